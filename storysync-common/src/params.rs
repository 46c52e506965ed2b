//! Widget tuning parameters
//!
//! All tunables are stored per widget instance and carried by value into the
//! components that need them. Nothing here is a process-global: two widgets
//! mounted on one page must never share tuning.
//!
//! Values were tuned empirically against one publication's video lengths and
//! carry no algorithmic meaning; treat them as configuration, not derivation.
//! Out-of-range values are clamped to their documented range with a warning
//! rather than failing the mount.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Volume ramp and unload tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeParams {
    /// Ramp tick interval
    ///
    /// Valid range: [50, 1000] ms
    /// Default: 200 ms
    /// Both ramp directions step once per tick.
    pub tick_ms: u64,

    /// Volume increase per tick while ramping in
    ///
    /// Valid range: (0.0, 1.0]
    /// Default: 0.4
    /// Fast on purpose: perceived immediacy when scrolling to a video.
    pub fade_in_step: f32,

    /// Volume decrease per tick while ramping out
    ///
    /// Valid range: (0.0, 1.0]
    /// Default: 0.1
    /// Slow on purpose: avoids an abrupt cut when scrolling quickly past.
    pub fade_out_step: f32,

    /// Silence period before a faded-out video's source is released
    ///
    /// Valid range: [1000, 600000] ms
    /// Default: 30000 ms
    pub unload_delay_ms: u64,
}

impl Default for FadeParams {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            fade_in_step: 0.4,
            fade_out_step: 0.1,
            unload_delay_ms: 30_000,
        }
    }
}

impl FadeParams {
    /// Ramp tick interval as a Duration
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Unload delay as a Duration
    pub fn unload_delay(&self) -> Duration {
        Duration::from_millis(self.unload_delay_ms)
    }

    /// Clamp every field to its valid range, warning on each adjustment
    pub fn validate(mut self) -> Self {
        if !(50..=1000).contains(&self.tick_ms) {
            warn!(tick_ms = self.tick_ms, "tick_ms out of range, clamping");
            self.tick_ms = self.tick_ms.clamp(50, 1000);
        }
        if !(self.fade_in_step > 0.0 && self.fade_in_step <= 1.0) {
            warn!(step = self.fade_in_step, "fade_in_step out of range, using default");
            self.fade_in_step = Self::default().fade_in_step;
        }
        if !(self.fade_out_step > 0.0 && self.fade_out_step <= 1.0) {
            warn!(step = self.fade_out_step, "fade_out_step out of range, using default");
            self.fade_out_step = Self::default().fade_out_step;
        }
        if !(1_000..=600_000).contains(&self.unload_delay_ms) {
            warn!(
                unload_delay_ms = self.unload_delay_ms,
                "unload_delay_ms out of range, clamping"
            );
            self.unload_delay_ms = self.unload_delay_ms.clamp(1_000, 600_000);
        }
        self
    }
}

/// Visibility observation tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverParams {
    /// Intersection ratio above which a video counts as on screen
    ///
    /// Valid range: [0.0, 1.0)
    /// Default: 0.0
    pub observation_ratio: f32,

    /// Proportion of viewport height cut off the observation region
    ///
    /// Valid range: [0.0, 0.5)
    /// Default: 0.35
    /// Applied as a negative vertical margin, so a video activates only once
    /// it is well inside the viewport.
    pub margin_ratio: f64,
}

impl Default for ObserverParams {
    fn default() -> Self {
        Self {
            observation_ratio: 0.0,
            margin_ratio: 0.35,
        }
    }
}

impl ObserverParams {
    /// Clamp every field to its valid range, warning on each adjustment
    pub fn validate(mut self) -> Self {
        if !(0.0..1.0).contains(&self.observation_ratio) {
            warn!(
                ratio = self.observation_ratio,
                "observation_ratio out of range, using default"
            );
            self.observation_ratio = Self::default().observation_ratio;
        }
        if !(0.0..0.5).contains(&self.margin_ratio) {
            warn!(ratio = self.margin_ratio, "margin_ratio out of range, using default");
            self.margin_ratio = Self::default().margin_ratio;
        }
        self
    }
}

/// Complete widget parameter set
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetParams {
    pub fade: FadeParams,
    pub observer: ObserverParams,
}

impl WidgetParams {
    /// Validate every section
    pub fn validate(self) -> Self {
        Self {
            fade: self.fade.validate(),
            observer: self.observer.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = WidgetParams::default();
        assert_eq!(params.fade.tick_ms, 200);
        assert_eq!(params.fade.fade_in_step, 0.4);
        assert_eq!(params.fade.fade_out_step, 0.1);
        assert_eq!(params.fade.unload_delay_ms, 30_000);
        assert_eq!(params.observer.observation_ratio, 0.0);
        assert_eq!(params.observer.margin_ratio, 0.35);
    }

    #[test]
    fn test_validate_clamps_out_of_range() {
        let params = FadeParams {
            tick_ms: 10,
            fade_in_step: 1.5,
            fade_out_step: 0.0,
            unload_delay_ms: 0,
        }
        .validate();

        assert_eq!(params.tick_ms, 50);
        assert_eq!(params.fade_in_step, 0.4);
        assert_eq!(params.fade_out_step, 0.1);
        assert_eq!(params.unload_delay_ms, 1_000);
    }

    #[test]
    fn test_validate_keeps_in_range() {
        let params = FadeParams {
            tick_ms: 100,
            fade_in_step: 0.25,
            fade_out_step: 0.05,
            unload_delay_ms: 5_000,
        };
        assert_eq!(params.validate(), params);
    }

    #[test]
    fn test_observer_validate() {
        let params = ObserverParams {
            observation_ratio: 1.0,
            margin_ratio: 0.5,
        }
        .validate();

        assert_eq!(params.observation_ratio, 0.0);
        assert_eq!(params.margin_ratio, 0.35);
    }

    #[test]
    fn test_params_deserialize_partial() {
        let params: WidgetParams =
            serde_json::from_str(r#"{"fade": {"fade_in_step": 0.2}}"#).unwrap();
        assert_eq!(params.fade.fade_in_step, 0.2);
        // Unlisted fields fall back to defaults
        assert_eq!(params.fade.tick_ms, 200);
        assert_eq!(params.observer.margin_ratio, 0.35);
    }
}
