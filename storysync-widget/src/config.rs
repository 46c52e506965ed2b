//! Mount configuration
//!
//! The host page hands the widget the raw value of its mount point's data
//! attribute, a JSON object overriding any subset of the tuning parameters.
//!
//! # Configuration Philosophy
//!
//! - **Built-in defaults**: defined in code, every field optional
//! - **Partial overrides**: the attribute names only what it changes
//! - **Warn, don't fail**: out-of-range values are clamped with a warning;
//!   only malformed JSON rejects the mount, since a typo'd attribute means
//!   the page author's intent is unknowable

use serde::{Deserialize, Serialize};
use tracing::info;

use storysync_common::error::{Error, Result};
use storysync_common::params::WidgetParams;

/// Parsed mount configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Tuning overrides, defaulted field by field
    #[serde(flatten)]
    pub params: WidgetParams,
}

impl MountConfig {
    /// Parse the mount point's data attribute
    ///
    /// An absent or empty attribute yields the built-in defaults.
    pub fn from_attribute(attribute: Option<&str>) -> Result<Self> {
        let raw = match attribute {
            None => return Ok(Self::default()),
            Some(raw) if raw.trim().is_empty() => return Ok(Self::default()),
            Some(raw) => raw,
        };

        let config: Self = serde_json::from_str(raw)
            .map_err(|err| Error::Config(format!("invalid mount attribute: {err}")))?;
        info!("mount configuration parsed from data attribute");
        Ok(config)
    }

    /// Validated parameter set for the widget
    pub fn into_params(self) -> WidgetParams {
        self.params.validate()
    }
}
