//! Host page boundary
//!
//! The engine never touches a real document. Everything it needs from the
//! page — media elements, the custom playback API, visibility observation,
//! control clicks — arrives through the traits in this module. A production
//! binding implements them against the browser; tests drive the engine
//! through the deterministic doubles in [`fake`].
//!
//! Observation is delivered as event streams: installing a watch returns a
//! [`Watch`] holding an unbounded receiver plus a [`WatchGuard`] that
//! disconnects the underlying observer when dropped. Guard drop must never
//! panic, even for elements already removed from the document; hosts catch
//! and discard unobserve failures.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;

pub mod fake;

/// Identity of an observable page element (video container, control button)
pub type TargetId = Uuid;

/// One native media element, as mutated by the widget
///
/// Mirrors the subset of the element surface the widget touches: volume,
/// muted, paused/play/pause, the source attribute (cleared during unload,
/// restored on reactivation) and `load()` to force release of buffered
/// media. Reads on a detached element return the last known values; writes
/// on a detached element are ignored by the host.
pub trait MediaElement: Send + Sync {
    fn volume(&self) -> f32;
    fn set_volume(&self, volume: f32);

    fn is_muted(&self) -> bool;
    fn set_muted(&self, muted: bool);

    fn is_paused(&self) -> bool;

    /// Begin playback. May fail under host autoplay policy.
    fn play(&self) -> Result<()>;
    fn pause(&self);

    /// Current source attribute, if set
    fn src(&self) -> Option<String>;
    fn set_src(&self, src: &str);

    /// Remove the source attribute entirely
    fn clear_src(&self);

    /// Re-run the element's media load algorithm
    fn load(&self);

    /// Inline playback affordance for mobile hosts
    fn set_plays_inline(&self, inline: bool);

    /// False once the element has been removed from the document
    fn is_connected(&self) -> bool;
}

/// The host platform's custom playback API, when a video exposes one
///
/// Matches the third-party player surface: `play`, `pause`, `isPaused`,
/// `isMuted`, `setMuted`, plus the ambient flag that lets more than one
/// non-ambient video play at a time.
pub trait PlayerApi: Send + Sync {
    fn play(&self) -> Result<()>;
    fn pause(&self);
    fn is_paused(&self) -> bool;

    fn is_muted(&self) -> bool;
    fn set_muted(&self, muted: bool);

    /// Mark the wrapped player ambient so the host does not stop it when
    /// another video starts
    fn set_ambient(&self, ambient: bool);
}

/// One video matched by the page scan
///
/// The host resolves the container → media element lookup at discovery time
/// (the element itself when the container is a video, otherwise its first
/// descendant video), so the engine never walks the document.
pub struct DiscoveredVideo {
    /// Observation target for this video's container
    pub target: TargetId,
    /// Resolved native media element
    pub media: Arc<dyn MediaElement>,
    /// Custom playback API, when the container exposes one
    pub api: Option<Arc<dyn PlayerApi>>,
    /// Class list of the container, for slot classification
    pub container_classes: Vec<String>,
    /// Per-video mute button, when the player renders one
    pub mute_button: Option<TargetId>,
}

impl std::fmt::Debug for DiscoveredVideo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveredVideo")
            .field("target", &self.target)
            .field("has_api", &self.api.is_some())
            .field("container_classes", &self.container_classes)
            .field("mute_button", &self.mute_button)
            .finish()
    }
}

/// One intersection observation delivery
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: TargetId,
    /// Fraction of the target inside the (margin-adjusted) viewport
    pub ratio: f32,
}

/// One class-attribute mutation delivery
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMutation {
    pub target: TargetId,
    /// Full class list after the mutation
    pub classes: Vec<String>,
}

/// Geometry for an intersection watch
///
/// Margins follow the observer convention: negative values inset the
/// observation region, positive values extend it beyond the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntersectionOptions {
    pub top_margin_px: f64,
    pub bottom_margin_px: f64,
    pub threshold: f32,
}

/// Disconnects an installed observer when dropped
pub struct WatchGuard {
    disconnect: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchGuard {
    pub fn new(disconnect: impl FnOnce() + Send + 'static) -> Self {
        Self {
            disconnect: Some(Box::new(disconnect)),
        }
    }

    /// Guard for a watch with nothing to disconnect
    pub fn noop() -> Self {
        Self { disconnect: None }
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl std::fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchGuard")
            .field("armed", &self.disconnect.is_some())
            .finish()
    }
}

/// An installed observation: an event stream plus its disconnect guard
#[derive(Debug)]
pub struct Watch<T> {
    pub events: mpsc::UnboundedReceiver<T>,
    pub guard: WatchGuard,
}

impl<T> Watch<T> {
    /// Split into the receiver (for a pump task) and the guard (kept by the
    /// installer so teardown is a drop)
    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<T>, WatchGuard) {
        (self.events, self.guard)
    }
}

/// The page as seen by the widget
pub trait PageHost: Send + Sync {
    /// Current viewport height in pixels
    fn viewport_height(&self) -> f64;

    /// Scan the document for managed videos
    fn discover_videos(&self) -> Vec<DiscoveredVideo>;

    /// Install a viewport-intersection watch over `targets`
    fn watch_intersection(
        &self,
        targets: &[TargetId],
        options: IntersectionOptions,
    ) -> Watch<IntersectionEntry>;

    /// Install a class-attribute mutation watch over `targets`
    fn watch_class(&self, targets: &[TargetId]) -> Watch<ClassMutation>;

    /// Install a click watch over `targets`
    fn watch_clicks(&self, targets: &[TargetId]) -> Watch<TargetId>;

    /// The primary mute control, once the presentation layer has rendered it
    fn mute_control(&self) -> Option<TargetId>;

    /// The companion background audio element, if the story carries one
    fn background_audio(&self) -> Option<Arc<dyn MediaElement>>;
}
