//! Shared widget state
//!
//! Thread-safe shared state for coordination between the detector, fade
//! controller, and mute coordinator. Uses RwLock for concurrent read access
//! with rare writes: the mute flag is read on every fade and written only on
//! a toggle.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::RwLock;
use uuid::Uuid;

use storysync_common::events::{EventBus, WidgetEvent};

use crate::handle::VideoHandle;

/// Shared state accessible by all components
pub struct SharedState {
    /// Global mute flag. The story starts muted.
    muted: RwLock<bool>,

    /// Floating mute control visibility
    float_visible: RwLock<bool>,

    /// Currently tracked videos, replaced wholesale on rescan
    videos: RwLock<Vec<Arc<VideoHandle>>>,

    /// The video whose audio should currently be audible, if any
    active_video: RwLock<Option<Uuid>>,

    /// Event broadcaster toward the presentation layer
    event_bus: EventBus,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            muted: RwLock::new(true),
            float_visible: RwLock::new(false),
            videos: RwLock::new(Vec::new()),
            active_video: RwLock::new(None),
            event_bus: EventBus::default(),
        }
    }

    /// Broadcast an event to all listeners; no listeners is fine
    pub fn broadcast_event(&self, event: WidgetEvent) {
        self.event_bus.emit_lossy(event);
    }

    /// Subscribe to the widget event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<WidgetEvent> {
        self.event_bus.subscribe()
    }

    pub async fn is_muted(&self) -> bool {
        *self.muted.read().await
    }

    pub async fn set_muted(&self, muted: bool) {
        *self.muted.write().await = muted;
    }

    /// Flip the mute flag, returning the new value
    pub async fn toggle_muted(&self) -> bool {
        let mut muted = self.muted.write().await;
        *muted = !*muted;
        *muted
    }

    pub async fn float_visible(&self) -> bool {
        *self.float_visible.read().await
    }

    pub async fn set_float_visible(&self, visible: bool) {
        *self.float_visible.write().await = visible;
    }

    pub async fn videos(&self) -> Vec<Arc<VideoHandle>> {
        self.videos.read().await.clone()
    }

    pub async fn set_videos(&self, videos: Vec<Arc<VideoHandle>>) {
        *self.videos.write().await = videos;
    }

    pub async fn active_video(&self) -> Option<Uuid> {
        *self.active_video.read().await
    }

    pub async fn set_active_video(&self, video_id: Option<Uuid>) {
        *self.active_video.write().await = video_id;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
