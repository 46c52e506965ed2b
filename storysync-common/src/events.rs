//! Event types for the storysync widget
//!
//! # Architecture
//!
//! The widget uses hybrid communication:
//! - **EventBus** (tokio::broadcast): one-to-many broadcasting toward the
//!   presentation layer (mute icon/text state, floating control visibility)
//! - **Command/activation channels** (tokio::mpsc): observer → single pump
//! - **Shared state** (RwLock): read-heavy access to the mute flag
//!
//! Activation events are internal to the engine crate and never serialized;
//! the types here are the externally visible surface.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Fade direction, carried by fade-related events and the fade controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeDirection {
    /// Volume ramping toward 1.0
    In,
    /// Volume ramping toward 0.0
    Out,
}

impl std::fmt::Display for FadeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FadeDirection::In => write!(f, "in"),
            FadeDirection::Out => write!(f, "out"),
        }
    }
}

/// Widget event types
///
/// Consumed by the presentation layer to render icon/text state. All events
/// carry a UTC timestamp so a listener joining late can order what it missed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WidgetEvent {
    /// Global mute flag changed
    MuteChanged {
        muted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A video became the active (audible) one
    VideoActivated {
        video_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A video stopped being active
    VideoDeactivated {
        video_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A fade ramp reached its target volume
    FadeCompleted {
        video_id: Uuid,
        direction: FadeDirection,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A silent video's source was cleared to release buffered media
    SourceUnloaded {
        video_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A previously unloaded video's source was restored
    SourceRestored {
        video_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Floating mute control visibility changed
    FloatingControlVisibility {
        visible: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast event bus
///
/// Thin wrapper over `tokio::sync::broadcast` so emitters don't care whether
/// anyone is listening. Lagged receivers drop the oldest events, which is
/// acceptable for presentation state: every event is self-describing.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<WidgetEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` undelivered events per receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Emit an event, failing if there are no subscribers
    pub fn emit(&self, event: WidgetEvent) -> Result<usize, broadcast::error::SendError<WidgetEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscribers case
    pub fn emit_lossy(&self, event: WidgetEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.tx.subscribe()
    }

    /// Configured buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
