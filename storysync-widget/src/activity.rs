//! Visibility-driven activation
//!
//! Watches the page two ways and feeds one activation sink:
//!
//! - **Intersection**: regular videos occupy their own layout slot, so a
//!   single viewport-intersection watch (margins inset by a fraction of the
//!   viewport height) tells us which one the reader is looking at.
//! - **Class mutation**: stacked crossfade videos are all simultaneously
//!   visible, so intersection can't tell them apart; the host toggles an
//!   active class between them instead, and the detector derives
//!   enter/leave transitions from class-attribute mutations.
//!
//! Installing watches always tears down the previous set first, so a rescan
//! never leaks observers; exactly one watch of each kind is live at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use storysync_common::host::{
    DiscoveredVideo, IntersectionOptions, PageHost, TargetId, WatchGuard,
};
use storysync_common::params::ObserverParams;

use crate::handle::{SlotKind, VideoHandle};

/// Container class marking a stacked crossfade group
pub const CROSSFADE_CONTAINER_CLASS: &str = "VideoCrossfade";

/// Class the host toggles onto the audible member of a crossfade group
pub const PLAY_ACTIVE_CLASS: &str = "play-active";

/// One activation transition, consumed immediately by the widget pump
pub struct ActivationEvent {
    pub video: Arc<VideoHandle>,
    pub active: bool,
}

/// Guards and pump tasks for one installed generation of watches
///
/// Dropping the set disconnects the observers (guard drop) and aborts the
/// pump tasks, so teardown is a single assignment.
pub(crate) struct WatchSet {
    pub(crate) guards: Vec<WatchGuard>,
    pub(crate) pumps: Vec<JoinHandle<()>>,
}

impl Drop for WatchSet {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
    }
}

/// Determines which videos are active right now
pub struct ActivityDetector {
    page: Arc<dyn PageHost>,
    params: ObserverParams,
    sink: mpsc::UnboundedSender<ActivationEvent>,
    watches: Mutex<Option<WatchSet>>,
}

impl ActivityDetector {
    pub fn new(
        page: Arc<dyn PageHost>,
        params: ObserverParams,
        sink: mpsc::UnboundedSender<ActivationEvent>,
    ) -> Self {
        Self {
            page,
            params,
            sink,
            watches: Mutex::new(None),
        }
    }

    /// Classify a discovered video's layout slot
    pub fn classify(video: &DiscoveredVideo) -> SlotKind {
        if video
            .container_classes
            .iter()
            .any(|class| class == CROSSFADE_CONTAINER_CLASS)
        {
            SlotKind::StackedCrossfade
        } else {
            SlotKind::Regular
        }
    }

    /// Install watches over the tracked set, replacing any previous set
    pub fn install(&self, videos: &[Arc<VideoHandle>]) {
        self.teardown();

        let mut guards = Vec::new();
        let mut pumps = Vec::new();

        let regular: HashMap<TargetId, Arc<VideoHandle>> = videos
            .iter()
            .filter(|v| v.kind == SlotKind::Regular)
            .map(|v| (v.target, Arc::clone(v)))
            .collect();
        let regular_count = regular.len();
        if !regular.is_empty() {
            let targets: Vec<TargetId> = regular.keys().copied().collect();
            let inset = -(self.page.viewport_height() * self.params.margin_ratio);
            let watch = self.page.watch_intersection(
                &targets,
                IntersectionOptions {
                    top_margin_px: inset,
                    bottom_margin_px: inset,
                    threshold: self.params.observation_ratio,
                },
            );
            let (mut events, guard) = watch.into_parts();
            guards.push(guard);

            let sink = self.sink.clone();
            let threshold = self.params.observation_ratio;
            pumps.push(tokio::spawn(async move {
                while let Some(entry) = events.recv().await {
                    let Some(video) = regular.get(&entry.target) else {
                        continue;
                    };
                    let active = entry.ratio > threshold;
                    debug!(video = %video.id, ratio = entry.ratio, active, "intersection entry");
                    let event = ActivationEvent {
                        video: Arc::clone(video),
                        active,
                    };
                    if sink.send(event).is_err() {
                        return;
                    }
                }
            }));
        }

        let stacked: HashMap<TargetId, Arc<VideoHandle>> = videos
            .iter()
            .filter(|v| v.kind == SlotKind::StackedCrossfade)
            .map(|v| (v.target, Arc::clone(v)))
            .collect();
        let stacked_count = stacked.len();
        if !stacked.is_empty() {
            let targets: Vec<TargetId> = stacked.keys().copied().collect();
            let watch = self.page.watch_class(&targets);
            let (mut events, guard) = watch.into_parts();
            guards.push(guard);

            let sink = self.sink.clone();
            pumps.push(tokio::spawn(async move {
                // Crossfade groups start with no member marked active
                let mut last_active: HashMap<TargetId, bool> =
                    stacked.keys().map(|target| (*target, false)).collect();
                while let Some(mutation) = events.recv().await {
                    let Some(video) = stacked.get(&mutation.target) else {
                        continue;
                    };
                    let active = mutation
                        .classes
                        .iter()
                        .any(|class| class == PLAY_ACTIVE_CLASS);
                    let was_active = last_active.insert(mutation.target, active).unwrap_or(false);
                    if active == was_active {
                        continue;
                    }
                    debug!(video = %video.id, active, "crossfade class transition");
                    let event = ActivationEvent {
                        video: Arc::clone(video),
                        active,
                    };
                    if sink.send(event).is_err() {
                        return;
                    }
                }
            }));
        }

        debug!(regular = regular_count, stacked = stacked_count, "activity watches installed");
        *self.watches.lock().unwrap() = Some(WatchSet { guards, pumps });
    }

    /// Disconnect every installed watch
    pub fn teardown(&self) {
        // Guard drop disconnects; WatchSet drop aborts the pumps
        self.watches.lock().unwrap().take();
    }
}
