//! Widget root
//!
//! Composes the detector, fade controller, and mute coordinator over one
//! host page and owns their lifecycles: mount scans the page and installs
//! watches, rescan repeats that without leaking the previous generation,
//! unmount disconnects everything and aborts every scheduled task.
//!
//! Activation events flow through a single pump task: the detector is the
//! producer, the pump records which video is active and drives the fade
//! controller. The pump never blocks the observers; events queue on an
//! unbounded channel and are handled in delivery order.

use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use storysync_common::host::PageHost;
use storysync_common::{Result, WidgetEvent, WidgetParams};

use crate::activity::{ActivationEvent, ActivityDetector};
use crate::config::MountConfig;
use crate::fade::FadeController;
use crate::handle::VideoHandle;
use crate::mute::MuteCoordinator;
use crate::state::SharedState;

/// The mounted widget
pub struct Widget {
    page: Arc<dyn PageHost>,
    params: WidgetParams,
    state: Arc<SharedState>,
    fade: Arc<FadeController>,
    detector: ActivityDetector,
    mute: Arc<MuteCoordinator>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl Widget {
    /// Mount the widget against a host page
    ///
    /// `attribute` is the raw value of the mount point's data attribute,
    /// parsed as JSON tuning overrides. Mounting scans the page for videos,
    /// puts each one into the muted/silent baseline, installs the
    /// observation watches, and starts the activation pump.
    pub async fn mount(page: Arc<dyn PageHost>, attribute: Option<&str>) -> Result<Arc<Self>> {
        let params = MountConfig::from_attribute(attribute)?.into_params();
        let state = Arc::new(SharedState::new());
        let fade = Arc::new(FadeController::new(params.fade, Arc::clone(&state)));

        let (sink, events) = mpsc::unbounded_channel();
        let detector = ActivityDetector::new(Arc::clone(&page), params.observer, sink);
        let mute = MuteCoordinator::new(Arc::clone(&state), Arc::clone(&fade), Arc::clone(&page));

        let widget = Arc::new(Self {
            page,
            params,
            state: Arc::clone(&state),
            fade: Arc::clone(&fade),
            detector,
            mute,
            pump: Mutex::new(None),
        });

        let pump = tokio::spawn(pump_activations(events, state, fade));
        *widget.pump.lock().unwrap() = Some(pump);

        widget.rescan().await;
        let tracked = widget.state.videos().await.len();
        info!(videos = tracked, "widget mounted");
        Ok(widget)
    }

    /// Re-run discovery, replacing the tracked set and every watch
    ///
    /// Safe to call after the host re-renders the article body. Videos that
    /// left the set have their scheduled tasks cancelled; the observer
    /// generations are swapped atomically enough that no watch leaks.
    pub async fn rescan(&self) {
        for video in self.state.videos().await {
            video.cancel_all();
        }

        let muted = self.state.is_muted().await;
        let mut handles = Vec::new();
        for discovered in self.page.discover_videos() {
            let kind = ActivityDetector::classify(&discovered);
            let video = VideoHandle::new(&discovered, kind);

            // Baseline: muted per the flag, silent so a fade-in has
            // somewhere to go, and marked ambient so the host lets several
            // videos play at once.
            video.backend.set_muted(muted);
            video.backend.media().set_volume(0.0);
            video.backend.set_ambient(true);

            debug!(video = %video.id, kind = ?video.kind, "tracking video");
            handles.push(video);
        }

        self.state.set_videos(handles.clone()).await;
        self.state.set_active_video(None).await;

        self.detector.install(&handles);
        self.mute.install().await;
    }

    /// Flip the global mute flag (primary control and floating control)
    pub async fn toggle_mute(&self) {
        self.mute.toggle().await;
    }

    /// Unmount: disconnect every watch and abort every scheduled task
    pub async fn unmount(&self) {
        self.detector.teardown();
        self.mute.teardown();
        if let Some(pump) = self.pump.lock().unwrap().take() {
            pump.abort();
        }
        for video in self.state.videos().await {
            video.cancel_all();
        }
        self.state.set_videos(Vec::new()).await;
        self.state.set_active_video(None).await;
        info!("widget unmounted");
    }

    /// Shared state handle, for the presentation layer
    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    /// Subscribe to widget events
    pub fn subscribe_events(&self) -> broadcast::Receiver<WidgetEvent> {
        self.state.subscribe_events()
    }

    /// The validated parameter set this widget runs with
    pub fn params(&self) -> WidgetParams {
        self.params
    }
}

/// Consume activation events, tracking the active video and driving fades
async fn pump_activations(
    mut events: mpsc::UnboundedReceiver<ActivationEvent>,
    state: Arc<SharedState>,
    fade: Arc<FadeController>,
) {
    while let Some(event) = events.recv().await {
        if event.active {
            state.set_active_video(Some(event.video.id)).await;
            state.broadcast_event(WidgetEvent::VideoActivated {
                video_id: event.video.id,
                timestamp: chrono::Utc::now(),
            });
            fade.fade_in(&event.video).await;
        } else {
            if state.active_video().await == Some(event.video.id) {
                state.set_active_video(None).await;
            }
            state.broadcast_event(WidgetEvent::VideoDeactivated {
                video_id: event.video.id,
                timestamp: chrono::Utc::now(),
            });
            fade.fade_out(&event.video).await;
        }
    }
}
