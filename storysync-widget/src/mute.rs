//! Global mute coordination
//!
//! Owns the single writer path for the global mute flag: the primary toggle
//! (shared by the floating control) and the legacy per-video "fake-ambient"
//! mute buttons. Also derives the floating control's visibility from an
//! intersection watch on the primary control, extended downward by one
//! viewport height so the float appears while the reader scrolls past it.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use storysync_common::host::{IntersectionOptions, PageHost, TargetId};
use storysync_common::WidgetEvent;

use crate::activity::WatchSet;
use crate::fade::FadeController;
use crate::state::SharedState;

/// Holds the authoritative mute flag and propagates it everywhere
pub struct MuteCoordinator {
    state: Arc<SharedState>,
    fade: Arc<FadeController>,
    page: Arc<dyn PageHost>,
    watches: Mutex<Option<WatchSet>>,
}

impl MuteCoordinator {
    pub fn new(
        state: Arc<SharedState>,
        fade: Arc<FadeController>,
        page: Arc<dyn PageHost>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state,
            fade,
            page,
            watches: Mutex::new(None),
        })
    }

    /// Install the floating-control and mute-button watches, replacing any
    /// previous set
    pub async fn install(self: &Arc<Self>) {
        self.teardown();

        let mut guards = Vec::new();
        let mut pumps = Vec::new();

        if let Some(control) = self.page.mute_control() {
            let watch = self.page.watch_intersection(
                &[control],
                IntersectionOptions {
                    top_margin_px: 0.0,
                    bottom_margin_px: self.page.viewport_height(),
                    threshold: 0.0,
                },
            );
            let (mut events, guard) = watch.into_parts();
            guards.push(guard);

            let state = Arc::clone(&self.state);
            pumps.push(tokio::spawn(async move {
                while let Some(entry) = events.recv().await {
                    // Fully out of the extended region means the reader has
                    // scrolled past the primary control
                    let visible = entry.ratio == 0.0;
                    if state.float_visible().await != visible {
                        state.set_float_visible(visible).await;
                        state.broadcast_event(WidgetEvent::FloatingControlVisibility {
                            visible,
                            timestamp: chrono::Utc::now(),
                        });
                    }
                }
            }));
        }

        let buttons: Vec<TargetId> = self
            .state
            .videos()
            .await
            .iter()
            .filter_map(|video| video.mute_button)
            .collect();
        if !buttons.is_empty() {
            let watch = self.page.watch_clicks(&buttons);
            let (mut events, guard) = watch.into_parts();
            guards.push(guard);

            let coordinator = Arc::clone(self);
            pumps.push(tokio::spawn(async move {
                while let Some(target) = events.recv().await {
                    debug!(%target, "video mute button clicked");
                    coordinator.handle_mute_button_click().await;
                }
            }));
        }

        *self.watches.lock().unwrap() = Some(WatchSet { guards, pumps });
    }

    /// Disconnect the coordinator's watches
    pub fn teardown(&self) {
        self.watches.lock().unwrap().take();
    }

    /// Flip the global mute flag
    ///
    /// Unmuting drops every tracked video to a known muted baseline, fades
    /// the currently active video back in so the reader hears the on-screen
    /// video rather than silence, and starts the companion background track.
    /// Muting just sets the flag: in-view videos pick it up on their next
    /// activation cycle and already-silent videos are unaffected. The
    /// background element's muted state follows the flag either way.
    pub async fn toggle(&self) {
        let muted = self.state.toggle_muted().await;
        info!(muted, "global mute toggled");
        self.state.broadcast_event(WidgetEvent::MuteChanged {
            muted,
            timestamp: chrono::Utc::now(),
        });

        let background = self.page.background_audio();
        if muted {
            if let Some(bg) = background {
                bg.set_muted(true);
            }
            return;
        }

        let videos = self.state.videos().await;
        for video in &videos {
            video.backend.set_muted(true);
        }

        if let Some(active_id) = self.state.active_video().await {
            if let Some(video) = videos.iter().find(|v| v.id == active_id) {
                self.fade.fade_in(video).await;
            }
        }

        if let Some(bg) = background {
            bg.set_muted(false);
            if let Err(err) = bg.play() {
                debug!(%err, "background track play rejected");
            }
        }
    }

    /// Legacy per-video mute button: flip the flag, then reconcile every
    /// tracked video against it, touching only the ones that differ
    pub async fn handle_mute_button_click(&self) {
        let muted = self.state.toggle_muted().await;
        info!(muted, "mute flipped from video mute button");
        self.state.broadcast_event(WidgetEvent::MuteChanged {
            muted,
            timestamp: chrono::Utc::now(),
        });

        for video in self.state.videos().await {
            if video.backend.is_muted() != muted {
                video.backend.set_muted(muted);
            }
        }
    }
}
