//! Timer-driven volume ramps
//!
//! Fades one video's audio in or out on a fixed tick, issuing play/pause and
//! mute transitions only at the edges of a ramp: play when a fade-in starts,
//! pause and mute when a fade-out reaches silence. Ramp direction mutual
//! exclusion lives in the handle's fade slot; this module supplies the
//! policy around it.
//!
//! Step sizes are asymmetric: fade-in is fast (perceived immediacy when the
//! reader scrolls to a video) and fade-out slow (no abrupt cut when
//! scrolling quickly past a boundary).
//!
//! A video that stays silent for the unload delay has its source cleared to
//! release the host's buffered media; the next fade-in restores it.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use storysync_common::events::{FadeDirection, WidgetEvent};
use storysync_common::params::FadeParams;

use crate::handle::VideoHandle;
use crate::state::SharedState;

/// Round a volume to the two decimal places the ramp operates in
fn round2(volume: f32) -> f32 {
    (volume * 100.0).round() / 100.0
}

/// Drives volume ramps for every tracked video
pub struct FadeController {
    params: FadeParams,
    state: Arc<SharedState>,
}

impl FadeController {
    pub fn new(params: FadeParams, state: Arc<SharedState>) -> Self {
        Self { params, state }
    }

    /// Bring a video to audible volume and playing state
    ///
    /// Restores an unloaded source, cancels any pending unload and any
    /// fade-out in flight, unmutes when the global flag allows, starts
    /// playback, then ramps volume toward 1.0. Calling this on a video that
    /// is already ramping in (or already at full volume and playing) changes
    /// nothing.
    pub async fn fade_in(&self, video: &Arc<VideoHandle>) {
        let media = video.backend.media();

        let saved = video.saved_src.lock().unwrap().take();
        if let Some(src) = saved {
            debug!(video = %video.id, "restoring unloaded source");
            media.set_src(&src);
            media.load();
            self.state.broadcast_event(WidgetEvent::SourceRestored {
                video_id: video.id,
                timestamp: chrono::Utc::now(),
            });
        }

        video.cancel_unload();
        video.cancel_ramp_if(FadeDirection::Out);

        if !self.state.is_muted().await && video.backend.is_muted() {
            video.backend.set_muted(false);
        }

        media.set_plays_inline(true);

        if video.backend.is_paused() {
            if let Err(err) = video.backend.play() {
                debug!(video = %video.id, %err, "play rejected, leaving video paused");
            }
        }

        if media.volume() < 1.0 {
            let Some(generation) = video.begin_ramp(FadeDirection::In) else {
                return;
            };
            let handle = self.spawn_ramp_in(Arc::clone(video), generation);
            video.install_ramp(generation, FadeDirection::In, handle);
        }
    }

    /// Take a video to silence, then paused and muted
    ///
    /// Cancels any fade-in in flight and ramps volume toward 0.0. Reaching
    /// silence pauses the video, mutes it, and arms the deferred unload. A
    /// video already silent is left untouched.
    pub async fn fade_out(&self, video: &Arc<VideoHandle>) {
        video.cancel_ramp_if(FadeDirection::In);

        if video.backend.media().volume() <= 0.0 {
            return;
        }
        let Some(generation) = video.begin_ramp(FadeDirection::Out) else {
            return;
        };
        let handle = self.spawn_ramp_out(Arc::clone(video), generation);
        video.install_ramp(generation, FadeDirection::Out, handle);
    }

    fn spawn_ramp_in(&self, video: Arc<VideoHandle>, generation: u64) -> tokio::task::JoinHandle<()> {
        let step = self.params.fade_in_step;
        let tick = self.params.tick();
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let media = video.backend.media();
            let mut volume = media.volume();
            loop {
                tokio::time::sleep(tick).await;
                if !media.is_connected() {
                    debug!(video = %video.id, "element detached mid-ramp, stopping");
                    video.finish_ramp(generation);
                    return;
                }
                volume = round2((volume + step).min(1.0));
                media.set_volume(volume);
                if volume >= 1.0 {
                    video.finish_ramp(generation);
                    state.broadcast_event(WidgetEvent::FadeCompleted {
                        video_id: video.id,
                        direction: FadeDirection::In,
                        timestamp: chrono::Utc::now(),
                    });
                    return;
                }
            }
        })
    }

    fn spawn_ramp_out(&self, video: Arc<VideoHandle>, generation: u64) -> tokio::task::JoinHandle<()> {
        let step = self.params.fade_out_step;
        let tick = self.params.tick();
        let unload_delay = self.params.unload_delay();
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let media = video.backend.media();
            let mut volume = media.volume();
            loop {
                tokio::time::sleep(tick).await;
                if !media.is_connected() {
                    debug!(video = %video.id, "element detached mid-ramp, stopping");
                    video.finish_ramp(generation);
                    return;
                }
                volume = round2((volume - step).max(0.0));
                media.set_volume(volume);
                if volume <= 0.0 {
                    video.backend.pause();
                    video.backend.set_muted(true);
                    video.finish_ramp(generation);
                    state.broadcast_event(WidgetEvent::FadeCompleted {
                        video_id: video.id,
                        direction: FadeDirection::Out,
                        timestamp: chrono::Utc::now(),
                    });
                    arm_unload(&video, &state, unload_delay);
                    return;
                }
            }
        })
    }
}

/// Schedule the deferred source release for a video that just went silent
///
/// Fires after `delay` unless a fade-in cancels it first: caches the source
/// string on the handle, clears the source attribute, and reloads the
/// element into an empty state so the host releases buffered media.
fn arm_unload(video: &Arc<VideoHandle>, state: &Arc<SharedState>, delay: Duration) {
    let task_video = Arc::clone(video);
    let task_state = Arc::clone(state);

    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        // Release our own slot; the unload is no longer cancellable
        task_video.unload.lock().unwrap().take();

        let media = task_video.backend.media();
        if !media.is_connected() {
            debug!(video = %task_video.id, "element detached before unload, skipping");
            return;
        }
        let Some(src) = media.src() else {
            return;
        };
        debug!(video = %task_video.id, "releasing media for silent video");
        *task_video.saved_src.lock().unwrap() = Some(src);
        media.clear_src();
        media.load();
        task_state.broadcast_event(WidgetEvent::SourceUnloaded {
            video_id: task_video.id,
            timestamp: chrono::Utc::now(),
        });
    });

    let mut slot = video.unload.lock().unwrap();
    if let Some(old) = slot.replace(handle) {
        old.abort();
    }
}
