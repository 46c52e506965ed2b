//! Fade controller integration tests
//!
//! Drives volume ramps against the fake host on a paused clock, asserting
//! the ramp-shape properties: monotone sequences bounded in [0.0, 1.0],
//! exact terminal values, play/pause only at ramp edges, direction mutual
//! exclusion, and the deferred unload/restore cycle.

mod helpers;

use std::sync::Arc;

use helpers::{advance_ms, settle, standalone_handle, ticks};
use storysync_common::events::{FadeDirection, WidgetEvent};
use storysync_common::host::MediaElement;
use storysync_common::params::FadeParams;
use storysync_widget::fade::FadeController;
use storysync_widget::state::SharedState;

fn controller() -> (Arc<SharedState>, FadeController) {
    helpers::init_tracing();
    let state = Arc::new(SharedState::new());
    let fade = FadeController::new(FadeParams::default(), Arc::clone(&state));
    (state, fade)
}

fn assert_non_decreasing(history: &[f32]) {
    for pair in history.windows(2) {
        assert!(pair[1] >= pair[0], "volume decreased: {history:?}");
    }
}

fn assert_non_increasing(history: &[f32]) {
    for pair in history.windows(2) {
        assert!(pair[1] <= pair[0], "volume increased: {history:?}");
    }
}

fn assert_bounded(history: &[f32]) {
    for volume in history {
        assert!((0.0..=1.0).contains(volume), "volume out of range: {history:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn fade_in_ramps_to_full_volume() {
    let (_state, fade) = controller();
    let (media, video) = standalone_handle();
    media.set_volume(0.0);

    fade.fade_in(&video).await;
    ticks(4).await;

    let history = media.volume_history();
    assert_eq!(history, vec![0.0, 0.4, 0.8, 1.0]);
    assert_non_decreasing(&history);
    assert_bounded(&history);

    let state = media.snapshot();
    assert!(!state.paused);
    assert_eq!(state.play_calls, 1);
    assert!(state.plays_inline);
    // Fade-in never mutes; the element keeps its prior muted state
    assert!(!state.muted);
    assert_eq!(video.fade_direction(), None);
}

#[tokio::test(start_paused = true)]
async fn fade_in_unmutes_only_when_globally_unmuted() {
    let (state, fade) = controller();
    let (media, video) = standalone_handle();
    media.set_volume(0.0);
    media.set_muted(true);

    // Muted flag (default) leaves the element muted
    fade.fade_in(&video).await;
    ticks(4).await;
    assert!(media.is_muted());

    // Unmuted flag lifts it on the next fade-in
    state.set_muted(false).await;
    fade.fade_out(&video).await;
    ticks(12).await;
    fade.fade_in(&video).await;
    ticks(4).await;
    assert!(!media.is_muted());
}

#[tokio::test(start_paused = true)]
async fn fade_in_at_full_volume_is_idempotent() {
    let (_state, fade) = controller();
    let (media, video) = standalone_handle();
    media.play().unwrap();

    fade.fade_in(&video).await;
    assert_eq!(video.fade_direction(), None, "no ramp for a full-volume video");

    ticks(4).await;
    assert!(media.volume_history().is_empty());
    assert_eq!(media.snapshot().play_calls, 1, "no extra play call");
}

#[tokio::test(start_paused = true)]
async fn fade_in_mid_ramp_does_not_restart() {
    let (_state, fade) = controller();
    let (media, video) = standalone_handle();
    media.set_volume(0.0);

    fade.fade_in(&video).await;
    ticks(1).await;
    assert_eq!(media.volume_history(), vec![0.0, 0.4]);

    fade.fade_in(&video).await;
    ticks(3).await;
    assert_eq!(media.volume_history(), vec![0.0, 0.4, 0.8, 1.0]);
}

#[tokio::test(start_paused = true)]
async fn fade_out_ramps_to_silence_then_pauses_and_mutes() {
    let (state, fade) = controller();
    let (media, video) = standalone_handle();
    media.play().unwrap();
    let mut events = state.subscribe_events();

    fade.fade_out(&video).await;
    ticks(11).await;

    let history = media.volume_history();
    assert_eq!(history.len(), 10);
    assert_eq!(*history.first().unwrap(), 0.9);
    assert_eq!(*history.last().unwrap(), 0.0);
    assert_non_increasing(&history);
    assert_bounded(&history);

    let snapshot = media.snapshot();
    assert!(snapshot.paused);
    assert!(snapshot.muted);
    assert_eq!(snapshot.pause_calls, 1, "pause issued once, at ramp end");
    assert_eq!(video.fade_direction(), None);

    let mut completed = false;
    while let Ok(event) = events.try_recv() {
        if let WidgetEvent::FadeCompleted { direction, .. } = event {
            assert_eq!(direction, FadeDirection::Out);
            completed = true;
        }
    }
    assert!(completed, "fade-out completion event expected");
}

#[tokio::test(start_paused = true)]
async fn fade_out_of_silent_video_is_a_no_op() {
    let (_state, fade) = controller();
    let (media, video) = standalone_handle();
    media.set_volume(0.0);
    let calls_before = media.volume_history().len();

    fade.fade_out(&video).await;
    ticks(4).await;

    assert_eq!(video.fade_direction(), None);
    assert_eq!(media.volume_history().len(), calls_before);
    assert_eq!(media.snapshot().pause_calls, 0, "no pause re-issued for silent video");
}

#[tokio::test(start_paused = true)]
async fn fade_out_cancels_in_flight_fade_in() {
    let (_state, fade) = controller();
    let (media, video) = standalone_handle();
    media.set_volume(0.0);

    fade.fade_in(&video).await;
    ticks(1).await;
    assert_eq!(video.fade_direction(), Some(FadeDirection::In));

    fade.fade_out(&video).await;
    assert_eq!(video.fade_direction(), Some(FadeDirection::Out));
    ticks(6).await;

    assert_eq!(media.volume_history(), vec![0.0, 0.4, 0.3, 0.2, 0.1, 0.0]);
    assert!(media.snapshot().paused);
    assert!(media.snapshot().muted);
}

#[tokio::test(start_paused = true)]
async fn fade_in_cancels_in_flight_fade_out() {
    let (_state, fade) = controller();
    let (media, video) = standalone_handle();
    media.play().unwrap();

    fade.fade_out(&video).await;
    ticks(2).await;
    assert_eq!(media.volume_history(), vec![0.9, 0.8]);

    fade.fade_in(&video).await;
    assert_eq!(video.fade_direction(), Some(FadeDirection::In));
    ticks(2).await;

    assert_eq!(media.volume_history(), vec![0.9, 0.8, 1.0]);
    assert!(!media.snapshot().paused, "fade-in never pauses");
    assert_eq!(video.fade_direction(), None);
}

#[tokio::test(start_paused = true)]
async fn silent_video_unloads_after_delay_and_reloads_on_fade_in() {
    let (state, fade) = controller();
    let (media, video) = standalone_handle();
    media.play().unwrap();
    media.set_volume(0.1);
    let mut events = state.subscribe_events();

    fade.fade_out(&video).await;
    ticks(2).await;
    assert_eq!(media.volume(), 0.0);

    // Just before the deadline nothing has happened
    advance_ms(29_000).await;
    assert_eq!(media.src().as_deref(), Some("clip.mp4"));
    assert!(!video.is_unloaded());

    advance_ms(1_500).await;
    assert_eq!(media.src(), None, "source cleared after the silence window");
    assert!(video.is_unloaded());
    assert_eq!(media.snapshot().load_calls, 1);

    // The next fade-in restores the cached source before playing
    fade.fade_in(&video).await;
    settle().await;
    assert_eq!(media.src().as_deref(), Some("clip.mp4"));
    assert!(!video.is_unloaded());
    assert_eq!(media.snapshot().load_calls, 2);

    ticks(4).await;
    assert_eq!(media.volume(), 1.0);
    assert!(!media.snapshot().paused);

    let mut saw_unloaded = false;
    let mut saw_restored = false;
    while let Ok(event) = events.try_recv() {
        match event {
            WidgetEvent::SourceUnloaded { .. } => saw_unloaded = true,
            WidgetEvent::SourceRestored { .. } => saw_restored = true,
            _ => {}
        }
    }
    assert!(saw_unloaded && saw_restored);
}

#[tokio::test(start_paused = true)]
async fn fade_in_cancels_pending_unload() {
    let (_state, fade) = controller();
    let (media, video) = standalone_handle();
    media.play().unwrap();
    media.set_volume(0.1);

    fade.fade_out(&video).await;
    ticks(2).await;
    advance_ms(10_000).await;

    fade.fade_in(&video).await;
    advance_ms(60_000).await;

    assert_eq!(media.src().as_deref(), Some("clip.mp4"), "unload was cancelled");
    assert!(!video.is_unloaded());
}

#[tokio::test(start_paused = true)]
async fn rejected_play_is_swallowed_and_ramp_continues() {
    let (_state, fade) = controller();
    let (media, video) = standalone_handle();
    media.set_volume(0.0);
    media.fail_next_play();

    fade.fade_in(&video).await;
    ticks(4).await;

    assert!(media.snapshot().paused, "play stayed rejected");
    assert_eq!(media.volume(), 1.0, "ramp ran regardless");
}

#[tokio::test(start_paused = true)]
async fn detached_element_stops_ramp_without_error() {
    let (_state, fade) = controller();
    let (media, video) = standalone_handle();
    media.set_volume(0.0);

    fade.fade_in(&video).await;
    ticks(1).await;
    assert_eq!(media.volume_history(), vec![0.0, 0.4]);

    media.set_connected(false);
    ticks(4).await;

    assert_eq!(media.volume_history(), vec![0.0, 0.4], "no writes after detach");
    assert_eq!(video.fade_direction(), None, "ramp stopped itself");
}
