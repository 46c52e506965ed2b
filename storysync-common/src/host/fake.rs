//! Deterministic host doubles
//!
//! In-memory stand-ins for the page boundary, used by every engine test.
//! `FakePage` lets a test deliver synthetic intersection entries, class
//! mutations, and control clicks, and to count live watches so observer
//! leaks across rescans are detectable.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::{
    ClassMutation, DiscoveredVideo, IntersectionEntry, IntersectionOptions, MediaElement,
    PageHost, PlayerApi, TargetId, Watch, WatchGuard,
};
use crate::error::{Error, Result};

/// Mutable state of a [`FakeMediaElement`]
#[derive(Debug, Clone)]
pub struct MediaState {
    pub volume: f32,
    pub muted: bool,
    pub paused: bool,
    pub src: Option<String>,
    pub plays_inline: bool,
    pub connected: bool,
    /// Every volume value applied, in order
    pub volume_history: Vec<f32>,
    pub load_calls: u32,
    pub play_calls: u32,
    pub pause_calls: u32,
    fail_next_play: bool,
}

impl MediaState {
    fn new(src: Option<String>) -> Self {
        Self {
            volume: 1.0,
            muted: false,
            paused: true,
            src,
            plays_inline: false,
            connected: true,
            volume_history: Vec::new(),
            load_calls: 0,
            play_calls: 0,
            pause_calls: 0,
            fail_next_play: false,
        }
    }
}

/// In-memory media element
#[derive(Debug)]
pub struct FakeMediaElement {
    state: Mutex<MediaState>,
}

impl FakeMediaElement {
    pub fn new(src: &str) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MediaState::new(Some(src.to_string()))),
        })
    }

    /// Snapshot of the current state
    pub fn snapshot(&self) -> MediaState {
        self.state.lock().unwrap().clone()
    }

    /// Simulate removal from the document
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().unwrap().connected = connected;
    }

    /// Make the next `play()` fail, as under an autoplay policy
    pub fn fail_next_play(&self) {
        self.state.lock().unwrap().fail_next_play = true;
    }

    /// Volume values applied so far, in order
    pub fn volume_history(&self) -> Vec<f32> {
        self.state.lock().unwrap().volume_history.clone()
    }
}

impl MediaElement for FakeMediaElement {
    fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    fn set_volume(&self, volume: f32) {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return;
        }
        state.volume = volume;
        state.volume_history.push(volume);
    }

    fn is_muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    fn set_muted(&self, muted: bool) {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return;
        }
        state.muted = muted;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn play(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(Error::Host("element is detached".into()));
        }
        if state.fail_next_play {
            state.fail_next_play = false;
            return Err(Error::Playback("autoplay blocked".into()));
        }
        state.paused = false;
        state.play_calls += 1;
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return;
        }
        state.paused = true;
        state.pause_calls += 1;
    }

    fn src(&self) -> Option<String> {
        self.state.lock().unwrap().src.clone()
    }

    fn set_src(&self, src: &str) {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return;
        }
        state.src = Some(src.to_string());
    }

    fn clear_src(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return;
        }
        state.src = None;
    }

    fn load(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return;
        }
        state.load_calls += 1;
    }

    fn set_plays_inline(&self, inline: bool) {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return;
        }
        state.plays_inline = inline;
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }
}

/// In-memory custom playback API, wrapping a fake element the way the host
/// platform's player wraps its video
#[derive(Debug)]
pub struct FakePlayerApi {
    media: Arc<FakeMediaElement>,
    ambient: AtomicBool,
    play_calls: AtomicU32,
    pause_calls: AtomicU32,
}

impl FakePlayerApi {
    pub fn new(media: Arc<FakeMediaElement>) -> Arc<Self> {
        Arc::new(Self {
            media,
            ambient: AtomicBool::new(false),
            play_calls: AtomicU32::new(0),
            pause_calls: AtomicU32::new(0),
        })
    }

    pub fn is_ambient(&self) -> bool {
        self.ambient.load(Ordering::SeqCst)
    }

    /// Calls that went through the API rather than the bare element
    pub fn api_play_calls(&self) -> u32 {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn api_pause_calls(&self) -> u32 {
        self.pause_calls.load(Ordering::SeqCst)
    }
}

impl PlayerApi for FakePlayerApi {
    fn play(&self) -> Result<()> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        self.media.play()
    }

    fn pause(&self) {
        self.pause_calls.fetch_add(1, Ordering::SeqCst);
        self.media.pause();
    }

    fn is_paused(&self) -> bool {
        self.media.is_paused()
    }

    fn is_muted(&self) -> bool {
        self.media.is_muted()
    }

    fn set_muted(&self, muted: bool) {
        self.media.set_muted(muted);
    }

    fn set_ambient(&self, ambient: bool) {
        self.ambient.store(ambient, Ordering::SeqCst);
    }
}

struct WatchRec<T> {
    id: u64,
    targets: Vec<TargetId>,
    tx: mpsc::UnboundedSender<T>,
}

#[derive(Default)]
struct PageInner {
    viewport_height: f64,
    videos: Vec<DiscoveredVideo>,
    mute_control: Option<TargetId>,
    background: Option<Arc<FakeMediaElement>>,
    intersection: Vec<(WatchRec<IntersectionEntry>, IntersectionOptions)>,
    class: Vec<WatchRec<ClassMutation>>,
    clicks: Vec<WatchRec<TargetId>>,
}

/// In-memory page
pub struct FakePage {
    inner: Arc<Mutex<PageInner>>,
    next_watch_id: AtomicU64,
}

impl FakePage {
    pub fn new(viewport_height: f64) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(Mutex::new(PageInner {
                viewport_height,
                ..PageInner::default()
            })),
            next_watch_id: AtomicU64::new(1),
        })
    }

    pub fn add_video(&self, video: DiscoveredVideo) {
        self.inner.lock().unwrap().videos.push(video);
    }

    /// Replace the discoverable video set (as after a host re-render)
    pub fn set_videos(&self, videos: Vec<DiscoveredVideo>) {
        self.inner.lock().unwrap().videos = videos;
    }

    pub fn set_mute_control(&self, target: TargetId) {
        self.inner.lock().unwrap().mute_control = Some(target);
    }

    pub fn set_background_audio(&self, media: Arc<FakeMediaElement>) {
        self.inner.lock().unwrap().background = Some(media);
    }

    /// Deliver an intersection entry to every live watch observing `target`
    pub fn push_intersection(&self, target: TargetId, ratio: f32) {
        let inner = self.inner.lock().unwrap();
        for (rec, _) in &inner.intersection {
            if rec.targets.contains(&target) {
                let _ = rec.tx.send(IntersectionEntry { target, ratio });
            }
        }
    }

    /// Change a target's class list, notifying every live class watch
    pub fn set_classes(&self, target: TargetId, classes: &[&str]) {
        let inner = self.inner.lock().unwrap();
        let classes: Vec<String> = classes.iter().map(|c| c.to_string()).collect();
        for rec in &inner.class {
            if rec.targets.contains(&target) {
                let _ = rec.tx.send(ClassMutation {
                    target,
                    classes: classes.clone(),
                });
            }
        }
    }

    /// Deliver a click to every live click watch observing `target`
    pub fn click(&self, target: TargetId) {
        let inner = self.inner.lock().unwrap();
        for rec in &inner.clicks {
            if rec.targets.contains(&target) {
                let _ = rec.tx.send(target);
            }
        }
    }

    pub fn intersection_watch_count(&self) -> usize {
        self.inner.lock().unwrap().intersection.len()
    }

    pub fn class_watch_count(&self) -> usize {
        self.inner.lock().unwrap().class.len()
    }

    pub fn click_watch_count(&self) -> usize {
        self.inner.lock().unwrap().clicks.len()
    }

    /// Total live watches of every kind
    pub fn watch_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.intersection.len() + inner.class.len() + inner.clicks.len()
    }

    /// Options of the most recently installed intersection watch
    pub fn last_intersection_options(&self) -> Option<IntersectionOptions> {
        self.inner
            .lock()
            .unwrap()
            .intersection
            .last()
            .map(|(_, options)| *options)
    }

    fn next_id(&self) -> u64 {
        self.next_watch_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl PageHost for FakePage {
    fn viewport_height(&self) -> f64 {
        self.inner.lock().unwrap().viewport_height
    }

    fn discover_videos(&self) -> Vec<DiscoveredVideo> {
        let inner = self.inner.lock().unwrap();
        inner
            .videos
            .iter()
            .map(|v| DiscoveredVideo {
                target: v.target,
                media: Arc::clone(&v.media),
                api: v.api.clone(),
                container_classes: v.container_classes.clone(),
                mute_button: v.mute_button,
            })
            .collect()
    }

    fn watch_intersection(
        &self,
        targets: &[TargetId],
        options: IntersectionOptions,
    ) -> Watch<IntersectionEntry> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id();
        let rec = WatchRec {
            id,
            targets: targets.to_vec(),
            tx,
        };
        self.inner.lock().unwrap().intersection.push((rec, options));

        let inner = Arc::clone(&self.inner);
        Watch {
            events: rx,
            guard: WatchGuard::new(move || {
                inner.lock().unwrap().intersection.retain(|(rec, _)| rec.id != id);
            }),
        }
    }

    fn watch_class(&self, targets: &[TargetId]) -> Watch<ClassMutation> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id();
        self.inner.lock().unwrap().class.push(WatchRec {
            id,
            targets: targets.to_vec(),
            tx,
        });

        let inner = Arc::clone(&self.inner);
        Watch {
            events: rx,
            guard: WatchGuard::new(move || {
                inner.lock().unwrap().class.retain(|rec| rec.id != id);
            }),
        }
    }

    fn watch_clicks(&self, targets: &[TargetId]) -> Watch<TargetId> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id();
        self.inner.lock().unwrap().clicks.push(WatchRec {
            id,
            targets: targets.to_vec(),
            tx,
        });

        let inner = Arc::clone(&self.inner);
        Watch {
            events: rx,
            guard: WatchGuard::new(move || {
                inner.lock().unwrap().clicks.retain(|rec| rec.id != id);
            }),
        }
    }

    fn mute_control(&self) -> Option<TargetId> {
        self.inner.lock().unwrap().mute_control
    }

    fn background_audio(&self) -> Option<Arc<dyn MediaElement>> {
        self.inner
            .lock()
            .unwrap()
            .background
            .as_ref()
            .map(|media| Arc::clone(media) as Arc<dyn MediaElement>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_media_element_detached_writes_ignored() {
        let media = FakeMediaElement::new("story.mp4");
        media.set_connected(false);

        media.set_volume(0.5);
        media.set_muted(true);
        media.clear_src();

        let state = media.snapshot();
        assert_eq!(state.volume, 1.0);
        assert!(!state.muted);
        assert_eq!(state.src.as_deref(), Some("story.mp4"));
        assert!(media.play().is_err());
    }

    #[test]
    fn test_player_api_delegates_to_media() {
        let media = FakeMediaElement::new("story.mp4");
        let api = FakePlayerApi::new(Arc::clone(&media));

        api.set_muted(true);
        assert!(media.is_muted());

        api.play().unwrap();
        assert!(!media.is_paused());
        assert_eq!(api.api_play_calls(), 1);
    }

    #[tokio::test]
    async fn test_watch_guard_disconnects() {
        let page = FakePage::new(800.0);
        let target = Uuid::new_v4();

        let watch = page.watch_intersection(&[target], IntersectionOptions::default());
        assert_eq!(page.intersection_watch_count(), 1);

        drop(watch);
        assert_eq!(page.intersection_watch_count(), 0);

        // Delivery after disconnect goes nowhere and does not panic
        page.push_intersection(target, 0.5);
    }

    #[tokio::test]
    async fn test_delivery_reaches_watching_targets_only() {
        let page = FakePage::new(800.0);
        let watched = Uuid::new_v4();
        let unwatched = Uuid::new_v4();

        let mut watch = page.watch_intersection(&[watched], IntersectionOptions::default());
        page.push_intersection(unwatched, 1.0);
        page.push_intersection(watched, 0.25);

        let entry = watch.events.recv().await.unwrap();
        assert_eq!(entry.target, watched);
        assert_eq!(entry.ratio, 0.25);
        assert!(watch.events.try_recv().is_err());
    }
}
