//! Test helper module for storysync widget integration tests
//!
//! Provides fixtures over the fake host: page/video builders, a scheduler
//! settle helper, and virtual-time tick advancement for the paused-clock
//! tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use storysync_common::host::fake::{FakeMediaElement, FakePage, FakePlayerApi};
use storysync_common::host::{DiscoveredVideo, MediaElement, PlayerApi, TargetId};
use storysync_widget::handle::{SlotKind, VideoHandle};

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storysync_widget=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// One video wired into a fake page
pub struct VideoFixture {
    pub target: TargetId,
    pub media: Arc<FakeMediaElement>,
    pub api: Option<Arc<FakePlayerApi>>,
    pub mute_button: Option<TargetId>,
}

impl VideoFixture {
    fn build(classes: &[&str], with_api: bool, with_mute_button: bool) -> (Self, DiscoveredVideo) {
        let target = Uuid::new_v4();
        let media = FakeMediaElement::new("clip.mp4");
        let api = with_api.then(|| FakePlayerApi::new(Arc::clone(&media)));
        let mute_button = with_mute_button.then(Uuid::new_v4);

        let discovered = DiscoveredVideo {
            target,
            media: Arc::clone(&media) as Arc<dyn MediaElement>,
            api: api
                .as_ref()
                .map(|api| Arc::clone(api) as Arc<dyn PlayerApi>),
            container_classes: classes.iter().map(|c| c.to_string()).collect(),
            mute_button,
        };

        (
            Self {
                target,
                media,
                api,
                mute_button,
            },
            discovered,
        )
    }
}

/// Add a regular (intersection-observed) video to the page
pub fn add_regular_video(page: &FakePage) -> VideoFixture {
    let (fixture, discovered) = VideoFixture::build(&["VideoPlayer"], false, false);
    page.add_video(discovered);
    fixture
}

/// Add a stacked crossfade (class-observed) video to the page
pub fn add_crossfade_video(page: &FakePage) -> VideoFixture {
    let (fixture, discovered) = VideoFixture::build(&["VideoCrossfade"], false, false);
    page.add_video(discovered);
    fixture
}

/// Add a custom-API video carrying its own mute button
pub fn add_api_video(page: &FakePage) -> VideoFixture {
    let (fixture, discovered) = VideoFixture::build(&["VideoPlayer"], true, true);
    page.add_video(discovered);
    fixture
}

/// A standalone handle for driving the fade controller directly
pub fn standalone_handle() -> (Arc<FakeMediaElement>, Arc<VideoHandle>) {
    let media = FakeMediaElement::new("clip.mp4");
    let discovered = DiscoveredVideo {
        target: Uuid::new_v4(),
        media: Arc::clone(&media) as Arc<dyn MediaElement>,
        api: None,
        container_classes: vec!["VideoPlayer".into()],
        mute_button: None,
    };
    let handle = VideoHandle::new(&discovered, SlotKind::Regular);
    (media, handle)
}

/// Let spawned tasks reach their first suspension point
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Advance virtual time far enough for `n` ramp ticks at the default 200 ms
pub async fn ticks(n: u64) {
    settle().await;
    tokio::time::sleep(Duration::from_millis(200 * n + 50)).await;
}

/// Advance virtual time by `ms` milliseconds (plus scheduler settle)
pub async fn advance_ms(ms: u64) {
    settle().await;
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
