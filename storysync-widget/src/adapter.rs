//! Video playback facade
//!
//! A video container either exposes the host platform's custom playback API
//! or is (or wraps) a bare native element. [`PlayerBackend`] resolves that
//! choice once, at discovery time, into a tagged union; every later
//! operation is pure delegation with no re-checking and no state of its own.

use std::sync::Arc;

use storysync_common::host::{DiscoveredVideo, MediaElement, PlayerApi};
use storysync_common::Result;

/// Playback capability of one video, resolved once per scan
pub enum PlayerBackend {
    /// Container exposes the custom playback API
    Api {
        api: Arc<dyn PlayerApi>,
        media: Arc<dyn MediaElement>,
    },
    /// Bare native element
    Native { media: Arc<dyn MediaElement> },
}

impl PlayerBackend {
    /// Pick the backend for a discovered video
    pub fn resolve(video: &DiscoveredVideo) -> Self {
        match &video.api {
            Some(api) => Self::Api {
                api: Arc::clone(api),
                media: Arc::clone(&video.media),
            },
            None => Self::Native {
                media: Arc::clone(&video.media),
            },
        }
    }

    /// The resolved native media element
    ///
    /// The host resolves container → descendant lookup at discovery, so this
    /// is always the element volume and source operations apply to.
    pub fn media(&self) -> &Arc<dyn MediaElement> {
        match self {
            Self::Api { media, .. } => media,
            Self::Native { media } => media,
        }
    }

    pub fn has_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    pub fn is_muted(&self) -> bool {
        match self {
            Self::Api { api, .. } => api.is_muted(),
            Self::Native { media } => media.is_muted(),
        }
    }

    /// Set the muted state, skipping the call when already there
    ///
    /// The skip avoids redundant autoplay-policy side effects in the host.
    pub fn set_muted(&self, muted: bool) {
        if self.is_muted() == muted {
            return;
        }
        match self {
            Self::Api { api, .. } => api.set_muted(muted),
            Self::Native { media } => media.set_muted(muted),
        }
    }

    pub fn is_paused(&self) -> bool {
        match self {
            Self::Api { api, .. } => api.is_paused(),
            Self::Native { media } => media.is_paused(),
        }
    }

    pub fn play(&self) -> Result<()> {
        match self {
            Self::Api { api, .. } => api.play(),
            Self::Native { media } => media.play(),
        }
    }

    pub fn pause(&self) {
        match self {
            Self::Api { api, .. } => api.pause(),
            Self::Native { media } => media.pause(),
        }
    }

    /// Mark the wrapped player ambient; no-op for bare elements
    pub fn set_ambient(&self, ambient: bool) {
        if let Self::Api { api, .. } = self {
            api.set_ambient(ambient);
        }
    }
}

impl std::fmt::Debug for PlayerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Api { .. } => write!(f, "PlayerBackend::Api"),
            Self::Native { .. } => write!(f, "PlayerBackend::Native"),
        }
    }
}
