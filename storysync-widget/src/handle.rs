//! Per-video tracking state
//!
//! A [`VideoHandle`] ties together one discovered video's resolved backend,
//! its slot classification, and the scheduling state the fade controller
//! needs: the single ramp-task slot, the pending unload task, and the cached
//! source string while the video is unloaded.
//!
//! Ramp mutual exclusion is structural. The slot holds at most one task;
//! beginning a ramp aborts whatever occupies the slot and bumps a generation
//! counter, so a completed or replaced task can never clear a slot it no
//! longer owns.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use uuid::Uuid;

use storysync_common::events::FadeDirection;
use storysync_common::host::{DiscoveredVideo, TargetId};

use crate::adapter::PlayerBackend;

/// Layout slot classification, evaluated once per scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Sole occupant of its layout slot; observed by viewport intersection
    Regular,
    /// One of several stacked videos toggled by a class; observed by
    /// class mutation
    StackedCrossfade,
}

pub(crate) struct RampTask {
    generation: u64,
    direction: FadeDirection,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub(crate) struct FadeSlot {
    generation: u64,
    task: Option<RampTask>,
}

/// One managed video
pub struct VideoHandle {
    pub id: Uuid,
    pub target: TargetId,
    pub kind: SlotKind,
    pub backend: PlayerBackend,
    pub mute_button: Option<TargetId>,
    pub(crate) fade: Mutex<FadeSlot>,
    pub(crate) unload: Mutex<Option<JoinHandle<()>>>,
    pub(crate) saved_src: Mutex<Option<String>>,
}

impl VideoHandle {
    pub fn new(video: &DiscoveredVideo, kind: SlotKind) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            target: video.target,
            kind,
            backend: PlayerBackend::resolve(video),
            mute_button: video.mute_button,
            fade: Mutex::new(FadeSlot::default()),
            unload: Mutex::new(None),
            saved_src: Mutex::new(None),
        })
    }

    /// Direction of the ramp currently in flight, if any
    pub fn fade_direction(&self) -> Option<FadeDirection> {
        self.fade.lock().unwrap().task.as_ref().map(|t| t.direction)
    }

    /// True while the source attribute is cached away
    pub fn is_unloaded(&self) -> bool {
        self.saved_src.lock().unwrap().is_some()
    }

    /// Abort an in-flight ramp in `direction`, leaving the other alone
    pub(crate) fn cancel_ramp_if(&self, direction: FadeDirection) {
        let mut slot = self.fade.lock().unwrap();
        if slot.task.as_ref().map(|t| t.direction) == Some(direction) {
            if let Some(task) = slot.task.take() {
                task.handle.abort();
            }
        }
    }

    /// Abort whatever ramp is in flight
    pub(crate) fn cancel_ramp(&self) {
        if let Some(task) = self.fade.lock().unwrap().task.take() {
            task.handle.abort();
        }
    }

    /// Reserve the slot for a new ramp in `direction`
    ///
    /// Returns the reserved generation, or `None` when a same-direction ramp
    /// is already in flight (the caller must not start a second one). An
    /// opposite-direction ramp occupying the slot is aborted.
    pub(crate) fn begin_ramp(&self, direction: FadeDirection) -> Option<u64> {
        let mut slot = self.fade.lock().unwrap();
        if let Some(task) = &slot.task {
            if task.direction == direction {
                return None;
            }
        }
        if let Some(task) = slot.task.take() {
            task.handle.abort();
        }
        slot.generation += 1;
        Some(slot.generation)
    }

    /// Install the spawned task for a reservation made by [`begin_ramp`]
    ///
    /// A reservation that lost to a newer one aborts its task instead.
    ///
    /// [`begin_ramp`]: VideoHandle::begin_ramp
    pub(crate) fn install_ramp(
        &self,
        generation: u64,
        direction: FadeDirection,
        handle: JoinHandle<()>,
    ) {
        let mut slot = self.fade.lock().unwrap();
        if slot.generation == generation {
            slot.task = Some(RampTask {
                generation,
                direction,
                handle,
            });
        } else {
            handle.abort();
        }
    }

    /// Release the slot once the ramp owning `generation` has finished
    pub(crate) fn finish_ramp(&self, generation: u64) {
        let mut slot = self.fade.lock().unwrap();
        if slot.task.as_ref().map(|t| t.generation) == Some(generation) {
            slot.task = None;
        }
    }

    /// Abort a pending unload, keeping the current source in place
    pub(crate) fn cancel_unload(&self) {
        if let Some(handle) = self.unload.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Abort every scheduled task for this video
    pub(crate) fn cancel_all(&self) {
        self.cancel_ramp();
        self.cancel_unload();
    }
}

impl std::fmt::Debug for VideoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoHandle")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("kind", &self.kind)
            .field("backend", &self.backend)
            .field("fade_direction", &self.fade_direction())
            .field("unloaded", &self.is_unloaded())
            .finish()
    }
}
