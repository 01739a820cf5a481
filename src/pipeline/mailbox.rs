//! Single-slot frame hand-off
//!
//! The producer thread publishes decoded frames; the render thread takes the
//! latest one once per frame. Frames are never queued: publishing over an
//! untaken frame drops the older one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{PipelineError, VideoFrame};

struct Slot {
    frame: Option<VideoFrame>,
    failure: Option<PipelineError>,
}

struct Shared {
    slot: Mutex<Slot>,
    published: AtomicU64,
    dropped: AtomicU64,
}

/// Thread-safe latest-frame mailbox
///
/// Cloning yields another handle to the same slot.
#[derive(Clone)]
pub struct FrameMailbox {
    shared: Arc<Shared>,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    frame: None,
                    failure: None,
                }),
                published: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Publish a frame, replacing any frame not yet taken
    ///
    /// Returns the sequence number assigned to the frame.
    pub fn publish(&self, mut frame: VideoFrame) -> u64 {
        let sequence = self.shared.published.fetch_add(1, Ordering::AcqRel) + 1;
        frame.sequence = sequence;

        let replaced = self.shared.slot.lock().frame.replace(frame);
        if replaced.is_some() {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }

        sequence
    }

    /// Take the latest frame, leaving the slot empty
    pub fn take(&self) -> Option<VideoFrame> {
        self.shared.slot.lock().frame.take()
    }

    /// Whether a frame is waiting to be taken
    pub fn has_frame(&self) -> bool {
        self.shared.slot.lock().frame.is_some()
    }

    /// Record a fatal producer error; the first one wins
    pub fn fail(&self, error: PipelineError) {
        let mut slot = self.shared.slot.lock();
        if slot.failure.is_none() {
            slot.failure = Some(error);
        }
    }

    /// Take the recorded producer error, if any
    pub fn take_failure(&self) -> Option<PipelineError> {
        self.shared.slot.lock().failure.take()
    }

    /// Total frames published
    pub fn published(&self) -> u64 {
        self.shared.published.load(Ordering::Acquire)
    }

    /// Frames overwritten before being taken
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl Default for FrameMailbox {
    fn default() -> Self {
        Self::new()
    }
}
