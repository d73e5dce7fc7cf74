// Latest timecode published by the producer, read by the display

use parking_lot::Mutex;
use std::sync::Arc;

use crate::timecode::rate::FrameRate;
use crate::timecode::smpte::SmpteTimecode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotData {
    pub timecode: SmpteTimecode,
    pub rate: FrameRate,
    /// Incremented on every successful publish
    pub sequence: u64,
}

#[derive(Clone)]
pub struct DisplaySnapshot {
    rate: FrameRate,
    inner: Arc<Mutex<Option<SnapshotData>>>,
}

impl DisplaySnapshot {
    pub fn new(rate: FrameRate) -> Self {
        Self {
            rate,
            inner: Arc::new(Mutex::new(None)),
        }
    }

    pub fn rate(&self) -> FrameRate {
        self.rate
    }

    /// Never blocks: if a reader holds the lock this update is dropped
    pub fn publish(&self, timecode: SmpteTimecode) -> bool {
        let Some(mut slot) = self.inner.try_lock() else {
            return false;
        };
        let sequence = slot.map(|s| s.sequence + 1).unwrap_or(0);
        *slot = Some(SnapshotData {
            timecode,
            rate: self.rate,
            sequence,
        });
        true
    }

    pub fn latest(&self) -> Option<SnapshotData> {
        *self.inner.lock()
    }
}
