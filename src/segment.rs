// Rangeload - segment.rs

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;

use crate::fetcher::FetchError;

/// Lifecycle of a single segment. Written only by the segment's own fetch
/// task; everyone else reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SegmentState {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
}

impl SegmentState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SegmentState::Pending,
            1 => SegmentState::Running,
            2 => SegmentState::Completed,
            _ => SegmentState::Failed,
        }
    }
}

/// One half-open byte range `[start, end)` of the resource, assigned to one
/// concurrent fetch task.
#[derive(Debug)]
pub struct Segment {
    index: usize,
    start: u64,
    end: u64,
    state: AtomicU8,
    bytes_transferred: AtomicU64,
    error: Mutex<Option<FetchError>>,
}

impl Segment {
    pub fn new(index: usize, start: u64, end: u64) -> Self {
        Segment {
            index,
            start,
            end,
            state: AtomicU8::new(SegmentState::Pending as u8),
            bytes_transferred: AtomicU64::new(0),
            error: Mutex::new(None),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Progress-sink label for this segment.
    pub fn label(&self) -> String {
        format!("segment {}", self.index)
    }

    pub fn state(&self) -> SegmentState {
        SegmentState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: SegmentState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred.load(Ordering::Relaxed)
    }

    pub(crate) fn add_bytes(&self, bytes: u64) {
        self.bytes_transferred.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Marks the segment failed and keeps the error for later inspection.
    pub(crate) fn record_failure(&self, error: FetchError) {
        if let Ok(mut slot) = self.error.lock() {
            *slot = Some(error);
        }
        self.set_state(SegmentState::Failed);
    }

    /// Human-readable description of the failure, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|e| e.to_string()))
    }
}
