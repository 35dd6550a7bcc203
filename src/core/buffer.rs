use chrono::{DateTime, Utc};

use crate::core::Frame;
use crate::error::{Result, SpyError};

/// Default number of frames kept while capturing
pub const DEFAULT_MAX_FRAMES: usize = 10_000;

/// A frame together with the wall-clock time it was captured
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub frame: Frame,
    pub captured_at: DateTime<Utc>,
}

/// Chronological copy of a buffer's contents
#[derive(Debug, Clone, PartialEq)]
pub struct BufferSnapshot {
    /// Frames, oldest first
    pub frames: Vec<Frame>,
    /// Ordinal of the oldest retained frame (`write_index - stored`).
    /// Negative for a buffer built from a loaded recording that has not
    /// wrapped yet.
    pub first_frame_ordinal: i64,
    /// Ordinal one past the newest frame, i.e. the write index
    pub last_frame_ordinal: i64,
    pub max_frames: usize,
}

/// Fixed-capacity ring of captured frames.
///
/// The write index grows without bound; the storage slot for a write is
/// `write_index % capacity`. Once the ring is full every write overwrites
/// the oldest frame.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    slots: Vec<CapturedFrame>,
    capacity: usize,
    write_index: u64,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SpyError::Capacity(capacity));
        }
        Ok(Self {
            slots: Vec::with_capacity(capacity.min(DEFAULT_MAX_FRAMES)),
            capacity,
            write_index: 0,
        })
    }

    /// A ring exactly as large as `frames`, with the write cursor at zero.
    ///
    /// Used for loaded recordings: the ring never overwrites anything during
    /// playback-only use.
    pub fn from_frames(frames: Vec<Frame>) -> Result<Self> {
        let mut buffer = Self::new(frames.len())?;
        let now = Utc::now();
        buffer.slots = frames
            .into_iter()
            .map(|frame| CapturedFrame {
                frame,
                captured_at: now,
            })
            .collect();
        Ok(buffer)
    }

    /// Store a frame at the current slot and advance the write cursor.
    ///
    /// Returns true when this write completed a full lap of the ring.
    pub fn add(&mut self, frame: Frame) -> bool {
        let slot = self.slot();
        let captured = CapturedFrame {
            frame,
            captured_at: Utc::now(),
        };

        if slot < self.slots.len() {
            self.slots[slot] = captured;
        } else {
            self.slots.push(captured);
        }

        self.write_index += 1;
        self.write_index % self.capacity as u64 == 0
    }

    /// Unspool the ring into chronological order
    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            frames: self.iter().map(|c| c.frame.clone()).collect(),
            first_frame_ordinal: self.write_index as i64 - self.slots.len() as i64,
            last_frame_ordinal: self.write_index as i64,
            max_frames: self.capacity,
        }
    }

    /// Captured frames, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &CapturedFrame> {
        let split = self.slot().min(self.slots.len());
        let (head, tail) = self.slots.split_at(split);
        tail.iter().chain(head.iter())
    }

    /// Most recently written frame
    pub fn latest(&self) -> Option<&CapturedFrame> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = (self.slot() + self.capacity - 1) % self.capacity;
        self.slots.get(idx)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn write_index(&self) -> u64 {
        self.write_index
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.write_index = 0;
    }

    fn slot(&self) -> usize {
        (self.write_index % self.capacity as u64) as usize
    }
}
