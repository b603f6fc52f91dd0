//! Audio thread to observer hand-off of the most recent rendered block.
//!
//! A triple buffer: the writer fills its back slot and publishes it by
//! swapping indices with the shared middle slot; the reader takes the
//! middle slot only when a new block has been published. Each side only
//! ever touches its own slot plus the atomic index, so neither waits on
//! the other. Slots are mutex-wrapped so the exchange stays safe code; the
//! writer only uses `try_lock`, which cannot fail while the index protocol
//! holds.

use super::buffer::AudioBlock;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

const INDEX_MASK: u8 = 0b011;
const DIRTY: u8 = 0b100;

struct Shared {
    slots: [Mutex<AudioBlock>; 3],
    middle: AtomicU8,
    published: AtomicU64,
    dropped: AtomicU64,
}

/// Create a connected writer/reader pair.
pub fn visualization_buffer() -> (VisualizationWriter, VisualizationReader) {
    let shared = Arc::new(Shared {
        slots: Default::default(),
        middle: AtomicU8::new(1),
        published: AtomicU64::new(0),
        dropped: AtomicU64::new(0),
    });
    (
        VisualizationWriter {
            shared: Arc::clone(&shared),
            back: 0,
            max_samples: usize::MAX,
        },
        VisualizationReader { shared, front: 2 },
    )
}

/// Audio-thread side. Never blocks and, once [`reserve`](Self::reserve)d,
/// never allocates.
pub struct VisualizationWriter {
    shared: Arc<Shared>,
    back: u8,
    max_samples: usize,
}

impl VisualizationWriter {
    /// Pre-size every slot for blocks up to `num_channels` x `num_samples`.
    /// Longer blocks pushed afterwards keep only their last `num_samples`.
    /// Call outside the audio callback.
    pub fn reserve(&mut self, num_channels: usize, num_samples: usize) {
        self.max_samples = num_samples;
        for slot in self.shared.slots.iter() {
            slot.lock().reserve(num_channels, num_samples);
        }
    }

    /// Publish a copy of `block`, replacing whatever the reader has not
    /// picked up yet. Returns `false` if the frame had to be dropped.
    pub fn push(&mut self, block: &AudioBlock) -> bool {
        let Some(mut slot) = self.shared.slots[self.back as usize].try_lock() else {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        slot.copy_from(block, self.max_samples);
        drop(slot);

        let previous = self.shared.middle.swap(self.back | DIRTY, Ordering::AcqRel);
        self.back = previous & INDEX_MASK;
        self.shared.published.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn published_count(&self) -> u64 {
        self.shared.published.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

/// Observer-thread side.
pub struct VisualizationReader {
    shared: Arc<Shared>,
    front: u8,
}

impl VisualizationReader {
    /// True when a block newer than the last one read is waiting.
    pub fn has_new_block(&self) -> bool {
        self.shared.middle.load(Ordering::Acquire) & DIRTY != 0
    }

    /// Copy of the most recent block; empty if nothing was pushed yet.
    pub fn read(&mut self) -> AudioBlock {
        let mut block = AudioBlock::default();
        self.read_into(&mut block);
        block
    }

    /// Copy the most recent block into `out`, reusing its allocation.
    /// Returns whether it is newer than the previous read.
    pub fn read_into(&mut self, out: &mut AudioBlock) -> bool {
        let fresh = self.take_latest();
        let slot = self.shared.slots[self.front as usize].lock();
        out.copy_from(&slot, slot.num_samples());
        fresh
    }

    pub fn published_count(&self) -> u64 {
        self.shared.published.load(Ordering::Relaxed)
    }

    fn take_latest(&mut self) -> bool {
        if !self.has_new_block() {
            return false;
        }
        let previous = self.shared.middle.swap(self.front, Ordering::AcqRel);
        self.front = previous & INDEX_MASK;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_before_first_push() {
        let (_writer, mut reader) = visualization_buffer();
        let block = reader.read();
        assert!(block.is_empty());
        assert_eq!(block.num_samples(), 0);
    }

    #[test]
    fn reader_sees_latest_push_only() {
        let (mut writer, mut reader) = visualization_buffer();
        writer.reserve(1, 4);
        assert!(writer.push(&AudioBlock::from_channels(&[vec![1.0; 4]])));
        assert!(writer.push(&AudioBlock::from_channels(&[vec![2.0; 3]])));

        let mut out = AudioBlock::default();
        assert!(reader.read_into(&mut out));
        assert_eq!(out.channel(0), &[2.0; 3]);

        // Nothing new: the same block again.
        assert!(!reader.read_into(&mut out));
        assert_eq!(out.channel(0), &[2.0; 3]);
        assert_eq!(writer.published_count(), 2);
        assert_eq!(writer.dropped_count(), 0);
    }

    #[test]
    fn oversized_push_keeps_the_latest_samples() {
        let (mut writer, mut reader) = visualization_buffer();
        writer.reserve(1, 4);
        let samples: Vec<f32> = (0..10).map(|n| n as f32).collect();
        writer.push(&AudioBlock::from_channels(&[samples]));
        assert_eq!(reader.read().channel(0), &[6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn push_after_reserve_keeps_slot_capacity() {
        let (mut writer, _reader) = visualization_buffer();
        writer.reserve(2, 256);
        let block = AudioBlock::new(2, 256);
        for _ in 0..6 {
            writer.push(&block);
        }
        for slot in writer.shared.slots.iter() {
            assert!(slot.lock().capacity() >= 512);
        }
    }
}
