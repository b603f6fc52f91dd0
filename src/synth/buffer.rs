/// Planar multichannel sample buffer.
///
/// Channels are stored back to back in one allocation. Resizing within the
/// reserved capacity never reallocates, so blocks sized at prepare time can
/// be reused on the audio thread.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBlock {
    data: Vec<f32>,
    num_channels: usize,
    num_samples: usize,
}

impl AudioBlock {
    /// A zeroed block of `num_channels` x `num_samples`.
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            data: vec![0.0; num_channels * num_samples],
            num_channels,
            num_samples,
        }
    }

    /// An empty block that can grow to `num_channels` x `num_samples`
    /// without reallocating.
    pub fn with_capacity(num_channels: usize, num_samples: usize) -> Self {
        Self {
            data: Vec::with_capacity(num_channels * num_samples),
            num_channels: 0,
            num_samples: 0,
        }
    }

    /// Build a block from per-channel sample vectors. Channels shorter than
    /// the longest one are zero padded.
    pub fn from_channels(channels: &[Vec<f32>]) -> Self {
        let num_samples = channels.iter().map(Vec::len).max().unwrap_or(0);
        let mut block = Self::new(channels.len(), num_samples);
        for (index, samples) in channels.iter().enumerate() {
            block.channel_mut(index)[..samples.len()].copy_from_slice(samples);
        }
        block
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn is_empty(&self) -> bool {
        self.num_channels == 0 || self.num_samples == 0
    }

    /// Samples the block can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Grow the allocation so `num_channels` x `num_samples` fits.
    pub fn reserve(&mut self, num_channels: usize, num_samples: usize) {
        let needed = num_channels * num_samples;
        if needed > self.data.len() {
            self.data.reserve(needed - self.data.len());
        }
    }

    /// Change the shape and zero every sample.
    pub fn set_size(&mut self, num_channels: usize, num_samples: usize) {
        self.num_channels = num_channels;
        self.num_samples = num_samples;
        self.data.clear();
        self.data.resize(num_channels * num_samples, 0.0);
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.num_samples;
        &self.data[start..start + self.num_samples]
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.num_samples;
        &mut self.data[start..start + self.num_samples]
    }

    /// Both channels of a stereo block, or `None` for any other layout.
    pub fn stereo_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        if self.num_channels != 2 {
            return None;
        }
        let (left, right) = self.data.split_at_mut(self.num_samples);
        Some((left, right))
    }

    /// Add `source * gain` into every channel starting at `start`.
    pub fn add_to_all_channels(&mut self, start: usize, source: &[f32], gain: f32) {
        for channel in 0..self.num_channels {
            let destination = &mut self.channel_mut(channel)[start..start + source.len()];
            for (out, sample) in destination.iter_mut().zip(source) {
                *out += sample * gain;
            }
        }
    }

    /// Copy the shape and contents of `other`, keeping only its last
    /// `max_samples` per channel. Does not reallocate when the capacity
    /// suffices.
    pub fn copy_from(&mut self, other: &AudioBlock, max_samples: usize) {
        let num_samples = other.num_samples.min(max_samples);
        let skipped = other.num_samples - num_samples;
        self.num_channels = other.num_channels;
        self.num_samples = num_samples;
        self.data.clear();
        for channel in 0..other.num_channels {
            self.data.extend_from_slice(&other.channel(channel)[skipped..]);
        }
    }

    /// Interleave into `output` frame by frame. Extra output channels repeat
    /// the last block channel.
    pub fn write_interleaved(&self, output: &mut [f32], output_channels: usize) {
        if self.num_channels == 0 || output_channels == 0 {
            output.fill(0.0);
            return;
        }
        for (index, frame) in output
            .chunks_mut(output_channels)
            .take(self.num_samples)
            .enumerate()
        {
            for (channel, sample) in frame.iter_mut().enumerate() {
                let source = channel.min(self.num_channels - 1);
                *sample = self.data[source * self.num_samples + index];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_within_capacity_keeps_allocation() {
        let mut block = AudioBlock::with_capacity(2, 512);
        let capacity = block.capacity();
        block.set_size(2, 256);
        block.set_size(1, 512);
        assert_eq!(block.capacity(), capacity);
        assert_eq!(block.channel(0).len(), 512);
    }

    #[test]
    fn stereo_halves_are_disjoint() {
        let mut block = AudioBlock::new(2, 4);
        let (left, right) = block.stereo_mut().unwrap();
        left.fill(1.0);
        right.fill(-1.0);
        assert_eq!(block.channel(0), &[1.0; 4]);
        assert_eq!(block.channel(1), &[-1.0; 4]);
        assert!(AudioBlock::new(1, 4).stereo_mut().is_none());
    }

    #[test]
    fn interleaving_duplicates_mono() {
        let block = AudioBlock::from_channels(&[vec![0.1, 0.2]]);
        let mut out = [0.0; 4];
        block.write_interleaved(&mut out, 2);
        assert_eq!(out, [0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn truncated_copy_keeps_the_latest_samples() {
        let source = AudioBlock::from_channels(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let mut copy = AudioBlock::with_capacity(2, 2);
        copy.copy_from(&source, 2);
        assert_eq!(copy.num_samples(), 2);
        assert_eq!(copy.channel(0), &[2.0, 3.0]);
        assert_eq!(copy.channel(1), &[5.0, 6.0]);
    }
}
