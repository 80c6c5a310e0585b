// NOTE: Capture and chunking operate on mono f32 samples. Chunks are only
// converted to 16-bit integer PCM when written out as WAV.

/// One second of audio at 16kHz
pub const DEFAULT_CHUNK_SIZE: usize = 16000;

/// Samples per frame delivered to the recorder (one render quantum)
pub const DEFAULT_FRAME_SIZE: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const BITS_PER_SAMPLE: u16 = 16;

    /// Calculate number of samples for a given duration in seconds
    pub fn samples_for_duration(&self, seconds: f32) -> usize {
        (self.sample_rate as f32 * seconds) as usize
    }

    /// Duration in seconds of `samples` mono samples
    pub fn duration_of(&self, samples: usize) -> f32 {
        samples as f32 / self.sample_rate as f32
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
        }
    }
}
