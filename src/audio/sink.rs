use super::format::AudioFormat;
use anyhow::Result;
use async_trait::async_trait;

/// Consumer of the chunks emitted by the chunking recorder
///
/// `write_chunk` is called from the event loop and must not block;
/// implementations hand heavy work off to their own thread.
#[async_trait]
pub trait ChunkSink: Send {
    /// The Vec is moved to avoid copying
    fn write_chunk(&mut self, samples: Vec<f32>) -> Result<()>;

    /// Flush outstanding work and close the sink
    async fn finalize(&mut self) -> Result<()>;
}

/// Sink that only reports chunk sizes
pub struct LoggingSink {
    format: AudioFormat,
    chunks: usize,
}

impl LoggingSink {
    pub fn new(format: AudioFormat) -> Self {
        Self { format, chunks: 0 }
    }
}

#[async_trait]
impl ChunkSink for LoggingSink {
    fn write_chunk(&mut self, samples: Vec<f32>) -> Result<()> {
        self.chunks += 1;
        tracing::info!(
            "Chunk {}: {} samples ({:.2}s)",
            self.chunks,
            samples.len(),
            self.format.duration_of(samples.len())
        );
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        tracing::info!("{} chunk(s) received", self.chunks);
        Ok(())
    }
}
