use super::format::AudioFormat;
use super::sink::ChunkSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

enum WriterCommand {
    WriteChunk(Vec<f32>),
    Finalize { reply: oneshot::Sender<Result<()>> },
}

/// Writes every chunk to its own numbered WAV file
///
/// File I/O happens on a dedicated blocking thread so the event loop never
/// waits on the disk. Chunks land in `<dir>/chunk-00001.wav`,
/// `<dir>/chunk-00002.wav`, ... in arrival order. The first write error is
/// kept and reported by `finalize`.
pub struct ChunkWriter {
    tx: mpsc::UnboundedSender<WriterCommand>,
}

impl ChunkWriter {
    pub fn new(dir: PathBuf, format: AudioFormat) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: AudioFormat::BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let mut index = 0usize;
            let mut first_error: Option<anyhow::Error> = None;

            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    WriterCommand::WriteChunk(samples) => {
                        index += 1;
                        let path = chunk_path(&dir, index);
                        match write_wav(&path, spec, &samples) {
                            Ok(()) => tracing::debug!(
                                "Wrote {} samples to {:?}",
                                samples.len(),
                                path
                            ),
                            Err(e) => {
                                tracing::error!("Failed to write chunk {:?}: {:#}", path, e);
                                if first_error.is_none() {
                                    first_error = Some(e);
                                }
                            }
                        }
                    }
                    WriterCommand::Finalize { reply } => {
                        let result = match first_error.take() {
                            Some(e) => Err(e),
                            None => Ok(()),
                        };
                        let _ = reply.send(result);
                        break;
                    }
                }
            }
        });

        Ok(Self { tx })
    }
}

fn chunk_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("chunk-{:05}.wav", index))
}

fn write_wav(path: &Path, spec: WavSpec, samples: &[f32]) -> Result<()> {
    let mut writer = WavWriter::create(path, spec).context("Failed to create WAV writer")?;
    for &sample in samples {
        // Convert f32 (-1.0 to 1.0) to i16
        let amplitude = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(amplitude)
            .context("Failed to write sample")?;
    }
    writer.finalize().context("Failed to finalize WAV")
}

#[async_trait]
impl ChunkSink for ChunkWriter {
    fn write_chunk(&mut self, samples: Vec<f32>) -> Result<()> {
        self.tx
            .send(WriterCommand::WriteChunk(samples))
            .map_err(|e| anyhow::anyhow!("Failed to send write command: {}", e))
    }

    async fn finalize(&mut self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WriterCommand::Finalize { reply })
            .map_err(|e| anyhow::anyhow!("Failed to send finalize command: {}", e))?;

        rx.await
            .map_err(|e| anyhow::anyhow!("Failed to receive finalize response: {}", e))?
    }
}
