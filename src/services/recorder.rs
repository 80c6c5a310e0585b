use crate::audio::{AudioCapture, AudioFormat, ChunkingRecorder};
use crate::messages::{RecorderCommand, RecorderEvent, ServiceRequest};
use anyhow::Result;
use tokio::sync::mpsc;

const FRAME_CHANNEL_CAPACITY: usize = 100;

/// Something that feeds fixed-size frames into the recorder once started
///
/// The returned guard keeps the source running; dropping it stops the feed.
pub trait FrameSource {
    type Guard;

    fn start(&mut self, frame_tx: mpsc::Sender<Vec<f32>>) -> Result<Self::Guard>;
}

/// Default input device via cpal
pub struct DeviceSource {
    pub format: AudioFormat,
    pub frame_size: usize,
    pub ring_seconds: f32,
}

impl FrameSource for DeviceSource {
    type Guard = cpal::Stream;

    fn start(&mut self, frame_tx: mpsc::Sender<Vec<f32>>) -> Result<cpal::Stream> {
        AudioCapture::start(self.format, self.frame_size, self.ring_seconds, frame_tx)
    }
}

/// Hosts a ChunkingRecorder
///
/// This service:
/// - Manages the frame source lifecycle
/// - Feeds every captured frame into the chunking recorder
/// - Handles start/stop requests
///
/// Requests and frames are consumed by this single task, so the chunking
/// recorder never sees two operations at once.
///
/// Note: with `DeviceSource` this service holds cpal::Stream which is !Send,
/// so it must be spawned on a LocalSet using tokio::task::spawn_local.
pub struct Recorder<F: FrameSource> {
    source: F,
    chunker: ChunkingRecorder<mpsc::UnboundedSender<RecorderEvent>>,
    req_rx: mpsc::Receiver<ServiceRequest>,
    frame_rx: mpsc::Receiver<Vec<f32>>,
    frame_tx: mpsc::Sender<Vec<f32>>,
    guard: Option<F::Guard>,
}

impl<F: FrameSource> Recorder<F> {
    pub fn new(
        source: F,
        chunk_size: usize,
        req_rx: mpsc::Receiver<ServiceRequest>,
        event_tx: mpsc::UnboundedSender<RecorderEvent>,
    ) -> Self {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let chunker = ChunkingRecorder::new(event_tx).with_chunk_size(chunk_size);
        tracing::debug!("Emitting a chunk every {} samples", chunker.chunk_size());
        Self {
            source,
            chunker,
            req_rx,
            frame_rx,
            frame_tx,
            guard: None,
        }
    }

    /// Runs until every RecorderHandle has been dropped
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                req = self.req_rx.recv() => match req {
                    Some(req) => self.handle_request(req),
                    None => break,
                },

                Some(frame) = self.frame_rx.recv(), if self.guard.is_some() => {
                    let channels: [&[f32]; 1] = [frame.as_slice()];
                    self.chunker.process(&[&channels[..]]);
                }
            }
        }

        if self.guard.is_some() {
            self.stop();
        }
        tracing::debug!("Recorder service exiting");
    }

    fn handle_request(&mut self, req: ServiceRequest) {
        match req {
            ServiceRequest::Start(reply) => {
                let _ = reply.send(self.start());
            }
            ServiceRequest::Stop(reply) => {
                self.stop();
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn start(&mut self) -> Result<()> {
        self.chunker.handle(RecorderCommand::Start);

        if self.guard.is_some() {
            tracing::debug!("Already capturing, buffer reset");
            return Ok(());
        }

        match self.source.start(self.frame_tx.clone()) {
            Ok(guard) => {
                self.guard = Some(guard);
                tracing::info!("Recording started");
                Ok(())
            }
            Err(e) => {
                self.chunker.handle(RecorderCommand::Stop);
                Err(e)
            }
        }
    }

    fn stop(&mut self) {
        // Drop the guard to stop capture
        let was_capturing = self.guard.take().is_some();

        // Frames captured before the stop still belong to this session
        while let Ok(frame) = self.frame_rx.try_recv() {
            self.chunker.ingest(&frame);
        }

        // Fresh channel for the next session; the old sender side sees it closed
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        self.frame_tx = frame_tx;
        self.frame_rx = frame_rx;

        tracing::debug!(
            recording = self.chunker.is_recording(),
            "Stopping with {} samples in {} frames pending",
            self.chunker.samples_buffered(),
            self.chunker.frames_buffered()
        );
        self.chunker.handle(RecorderCommand::Stop);

        if was_capturing {
            tracing::info!("Recording stopped");
        }
    }
}

/// Handle for communicating with the Recorder
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<ServiceRequest>,
}

impl RecorderHandle {
    pub fn new(tx: mpsc::Sender<ServiceRequest>) -> Self {
        Self { tx }
    }

    pub async fn start(&self) -> Result<()> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(ServiceRequest::Start(reply))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send start command: {}", e))?;

        rx.await
            .map_err(|e| anyhow::anyhow!("Failed to receive start response: {}", e))?
    }

    pub async fn stop(&self) -> Result<()> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(ServiceRequest::Stop(reply))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send stop command: {}", e))?;

        rx.await
            .map_err(|e| anyhow::anyhow!("Failed to receive stop response: {}", e))?
    }
}
