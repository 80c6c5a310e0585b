use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Commands understood by the chunking recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum RecorderCommand {
    Start,
    Stop,
}

/// Notifications emitted by the chunking recorder
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RecorderEvent {
    /// Concatenated samples of every frame buffered since the last flush
    AudioChunk {
        #[serde(rename = "audioData")]
        audio_data: Vec<f32>,
    },
    /// Samples accumulated since the last flush
    BufferUpdate {
        #[serde(rename = "samplesRecorded")]
        samples_recorded: usize,
    },
}

/// Requests sent to the Recorder service
pub enum ServiceRequest {
    Start(oneshot::Sender<Result<()>>),
    Stop(oneshot::Sender<Result<()>>),
}

/// Application state
#[derive(Clone, Debug, PartialEq)]
pub enum AppState {
    Idle,
    Recording,
}
