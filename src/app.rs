use crate::audio::{ChunkSink, ChunkWriter, LoggingSink};
use crate::config::Config;
use crate::messages::{AppState, RecorderCommand, RecorderEvent};
use crate::services::recorder::DeviceSource;
use crate::services::{Recorder, RecorderHandle};

use anyhow::Result;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// A line typed on stdin
#[derive(Debug, PartialEq)]
enum Control {
    Command(RecorderCommand),
    Toggle,
    Quit,
}

/// Accepts plain words as well as `{"command":"start"}` style messages
fn parse_control(line: &str) -> Option<Control> {
    let line = line.trim();
    if line.starts_with('{') {
        return serde_json::from_str(line).ok().map(Control::Command);
    }

    match line.to_ascii_lowercase().as_str() {
        "start" => Some(Control::Command(RecorderCommand::Start)),
        "stop" => Some(Control::Command(RecorderCommand::Stop)),
        "toggle" | "t" => Some(Control::Toggle),
        "quit" | "exit" | "q" => Some(Control::Quit),
        _ => None,
    }
}

pub struct App {
    state: AppState,
    recorder: RecorderHandle,
    event_rx: mpsc::UnboundedReceiver<RecorderEvent>,
    sink: Box<dyn ChunkSink>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let sink = Self::setup_sink(&config)?;
        let (recorder, event_rx) = Self::setup_audio_pipeline(&config);

        tracing::info!(
            "Ready! Type start, stop, toggle or quit ({} samples per chunk)",
            config.chunk_size
        );

        Ok(Self {
            state: AppState::Idle,
            recorder,
            event_rx,
            sink,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if !self.handle_line(&line).await {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::info!("stdin closed, shutting down");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Failed to read stdin: {}", e);
                        break;
                    }
                },

                Some(event) = self.event_rx.recv() => self.handle_event(event),

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        self.shutdown().await
    }

    /// Returns false once the app should exit
    async fn handle_line(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            return true;
        }

        let result = match parse_control(line) {
            Some(Control::Command(RecorderCommand::Start)) => self.handle_start().await,
            Some(Control::Command(RecorderCommand::Stop)) => self.handle_stop().await,
            Some(Control::Toggle) => match self.state {
                AppState::Idle => self.handle_start().await,
                AppState::Recording => self.handle_stop().await,
            },
            Some(Control::Quit) => return false,
            None => {
                tracing::warn!("Unknown command: {:?}", line.trim());
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::error!("Error handling command: {:#}", e);
        }
        true
    }

    async fn handle_start(&mut self) -> Result<()> {
        tracing::debug!("handle_start: current state = {:?}", self.state);
        self.recorder.start().await?;
        self.state = AppState::Recording;
        Ok(())
    }

    async fn handle_stop(&mut self) -> Result<()> {
        tracing::debug!("handle_stop: current state = {:?}", self.state);
        self.recorder.stop().await?;
        self.state = AppState::Idle;
        Ok(())
    }

    fn handle_event(&mut self, event: RecorderEvent) {
        match event {
            RecorderEvent::BufferUpdate { samples_recorded } => {
                tracing::debug!("Buffered {} samples", samples_recorded);
            }
            RecorderEvent::AudioChunk { audio_data } => {
                if let Err(e) = self.sink.write_chunk(audio_data) {
                    tracing::error!("Failed to write audio chunk: {}", e);
                }
            }
        }
    }

    async fn shutdown(mut self) -> Result<()> {
        if self.state == AppState::Recording {
            tracing::info!("Stopping recording");
            if let Err(e) = self.handle_stop().await {
                tracing::error!("Failed to stop recording: {}", e);
            }
        }

        // Chunks flushed by the final stop are already queued
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }

        self.sink.finalize().await?;
        tracing::info!("Shutdown complete");
        Ok(())
    }

    fn setup_sink(config: &Config) -> Result<Box<dyn ChunkSink>> {
        let format = config.audio_format();
        Ok(match &config.output_dir {
            Some(dir) => {
                tracing::info!("Writing chunks to {}", dir);
                Box::new(ChunkWriter::new(PathBuf::from(dir), format)?)
            }
            None => Box::new(LoggingSink::new(format)),
        })
    }

    fn setup_audio_pipeline(
        config: &Config,
    ) -> (RecorderHandle, mpsc::UnboundedReceiver<RecorderEvent>) {
        let source = DeviceSource {
            format: config.audio_format(),
            frame_size: config.frame_size,
            ring_seconds: config.ring_seconds,
        };
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        // Create and spawn Recorder (using spawn_local because it's !Send)
        let (recorder_tx, recorder_rx) = mpsc::channel(10);
        let recorder = Recorder::new(source, config.chunk_size, recorder_rx, event_tx);
        tokio::task::spawn_local(recorder.run());

        (RecorderHandle::new(recorder_tx), event_rx)
    }
}
