use super::format::AudioFormat;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use ringbuf::{HeapRb, traits::*};
use std::sync::Arc;
use tokio::sync::{Notify, mpsc};

pub struct AudioCapture;

impl AudioCapture {
    /// Start audio capture
    ///
    /// Returns the stream which must be kept alive for audio capture to continue.
    /// The device callback only writes into a ring buffer; a bridge task cuts the
    /// buffered samples into frames of `frame_size` and sends them via frame_tx.
    /// `ring_seconds` bounds how much audio may pile up between bridge wakeups.
    pub fn start(
        format: AudioFormat,
        frame_size: usize,
        ring_seconds: f32,
        frame_tx: mpsc::Sender<Vec<f32>>,
    ) -> Result<cpal::Stream> {
        let capacity = format.samples_for_duration(ring_seconds).max(frame_size);
        let ring = HeapRb::<f32>::new(capacity);
        let (mut producer, consumer) = ring.split();

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("No input audio device available")?;

        if let Ok(name) = device.name() {
            tracing::debug!("Using input device: {}", name);
        }

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let notify = Arc::new(Notify::new());
        let notify_callback = notify.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    producer.push_slice(data);
                    notify_callback.notify_one();
                },
                move |err| {
                    tracing::error!("Audio stream error: {}", err);
                },
                None,
            )
            .context("Failed to build input stream")?;

        stream.play().context("Failed to start audio stream")?;

        tokio::task::spawn_local(Self::bridge_task(consumer, frame_tx, frame_size, notify));

        tracing::info!(
            "Audio capture started ({} Hz, {} channel(s), {} samples per frame)",
            format.sample_rate,
            format.channels,
            frame_size
        );
        Ok(stream)
    }

    async fn bridge_task(
        mut consumer: impl Consumer<Item = f32>,
        tx: mpsc::Sender<Vec<f32>>,
        frame_size: usize,
        notify: Arc<Notify>,
    ) {
        let frame_size = frame_size.max(1);
        loop {
            tokio::select! {
                _ = notify.notified() => {}
                _ = tx.closed() => {
                    tracing::debug!("Frame receiver dropped, stopping bridge task");
                    return;
                }
            }

            while consumer.occupied_len() >= frame_size {
                let mut frame = vec![0.0f32; frame_size];
                let n = consumer.pop_slice(&mut frame);
                frame.truncate(n);

                if tx.send(frame).await.is_err() {
                    tracing::debug!("Frame receiver dropped, stopping bridge task");
                    return;
                }
            }
        }
    }
}
