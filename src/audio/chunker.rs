use super::format::DEFAULT_CHUNK_SIZE;
use crate::messages::{RecorderCommand, RecorderEvent};
use tokio::sync::mpsc;

/// Receiver of notifications emitted by [`ChunkingRecorder`]
pub trait EventSink {
    fn emit(&mut self, event: RecorderEvent);
}

impl EventSink for mpsc::UnboundedSender<RecorderEvent> {
    fn emit(&mut self, event: RecorderEvent) {
        // A dropped receiver means nobody is listening anymore
        let _ = self.send(event);
    }
}

impl EventSink for Vec<RecorderEvent> {
    fn emit(&mut self, event: RecorderEvent) {
        self.push(event);
    }
}

/// Accumulates real-time frames and emits them as fixed-size chunks
///
/// Frames are only accepted between a `Start` and the next `Stop` command.
/// Once the number of buffered samples reaches the chunk size, all buffered
/// frames are concatenated and emitted as one `AudioChunk`. Every accepted
/// frame is followed by a `BufferUpdate` carrying the samples buffered since
/// the last flush (0 right after a flush).
///
/// Must only be driven from one thread or task at a time. Every method
/// returns without blocking, so it is safe to call from a real-time context
/// as long as the event sink does not block.
pub struct ChunkingRecorder<S> {
    sink: S,
    buffers: Vec<Vec<f32>>,
    sample_counter: usize,
    recording: bool,
    chunk_size: usize,
}

impl<S: EventSink> ChunkingRecorder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            buffers: Vec::new(),
            sample_counter: 0,
            recording: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// A chunk size of 0 is treated as 1
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn handle(&mut self, command: RecorderCommand) {
        match command {
            RecorderCommand::Start => {
                // Stale frames from an unfinished session are discarded, not flushed
                self.recording = true;
                self.buffers.clear();
                self.sample_counter = 0;
            }
            RecorderCommand::Stop => {
                self.recording = false;
                if !self.buffers.is_empty() {
                    self.flush();
                }
                self.buffers.clear();
                self.sample_counter = 0;
            }
        }
    }

    /// Buffer one frame. Ignored while idle or when the frame is empty.
    pub fn ingest(&mut self, frame: &[f32]) {
        if frame.is_empty() || !self.recording {
            return;
        }

        self.buffers.push(frame.to_vec());
        self.sample_counter += frame.len();

        if self.sample_counter >= self.chunk_size {
            self.flush();
            self.sample_counter = 0;
        }

        self.sink.emit(RecorderEvent::BufferUpdate {
            samples_recorded: self.sample_counter,
        });
    }

    /// Host callback entry point: forwards the first channel of the first input.
    ///
    /// Always returns `true` so the host keeps the processor alive.
    pub fn process(&mut self, inputs: &[&[&[f32]]]) -> bool {
        if let Some(channel) = inputs.first().and_then(|input| input.first()) {
            self.ingest(channel);
        }
        true
    }

    fn flush(&mut self) {
        let total: usize = self.buffers.iter().map(Vec::len).sum();
        let mut audio_data = Vec::with_capacity(total);
        for frame in self.buffers.drain(..) {
            audio_data.extend_from_slice(&frame);
        }

        tracing::trace!("Flushing chunk of {} samples", audio_data.len());
        self.sink.emit(RecorderEvent::AudioChunk { audio_data });
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn samples_buffered(&self) -> usize {
        self.sample_counter
    }

    pub fn frames_buffered(&self) -> usize {
        self.buffers.len()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(chunk_size: usize) -> ChunkingRecorder<Vec<RecorderEvent>> {
        ChunkingRecorder::new(Vec::new()).with_chunk_size(chunk_size)
    }

    fn frame(len: usize, start: f32) -> Vec<f32> {
        (0..len).map(|i| start + i as f32).collect()
    }

    fn chunks(events: &[RecorderEvent]) -> Vec<&Vec<f32>> {
        events
            .iter()
            .filter_map(|e| match e {
                RecorderEvent::AudioChunk { audio_data } => Some(audio_data),
                _ => None,
            })
            .collect()
    }

    fn updates(events: &[RecorderEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                RecorderEvent::BufferUpdate { samples_recorded } => Some(*samples_recorded),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_default_chunk_size() {
        let rec = ChunkingRecorder::new(Vec::<RecorderEvent>::new());
        assert_eq!(rec.chunk_size(), 16000);
        assert!(!rec.is_recording());
    }

    #[test]
    fn test_flush_on_threshold_then_reports_zero() {
        let mut rec = recorder(4);
        rec.handle(RecorderCommand::Start);

        rec.ingest(&[1.0, 2.0]);
        rec.ingest(&[3.0, 4.0]);
        rec.ingest(&[5.0, 6.0, 7.0]);

        assert_eq!(
            rec.sink(),
            &vec![
                RecorderEvent::BufferUpdate {
                    samples_recorded: 2
                },
                RecorderEvent::AudioChunk {
                    audio_data: vec![1.0, 2.0, 3.0, 4.0]
                },
                RecorderEvent::BufferUpdate {
                    samples_recorded: 0
                },
                RecorderEvent::BufferUpdate {
                    samples_recorded: 3
                },
            ]
        );
        assert_eq!(rec.samples_buffered(), 3);
        assert_eq!(rec.frames_buffered(), 1);
    }

    #[test]
    fn test_chunk_is_ordered_concatenation() {
        let mut rec = recorder(10);
        rec.handle(RecorderCommand::Start);

        let frames = [frame(3, 0.0), frame(4, 100.0), frame(5, 200.0)];
        for f in &frames {
            rec.ingest(f);
        }

        let expected: Vec<f32> = frames.concat();
        let emitted = chunks(rec.sink());
        assert_eq!(emitted, vec![&expected]);
        assert_eq!(emitted[0].len(), 12);
    }

    #[test]
    fn test_overshoot_flushes_once() {
        let mut rec = recorder(5);
        rec.handle(RecorderCommand::Start);

        rec.ingest(&frame(3, 0.0));
        rec.ingest(&frame(3, 10.0));

        assert_eq!(chunks(rec.sink()).len(), 1);
        assert_eq!(chunks(rec.sink())[0].len(), 6);
        assert_eq!(rec.samples_buffered(), 0);
        assert_eq!(rec.frames_buffered(), 0);
    }

    #[test]
    fn test_single_frame_larger_than_chunk() {
        let mut rec = recorder(4);
        rec.handle(RecorderCommand::Start);

        rec.ingest(&frame(10, 0.0));

        assert_eq!(chunks(rec.sink()), vec![&frame(10, 0.0)]);
        assert_eq!(updates(rec.sink()), vec![0]);
    }

    #[test]
    fn test_stop_flushes_pending_samples() {
        let mut rec = recorder(16000);
        rec.handle(RecorderCommand::Start);

        rec.ingest(&frame(128, 0.0));
        rec.ingest(&frame(128, 1000.0));
        rec.handle(RecorderCommand::Stop);

        let expected = [frame(128, 0.0), frame(128, 1000.0)].concat();
        assert_eq!(chunks(rec.sink()), vec![&expected]);
        assert!(matches!(
            rec.sink().last(),
            Some(RecorderEvent::AudioChunk { .. })
        ));
        assert!(!rec.is_recording());
        assert_eq!(rec.samples_buffered(), 0);
        assert_eq!(rec.frames_buffered(), 0);
    }

    #[test]
    fn test_stop_without_pending_samples_emits_nothing() {
        let mut rec = recorder(4);
        rec.handle(RecorderCommand::Start);
        rec.ingest(&frame(4, 0.0));
        let before = rec.sink().len();

        rec.handle(RecorderCommand::Stop);

        assert_eq!(rec.sink().len(), before);
    }

    #[test]
    fn test_idle_frames_are_ignored() {
        let mut rec = recorder(4);

        rec.ingest(&frame(8, 0.0));
        rec.handle(RecorderCommand::Start);
        rec.handle(RecorderCommand::Stop);
        rec.ingest(&frame(8, 0.0));

        assert!(rec.sink().is_empty());
        assert_eq!(rec.samples_buffered(), 0);
    }

    #[test]
    fn test_empty_frame_is_ignored() {
        let mut rec = recorder(4);
        rec.handle(RecorderCommand::Start);

        rec.ingest(&[]);

        assert!(rec.sink().is_empty());
        assert_eq!(rec.frames_buffered(), 0);
    }

    #[test]
    fn test_repeated_commands_are_idempotent() {
        let mut rec = recorder(100);
        rec.handle(RecorderCommand::Start);
        rec.ingest(&frame(10, 0.0));
        rec.handle(RecorderCommand::Start);
        rec.handle(RecorderCommand::Start);

        assert!(rec.is_recording());
        assert_eq!(rec.samples_buffered(), 0);
        assert_eq!(rec.frames_buffered(), 0);

        rec.ingest(&frame(10, 0.0));
        rec.handle(RecorderCommand::Stop);
        rec.handle(RecorderCommand::Stop);

        assert!(!rec.is_recording());
        assert_eq!(rec.samples_buffered(), 0);
        assert_eq!(chunks(rec.sink()).len(), 1);
    }

    #[test]
    fn test_restart_discards_stale_frames() {
        let mut rec = recorder(100);
        rec.handle(RecorderCommand::Start);
        rec.ingest(&frame(10, 0.0));

        rec.handle(RecorderCommand::Start);
        rec.ingest(&frame(5, 50.0));
        rec.handle(RecorderCommand::Stop);

        assert_eq!(chunks(rec.sink()), vec![&frame(5, 50.0)]);
    }

    #[test]
    fn test_progress_tracks_running_sum() {
        let mut rec = recorder(10);
        rec.handle(RecorderCommand::Start);

        for len in [3, 3, 3, 3, 2, 1] {
            rec.ingest(&frame(len, 0.0));
        }

        // 3, 6, 9, 12 -> flush, 2, 3
        assert_eq!(updates(rec.sink()), vec![3, 6, 9, 0, 2, 3]);
        assert_eq!(chunks(rec.sink())[0].len(), 12);
    }

    #[test]
    fn test_process_uses_first_channel_of_first_input() {
        let mut rec = recorder(4);
        rec.handle(RecorderCommand::Start);

        let left: &[f32] = &[1.0, 2.0];
        let right: &[f32] = &[9.0, 9.0];
        let stereo: Vec<&[f32]> = vec![left, right];
        let no_channels: Vec<&[f32]> = Vec::new();

        assert!(rec.process(&[stereo.as_slice()]));
        assert!(rec.process(&[]));
        assert!(rec.process(&[no_channels.as_slice()]));

        assert_eq!(rec.frames_buffered(), 1);
        assert_eq!(updates(rec.sink()), vec![2]);
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let mut rec = recorder(0);
        assert_eq!(rec.chunk_size(), 1);

        rec.handle(RecorderCommand::Start);
        rec.ingest(&[0.5]);
        assert_eq!(chunks(rec.sink()), vec![&vec![0.5]]);
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut rec = ChunkingRecorder::new(tx).with_chunk_size(2);
        rec.handle(RecorderCommand::Start);
        rec.ingest(&[0.1, 0.2]);

        assert_eq!(
            rx.recv().await,
            Some(RecorderEvent::AudioChunk {
                audio_data: vec![0.1, 0.2]
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(RecorderEvent::BufferUpdate {
                samples_recorded: 0
            })
        );
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut rec = ChunkingRecorder::new(tx).with_chunk_size(2);
        rec.handle(RecorderCommand::Start);
        rec.ingest(&[0.1, 0.2]);
        rec.handle(RecorderCommand::Stop);
    }
}
