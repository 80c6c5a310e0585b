pub mod capture;
pub mod chunk_writer;
pub mod chunker;
pub mod format;
pub mod sink;

pub use capture::AudioCapture;
pub use chunk_writer::ChunkWriter;
pub use chunker::ChunkingRecorder;
pub use format::AudioFormat;
pub use sink::{ChunkSink, LoggingSink};
