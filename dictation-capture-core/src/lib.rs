//! # dictation-capture-core
//!
//! Platform-agnostic core of the dictation recorder.
//!
//! Provides the capture state machine, streaming WAV encoding, loudness
//! metering and telemetry. Device backends (cpal) implement the
//! `CaptureProvider` trait and plug into the generic `CaptureSession`.
//!
//! ## Architecture
//!
//! ```text
//! dictation-capture-core (this crate)
//! ├── traits/       ← CaptureProvider, CaptureStream, CaptureDelegate
//! ├── models/       ← CaptureError, CaptureState, CaptureConfiguration, AudioFormat, etc.
//! ├── processing/   ← LoudnessMeter, PcmConverter, ChunkAssembler, WAV header I/O
//! ├── session/      ← CaptureSession (state machine), Clock, TelemetryChannel
//! └── storage/      ← StreamingEncoder
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioFormat, AudioSource, CaptureSessionDiagnostics};
pub use models::config::CaptureConfiguration;
pub use models::error::CaptureError;
pub use models::recording_result::RecordingResult;
pub use models::state::CaptureState;
pub use models::telemetry::TelemetryEvent;
pub use processing::chunk_assembler::ChunkAssembler;
pub use processing::loudness::LoudnessMeter;
pub use processing::pcm_converter::{PcmConverter, StreamResampler};
pub use session::capture_session::CaptureSession;
pub use session::clock::{Clock, ManualClock, SystemClock};
pub use session::telemetry::TelemetryChannel;
pub use storage::streaming_encoder::StreamingEncoder;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_provider::{CaptureProvider, CaptureStream, ChunkCallback, InputSpec};
