//! # recorder-core
//!
//! Platform-agnostic engine of the multi-track recorder.
//!
//! Captures a multi-channel input device, meters every channel, splits the
//! interleaved stream into per-channel tracks and writes each selected track
//! to its own mono WAV file. Audio backends implement [`AudioBackend`] and
//! plug into the [`Recorder`] state machine.
//!
//! ## Architecture
//!
//! ```text
//! recorder-core (this crate)
//! ├── traits/       ← AudioBackend, InputStream, RecorderDelegate
//! ├── models/       ← RecorderError, RecorderState, AudioDevice, Take, options
//! ├── processing/   ← level meter, demultiplexer, RingBuffer, WAV header
//! ├── session/      ← CaptureSession, Recorder, RecorderController
//! ├── storage/      ← take numbering, track writer, metadata, settings
//! └── remote/       ← OSC codec, RemoteControlServer, StatusBroadcaster
//! ```

pub mod models;
pub mod processing;
pub mod remote;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioDevice, CaptureMode, LevelSnapshot, StreamSpec};
pub use models::config::{RecorderOptions, RemoteConfig};
pub use models::error::{RecorderError, TrackWriteFailure, ValidationError};
pub use models::state::{RecorderState, StatusBroadcast};
pub use models::take::{Take, TakeMetadata, TakeResult};
pub use processing::level_meter::LevelMonitor;
pub use processing::ring_buffer::RingBuffer;
pub use remote::server::{RemoteControlServer, StatusBroadcaster};
pub use remote::RemoteCommand;
pub use session::controller::{CommandSource, ControlMessage, RecorderController, RecorderHandle};
pub use session::recorder::{resolve_device, Recorder};
pub use session::stop_token::StopToken;
pub use storage::settings::RecorderSettings;
pub use traits::audio_backend::{AudioBackend, InputStream};
pub use traits::recorder_delegate::RecorderDelegate;
