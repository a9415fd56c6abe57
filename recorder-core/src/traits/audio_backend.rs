use crate::models::audio_models::{AudioDevice, StreamSpec};
use crate::models::error::RecorderError;
use crate::session::stop_token::StopToken;

/// Interface to a platform audio subsystem.
///
/// Implemented by:
/// - `CpalBackend` (`recorder-cpal`)
/// - a synthetic backend in this crate's tests
pub trait AudioBackend: Send + Sync {
    /// Capture-capable devices (`max_input_channels > 0`) in subsystem order.
    fn list_input_devices(&self) -> Result<Vec<AudioDevice>, RecorderError>;

    /// Open an input stream on `device` with `spec`.
    ///
    /// Called on the capture thread that will read from the stream, so the
    /// returned stream does not need to be `Send`. `stop` is the session's
    /// cancellation token; a blocking read should give up when it fires.
    fn open_input(
        &self,
        device: &AudioDevice,
        spec: &StreamSpec,
        stop: StopToken,
    ) -> Result<Box<dyn InputStream>, RecorderError>;
}

/// An open input stream delivering interleaved 16-bit LE blocks.
pub trait InputStream {
    /// Block until one buffer of `spec.block_frames` frames is available.
    ///
    /// Returns `Ok(None)` when the stop token fired while waiting. Driver
    /// overflow is not an error: the best-effort block is returned.
    fn read_block(&mut self) -> Result<Option<Vec<u8>>, RecorderError>;

    /// Stop and release the stream. Must be idempotent.
    fn close(&mut self) -> Result<(), RecorderError>;
}
