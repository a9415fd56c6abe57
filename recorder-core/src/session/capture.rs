use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::models::audio_models::{AudioDevice, CaptureDiagnostics, CaptureMode, StreamSpec, BYTES_PER_SAMPLE};
use crate::models::error::RecorderError;
use crate::processing::level_meter::{self, LevelMonitor};
use crate::session::stop_token::StopToken;
use crate::traits::audio_backend::{AudioBackend, InputStream};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Called from the capture thread when its loop ended on a read failure.
///
/// Receives the id of the failed session so the owner can ignore notices
/// from sessions it has already replaced.
pub type FailureNotifier = Arc<dyn Fn(u64, CaptureMode) + Send + Sync>;

/// Everything a capture loop produced, handed back by [`CaptureSession::close`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureOutcome {
    /// Blocks in arrival order. Always empty in monitoring mode.
    pub raw_frames: Vec<Vec<u8>>,
    pub diagnostics: CaptureDiagnostics,
    /// The read error that ended the loop, if any.
    pub failure: Option<RecorderError>,
}

impl CaptureOutcome {
    /// Whole interleaved frames accumulated for `channels` channels.
    pub fn frames(&self, channels: u16) -> u64 {
        let frame_bytes = channels as usize * BYTES_PER_SAMPLE;
        if frame_bytes == 0 {
            return 0;
        }
        let total: usize = self.raw_frames.iter().map(Vec::len).sum();
        (total / frame_bytes) as u64
    }
}

/// One open input stream and the thread reading it.
///
/// The stream is opened on the capture thread itself and lives there until
/// the loop exits. Dropping the session cancels and joins the loop.
///
/// ```text
/// [backend stream] → read_block → compute_levels → [LevelMonitor]
///                         └──────→ raw_frames (recording only)
/// ```
pub struct CaptureSession {
    id: u64,
    device: AudioDevice,
    spec: StreamSpec,
    mode: CaptureMode,
    stop: StopToken,
    handle: Option<JoinHandle<CaptureOutcome>>,
}

impl CaptureSession {
    /// Open `device` at its default rate and full channel count and start the loop.
    ///
    /// Returns only after the backend reported whether the stream opened. On
    /// failure no thread is left behind.
    pub fn open(
        backend: Arc<dyn AudioBackend>,
        device: &AudioDevice,
        mode: CaptureMode,
        block_frames: usize,
        levels: LevelMonitor,
        on_failure: Option<FailureNotifier>,
    ) -> Result<Self, RecorderError> {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst);
        let spec = StreamSpec::for_device(device, block_frames);
        let stop = StopToken::new();
        let (opened_tx, opened_rx) = mpsc::channel::<Result<(), RecorderError>>();

        let thread_device = device.clone();
        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name(format!("capture-{}", mode))
            .spawn(move || {
                let stream = match backend.open_input(&thread_device, &spec, thread_stop.clone()) {
                    Ok(stream) => {
                        let _ = opened_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = opened_tx.send(Err(e));
                        return CaptureOutcome::default();
                    }
                };

                let outcome = run_capture_loop(stream, &spec, mode, &thread_stop, &levels);
                if outcome.failure.is_some() {
                    if let Some(notify) = on_failure {
                        notify(id, mode);
                    }
                }
                outcome
            })
            .map_err(|e| RecorderError::StreamOpen {
                device: device.name.clone(),
                reason: format!("failed to spawn capture thread: {}", e),
            })?;

        let opened = opened_rx.recv().unwrap_or_else(|_| {
            Err(RecorderError::StreamOpen {
                device: device.name.clone(),
                reason: "capture thread exited before opening the stream".into(),
            })
        });
        if let Err(e) = opened {
            let _ = handle.join();
            return Err(e);
        }

        log::info!(
            "Capture session {} opened ({}): {} ch @ {} Hz on '{}'",
            id,
            mode,
            spec.channels,
            spec.sample_rate,
            device.name
        );

        Ok(Self {
            id,
            device: device.clone(),
            spec,
            mode,
            stop,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn device(&self) -> &AudioDevice {
        &self.device
    }

    pub fn spec(&self) -> &StreamSpec {
        &self.spec
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Cancel the loop, wait for it to release the stream, and collect its output.
    pub fn close(mut self) -> CaptureOutcome {
        self.shutdown()
    }

    fn shutdown(&mut self) -> CaptureOutcome {
        self.stop.cancel();
        let Some(handle) = self.handle.take() else {
            return CaptureOutcome::default();
        };

        let outcome = handle.join().unwrap_or_else(|_| CaptureOutcome {
            failure: Some(RecorderError::ReadFailure("capture thread panicked".into())),
            ..Default::default()
        });
        log::info!(
            "Capture session {} closed ({}): {} blocks, {} bytes",
            self.id,
            self.mode,
            outcome.diagnostics.blocks_read,
            outcome.diagnostics.bytes_captured
        );
        outcome
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

fn run_capture_loop(
    mut stream: Box<dyn InputStream>,
    spec: &StreamSpec,
    mode: CaptureMode,
    stop: &StopToken,
    levels: &LevelMonitor,
) -> CaptureOutcome {
    let channels = spec.channels as usize;
    let mut outcome = CaptureOutcome::default();

    while !stop.is_cancelled() {
        match stream.read_block() {
            Ok(Some(block)) => {
                levels.publish(level_meter::compute_levels(&block, channels));
                outcome.diagnostics.blocks_read += 1;
                outcome.diagnostics.bytes_captured += block.len() as u64;
                if mode == CaptureMode::Recording {
                    outcome.raw_frames.push(block);
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::error!("{} loop stopped: {}", mode, e);
                outcome.failure = Some(e);
                break;
            }
        }
    }

    if let Err(e) = stream.close() {
        log::warn!("Failed to close input stream: {}", e);
    }
    outcome
}
