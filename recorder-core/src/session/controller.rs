use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use crate::models::audio_models::AudioDevice;
use crate::models::error::RecorderError;
use crate::session::capture::FailureNotifier;
use crate::session::recorder::Recorder;

/// Who asked for a start or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    User,
    Remote,
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Work marshalled onto the controller context.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    Start(CommandSource),
    Stop(CommandSource),
    SelectDevice(AudioDevice),
    SetCustomName(String),
    SetSaveDirectory(Option<PathBuf>),
    SetSelectedTracks(BTreeSet<usize>),
    /// A capture loop ended on a read failure.
    CaptureFailed { session_id: u64 },
    Shutdown,
}

/// Cloneable sender for [`ControlMessage`]s, usable from any thread.
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    sender: Sender<ControlMessage>,
}

impl RecorderHandle {
    pub fn send(&self, message: ControlMessage) -> Result<(), RecorderError> {
        self.sender
            .send(message)
            .map_err(|_| RecorderError::InvalidState("recorder controller has shut down".into()))
    }

    pub fn start(&self, source: CommandSource) -> Result<(), RecorderError> {
        self.send(ControlMessage::Start(source))
    }

    pub fn stop(&self, source: CommandSource) -> Result<(), RecorderError> {
        self.send(ControlMessage::Stop(source))
    }

    pub fn shutdown(&self) -> Result<(), RecorderError> {
        self.send(ControlMessage::Shutdown)
    }
}

/// The single execution context that owns a [`Recorder`].
///
/// User actions, remote commands and capture-failure notices all arrive as
/// messages and are applied one at a time, so the state machine is never
/// touched from two threads.
pub struct RecorderController {
    recorder: Recorder,
    sender: Sender<ControlMessage>,
    receiver: Receiver<ControlMessage>,
}

impl RecorderController {
    /// Take ownership of `recorder` and route its capture failures through the queue.
    pub fn new(mut recorder: Recorder) -> Self {
        let (sender, receiver) = mpsc::channel();
        let failures = sender.clone();
        let notifier: FailureNotifier = Arc::new(move |session_id, mode| {
            log::debug!("Capture session {} ({}) failed", session_id, mode);
            let _ = failures.send(ControlMessage::CaptureFailed { session_id });
        });
        recorder.set_failure_notifier(notifier);
        Self {
            recorder,
            sender,
            receiver,
        }
    }

    pub fn handle(&self) -> RecorderHandle {
        RecorderHandle {
            sender: self.sender.clone(),
        }
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    /// Announce the initial status, then apply messages until `Shutdown`.
    ///
    /// Shuts the recorder down (saving any take in progress) and hands it back.
    pub fn run(mut self) -> Recorder {
        self.recorder.announce_status();
        while let Ok(message) = self.receiver.recv() {
            if !self.process(message) {
                break;
            }
        }
        self.recorder.shutdown();
        self.recorder
    }

    /// Apply one message. Returns `false` for `Shutdown`.
    pub fn process(&mut self, message: ControlMessage) -> bool {
        match message {
            ControlMessage::Start(source) => {
                log::info!("Start requested ({})", source);
                if let Err(e) = self.recorder.start() {
                    if e.is_rejection() {
                        log::warn!("Start rejected: {}", e);
                    } else {
                        log::error!("Start failed: {}", e);
                    }
                    self.recorder.report_error(&e);
                }
            }
            ControlMessage::Stop(source) => {
                log::info!("Stop requested ({})", source);
                self.recorder.stop();
            }
            ControlMessage::SelectDevice(device) => {
                if let Err(e) = self.recorder.select_device(device) {
                    self.recorder.report_error(&e);
                }
            }
            ControlMessage::SetCustomName(name) => self.recorder.set_custom_name(name),
            ControlMessage::SetSaveDirectory(directory) => self.recorder.set_save_directory(directory),
            ControlMessage::SetSelectedTracks(tracks) => self.recorder.set_selected_tracks(tracks),
            ControlMessage::CaptureFailed { session_id } => self.recorder.handle_capture_failure(session_id),
            ControlMessage::Shutdown => return false,
        }
        true
    }
}
