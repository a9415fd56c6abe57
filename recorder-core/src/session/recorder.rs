use std::collections::BTreeSet;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::audio_models::{AudioDevice, CaptureMode};
use crate::models::config::RecorderOptions;
use crate::models::error::{RecorderError, TrackWriteFailure, ValidationError};
use crate::models::state::{RecorderState, StatusBroadcast};
use crate::models::take::{Take, TakeMetadata, TakeResult, TrackMetadata};
use crate::processing::demux;
use crate::processing::level_meter::LevelMonitor;
use crate::session::capture::{CaptureOutcome, CaptureSession, FailureNotifier};
use crate::storage::{metadata, take_manager, track_writer};
use crate::traits::audio_backend::AudioBackend;
use crate::traits::recorder_delegate::RecorderDelegate;

/// What the recorder currently owns. Each variant holds at most one session.
enum Phase {
    Idle,
    Monitoring(CaptureSession),
    Recording { session: CaptureSession, take: Take },
}

/// The Idle / Monitoring / Recording state machine.
///
/// Owns exactly one capture session at a time and always closes the current
/// one before opening the next, so monitor and record loops never run
/// against the device concurrently. Not thread-safe by itself: drive it from
/// a single context such as [`RecorderController`](super::controller::RecorderController).
///
/// ```text
///            select_device            start
///   Idle ─────────────────→ Monitoring ─────→ Recording
///    ↑  read failure            ↑    stop / read failure │
///    └──────────────────────────┘←───────────────────────┘
/// ```
pub struct Recorder {
    backend: Arc<dyn AudioBackend>,
    options: RecorderOptions,
    levels: LevelMonitor,
    delegates: Vec<Arc<dyn RecorderDelegate>>,
    failure_notifier: Option<FailureNotifier>,
    device: Option<AudioDevice>,
    custom_name: String,
    save_directory: Option<PathBuf>,
    selected_tracks: BTreeSet<usize>,
    state: RecorderState,
    phase: Phase,
}

impl Recorder {
    pub fn new(backend: Arc<dyn AudioBackend>, options: RecorderOptions) -> Result<Self, RecorderError> {
        options.validate().map_err(RecorderError::Configuration)?;
        Ok(Self {
            backend,
            custom_name: options.default_custom_name.trim().to_string(),
            options,
            levels: LevelMonitor::new(),
            delegates: Vec::new(),
            failure_notifier: None,
            device: None,
            save_directory: None,
            selected_tracks: BTreeSet::new(),
            state: RecorderState::Idle,
            phase: Phase::Idle,
        })
    }

    pub fn add_delegate(&mut self, delegate: Arc<dyn RecorderDelegate>) {
        self.delegates.push(delegate);
    }

    /// Install the callback capture threads use to report read failures.
    ///
    /// Applies to sessions opened after the call.
    pub fn set_failure_notifier(&mut self, notifier: FailureNotifier) {
        self.failure_notifier = Some(notifier);
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Handle the UI polls for level snapshots.
    pub fn levels(&self) -> LevelMonitor {
        self.levels.clone()
    }

    pub fn device(&self) -> Option<&AudioDevice> {
        self.device.as_ref()
    }

    pub fn custom_name(&self) -> &str {
        &self.custom_name
    }

    /// Surrounding whitespace is stripped; the stored name goes into file names as is.
    pub fn set_custom_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.custom_name = name.trim().to_string();
    }

    pub fn save_directory(&self) -> Option<&Path> {
        self.save_directory.as_deref()
    }

    pub fn set_save_directory(&mut self, directory: Option<PathBuf>) {
        self.save_directory = directory;
    }

    pub fn selected_tracks(&self) -> &BTreeSet<usize> {
        &self.selected_tracks
    }

    /// Replace the track selection. Checked against the device at `start`.
    pub fn set_selected_tracks(&mut self, tracks: BTreeSet<usize>) {
        self.selected_tracks = tracks;
    }

    /// Id of the live capture session, if any.
    pub fn session_id(&self) -> Option<u64> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Monitoring(session) | Phase::Recording { session, .. } => Some(session.id()),
        }
    }

    /// Devices available for selection. An enumeration failure is reported
    /// as a warning and yields an empty list.
    pub fn input_devices(&self) -> Vec<AudioDevice> {
        match self.backend.list_input_devices() {
            Ok(devices) => {
                log::debug!("Found {} input device(s)", devices.len());
                devices
            }
            Err(e) => {
                log::warn!("{}", e);
                self.warn(&e);
                Vec::new()
            }
        }
    }

    /// Take number the next `start` would use, for display.
    pub fn next_take_number(&self) -> Option<u32> {
        let directory = self.save_directory.as_deref()?;
        Some(take_manager::next_take_number(directory, &self.custom_name))
    }

    /// Switch to `device` and start monitoring it. Rejected while recording.
    ///
    /// Resets the track selection to every channel of the new device. If the
    /// monitoring stream cannot be opened the device stays selected and the
    /// recorder is left idle.
    pub fn select_device(&mut self, device: AudioDevice) -> Result<(), RecorderError> {
        if matches!(self.phase, Phase::Recording { .. }) {
            return Err(RecorderError::InvalidState("cannot change device while recording".into()));
        }
        if device.max_input_channels == 0 {
            return Err(RecorderError::DeviceNotFound(format!("'{}' has no input channels", device.name)));
        }

        if let Phase::Monitoring(session) = self.take_phase() {
            session.close();
        }
        self.levels.clear();
        self.selected_tracks = (0..device.max_input_channels as usize).collect();
        self.device = Some(device.clone());

        match self.open_session(&device, CaptureMode::Monitoring) {
            Ok(session) => {
                self.phase = Phase::Monitoring(session);
                self.set_state(RecorderState::Monitoring);
                log::info!("Monitoring {}", device);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to monitor {}: {}", device, e);
                self.set_state(RecorderState::Idle);
                Err(e)
            }
        }
    }

    /// `Monitoring -> Recording`.
    ///
    /// Returns the new take, or `None` if a recording was already running.
    /// Selections are validated before the device is touched; a rejected
    /// start leaves the monitoring session running.
    pub fn start(&mut self) -> Result<Option<Take>, RecorderError> {
        if matches!(self.phase, Phase::Recording { .. }) {
            log::debug!("Start ignored: already recording");
            return Ok(None);
        }
        let device = self
            .device
            .clone()
            .ok_or_else(|| RecorderError::InvalidState("no input device selected".into()))?;
        let save_directory = self.validate_selection(&device)?;
        if !matches!(self.phase, Phase::Monitoring(_)) {
            return Err(RecorderError::InvalidState(format!("'{}' is not being monitored", device.name)));
        }

        let take_number = match take_manager::scan_take_number(&save_directory, &self.custom_name) {
            Ok(number) => number,
            Err(e) => {
                log::warn!("{}; starting at take 1", e);
                self.warn(&e);
                1
            }
        };
        let take = Take {
            custom_name: self.custom_name.clone(),
            take_number,
            selected_tracks: self.selected_tracks.clone(),
            save_directory,
            device_name: device.name.clone(),
            channel_count: device.max_input_channels,
            sample_rate: device.default_sample_rate,
        };

        if let Phase::Monitoring(session) = self.take_phase() {
            session.close();
        }

        match self.open_session(&device, CaptureMode::Recording) {
            Ok(session) => {
                log::info!(
                    "Recording take {} of '{}' ({} track(s))",
                    take.take_number,
                    take.custom_name,
                    take.selected_tracks.len()
                );
                self.phase = Phase::Recording {
                    session,
                    take: take.clone(),
                };
                self.set_state(RecorderState::Recording);
                self.broadcast(StatusBroadcast::Recording);
                Ok(Some(take))
            }
            Err(e) => {
                log::error!("Failed to start recording: {}", e);
                self.reopen_monitoring(&device);
                Err(e)
            }
        }
    }

    /// `Recording -> Monitoring`. Returns `None` if nothing was recording.
    ///
    /// Every selected track is attempted; write failures are aggregated into
    /// the result and reported once through the delegates.
    pub fn stop(&mut self) -> Option<TakeResult> {
        match self.take_phase() {
            Phase::Recording { session, take } => Some(self.finish_recording(session, take, true)),
            other => {
                self.phase = other;
                log::debug!("Stop ignored: not recording");
                None
            }
        }
    }

    /// React to a read failure reported by capture session `session_id`.
    ///
    /// A recording is saved with whatever was captured and monitoring
    /// resumes; a failed monitoring session leaves the recorder idle.
    /// Notices from sessions that are no longer live are ignored.
    pub fn handle_capture_failure(&mut self, session_id: u64) {
        if self.session_id() != Some(session_id) {
            log::debug!("Ignoring failure notice from stale capture session {}", session_id);
            return;
        }

        match self.take_phase() {
            Phase::Recording { session, take } => {
                log::warn!("Recording interrupted, saving partial take {}", take.take_number);
                self.finish_recording(session, take, true);
            }
            Phase::Monitoring(session) => {
                let failure = session
                    .close()
                    .failure
                    .unwrap_or_else(|| RecorderError::ReadFailure("monitoring stream stopped".into()));
                self.levels.clear();
                self.set_state(RecorderState::Idle);
                self.report_error(&failure);
            }
            Phase::Idle => {}
        }
    }

    /// Stop and save any recording, close the monitoring session, go idle.
    pub fn shutdown(&mut self) {
        match self.take_phase() {
            Phase::Recording { session, take } => {
                self.finish_recording(session, take, false);
            }
            Phase::Monitoring(session) => {
                session.close();
            }
            Phase::Idle => {}
        }
        self.levels.clear();
        self.set_state(RecorderState::Idle);
        log::info!("Recorder shut down");
    }

    /// Broadcast the current status, used once at startup.
    pub fn announce_status(&self) {
        self.broadcast(self.state.status());
    }

    /// Forward an error to every delegate.
    pub fn report_error(&self, error: &RecorderError) {
        for delegate in &self.delegates {
            delegate.on_error(error);
        }
    }

    fn validate_selection(&self, device: &AudioDevice) -> Result<PathBuf, ValidationError> {
        let save_directory = self
            .save_directory
            .clone()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or(ValidationError::MissingSaveDirectory)?;
        if self.custom_name.is_empty() {
            return Err(ValidationError::EmptyCustomName);
        }
        if self.selected_tracks.is_empty() {
            return Err(ValidationError::NoTracksSelected);
        }
        let channels = device.max_input_channels;
        if let Some(&track) = self.selected_tracks.iter().find(|&&t| t >= channels as usize) {
            return Err(ValidationError::TrackOutOfRange { track, channels });
        }
        Ok(save_directory)
    }

    fn finish_recording(&mut self, session: CaptureSession, take: Take, resume_monitoring: bool) -> TakeResult {
        let device = session.device().clone();
        let outcome = session.close();
        let result = self.save_take(take, outcome);

        if resume_monitoring {
            self.reopen_monitoring(&device);
        } else {
            self.set_state(RecorderState::Idle);
        }
        self.broadcast(StatusBroadcast::Idle);

        for delegate in &self.delegates {
            delegate.on_take_finished(&result);
        }
        if let Some(failure) = &result.read_failure {
            self.report_error(failure);
        }
        if let Some(error) = result.write_error() {
            self.report_error(&error);
        }
        result
    }

    fn save_take(&self, take: Take, outcome: CaptureOutcome) -> TakeResult {
        let channels = demux::demux(&outcome.raw_frames, take.channel_count as usize);
        let frames = outcome.frames(take.channel_count);

        let mut files = Vec::new();
        let mut failures = Vec::new();
        let mut tracks = Vec::new();
        for &track in &take.selected_tracks {
            let samples = channels.get(track).map(Vec::as_slice).unwrap_or_default();
            match track_writer::write_track(
                &take.save_directory,
                &take.custom_name,
                take.take_number,
                track,
                samples,
                take.sample_rate,
            ) {
                Ok(written) => {
                    log::info!("Wrote {} ({} frames)", written.path.display(), written.frames);
                    tracks.push(TrackMetadata {
                        track_number: track + 1,
                        file_name: take_manager::track_file_name(&take.custom_name, take.take_number, track),
                        sha256: written.sha256,
                    });
                    files.push(written.path);
                }
                Err(e) => {
                    log::error!("Track {} of take {} not saved: {}", track + 1, take.take_number, e);
                    let path = take.save_directory.join(take_manager::track_file_name(
                        &take.custom_name,
                        take.take_number,
                        track,
                    ));
                    failures.push(write_failure(Some(track), path, e));
                }
            }
        }

        let mut metadata_file = None;
        if self.options.write_metadata && !files.is_empty() {
            let path = metadata::metadata_path(&take);
            match metadata::write_metadata(&TakeMetadata::new(&take, frames, tracks), &path) {
                Ok(()) => metadata_file = Some(path),
                Err(e) => {
                    log::error!("Metadata for take {} not saved: {}", take.take_number, e);
                    failures.push(write_failure(None, path, e));
                }
            }
        }

        TakeResult {
            take,
            files,
            metadata_file,
            failures,
            frames,
            read_failure: outcome.failure,
        }
    }

    fn reopen_monitoring(&mut self, device: &AudioDevice) {
        match self.open_session(device, CaptureMode::Monitoring) {
            Ok(session) => {
                self.phase = Phase::Monitoring(session);
                self.set_state(RecorderState::Monitoring);
            }
            Err(e) => {
                log::error!("Failed to resume monitoring {}: {}", device, e);
                self.levels.clear();
                self.set_state(RecorderState::Idle);
                self.report_error(&e);
            }
        }
    }

    fn open_session(&self, device: &AudioDevice, mode: CaptureMode) -> Result<CaptureSession, RecorderError> {
        CaptureSession::open(
            Arc::clone(&self.backend),
            device,
            mode,
            self.options.block_frames,
            self.levels.clone(),
            self.failure_notifier.clone(),
        )
    }

    fn take_phase(&mut self) -> Phase {
        mem::replace(&mut self.phase, Phase::Idle)
    }

    fn set_state(&mut self, state: RecorderState) {
        if self.state == state {
            return;
        }
        log::debug!("State {} -> {}", self.state, state);
        self.state = state;
        for delegate in &self.delegates {
            delegate.on_state_changed(state);
        }
    }

    fn broadcast(&self, status: StatusBroadcast) {
        for delegate in &self.delegates {
            delegate.on_status(status);
        }
    }

    fn warn(&self, warning: &RecorderError) {
        for delegate in &self.delegates {
            delegate.on_warning(warning);
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if !matches!(self.phase, Phase::Idle) {
            self.shutdown();
        }
    }
}

/// Pick the remembered device by exact name, else the first one listed.
pub fn resolve_device(devices: &[AudioDevice], preferred_name: &str) -> Option<AudioDevice> {
    devices
        .iter()
        .find(|d| !preferred_name.is_empty() && d.name == preferred_name)
        .or_else(|| devices.first())
        .cloned()
}

fn write_failure(track_index: Option<usize>, path: PathBuf, error: RecorderError) -> TrackWriteFailure {
    match error {
        RecorderError::Write { path, reason } => TrackWriteFailure {
            track_index,
            path,
            reason,
        },
        other => TrackWriteFailure {
            track_index,
            path,
            reason: other.to_string(),
        },
    }
}
