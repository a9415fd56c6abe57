//! Synthetic backend and event capture shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::audio_models::{AudioDevice, StreamSpec};
use crate::models::error::RecorderError;
use crate::models::state::{RecorderState, StatusBroadcast};
use crate::models::take::TakeResult;
use crate::processing::wav_format;
use crate::session::stop_token::StopToken;
use crate::traits::audio_backend::{AudioBackend, InputStream};
use crate::traits::recorder_delegate::RecorderDelegate;

/// Behaviour of one opened stream.
#[derive(Debug, Clone)]
pub(crate) struct StreamScript {
    /// Value of every sample delivered.
    pub sample: i16,
    /// Deliver this many blocks, then wait for the stop token.
    pub blocks: Option<usize>,
    /// Fail with a read error once this many blocks were delivered.
    pub fail_after: Option<usize>,
    /// Refuse to open.
    pub fail_open: bool,
    pub block_delay: Duration,
}

impl Default for StreamScript {
    fn default() -> Self {
        Self {
            sample: 0,
            blocks: None,
            fail_after: None,
            fail_open: false,
            block_delay: Duration::from_millis(1),
        }
    }
}

impl StreamScript {
    pub fn blocks(count: usize) -> Self {
        Self {
            blocks: Some(count),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct BackendStats {
    pub opens: AtomicUsize,
    pub open_now: AtomicUsize,
    pub max_open: AtomicUsize,
    pub closes: AtomicUsize,
    /// Blocks delivered by the most recently opened stream.
    pub delivered: AtomicUsize,
}

pub(crate) struct SyntheticBackend {
    devices: Vec<AudioDevice>,
    default_script: StreamScript,
    queued: Mutex<VecDeque<StreamScript>>,
    pub fail_enumeration: AtomicBool,
    pub stats: Arc<BackendStats>,
}

impl SyntheticBackend {
    pub fn new(devices: Vec<AudioDevice>, default_script: StreamScript) -> Arc<Self> {
        Arc::new(Self {
            devices,
            default_script,
            queued: Mutex::new(VecDeque::new()),
            fail_enumeration: AtomicBool::new(false),
            stats: Arc::new(BackendStats::default()),
        })
    }

    /// Script for the next opened stream only.
    pub fn queue(&self, script: StreamScript) {
        self.queued.lock().push_back(script);
    }

    pub fn delivered(&self) -> usize {
        self.stats.delivered.load(Ordering::SeqCst)
    }
}

pub(crate) fn device(index: usize, name: &str, channels: u16) -> AudioDevice {
    AudioDevice {
        index,
        name: name.into(),
        max_input_channels: channels,
        default_sample_rate: 44100,
    }
}

impl AudioBackend for SyntheticBackend {
    fn list_input_devices(&self) -> Result<Vec<AudioDevice>, RecorderError> {
        if self.fail_enumeration.load(Ordering::SeqCst) {
            return Err(RecorderError::DeviceEnumeration("synthetic host unavailable".into()));
        }
        Ok(self.devices.clone())
    }

    fn open_input(
        &self,
        device: &AudioDevice,
        spec: &StreamSpec,
        stop: StopToken,
    ) -> Result<Box<dyn InputStream>, RecorderError> {
        let script = self.queued.lock().pop_front().unwrap_or_else(|| self.default_script.clone());
        if script.fail_open {
            return Err(RecorderError::StreamOpen {
                device: device.name.clone(),
                reason: "device busy".into(),
            });
        }

        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        let now = self.stats.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_open.fetch_max(now, Ordering::SeqCst);
        self.stats.delivered.store(0, Ordering::SeqCst);

        Ok(Box::new(SyntheticStream {
            spec: *spec,
            script,
            stop,
            delivered: 0,
            closed: false,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct SyntheticStream {
    spec: StreamSpec,
    script: StreamScript,
    stop: StopToken,
    delivered: usize,
    closed: bool,
    stats: Arc<BackendStats>,
}

impl InputStream for SyntheticStream {
    fn read_block(&mut self) -> Result<Option<Vec<u8>>, RecorderError> {
        if self.script.fail_after.is_some_and(|n| self.delivered >= n) {
            return Err(RecorderError::ReadFailure("synthetic device unplugged".into()));
        }
        if self.script.blocks.is_some_and(|n| self.delivered >= n) {
            while !self.stop.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            return Ok(None);
        }
        if !self.script.block_delay.is_zero() {
            thread::sleep(self.script.block_delay);
        }

        self.delivered += 1;
        self.stats.delivered.fetch_add(1, Ordering::SeqCst);
        let samples = vec![self.script.sample; self.spec.block_samples()];
        Ok(Some(wav_format::encode_i16_le(&samples)))
    }

    fn close(&mut self) -> Result<(), RecorderError> {
        if !self.closed {
            self.closed = true;
            self.stats.open_now.fetch_sub(1, Ordering::SeqCst);
            self.stats.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    State(RecorderState),
    Status(StatusBroadcast),
    TakeFinished(TakeResult),
    Error(RecorderError),
    Warning(RecorderError),
}

/// Delegate that records every notification in order.
#[derive(Debug, Default)]
pub(crate) struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn statuses(&self) -> Vec<StatusBroadcast> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn takes(&self) -> Vec<TakeResult> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::TakeFinished(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<RecorderError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(r) => Some(r),
                _ => None,
            })
            .collect()
    }
}

impl RecorderDelegate for EventLog {
    fn on_state_changed(&self, state: RecorderState) {
        self.events.lock().push(Event::State(state));
    }

    fn on_status(&self, status: StatusBroadcast) {
        self.events.lock().push(Event::Status(status));
    }

    fn on_take_finished(&self, result: &TakeResult) {
        self.events.lock().push(Event::TakeFinished(result.clone()));
    }

    fn on_error(&self, error: &RecorderError) {
        self.events.lock().push(Event::Error(error.clone()));
    }

    fn on_warning(&self, warning: &RecorderError) {
        self.events.lock().push(Event::Warning(warning.clone()));
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}
