//! cpal-backed [`AudioBackend`].
//!
//! cpal delivers audio on its own callback thread. The callback converts each
//! buffer to i16 and appends it to a shared ring buffer; the capture loop
//! pulls fixed-size blocks out of it.
//!
//! ```text
//! [cpal callback] → to i16 → [RingBuffer<i16>] → read_block → [capture loop]
//! ```

use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, FromSample, SampleFormat, SampleRate, SizedSample, StreamConfig};
use parking_lot::{Condvar, Mutex};

use recorder_core::models::audio_models::{AudioDevice, StreamSpec};
use recorder_core::models::error::RecorderError;
use recorder_core::processing::ring_buffer::RingBuffer;
use recorder_core::processing::wav_format;
use recorder_core::session::stop_token::StopToken;
use recorder_core::traits::audio_backend::{AudioBackend, InputStream};

use crate::device_enumerator;

/// Seconds of audio buffered between the callback and the capture loop.
const BUFFER_SECONDS: usize = 2;

/// Upper bound on one wait before the stop token is checked again.
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Audio backend over one cpal host.
pub struct CpalBackend {
    host_id: cpal::HostId,
}

impl CpalBackend {
    /// Backend over the platform's default host.
    pub fn new() -> Self {
        Self {
            host_id: cpal::default_host().id(),
        }
    }

    pub fn with_host(host_id: cpal::HostId) -> Self {
        Self { host_id }
    }

    fn host(&self) -> Result<cpal::Host, RecorderError> {
        cpal::host_from_id(self.host_id)
            .map_err(|e| RecorderError::DeviceEnumeration(format!("{:?}: {}", self.host_id, e)))
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn list_input_devices(&self) -> Result<Vec<AudioDevice>, RecorderError> {
        device_enumerator::list_input_devices(&self.host()?)
    }

    fn open_input(
        &self,
        device: &AudioDevice,
        spec: &StreamSpec,
        stop: StopToken,
    ) -> Result<Box<dyn InputStream>, RecorderError> {
        let open_error = |reason: String| RecorderError::StreamOpen {
            device: device.name.clone(),
            reason,
        };

        let cpal_device = device_enumerator::find_device(&self.host()?, device)?;
        let sample_format = cpal_device
            .default_input_config()
            .map_err(|e| open_error(e.to_string()))?
            .sample_format();
        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: SampleRate(spec.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let capacity = (spec.sample_rate as usize * spec.channels as usize * BUFFER_SECONDS).max(spec.block_samples() * 4);
        let shared = Arc::new(Shared {
            pending: Mutex::new(Pending {
                samples: RingBuffer::new(capacity),
                error: None,
            }),
            ready: Condvar::new(),
        });

        let stream = match sample_format {
            SampleFormat::I8 => build_stream::<i8>(&cpal_device, &config, &shared),
            SampleFormat::I16 => build_stream::<i16>(&cpal_device, &config, &shared),
            SampleFormat::I32 => build_stream::<i32>(&cpal_device, &config, &shared),
            SampleFormat::U8 => build_stream::<u8>(&cpal_device, &config, &shared),
            SampleFormat::U16 => build_stream::<u16>(&cpal_device, &config, &shared),
            SampleFormat::U32 => build_stream::<u32>(&cpal_device, &config, &shared),
            SampleFormat::F32 => build_stream::<f32>(&cpal_device, &config, &shared),
            SampleFormat::F64 => build_stream::<f64>(&cpal_device, &config, &shared),
            other => return Err(open_error(format!("unsupported sample format {:?}", other))),
        }
        .map_err(|e| open_error(e.to_string()))?;
        stream.play().map_err(|e| open_error(e.to_string()))?;

        log::debug!(
            "cpal stream on '{}': {:?} → i16, {} ch @ {} Hz",
            device.name,
            sample_format,
            spec.channels,
            spec.sample_rate
        );

        Ok(Box::new(CpalInputStream {
            stream: Some(stream),
            shared,
            block_samples: spec.block_samples(),
            stop,
            device_name: device.name.clone(),
        }))
    }
}

struct Pending {
    samples: RingBuffer<i16>,
    /// Set by the error callback; surfaces as a read failure.
    error: Option<String>,
}

struct Shared {
    pending: Mutex<Pending>,
    ready: Condvar,
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    shared: &Arc<Shared>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + Send + 'static,
    i16: FromSample<T>,
{
    let data_shared = Arc::clone(shared);
    let error_shared = Arc::clone(shared);

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let converted: Vec<i16> = data.iter().map(|&s| s.to_sample::<i16>()).collect();
            data_shared.pending.lock().samples.write(&converted);
            data_shared.ready.notify_one();
        },
        move |err| {
            log::error!("cpal stream error: {}", err);
            error_shared.pending.lock().error = Some(err.to_string());
            error_shared.ready.notify_one();
        },
        None,
    )
}

/// Blocking reader over a running cpal input stream.
///
/// Not `Send`: lives on the capture thread that opened it.
pub struct CpalInputStream {
    stream: Option<cpal::Stream>,
    shared: Arc<Shared>,
    block_samples: usize,
    stop: StopToken,
    device_name: String,
}

impl InputStream for CpalInputStream {
    fn read_block(&mut self) -> Result<Option<Vec<u8>>, RecorderError> {
        if self.stream.is_none() {
            return Err(RecorderError::ReadFailure(format!("stream on '{}' is closed", self.device_name)));
        }

        let mut pending = self.shared.pending.lock();
        loop {
            if let Some(error) = pending.error.take() {
                return Err(RecorderError::ReadFailure(format!("'{}': {}", self.device_name, error)));
            }
            if pending.samples.count() >= self.block_samples {
                break;
            }
            if self.stop.is_cancelled() {
                return Ok(None);
            }
            self.shared.ready.wait_for(&mut pending, WAIT_SLICE);
        }

        let dropped = pending.samples.take_dropped();
        let samples = pending.samples.read(self.block_samples);
        drop(pending);

        if dropped > 0 {
            log::warn!("Input overflow on '{}': {} samples dropped", self.device_name, dropped);
        }
        Ok(Some(wav_format::encode_i16_le(&samples)))
    }

    fn close(&mut self) -> Result<(), RecorderError> {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("Pausing stream on '{}' failed: {}", self.device_name, e);
            }
            drop(stream);
            log::debug!("cpal stream on '{}' released", self.device_name);
        }
        Ok(())
    }
}

impl Drop for CpalInputStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
