//! # recorder-cpal
//!
//! cpal backend for the multi-track recorder.
//!
//! Provides:
//! - `CpalBackend`: the [`AudioBackend`](recorder_core::AudioBackend) over a cpal host
//! - `device_enumerator`: input device snapshots and lookup
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use recorder_core::{Recorder, RecorderOptions};
//! use recorder_cpal::CpalBackend;
//!
//! let mut recorder = Recorder::new(Arc::new(CpalBackend::new()), RecorderOptions::default())?;
//! let device = recorder.input_devices().into_iter().next().unwrap();
//! recorder.select_device(device)?;
//! ```

pub mod cpal_input;
pub mod device_enumerator;

pub use cpal_input::{CpalBackend, CpalInputStream};
