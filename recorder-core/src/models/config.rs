use std::net::SocketAddr;

use super::audio_models::DEFAULT_BLOCK_FRAMES;

/// Default OSC listen port for inbound `/start_recording` / `/stop_recording`.
pub const DEFAULT_REMOTE_PORT: u16 = 4565;

/// Default port `/recorder_status` is sent to.
pub const DEFAULT_STATUS_PORT: u16 = 4566;

/// Engine options for a [`Recorder`](crate::session::recorder::Recorder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderOptions {
    /// Frames per channel read per loop iteration (default: 1024).
    pub block_frames: usize,

    /// Write a `<name>_<take>.json` sidecar next to the track files (default: true).
    pub write_metadata: bool,

    /// Custom name used until the user enters one (default: "Recording").
    pub default_custom_name: String,
}

impl RecorderOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.block_frames == 0 {
            return Err("block size must be at least one frame".into());
        }
        Ok(())
    }
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            block_frames: DEFAULT_BLOCK_FRAMES,
            write_metadata: true,
            default_custom_name: "Recording".into(),
        }
    }
}

/// Network endpoints of the remote-control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Address the command socket binds to.
    pub listen_addr: SocketAddr,

    /// Where `/recorder_status` datagrams are sent.
    pub status_target: SocketAddr,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_REMOTE_PORT)),
            status_target: SocketAddr::from(([127, 0, 0, 1], DEFAULT_STATUS_PORT)),
        }
    }
}
