//! OSC-over-UDP remote control surface.
//!
//! Inbound `/start_recording` and `/stop_recording` become [`RemoteCommand`]s;
//! outbound `/recorder_status` carries `"recording"` or `"idle"`.

pub mod osc;
pub mod server;

use crate::models::state::StatusBroadcast;
use crate::session::controller::{CommandSource, ControlMessage};

use self::osc::{OscArg, OscMessage};

pub const START_ADDRESS: &str = "/start_recording";
pub const STOP_ADDRESS: &str = "/stop_recording";
pub const STATUS_ADDRESS: &str = "/recorder_status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    Start,
    Stop,
}

impl RemoteCommand {
    /// Map an inbound message by exact address. Arguments are ignored.
    pub fn from_message(message: &OscMessage) -> Option<Self> {
        match message.address.as_str() {
            START_ADDRESS => Some(Self::Start),
            STOP_ADDRESS => Some(Self::Stop),
            _ => None,
        }
    }

    pub fn address(&self) -> &'static str {
        match self {
            Self::Start => START_ADDRESS,
            Self::Stop => STOP_ADDRESS,
        }
    }

    pub fn to_message(self) -> OscMessage {
        OscMessage::new(self.address(), Vec::new())
    }
}

impl From<RemoteCommand> for ControlMessage {
    fn from(command: RemoteCommand) -> Self {
        match command {
            RemoteCommand::Start => ControlMessage::Start(CommandSource::Remote),
            RemoteCommand::Stop => ControlMessage::Stop(CommandSource::Remote),
        }
    }
}

pub fn status_message(status: StatusBroadcast) -> OscMessage {
    OscMessage::new(STATUS_ADDRESS, vec![OscArg::String(status.as_str().into())])
}
