use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::models::error::RecorderError;
use crate::models::state::StatusBroadcast;
use crate::remote::osc;
use crate::remote::{status_message, RemoteCommand};
use crate::session::controller::RecorderHandle;
use crate::traits::recorder_delegate::RecorderDelegate;

/// Receiver for decoded remote commands. Called on the server thread.
pub type CommandCallback = Arc<dyn Fn(RemoteCommand) + Send + Sync>;

/// How long a receive may block before the stop flag is checked again.
const READ_TIMEOUT: Duration = Duration::from_millis(200);

const MAX_DATAGRAM: usize = 65_536;

/// Forward remote commands onto a controller queue.
pub fn forward_to(handle: RecorderHandle) -> CommandCallback {
    Arc::new(move |command| {
        if let Err(e) = handle.send(command.into()) {
            log::warn!("Dropping remote {:?}: {}", command, e);
        }
    })
}

/// UDP listener for `/start_recording` and `/stop_recording`.
///
/// Never touches recorder state itself; every command goes through the
/// callback. Unknown addresses and malformed datagrams are logged and
/// dropped. Commands are fire-and-forget: nothing is sent back.
pub struct RemoteControlServer {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RemoteControlServer {
    pub fn start(listen_addr: SocketAddr, on_command: CommandCallback) -> Result<Self, RecorderError> {
        let socket = UdpSocket::bind(listen_addr)
            .map_err(|e| RecorderError::Remote(format!("failed to bind {}: {}", listen_addr, e)))?;
        socket
            .set_read_timeout(Some(READ_TIMEOUT))
            .map_err(|e| RecorderError::Remote(format!("failed to set read timeout: {}", e)))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| RecorderError::Remote(format!("failed to query local address: {}", e)))?;

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("remote-control".into())
            .spawn(move || receive_loop(socket, thread_running, on_command))
            .map_err(|e| RecorderError::Remote(format!("failed to spawn remote-control thread: {}", e)))?;

        log::info!("Remote control listening on {}", local_addr);
        Ok(Self {
            local_addr,
            running,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            log::info!("Remote control on {} stopped", self.local_addr);
        }
    }
}

impl Drop for RemoteControlServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop(socket: UdpSocket, running: Arc<AtomicBool>, on_command: CommandCallback) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    while running.load(Ordering::SeqCst) {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => continue,
            Err(e) => {
                log::warn!("Remote control receive failed: {}", e);
                continue;
            }
        };
        dispatch_datagram(&buf[..len], peer, &on_command);
    }
}

fn dispatch_datagram(bytes: &[u8], peer: SocketAddr, on_command: &CommandCallback) {
    let packet = match osc::decode(bytes) {
        Ok(packet) => packet,
        Err(e) => {
            log::warn!("Ignoring malformed datagram from {}: {}", peer, e);
            return;
        }
    };
    for message in packet.into_messages() {
        match RemoteCommand::from_message(&message) {
            Some(command) => {
                log::info!("Remote {:?} from {}", command, peer);
                on_command(command);
            }
            None => log::debug!("Ignoring OSC address {} from {}", message.address, peer),
        }
    }
}

/// Sends `/recorder_status` datagrams to one target.
///
/// Installed as a recorder delegate so every start, stop and the startup
/// announcement reach the target.
pub struct StatusBroadcaster {
    socket: UdpSocket,
    target: SocketAddr,
}

impl StatusBroadcaster {
    pub fn new(target: SocketAddr) -> Result<Self, RecorderError> {
        let bind_addr: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind_addr)
            .map_err(|e| RecorderError::Remote(format!("failed to bind status socket: {}", e)))?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn send(&self, status: StatusBroadcast) -> Result<(), RecorderError> {
        let bytes = osc::encode(&status_message(status).into());
        self.socket
            .send_to(&bytes, self.target)
            .map_err(|e| RecorderError::Remote(format!("failed to send status to {}: {}", self.target, e)))?;
        log::debug!("Status '{}' sent to {}", status.as_str(), self.target);
        Ok(())
    }
}

impl RecorderDelegate for StatusBroadcaster {
    fn on_status(&self, status: StatusBroadcast) {
        if let Err(e) = self.send(status) {
            log::warn!("{}", e);
        }
    }
}
