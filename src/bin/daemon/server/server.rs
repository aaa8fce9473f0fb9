use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_std::channel::Receiver;
use futures::FutureExt;
use tracing::{error, info, warn};
use zeromq::prelude::*;
use zeromq::{RepSocket, ZmqMessage};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::command_registry::CommandRegistry;
use super::commands::init_commands;
use super::response_handler::{ERROR_PREFIX, format_response};
use crate::screen::OutputSwitcher;

/// Maximum message size (1MB)
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
/// Maximum retry attempts for sending replies
const MAX_SEND_RETRIES: usize = 3;

/// Extract command string from a raw request frame with validation
pub fn extract_command(frame: &[u8]) -> Result<String, String> {
    if frame.len() > MAX_MESSAGE_SIZE {
        warn!("Message too large: {} bytes", frame.len());
        return Err(format!(
            "Message too large: {} bytes (max: {})",
            frame.len(),
            MAX_MESSAGE_SIZE
        ));
    }

    String::from_utf8(frame.to_vec()).map_err(|e| format!("Invalid UTF-8 message: {}", e))
}

/// Runs one request against the switcher and formats the reply
pub fn process_command(registry: &CommandRegistry, switcher: &mut OutputSwitcher, frame: &[u8]) -> String {
    match extract_command(frame) {
        Ok(cmdline) => format_response(registry.handle(switcher, &cmdline)),
        Err(e) => format!("{}{}", ERROR_PREFIX, e),
    }
}

/// Main daemon server structure that handles ZeroMQ communication
pub struct DaemonServer {
    /// ZeroMQ reply socket for communication with clients
    socket: RepSocket,
    socket_path: PathBuf,
    registry: CommandRegistry,
}

impl DaemonServer {
    /// Binds the reply socket at `socket_path`, replacing a stale one
    pub async fn bind(socket_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let _ = fs::remove_file(socket_path);

        let mut socket = RepSocket::new();
        socket.bind(&format!("ipc://{}", socket_path.display())).await?;

        // Set appropriate permissions for the socket (Unix only)
        #[cfg(unix)]
        {
            if let Ok(metadata) = fs::metadata(socket_path) {
                let mut perms = metadata.permissions();
                perms.set_mode(0o660); // rw-rw----
                let _ = fs::set_permissions(socket_path, perms);
            }
        }

        info!("Daemon running on ipc://{}", socket_path.display());

        Ok(DaemonServer {
            socket,
            socket_path: socket_path.to_path_buf(),
            registry: init_commands(),
        })
    }

    /// Shutdown the daemon server, removing its socket
    pub fn shutdown(self) {
        info!("Shutting down daemon server");
        if let Err(e) = fs::remove_file(&self.socket_path) {
            warn!("Could not remove {}: {}", self.socket_path.display(), e);
        }
    }

    /// Run the daemon server loop until a shutdown signal arrives.
    /// Requests are handled one at a time.
    pub async fn run(
        &mut self,
        switcher: &mut OutputSwitcher,
        shutdown_rx: Receiver<()>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            futures::select! {
                msg = self.socket.recv().fuse() => {
                    match msg {
                        Ok(cmdline) => {
                            if let Err(e) = self.process_message(switcher, cmdline).await {
                                error!("Error processing message: {:?}", e);
                            }
                        }
                        Err(e) => {
                            error!("Error receiving message: {:?}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv().fuse() => {
                    info!("Shutdown signal received, stopping server loop");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn process_message(
        &mut self,
        switcher: &mut OutputSwitcher,
        cmdline: ZmqMessage,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let reply = match cmdline.get(0) {
            Some(frame) => process_command(&self.registry, switcher, frame),
            None => format!("{}Received empty message", ERROR_PREFIX),
        };
        self.send_reply(reply).await
    }

    /// Send a reply to the client with retry logic
    async fn send_reply(&mut self, reply: String) -> Result<(), Box<dyn std::error::Error>> {
        let mut attempt = 0;
        loop {
            match self.socket.send(ZmqMessage::from(reply.clone())).await {
                Ok(_) => {
                    if attempt > 0 {
                        info!("Reply sent successfully on attempt {}", attempt + 1);
                    }
                    return Ok(());
                }
                Err(e) if attempt < MAX_SEND_RETRIES - 1 => {
                    warn!("Failed to send reply (attempt {}): {:?}", attempt + 1, e);
                    async_std::task::sleep(Duration::from_millis(100 * (attempt as u64 + 1))).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("Failed to send reply after {} attempts: {:?}", MAX_SEND_RETRIES, e);
                    return Err(Box::new(e));
                }
            }
        }
    }
}
