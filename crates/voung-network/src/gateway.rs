//! Outbound command delivery to connected boards.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use voung_core::DeviceId;
use voung_core::constants::DEFAULT_SEND_TIMEOUT_MS;
use voung_protocol::{OutboundCommand, frame};

use crate::registry::DeviceRegistry;
use crate::session::SessionError;

/// Send timeout used when the caller has no stronger requirement.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS);

/// Result of handing a command to a board's session.
///
/// `Delivered` means the frame was written to the socket, not that the
/// board acted on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    NotConnected,
    Timeout,
    WriteError(String),
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered)
    }
}

impl fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendOutcome::Delivered => write!(f, "delivered"),
            SendOutcome::NotConnected => write!(f, "device not connected"),
            SendOutcome::Timeout => write!(f, "send timed out"),
            SendOutcome::WriteError(e) => write!(f, "write failed: {e}"),
        }
    }
}

/// Sends frames to boards by device identifier.
///
/// Cheap to clone; every clone shares the same registry.
#[derive(Debug, Clone)]
pub struct CommandGateway {
    registry: Arc<DeviceRegistry>,
}

impl CommandGateway {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }

    /// Frame `payload` under `command` and write it to the board's session.
    ///
    /// The frame carries the board address learned at registration. When
    /// the write does not finish within `timeout` the caller gets
    /// [`SendOutcome::Timeout`], but the frame still goes out whole behind
    /// it and the session stays open.
    pub async fn send_command(
        &self,
        device_id: &DeviceId,
        command: impl Into<u8>,
        payload: &[u8],
        timeout: Duration,
    ) -> SendOutcome {
        let command = command.into();

        let Some(session) = self.registry.lookup(device_id) else {
            debug!(device_id = %device_id, command = %format!("0x{command:02X}"), "Device not connected");
            return SendOutcome::NotConnected;
        };

        let board_address = session.board_address().unwrap_or_default();
        let bytes = match frame::encode(board_address, command, payload) {
            Ok(bytes) => bytes,
            Err(e) => return SendOutcome::WriteError(e.to_string()),
        };

        let len = bytes.len();
        match tokio::time::timeout(timeout, session.send(bytes)).await {
            Ok(Ok(())) => {
                debug!(
                    device_id = %device_id,
                    command = %format!("0x{command:02X}"),
                    bytes = len,
                    "Command sent"
                );
                SendOutcome::Delivered
            }
            Ok(Err(SessionError::Closed)) => SendOutcome::NotConnected,
            Ok(Err(e)) => {
                warn!(device_id = %device_id, error = %e, "Command write failed");
                SendOutcome::WriteError(e.to_string())
            }
            Err(_) => {
                warn!(device_id = %device_id, timeout_ms = timeout.as_millis() as u64, "Command send timed out");
                SendOutcome::Timeout
            }
        }
    }

    /// Send a typed outbound command.
    pub async fn send(
        &self,
        device_id: &DeviceId,
        command: &OutboundCommand,
        timeout: Duration,
    ) -> SendOutcome {
        match command.payload() {
            Ok(payload) => {
                self.send_command(device_id, command.command(), &payload, timeout)
                    .await
            }
            Err(e) => SendOutcome::WriteError(e.to_string()),
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }
}
