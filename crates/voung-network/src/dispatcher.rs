//! Routing of inbound board frames.
//!
//! | Code | Command        | Action                                   | Reply        |
//! |------|----------------|------------------------------------------|--------------|
//! | 0x80 | HEARTBEAT      | refresh `last_heartbeat` when identified | `00`         |
//! | 0x81 | REGISTER       | upsert board, bind session in registry   | `00` / `FF`  |
//! | 0x85 | STATUS_CHANGE  | update stored lock status                | none         |
//! | 0xD0 | SIGNAL_QUALITY | log                                      | none         |
//! | 0x82-0x84, 0x86-0x89 | board answers to server commands | log | none  |
//!
//! Unknown command codes are logged and ignored. Storage failures never
//! close the session.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use voung_core::constants::{STATUS_FAILURE, STATUS_OK};
use voung_protocol::{CommandCode, Frame, RegisterRequest, StatusChange, heartbeat_device_id};
use voung_storage::{BoardRegistration, BoardStore};

use crate::registry::DeviceRegistry;
use crate::session::SessionHandle;

pub struct CommandDispatcher<S> {
    store: Arc<S>,
    registry: Arc<DeviceRegistry>,
}

impl<S: BoardStore> CommandDispatcher<S> {
    pub fn new(store: Arc<S>, registry: Arc<DeviceRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> Arc<S> {
        self.store.clone()
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Handle one frame received on `session`, returning the reply to send.
    pub async fn dispatch(&self, session: &Arc<SessionHandle>, frame: &Frame) -> Option<Frame> {
        let Some(code) = frame.command_code() else {
            warn!(
                session = %session.id(),
                command = %format!("0x{:02X}", frame.command),
                board_address = frame.board_address,
                "Unknown command ignored"
            );
            return None;
        };

        match code {
            CommandCode::Heartbeat => Some(self.heartbeat(session, frame).await),
            CommandCode::Register => Some(self.register(session, frame).await),
            CommandCode::StatusChange => {
                self.status_change(frame).await;
                None
            }
            CommandCode::SignalQuality => {
                debug!(
                    session = %session.id(),
                    board_address = frame.board_address,
                    payload = ?frame.payload.as_ref(),
                    "Signal quality report"
                );
                None
            }
            CommandCode::OpenSingle
            | CommandCode::ReadStatus
            | CommandCode::ReadAllStatus
            | CommandCode::OpenAll
            | CommandCode::OpenMultiple
            | CommandCode::KeepOpen
            | CommandCode::CloseChannel => {
                info!(
                    session = %session.id(),
                    device_id = ?session.device_id(),
                    command = %code,
                    payload = ?frame.payload.as_ref(),
                    "Board response"
                );
                None
            }
        }
    }

    async fn heartbeat(&self, session: &SessionHandle, frame: &Frame) -> Frame {
        if let Some(device_id) = heartbeat_device_id(&frame.payload) {
            match self.store.record_heartbeat(&device_id).await {
                Ok(true) => debug!(device_id = %device_id, "Heartbeat recorded"),
                Ok(false) => debug!(device_id = %device_id, "Heartbeat from unknown device"),
                Err(e) => warn!(device_id = %device_id, error = %e, "Failed to record heartbeat"),
            }
        } else {
            debug!(session = %session.id(), board_address = frame.board_address, "Heartbeat");
        }

        status_reply(frame, STATUS_OK)
    }

    async fn register(&self, session: &Arc<SessionHandle>, frame: &Frame) -> Frame {
        let request = match RegisterRequest::parse(&frame.payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(session = %session.id(), peer = %session.peer(), error = %e, "Invalid registration");
                return status_reply(frame, STATUS_FAILURE);
            }
        };

        let registration = BoardRegistration::new(request.device_id.clone(), frame.board_address)
            .device_type(request.device_type.clone())
            .ccid(request.ccid.clone())
            .ip_address(session.peer().ip().to_string());

        match self.store.upsert_board(&registration).await {
            Ok(upsert) if upsert.created => {
                let board = &upsert.board;
                match self
                    .store
                    .create_channels_for_board(board.id, board.channel_count())
                    .await
                {
                    Ok(created) => {
                        info!(device_id = %request.device_id, channels = created, "New board stored")
                    }
                    Err(e) => {
                        error!(device_id = %request.device_id, error = %e, "Failed to create lock channels")
                    }
                }
            }
            Ok(_) => debug!(device_id = %request.device_id, "Board record refreshed"),
            Err(e) => {
                error!(device_id = %request.device_id, error = %e, "Failed to store board registration")
            }
        }

        if session.is_closed() {
            debug!(device_id = %request.device_id, session = %session.id(), "Session closed during registration");
            return status_reply(frame, STATUS_OK);
        }

        session.mark_registered(request.device_id.clone(), frame.board_address);
        self.registry
            .register(request.device_id.clone(), session.clone());

        info!(
            device_id = %request.device_id,
            device_type = %request.device_type,
            ccid = %request.ccid,
            board_address = frame.board_address,
            peer = %session.peer(),
            "Device registered"
        );

        status_reply(frame, STATUS_OK)
    }

    async fn status_change(&self, frame: &Frame) {
        let change = match StatusChange::parse(&frame.payload) {
            Ok(change) => change,
            Err(e) => {
                warn!(board_address = frame.board_address, error = %e, "Invalid status change");
                return;
            }
        };

        let status = match change.lock_status() {
            Ok(status) => status,
            Err(e) => {
                warn!(board_address = frame.board_address, channel = change.channel, error = %e, "Invalid status change");
                return;
            }
        };

        let board = match self.store.find_board_by_address(frame.board_address).await {
            Ok(Some(board)) => board,
            Ok(None) => {
                debug!(board_address = frame.board_address, "Status change from unknown board");
                return;
            }
            Err(e) => {
                warn!(board_address = frame.board_address, error = %e, "Board lookup failed");
                return;
            }
        };

        match self
            .store
            .update_channel_status(board.id, change.channel, status)
            .await
        {
            Ok(true) => info!(
                device_id = %board.device_id,
                channel = change.channel,
                status = %status,
                "Lock status changed"
            ),
            Ok(false) => debug!(
                device_id = %board.device_id,
                channel = change.channel,
                "Status change for unknown channel"
            ),
            Err(e) => warn!(device_id = %board.device_id, error = %e, "Failed to store lock status"),
        }
    }
}

fn status_reply(request: &Frame, status: u8) -> Frame {
    Frame {
        board_address: request.board_address,
        command: request.command,
        payload: Bytes::copy_from_slice(&[status]),
    }
}
