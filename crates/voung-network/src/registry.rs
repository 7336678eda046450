//! Registry of live board sessions keyed by device identifier.
//!
//! At most one session is registered per device. Registering a device that
//! already has a different live session closes the old one; a session that
//! re-registers under a new identifier loses its old entry.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;
use voung_core::DeviceId;

use crate::session::SessionHandle;

/// Snapshot of one registered connection
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub device_id: DeviceId,
    pub session_id: Uuid,
    pub remote_addr: SocketAddr,
    pub board_address: Option<u8>,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub uptime: Duration,
}

impl ConnectionInfo {
    fn from_session(device_id: &DeviceId, session: &SessionHandle) -> Self {
        let connected_at = session.created_at();
        Self {
            device_id: device_id.clone(),
            session_id: session.id(),
            remote_addr: session.peer(),
            board_address: session.board_address(),
            connected_at,
            last_activity: session.last_activity(),
            uptime: (Utc::now() - connected_at).to_std().unwrap_or_default(),
        }
    }
}

/// Map from device identifier to its current session.
///
/// Every operation holds the inner lock only for the duration of a map
/// update, never across an `.await`.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    entries: Mutex<HashMap<DeviceId, Arc<SessionHandle>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `device_id` to `session`.
    ///
    /// Returns the previously registered session when one was replaced; that
    /// session has already been closed. A session that is already closed is
    /// refused and leaves any live entry in place.
    pub fn register(
        &self,
        device_id: DeviceId,
        session: Arc<SessionHandle>,
    ) -> Option<Arc<SessionHandle>> {
        let mut entries = self.entries();

        if session.is_closed() {
            debug!(device_id = %device_id, session = %session.id(), "Refusing registration from closed session");
            return None;
        }

        entries.retain(|id, existing| *id == device_id || existing.id() != session.id());

        let previous = entries.insert(device_id.clone(), session.clone())?;
        if previous.id() == session.id() {
            debug!(device_id = %device_id, session = %session.id(), "Device re-registered on same session");
            return None;
        }

        previous.close();
        info!(
            device_id = %device_id,
            old_session = %previous.id(),
            old_peer = %previous.peer(),
            new_session = %session.id(),
            new_peer = %session.peer(),
            "Replaced existing session for device"
        );
        Some(previous)
    }

    /// Remove the entry owned by `session`, if it still owns one.
    ///
    /// Returns the device identifier that was removed. A session that was
    /// superseded by a newer registration yields `None`.
    pub fn unregister_by_session(&self, session: &SessionHandle) -> Option<DeviceId> {
        let mut entries = self.entries();
        let device_id = session.device_id()?;

        match entries.get(&device_id) {
            Some(current) if current.id() == session.id() => {
                entries.remove(&device_id);
                Some(device_id)
            }
            _ => None,
        }
    }

    pub fn lookup(&self, device_id: &DeviceId) -> Option<Arc<SessionHandle>> {
        self.entries().get(device_id).cloned()
    }

    pub fn is_connected(&self, device_id: &DeviceId) -> bool {
        self.entries().contains_key(device_id)
    }

    pub fn connected_devices(&self) -> Vec<DeviceId> {
        let mut devices: Vec<DeviceId> = self.entries().keys().cloned().collect();
        devices.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        devices
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn connection_info(&self, device_id: &DeviceId) -> Option<ConnectionInfo> {
        self.entries()
            .get(device_id)
            .map(|session| ConnectionInfo::from_session(device_id, session))
    }

    pub fn all_connections_info(&self) -> Vec<ConnectionInfo> {
        let mut infos: Vec<ConnectionInfo> = self
            .entries()
            .iter()
            .map(|(id, session)| ConnectionInfo::from_session(id, session))
            .collect();
        infos.sort_by(|a, b| a.device_id.as_str().cmp(b.device_id.as_str()));
        infos
    }

    /// Close every registered session. Entries are removed as each
    /// session tears down.
    pub fn close_all(&self) -> usize {
        let entries = self.entries();
        for session in entries.values() {
            session.close();
        }
        entries.len()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<DeviceId, Arc<SessionHandle>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
