use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use voung_core::{DeviceId, constants::DEFAULT_TOTAL_CHANNELS};

/// Board entity: one lock-controller board known to the server.
///
/// A board is identified two ways. `device_id` is the stable name it
/// announces on REGISTER and HEARTBEAT; `board_address` is the numeric
/// address carried in every frame header and is what STATUS_CHANGE frames
/// are matched against. Registration refreshes both.
///
/// # Database Schema
///
/// Maps to the `boards` table:
/// - `device_id` is unique (1-8 ASCII chars)
/// - `board_address` is indexed but not unique
/// - `ccid` is at most 20 chars and may be empty
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    /// Auto-increment primary key
    pub id: i64,

    /// Device identifier announced by the board
    pub device_id: String,

    /// Device type as a hex string of the two REGISTER bytes (e.g. "0025")
    pub device_type: String,

    /// SIM CCID, empty when the board did not send one
    pub ccid: String,

    /// Address used in frame headers
    pub board_address: i32,

    /// Number of lock channels on the board
    pub total_channels: i32,

    /// Whether the board currently holds a registered connection
    pub is_online: bool,

    /// Last REGISTER or HEARTBEAT seen from the board
    pub last_heartbeat: Option<DateTime<Utc>>,

    /// Peer IP of the last registration
    pub ip_address: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    /// Channel count clamped to the range a frame can address.
    pub fn channel_count(&self) -> u8 {
        u8::try_from(self.total_channels).unwrap_or(u8::MAX)
    }
}

/// Fields learned from a REGISTER frame, used to create or refresh a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRegistration {
    pub device_id: DeviceId,
    pub device_type: String,
    pub ccid: String,
    pub board_address: u8,
    pub ip_address: Option<String>,

    /// Channel count for a newly created board; existing boards keep theirs.
    pub total_channels: u8,
}

impl BoardRegistration {
    pub fn new(device_id: DeviceId, board_address: u8) -> Self {
        Self {
            device_id,
            device_type: voung_core::constants::DEFAULT_DEVICE_TYPE.to_string(),
            ccid: String::new(),
            board_address,
            ip_address: None,
            total_channels: DEFAULT_TOTAL_CHANNELS,
        }
    }

    pub fn device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    pub fn ccid(mut self, ccid: impl Into<String>) -> Self {
        self.ccid = ccid.into();
        self
    }

    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn total_channels(mut self, total: u8) -> Self {
        self.total_channels = total;
        self
    }
}

/// Result of [`BoardStore::upsert_board`](crate::BoardStore::upsert_board).
#[derive(Debug, Clone)]
pub struct BoardUpsert {
    pub board: Board,

    /// `true` when the board row did not exist before.
    pub created: bool,
}
