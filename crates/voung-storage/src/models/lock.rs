use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use voung_core::{Error, LockStatus};

/// One lock channel on a board.
///
/// Channels are numbered 1..=total_channels and created closed when the
/// board first registers.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lock {
    pub id: i64,
    pub board_id: i64,
    pub channel: i32,

    /// Display name, `"Lock {channel}"` by default
    pub name: String,

    /// 0 = open, 1 = closed
    pub status: i32,

    pub last_status_change: DateTime<Utc>,
}

impl Lock {
    pub fn lock_status(&self) -> voung_core::Result<LockStatus> {
        match self.status {
            0 => Ok(LockStatus::Open),
            1 => Ok(LockStatus::Closed),
            other => Err(Error::InvalidLockStatus(other as u8)),
        }
    }

    pub fn default_name(channel: u8) -> String {
        format!("Lock {channel}")
    }
}
