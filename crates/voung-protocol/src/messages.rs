//! Typed views over the payloads boards send to the server.

use voung_core::{
    DeviceId, Error, LockStatus, Result,
    constants::{
        DEVICE_ID_LEN, DEVICE_TYPE_LEN, MAX_CCID_LEN, MIN_REGISTER_PAYLOAD,
        MIN_STATUS_CHANGE_PAYLOAD,
    },
};

/// REGISTER (0x81) payload.
///
/// ```text
/// 0..8   device identifier (ASCII, NUL/space padded)
/// 8..10  device type (recorded as hex, e.g. 00 25 -> "0025")
/// 10..30 SIM CCID (ASCII, ignored unless all 20 bytes are present)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub device_id: DeviceId,
    pub device_type: String,
    pub ccid: String,
}

impl RegisterRequest {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < MIN_REGISTER_PAYLOAD {
            return Err(Error::PayloadTooShort {
                len: payload.len(),
                min: MIN_REGISTER_PAYLOAD,
            });
        }

        let device_id = DeviceId::from_wire(&payload[..DEVICE_ID_LEN])?;
        let device_type = payload[DEVICE_ID_LEN..DEVICE_ID_LEN + DEVICE_TYPE_LEN]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();

        // A CCID is only present when the full 20-byte field was sent.
        let ccid = payload
            .get(MIN_REGISTER_PAYLOAD..MIN_REGISTER_PAYLOAD + MAX_CCID_LEN)
            .map(|field| {
                field
                    .iter()
                    .filter(|b| b.is_ascii_graphic())
                    .map(|&b| b as char)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            device_id,
            device_type,
            ccid,
        })
    }
}

/// HEARTBEAT (0x80) payload: the device identifier.
///
/// Returns `None` when the payload is too short or does not decode.
pub fn heartbeat_device_id(payload: &[u8]) -> Option<DeviceId> {
    payload
        .get(..DEVICE_ID_LEN)
        .and_then(|field| DeviceId::from_wire(field).ok())
}

/// STATUS_CHANGE (0x85) payload: channel index and raw status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub channel: u8,
    pub status: u8,
}

impl StatusChange {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        match payload {
            [channel, status, ..] => Ok(Self {
                channel: *channel,
                status: *status,
            }),
            _ => Err(Error::PayloadTooShort {
                len: payload.len(),
                min: MIN_STATUS_CHANGE_PAYLOAD,
            }),
        }
    }

    pub fn lock_status(&self) -> Result<LockStatus> {
        LockStatus::from_u8(self.status)
    }
}
