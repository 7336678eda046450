use crate::{
    Result,
    constants::{DEVICE_ID_LEN, MAX_ORDER_NUMBER_LEN},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Board device identifier (up to 8 printable ASCII characters).
///
/// This is the stable, globally unique name a board announces in its
/// REGISTER and HEARTBEAT payloads. It is distinct from the numeric board
/// address carried in every frame header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new device ID with validation.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidDeviceId` if the identifier is empty, longer
    /// than 8 characters, or contains non-printable / non-ASCII characters.
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();

        if id.is_empty() || id.len() > DEVICE_ID_LEN {
            return Err(Error::InvalidDeviceId(format!(
                "Device ID must be 1-{DEVICE_ID_LEN} chars, got {:?}",
                id
            )));
        }

        if !id.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(Error::InvalidDeviceId(format!(
                "Device ID must be printable ASCII, got {:?}",
                id
            )));
        }

        Ok(DeviceId(id.to_string()))
    }

    /// Decode a device ID from the fixed 8-byte field of a payload.
    ///
    /// Boards pad short identifiers with NUL or space bytes; the padding is
    /// stripped. Only the first 8 bytes of `field` are considered.
    ///
    /// # Errors
    /// Returns `Error::InvalidDeviceId` if fewer than 8 bytes are given or
    /// the field does not decode to a valid identifier.
    pub fn from_wire(field: &[u8]) -> Result<Self> {
        let Some(raw) = field.get(..DEVICE_ID_LEN) else {
            return Err(Error::InvalidDeviceId(format!(
                "Device ID field needs {DEVICE_ID_LEN} bytes, got {}",
                field.len()
            )));
        };

        let end = raw
            .iter()
            .rposition(|&b| b != 0x00 && b != b' ')
            .map_or(0, |pos| pos + 1);

        let text = std::str::from_utf8(&raw[..end])
            .map_err(|_| Error::InvalidDeviceId("Device ID is not ASCII".to_string()))?;

        DeviceId::new(text)
    }

    /// Encode the device ID as the 8-byte wire field (NUL padded).
    #[must_use]
    pub fn to_wire(&self) -> [u8; DEVICE_ID_LEN] {
        let mut field = [0u8; DEVICE_ID_LEN];
        field[..self.0.len()].copy_from_slice(self.0.as_bytes());
        field
    }

    /// Get the device ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DeviceId::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        DeviceId::new(&value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// Physical state of one lock channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockStatus {
    Open = 0,
    Closed = 1,
}

impl LockStatus {
    /// Decode the status byte reported by a board.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(LockStatus::Open),
            1 => Ok(LockStatus::Closed),
            _ => Err(Error::InvalidLockStatus(value)),
        }
    }

    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, LockStatus::Open)
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LockStatus::Open => write!(f, "open"),
            LockStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Kind of operator action recorded in the operation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    OpenSingle,
    OpenAll,
    OpenMultiple,
    ReadStatus,
    ReadAllStatus,
    KeepOpen,
    CloseChannel,
}

impl OperationType {
    /// Stored representation of the operation type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::OpenSingle => "open_single",
            OperationType::OpenAll => "open_all",
            OperationType::OpenMultiple => "open_multiple",
            OperationType::ReadStatus => "read_status",
            OperationType::ReadAllStatus => "read_all_status",
            OperationType::KeepOpen => "keep_open",
            OperationType::CloseChannel => "close_channel",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open_single" => Ok(OperationType::OpenSingle),
            "open_all" => Ok(OperationType::OpenAll),
            "open_multiple" => Ok(OperationType::OpenMultiple),
            "read_status" => Ok(OperationType::ReadStatus),
            "read_all_status" => Ok(OperationType::ReadAllStatus),
            "keep_open" => Ok(OperationType::KeepOpen),
            "close_channel" => Ok(OperationType::CloseChannel),
            other => Err(Error::InvalidOperationType(other.to_string())),
        }
    }
}

/// Check that a 1-based channel index exists on a board with `total` channels.
pub fn validate_channel(channel: u8, total: u8) -> Result<u8> {
    if channel == 0 || channel > total {
        return Err(Error::InvalidChannel { channel, total });
    }
    Ok(channel)
}

/// Order number attached to an open command (ASCII, at most 24 bytes).
///
/// Longer input is truncated; non-ASCII characters are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNumber(String);

impl OrderNumber {
    #[must_use]
    pub fn new(value: &str) -> Self {
        let ascii: String = value
            .chars()
            .filter(char::is_ascii)
            .take(MAX_ORDER_NUMBER_LEN)
            .collect();
        OrderNumber(ascii)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("BOARD001", "BOARD001")]
    #[case("A1", "A1")]
    #[case("  LK000042 ", "LK000042")]
    fn test_device_id_valid(#[case] input: &str, #[case] expected: &str) {
        let id: DeviceId = input.parse().unwrap();
        assert_eq!(id.as_str(), expected);
    }

    #[rstest]
    #[case("")] // empty
    #[case("BOARD0001")] // 9 chars
    #[case("BO ARD")] // inner space
    #[case("PLACA-Ç")] // non-ASCII
    fn test_device_id_invalid(#[case] input: &str) {
        let result: Result<DeviceId> = input.parse();
        assert!(result.is_err());
    }

    #[rstest]
    #[case(b"BOARD001", "BOARD001")]
    #[case(b"LK42\0\0\0\0", "LK42")]
    #[case(b"LK42    ", "LK42")]
    #[case(b"BOARD001EXTRA", "BOARD001")]
    fn test_device_id_from_wire(#[case] field: &[u8], #[case] expected: &str) {
        let id = DeviceId::from_wire(field).unwrap();
        assert_eq!(id.as_str(), expected);
    }

    #[rstest]
    #[case(b"SHORT")] // fewer than 8 bytes
    #[case(b"\0\0\0\0\0\0\0\0")] // all padding
    #[case(&[0xC3, 0x87, b'A', b'B', b'C', b'D', b'E', b'F'])] // not ASCII
    fn test_device_id_from_wire_invalid(#[case] field: &[u8]) {
        assert!(DeviceId::from_wire(field).is_err());
    }

    #[test]
    fn test_device_id_wire_padding() {
        let id = DeviceId::new("LK42").unwrap();
        assert_eq!(&id.to_wire(), b"LK42\0\0\0\0");
        assert_eq!(DeviceId::from_wire(&id.to_wire()).unwrap(), id);
    }

    #[test]
    fn test_lock_status() {
        assert_eq!(LockStatus::from_u8(0).unwrap(), LockStatus::Open);
        assert_eq!(LockStatus::from_u8(1).unwrap(), LockStatus::Closed);
        assert!(matches!(
            LockStatus::from_u8(7),
            Err(Error::InvalidLockStatus(7))
        ));
        assert_eq!(LockStatus::Closed.to_u8(), 1);
        assert!(LockStatus::Open.is_open());
    }

    #[rstest]
    #[case(OperationType::OpenSingle, "open_single")]
    #[case(OperationType::OpenAll, "open_all")]
    #[case(OperationType::OpenMultiple, "open_multiple")]
    #[case(OperationType::ReadStatus, "read_status")]
    #[case(OperationType::ReadAllStatus, "read_all_status")]
    #[case(OperationType::KeepOpen, "keep_open")]
    #[case(OperationType::CloseChannel, "close_channel")]
    fn test_operation_type_str(#[case] op: OperationType, #[case] text: &str) {
        assert_eq!(op.as_str(), text);
        assert_eq!(text.parse::<OperationType>().unwrap(), op);
    }

    #[rstest]
    #[case(1, 25, true)]
    #[case(25, 25, true)]
    #[case(0, 25, false)]
    #[case(26, 25, false)]
    fn test_validate_channel(#[case] channel: u8, #[case] total: u8, #[case] ok: bool) {
        assert_eq!(validate_channel(channel, total).is_ok(), ok);
    }

    #[test]
    fn test_order_number_truncates() {
        let order = OrderNumber::new("ORDER-1234567890-ABCDEFGHIJ");
        assert_eq!(order.as_str().len(), MAX_ORDER_NUMBER_LEN);
        assert_eq!(OrderNumber::new("AÇB").as_str(), "AB");
        assert!(OrderNumber::default().is_empty());
    }
}
