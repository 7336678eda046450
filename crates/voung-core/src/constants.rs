//! Core constants for the Voung lock-controller protocol.
//!
//! This module defines the protocol-level constants shared by the codec,
//! the connection layer and the storage layer. Every board speaks the same
//! binary framing, so these values must match the firmware exactly.
//!
//! # Frame Structure
//!
//! ```text
//! offset 0..3  : "WKLY" marker
//! offset 4     : frame length (total bytes, marker and checksum included)
//! offset 5     : board address
//! offset 6     : command code
//! offset 7..n-2: payload
//! offset n-1   : XOR checksum of bytes 0..n-2
//! ```
//!
//! # Usage
//!
//! ```
//! use voung_core::constants::*;
//!
//! assert_eq!(FRAME_MARKER, b"WKLY");
//! assert_eq!(FRAME_OVERHEAD, 8);
//! assert_eq!(MAX_PAYLOAD_LEN, 247);
//! ```

// ============================================================================
// Framing
// ============================================================================

/// Four ASCII bytes that open every frame.
pub const FRAME_MARKER: &[u8; 4] = b"WKLY";

/// Length of [`FRAME_MARKER`].
pub const MARKER_LEN: usize = FRAME_MARKER.len();

/// Offset of the length byte.
pub const LENGTH_OFFSET: usize = 4;

/// Offset of the board address byte.
pub const ADDRESS_OFFSET: usize = 5;

/// Offset of the command byte.
pub const COMMAND_OFFSET: usize = 6;

/// Offset of the first payload byte.
pub const PAYLOAD_OFFSET: usize = 7;

/// Fixed bytes in every frame: marker (4) + length (1) + address (1) +
/// command (1) + checksum (1).
///
/// This is also the smallest valid frame (empty payload).
pub const FRAME_OVERHEAD: usize = 8;

/// Largest value the single length byte can hold.
pub const MAX_FRAME_LEN: usize = u8::MAX as usize;

/// Largest payload that still fits the length byte.
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - FRAME_OVERHEAD;

// ============================================================================
// Response Status
// ============================================================================

/// Status byte acknowledging a request.
pub const STATUS_OK: u8 = 0x00;

/// Status byte rejecting a request.
pub const STATUS_FAILURE: u8 = 0xFF;

// ============================================================================
// Registration Payload
// ============================================================================

/// Number of ASCII bytes carrying the device identifier.
///
/// Used by both REGISTER and HEARTBEAT payloads.
pub const DEVICE_ID_LEN: usize = 8;

/// Number of bytes carrying the device type in a REGISTER payload.
pub const DEVICE_TYPE_LEN: usize = 2;

/// Minimum REGISTER payload: device identifier followed by device type.
pub const MIN_REGISTER_PAYLOAD: usize = DEVICE_ID_LEN + DEVICE_TYPE_LEN;

/// Maximum length of the SIM CCID trailing a REGISTER payload.
pub const MAX_CCID_LEN: usize = 20;

/// Minimum STATUS_CHANGE payload: channel index and new status.
pub const MIN_STATUS_CHANGE_PAYLOAD: usize = 2;

// ============================================================================
// Boards and Channels
// ============================================================================

/// Channel count assigned to boards created through registration.
pub const DEFAULT_TOTAL_CHANNELS: u8 = 25;

/// Device type recorded when none is known.
pub const DEFAULT_DEVICE_TYPE: &str = "0025";

/// Maximum length of an order number attached to an open command.
pub const MAX_ORDER_NUMBER_LEN: usize = 24;

// ============================================================================
// Network
// ============================================================================

/// Port boards connect to unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8585;

/// Default time a gateway caller waits for a command to be written, in milliseconds.
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 3000;
