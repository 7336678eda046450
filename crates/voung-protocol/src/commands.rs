//! Command code definitions for the Voung protocol.
//!
//! Every frame carries a single command byte at offset 6. Boards send
//! [`CommandCode::Heartbeat`], [`CommandCode::Register`],
//! [`CommandCode::StatusChange`] and [`CommandCode::SignalQuality`]; the
//! server sends the remaining (outbound) codes to drive the locks.
//!
//! ```text
//! 57 4B 4C 59  09  01  80  00  xx
//! ^^^^^^^^^^^  ^^  ^^  ^^
//! marker       len addr command
//! ```
//!
//! # Usage
//!
//! ```
//! use voung_protocol::CommandCode;
//!
//! let cmd = CommandCode::try_from(0x81).unwrap();
//! assert_eq!(cmd, CommandCode::Register);
//! assert_eq!(cmd.as_u8(), 0x81);
//! assert!(!cmd.is_outbound());
//! ```

use std::fmt;
use voung_core::{Error, Result};

/// Command codes for Voung protocol frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    // Board to server
    Heartbeat = 0x80,
    Register = 0x81,
    StatusChange = 0x85,
    SignalQuality = 0xD0,

    // Server to board
    OpenSingle = 0x82,
    ReadStatus = 0x83,
    ReadAllStatus = 0x84,
    OpenAll = 0x86,
    OpenMultiple = 0x87,
    KeepOpen = 0x88,
    CloseChannel = 0x89,
}

impl CommandCode {
    /// All known command codes, in wire order.
    pub const ALL: [CommandCode; 11] = [
        CommandCode::Heartbeat,
        CommandCode::Register,
        CommandCode::OpenSingle,
        CommandCode::ReadStatus,
        CommandCode::ReadAllStatus,
        CommandCode::StatusChange,
        CommandCode::OpenAll,
        CommandCode::OpenMultiple,
        CommandCode::KeepOpen,
        CommandCode::CloseChannel,
        CommandCode::SignalQuality,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether this code is one the server sends to a board.
    pub fn is_outbound(self) -> bool {
        matches!(
            self,
            CommandCode::OpenSingle
                | CommandCode::ReadStatus
                | CommandCode::ReadAllStatus
                | CommandCode::OpenAll
                | CommandCode::OpenMultiple
                | CommandCode::KeepOpen
                | CommandCode::CloseChannel
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandCode::Heartbeat => "HEARTBEAT",
            CommandCode::Register => "REGISTER",
            CommandCode::OpenSingle => "OPEN_SINGLE",
            CommandCode::ReadStatus => "READ_STATUS",
            CommandCode::ReadAllStatus => "READ_ALL_STATUS",
            CommandCode::StatusChange => "STATUS_CHANGE",
            CommandCode::OpenAll => "OPEN_ALL",
            CommandCode::OpenMultiple => "OPEN_MULTIPLE",
            CommandCode::KeepOpen => "KEEP_OPEN",
            CommandCode::CloseChannel => "CLOSE_CHANNEL",
            CommandCode::SignalQuality => "SIGNAL_QUALITY",
        }
    }
}

impl TryFrom<u8> for CommandCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x80 => Ok(CommandCode::Heartbeat),
            0x81 => Ok(CommandCode::Register),
            0x82 => Ok(CommandCode::OpenSingle),
            0x83 => Ok(CommandCode::ReadStatus),
            0x84 => Ok(CommandCode::ReadAllStatus),
            0x85 => Ok(CommandCode::StatusChange),
            0x86 => Ok(CommandCode::OpenAll),
            0x87 => Ok(CommandCode::OpenMultiple),
            0x88 => Ok(CommandCode::KeepOpen),
            0x89 => Ok(CommandCode::CloseChannel),
            0xD0 => Ok(CommandCode::SignalQuality),
            other => Err(Error::UnknownCommand(other)),
        }
    }
}

impl From<CommandCode> for u8 {
    fn from(code: CommandCode) -> Self {
        code.as_u8()
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x80, CommandCode::Heartbeat)]
    #[case(0x81, CommandCode::Register)]
    #[case(0x82, CommandCode::OpenSingle)]
    #[case(0x83, CommandCode::ReadStatus)]
    #[case(0x84, CommandCode::ReadAllStatus)]
    #[case(0x85, CommandCode::StatusChange)]
    #[case(0x86, CommandCode::OpenAll)]
    #[case(0x87, CommandCode::OpenMultiple)]
    #[case(0x88, CommandCode::KeepOpen)]
    #[case(0x89, CommandCode::CloseChannel)]
    #[case(0xD0, CommandCode::SignalQuality)]
    fn test_command_code_values(#[case] byte: u8, #[case] expected: CommandCode) {
        assert_eq!(CommandCode::try_from(byte).unwrap(), expected);
        assert_eq!(expected.as_u8(), byte);
    }

    #[rstest]
    #[case(0x00)]
    #[case(0x7F)]
    #[case(0x8A)]
    #[case(0xFF)]
    fn test_unknown_command_code(#[case] byte: u8) {
        assert!(matches!(
            CommandCode::try_from(byte),
            Err(Error::UnknownCommand(b)) if b == byte
        ));
    }

    #[test]
    fn test_outbound_split() {
        let outbound: Vec<_> = CommandCode::ALL
            .iter()
            .filter(|c| c.is_outbound())
            .collect();
        assert_eq!(outbound.len(), 7);
        assert!(!CommandCode::Heartbeat.is_outbound());
        assert!(!CommandCode::StatusChange.is_outbound());
        assert!(!CommandCode::SignalQuality.is_outbound());
    }

    #[test]
    fn test_display() {
        assert_eq!(CommandCode::Register.to_string(), "REGISTER (0x81)");
    }
}
