//! Payload builders for the commands the server sends to boards.
//!
//! | Command        | Code | Payload                          |
//! |----------------|------|----------------------------------|
//! | OPEN_SINGLE    | 0x82 | channel, order number (ASCII)    |
//! | READ_STATUS    | 0x83 | channel                          |
//! | READ_ALL_STATUS| 0x84 | empty                            |
//! | OPEN_ALL       | 0x86 | empty                            |
//! | OPEN_MULTIPLE  | 0x87 | count, channels...               |
//! | KEEP_OPEN      | 0x88 | channel                          |
//! | CLOSE_CHANNEL  | 0x89 | channel                          |

use bytes::{BufMut, Bytes, BytesMut};
use voung_core::{Error, OperationType, OrderNumber, Result, constants::MAX_PAYLOAD_LEN};

use crate::{CommandCode, Frame};

/// A command addressed to one board, before framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    OpenSingle { channel: u8, order_number: OrderNumber },
    OpenAll,
    OpenMultiple(Vec<u8>),
    ReadStatus(u8),
    ReadAllStatus,
    KeepOpen(u8),
    CloseChannel(u8),
}

impl OutboundCommand {
    pub fn command(&self) -> CommandCode {
        match self {
            OutboundCommand::OpenSingle { .. } => CommandCode::OpenSingle,
            OutboundCommand::OpenAll => CommandCode::OpenAll,
            OutboundCommand::OpenMultiple(_) => CommandCode::OpenMultiple,
            OutboundCommand::ReadStatus(_) => CommandCode::ReadStatus,
            OutboundCommand::ReadAllStatus => CommandCode::ReadAllStatus,
            OutboundCommand::KeepOpen(_) => CommandCode::KeepOpen,
            OutboundCommand::CloseChannel(_) => CommandCode::CloseChannel,
        }
    }

    pub fn operation_type(&self) -> OperationType {
        match self {
            OutboundCommand::OpenSingle { .. } => OperationType::OpenSingle,
            OutboundCommand::OpenAll => OperationType::OpenAll,
            OutboundCommand::OpenMultiple(_) => OperationType::OpenMultiple,
            OutboundCommand::ReadStatus(_) => OperationType::ReadStatus,
            OutboundCommand::ReadAllStatus => OperationType::ReadAllStatus,
            OutboundCommand::KeepOpen(_) => OperationType::KeepOpen,
            OutboundCommand::CloseChannel(_) => OperationType::CloseChannel,
        }
    }

    /// Channels named explicitly by the command. Board-wide commands
    /// return an empty list.
    pub fn channels(&self) -> Vec<u8> {
        match self {
            OutboundCommand::OpenSingle { channel, .. }
            | OutboundCommand::ReadStatus(channel)
            | OutboundCommand::KeepOpen(channel)
            | OutboundCommand::CloseChannel(channel) => vec![*channel],
            OutboundCommand::OpenMultiple(channels) => channels.clone(),
            OutboundCommand::OpenAll | OutboundCommand::ReadAllStatus => Vec::new(),
        }
    }

    /// Build the payload bytes.
    ///
    /// # Errors
    /// `Error::NoChannels` for an empty OPEN_MULTIPLE and
    /// `Error::PayloadTooLarge` when the channel list does not fit a frame.
    pub fn payload(&self) -> Result<Bytes> {
        match self {
            OutboundCommand::OpenSingle {
                channel,
                order_number,
            } => {
                let mut buf = BytesMut::with_capacity(1 + order_number.as_str().len());
                buf.put_u8(*channel);
                buf.extend_from_slice(order_number.as_str().as_bytes());
                Ok(buf.freeze())
            }
            OutboundCommand::OpenMultiple(channels) => {
                if channels.is_empty() {
                    return Err(Error::NoChannels);
                }
                if channels.len() + 1 > MAX_PAYLOAD_LEN {
                    return Err(Error::PayloadTooLarge {
                        size: channels.len() + 1,
                        max_size: MAX_PAYLOAD_LEN,
                    });
                }
                let mut buf = BytesMut::with_capacity(1 + channels.len());
                buf.put_u8(channels.len() as u8);
                buf.extend_from_slice(channels);
                Ok(buf.freeze())
            }
            OutboundCommand::ReadStatus(channel)
            | OutboundCommand::KeepOpen(channel)
            | OutboundCommand::CloseChannel(channel) => Ok(Bytes::copy_from_slice(&[*channel])),
            OutboundCommand::OpenAll | OutboundCommand::ReadAllStatus => Ok(Bytes::new()),
        }
    }

    /// Frame this command for the board at `board_address`.
    pub fn to_frame(&self, board_address: u8) -> Result<Frame> {
        Frame::new(board_address, self.command().as_u8(), self.payload()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_open_single_payload() {
        let cmd = OutboundCommand::OpenSingle {
            channel: 3,
            order_number: OrderNumber::new("ORD-77"),
        };
        assert_eq!(cmd.payload().unwrap().as_ref(), b"\x03ORD-77");
        assert_eq!(cmd.command(), CommandCode::OpenSingle);
        assert_eq!(cmd.channels(), vec![3]);
    }

    #[test]
    fn test_open_single_without_order_number() {
        let cmd = OutboundCommand::OpenSingle {
            channel: 12,
            order_number: OrderNumber::default(),
        };
        assert_eq!(cmd.payload().unwrap().as_ref(), &[12]);
    }

    #[test]
    fn test_open_multiple_payload() {
        let cmd = OutboundCommand::OpenMultiple(vec![1, 4, 9]);
        assert_eq!(cmd.payload().unwrap().as_ref(), &[3, 1, 4, 9]);
    }

    #[test]
    fn test_open_multiple_requires_channels() {
        let cmd = OutboundCommand::OpenMultiple(Vec::new());
        assert!(matches!(cmd.payload(), Err(Error::NoChannels)));
    }

    #[rstest]
    #[case(OutboundCommand::ReadStatus(5), CommandCode::ReadStatus, &[5])]
    #[case(OutboundCommand::KeepOpen(6), CommandCode::KeepOpen, &[6])]
    #[case(OutboundCommand::CloseChannel(7), CommandCode::CloseChannel, &[7])]
    #[case(OutboundCommand::OpenAll, CommandCode::OpenAll, &[])]
    #[case(OutboundCommand::ReadAllStatus, CommandCode::ReadAllStatus, &[])]
    fn test_simple_payloads(
        #[case] cmd: OutboundCommand,
        #[case] code: CommandCode,
        #[case] payload: &[u8],
    ) {
        assert_eq!(cmd.command(), code);
        assert_eq!(cmd.payload().unwrap().as_ref(), payload);
    }

    #[test]
    fn test_to_frame() {
        let frame = OutboundCommand::KeepOpen(2).to_frame(9).unwrap();
        assert_eq!(frame.board_address, 9);
        assert_eq!(frame.command, 0x88);
        assert_eq!(frame.payload.as_ref(), &[2]);
    }

    #[test]
    fn test_operation_types() {
        assert_eq!(
            OutboundCommand::OpenAll.operation_type(),
            OperationType::OpenAll
        );
        assert_eq!(
            OutboundCommand::CloseChannel(1).operation_type(),
            OperationType::CloseChannel
        );
    }
}
