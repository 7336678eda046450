pub mod codec;
pub mod commands;
pub mod frame;
pub mod messages;
pub mod outbound;
pub mod stream_parser;

pub use codec::VoungCodec;
pub use commands::CommandCode;
pub use frame::{Frame, MalformedFrame, checksum, create_response};
pub use messages::{RegisterRequest, StatusChange, heartbeat_device_id};
pub use outbound::OutboundCommand;
pub use stream_parser::{Events, FrameEvent, StreamReassembler};
