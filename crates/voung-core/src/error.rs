use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Payload too large: {size} bytes (max {max_size})")]
    PayloadTooLarge { size: usize, max_size: usize },

    #[error("Payload too short: {len} bytes (need at least {min})")]
    PayloadTooShort { len: usize, min: usize },

    #[error("Unknown command code: 0x{0:02X}")]
    UnknownCommand(u8),

    #[error("Invalid device ID: {0}")]
    InvalidDeviceId(String),

    #[error("Invalid lock status byte: 0x{0:02X}")]
    InvalidLockStatus(u8),

    #[error("Invalid operation type: {0}")]
    InvalidOperationType(String),

    // Channel errors
    #[error("Invalid channel {channel} (board has {total} channels)")]
    InvalidChannel { channel: u8, total: u8 },

    #[error("At least one channel is required")]
    NoChannels,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
