pub mod command;
pub mod constants;
pub mod display;
pub mod encoding;
pub mod frame;
pub mod report;
pub mod types;

pub use command::Command;
pub use frame::{Frame, FrameDecoder};
pub use report::Report;

/// Version of this client library, reported by `get_pymata_version`.
pub const CLIENT_VERSION: &str = "1.4.1";

/// FirmataExpress sketch version this client is written against.
pub const FIRMATA_EXPRESS_VERSION: &str = "1.4";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Payload for {command:#04x} too short (expected at least {expected} bytes, got {actual})")]
    TooShort {
        command: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown DHT sensor type {0}")]
    UnknownDhtType(u8),
}
