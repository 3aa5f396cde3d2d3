mod board;
pub mod config;
pub mod devices;
mod event;
mod pins;
mod query;
mod receiver;
mod reporter;
mod state;
pub mod transport;


pub use board::{
    Board, I2cData, IrCode, Pm25Value, Reading, DEFAULT_DHT_DIFFERENTIAL, DEFAULT_SERVO_MAX_PULSE,
    DEFAULT_SERVO_MIN_PULSE, DEFAULT_SONAR_TIMEOUT_US,
};
pub use config::BoardConfig;
pub use event::{Callback, Event};
pub use query::PinState;
pub use kiddee_protocol as protocol;

use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("No board found with instance ID {0}")]
    BoardNotFound(u8),

    #[error("Board identification failed: {0}")]
    Identification(String),

    #[error("Timeout waiting for {0}")]
    Timeout(&'static str),

    #[error("Unsupported firmware version {found} (expected {expected})")]
    UnsupportedFirmware { found: String, expected: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Board is not running")]
    NotRunning,

    #[error("Protocol decode error: {0}")]
    Decode(#[from] kiddee_protocol::DecodeError),
}

/// Pause between reporting-disable messages during shutdown.
const SHUTDOWN_MESSAGE_INTERVAL: Duration = Duration::from_millis(5);

/// How long to wait for an `I_AM_HERE` reply to `ARE_YOU_THERE`.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(1);
