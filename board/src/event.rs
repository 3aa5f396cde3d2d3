use chrono::{DateTime, Utc};
use kiddee_protocol::types::DhtReading;
use std::sync::Arc;

/// A change reported by the board, delivered to registered callbacks from
/// the reporter task.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Analog {
        pin: u8,
        value: u16,
        time: DateTime<Utc>,
    },
    Input {
        pin: u8,
        value: u8,
        time: DateTime<Utc>,
    },
    Pullup {
        pin: u8,
        value: u8,
        time: DateTime<Utc>,
    },
    I2c {
        address: u16,
        register: u16,
        data: Vec<u16>,
        time: DateTime<Utc>,
    },
    Sonar {
        trigger_pin: u8,
        distance_cm: u16,
        time: DateTime<Utc>,
    },
    Dht {
        pin: u8,
        sensor_type: u8,
        reading: DhtReading,
        time: DateTime<Utc>,
    },
    Pm25 {
        pm25: u16,
        pm10: u16,
        error: bool,
        time: DateTime<Utc>,
    },
    Ir {
        address: u16,
        data: u16,
        time: DateTime<Utc>,
    },
}

/// Callbacks run on the reporter task and must not block.
pub type Callback = Arc<dyn Fn(Event) + Send + Sync>;
