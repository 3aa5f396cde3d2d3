use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection and start-up settings for a [`crate::Board`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Serial device, e.g. `/dev/ttyACM0` or `COM3`. When neither this nor
    /// `ip_address` is set, every USB serial port is probed.
    pub com_port: Option<String>,
    pub baud_rate: u32,

    /// Must match the ID compiled into the FirmataExpress sketch.
    pub arduino_instance_id: u8,

    /// Time allowed for a board to reset after its port is opened.
    pub arduino_wait: Duration,

    /// StandardFirmataWifi host; takes precedence over serial.
    pub ip_address: Option<String>,
    pub ip_port: u16,

    pub query_timeout: Duration,

    /// Sampling interval applied once start-up completes, in milliseconds.
    pub sampling_interval: u16,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            com_port: None,
            baud_rate: 115_200,
            arduino_instance_id: 1,
            arduino_wait: Duration::from_secs(4),
            ip_address: None,
            ip_port: 3030,
            query_timeout: Duration::from_secs(4),
            sampling_interval: 19,
        }
    }
}

impl BoardConfig {
    /// Identification is only attempted at the FirmataExpress baud rate.
    pub fn expects_firmata_express(&self) -> bool {
        self.baud_rate == 115_200
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.arduino_instance_id, 1);
        assert_eq!(config.arduino_wait, Duration::from_secs(4));
        assert_eq!(config.sampling_interval, 19);
        assert!(config.expects_firmata_express());
    }

    #[test]
    fn other_baud_rates_skip_identification() {
        let config = BoardConfig {
            baud_rate: 57_600,
            ..Default::default()
        };
        assert!(!config.expects_firmata_express());
    }
}
