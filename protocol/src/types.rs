use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, FromRepr};

/// Pin modes as reported by, and configured on, a FirmataExpress board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, FromRepr,
)]
#[repr(u8)]
pub enum PinMode {
    Input = 0x00,
    Output = 0x01,
    Analog = 0x02,
    Pwm = 0x03,
    Servo = 0x04,
    I2c = 0x06,
    Stepper = 0x08,
    Serial = 0x0A,
    Pullup = 0x0B,
    Sonar = 0x0C,
    Tone = 0x0D,
    Pixy = 0x0E,
    Dht = 0x0F,
    Pm25 = 0x10,
}

impl PinMode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// I2C read flavours for `I2C_REQUEST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum I2cReadMode {
    Once,
    Continuous,
    /// Single read that restarts the transmission afterwards (e.g. MMA8452Q).
    RestartTransmission,
}

impl I2cReadMode {
    pub fn as_byte(self) -> u8 {
        use crate::constants::i2c;

        match self {
            I2cReadMode::Once => i2c::READ,
            I2cReadMode::Continuous => i2c::READ_CONTINUOUSLY,
            I2cReadMode::RestartTransmission => i2c::READ | i2c::END_TX_MASK,
        }
    }
}

/// Supported DHT sensor families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, FromRepr)]
#[repr(u8)]
pub enum DhtType {
    Dht11 = 11,
    Dht22 = 22,
}

/// Outcome of a single DHT measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DhtReading {
    Valid { humidity: f64, temperature: f64 },
    ConfigError,
    ChecksumError,
    Timeout,
}

impl DhtReading {
    /// Humidity and temperature, with the legacy negative error codes
    /// (-1 config, -2 checksum, -3 timeout) substituted for failed reads.
    pub fn values(&self) -> (f64, f64) {
        match *self {
            DhtReading::Valid {
                humidity,
                temperature,
            } => (humidity, temperature),
            DhtReading::ConfigError => (-1.0, -1.0),
            DhtReading::ChecksumError => (-2.0, -2.0),
            DhtReading::Timeout => (-3.0, -3.0),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, DhtReading::Valid { .. })
    }
}

/// One `(mode, resolution)` entry of a capability report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeCapability {
    /// Raw mode byte; not every sketch limits itself to [`PinMode`].
    pub mode: u8,
    pub resolution: u8,
}

impl ModeCapability {
    pub fn pin_mode(&self) -> Option<PinMode> {
        PinMode::from_repr(self.mode)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinCapabilities {
    pub pin: u8,
    pub modes: Vec<ModeCapability>,
}

/// 24-bit colour, converted to RGB565 for the TFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgb565(self) -> u16 {
        ((self.r as u16 & 0xF8) << 8) | ((self.g as u16 & 0xFC) << 3) | (self.b as u16 >> 3)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn pin_mode_bytes_round_trip() {
        for mode in PinMode::iter() {
            assert_eq!(PinMode::from_repr(mode.as_byte()), Some(mode));
        }
        assert_eq!(PinMode::from_repr(0x05), None);
        assert_eq!(PinMode::Pullup.as_byte(), 0x0B);
    }

    #[test]
    fn i2c_read_mode_flags() {
        assert_eq!(I2cReadMode::Once.as_byte(), 0x08);
        assert_eq!(I2cReadMode::Continuous.as_byte(), 0x10);
        assert_eq!(I2cReadMode::RestartTransmission.as_byte(), 0x48);
    }

    #[test]
    fn rgb565_conversion() {
        assert_eq!(Rgb::WHITE.to_rgb565(), 0xFFFF);
        assert_eq!(Rgb::BLACK.to_rgb565(), 0x0000);
        assert_eq!(Rgb::new(255, 0, 0).to_rgb565(), 0xF800);
        assert_eq!(Rgb::new(0, 255, 0).to_rgb565(), 0x07E0);
        assert_eq!(Rgb::new(0, 0, 255).to_rgb565(), 0x001F);
    }

    #[test]
    fn dht_error_codes() {
        assert_eq!(DhtReading::ConfigError.values(), (-1.0, -1.0));
        assert_eq!(DhtReading::ChecksumError.values(), (-2.0, -2.0));
        assert_eq!(DhtReading::Timeout.values(), (-3.0, -3.0));
        assert!(!DhtReading::Valid {
            humidity: 40.0,
            temperature: 21.5
        }
        .is_error());
    }
}
