use crate::{
    constants::{sysex, IGNORE},
    encoding::{combine, words},
    frame::Frame,
    types::{DhtReading, DhtType, ModeCapability, PinCapabilities},
    DecodeError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub name: String,
}

impl FirmwareVersion {
    /// `"{major}.{minor}"`, compared against the expected sketch version.
    pub fn version_number(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} {}", self.major, self.minor, self.name)
    }
}

/// A decoded message from the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Report {
    AnalogValue {
        pin: u8,
        value: u16,
    },
    DigitalPort {
        port: u8,
        mask: u16,
    },
    ProtocolVersion(ProtocolVersion),
    Firmware(FirmwareVersion),
    /// One entry per digital pin: the analog channel, or `IGNORE`.
    AnalogMap(Vec<u8>),
    Capabilities(Vec<PinCapabilities>),
    PinState {
        pin: u8,
        mode: u8,
        state: u32,
    },
    I2cReply {
        address: u16,
        register: u16,
        data: Vec<u16>,
    },
    Sonar {
        trigger_pin: u8,
        distance_cm: u16,
    },
    StringData(String),
    /// `reading` is `None` for a successful configuration acknowledgement.
    Dht {
        pin: u8,
        sensor_type: u8,
        reading: Option<DhtReading>,
    },
    Pm25 {
        pm25: u16,
        pm10: u16,
        error: bool,
    },
    Ir {
        address: u16,
        data: u16,
    },
    IAmHere {
        instance_id: u8,
    },
    Unhandled {
        command: u8,
    },
}

fn require(command: u8, payload: &[u8], expected: usize) -> Result<(), DecodeError> {
    if payload.len() < expected {
        Err(DecodeError::TooShort {
            command,
            expected,
            actual: payload.len(),
        })
    } else {
        Ok(())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Report {
    pub fn decode(frame: &Frame) -> Result<Self, DecodeError> {
        match frame {
            Frame::Digital { port, lsb, msb } => Ok(Report::DigitalPort {
                port: *port,
                mask: combine(*lsb, *msb),
            }),
            Frame::Analog { pin, lsb, msb } => Ok(Report::AnalogValue {
                pin: *pin,
                value: combine(*lsb, *msb),
            }),
            Frame::Version { major, minor } => Ok(Report::ProtocolVersion(ProtocolVersion {
                major: *major,
                minor: *minor,
            })),
            Frame::Sysex { id, payload } => Self::decode_sysex(*id, payload),
            Frame::Unknown(command) => Ok(Report::Unhandled { command: *command }),
        }
    }

    fn decode_sysex(id: u8, payload: &[u8]) -> Result<Self, DecodeError> {
        match id {
            sysex::REPORT_FIRMWARE => {
                require(id, payload, 2)?;
                let name = words(&payload[2..])
                    .into_iter()
                    .filter_map(|c| char::from_u32(c as u32))
                    .collect();
                Ok(Report::Firmware(FirmwareVersion {
                    major: payload[0],
                    minor: payload[1],
                    name,
                }))
            }
            sysex::ANALOG_MAPPING_RESPONSE => Ok(Report::AnalogMap(payload.to_vec())),
            sysex::CAPABILITY_RESPONSE => Ok(Report::Capabilities(decode_capabilities(payload))),
            sysex::PIN_STATE_RESPONSE => {
                require(id, payload, 2)?;
                let state = payload[2..]
                    .iter()
                    .take(4)
                    .enumerate()
                    .fold(0u32, |acc, (i, b)| acc | ((*b as u32 & 0x7F) << (7 * i)));
                Ok(Report::PinState {
                    pin: payload[0],
                    mode: payload[1],
                    state,
                })
            }
            sysex::I2C_REPLY => {
                require(id, payload, 4)?;
                let pairs = words(payload);
                Ok(Report::I2cReply {
                    address: pairs[0],
                    register: pairs[1],
                    data: pairs[2..].to_vec(),
                })
            }
            sysex::SONAR_DATA => {
                require(id, payload, 3)?;
                Ok(Report::Sonar {
                    trigger_pin: payload[0],
                    distance_cm: combine(payload[1], payload[2]),
                })
            }
            sysex::STRING_DATA => Ok(Report::StringData(
                payload
                    .iter()
                    .filter(|b| **b != 0)
                    .map(|b| *b as char)
                    .collect(),
            )),
            sysex::DHT_DATA => decode_dht(payload),
            sysex::PM25_DATA => {
                require(id, payload, 5)?;
                Ok(Report::Pm25 {
                    pm25: combine(payload[0], payload[1]),
                    pm10: combine(payload[2], payload[3]),
                    error: payload[4] != 0,
                })
            }
            sysex::IR_DATA => {
                require(id, payload, 4)?;
                Ok(Report::Ir {
                    address: combine(payload[0], payload[1]),
                    data: combine(payload[2], payload[3]),
                })
            }
            sysex::I_AM_HERE => {
                require(id, payload, 1)?;
                Ok(Report::IAmHere {
                    instance_id: payload[0],
                })
            }
            _ => Ok(Report::Unhandled { command: id }),
        }
    }
}

fn decode_capabilities(payload: &[u8]) -> Vec<PinCapabilities> {
    let mut pins = Vec::new();
    let mut current = PinCapabilities::default();
    let mut iter = payload.iter().copied();

    while let Some(byte) = iter.next() {
        if byte == IGNORE {
            let pin = current.pin;
            pins.push(std::mem::take(&mut current));
            current.pin = pin + 1;
            continue;
        }
        let Some(resolution) = iter.next() else {
            break;
        };
        current.modes.push(ModeCapability {
            mode: byte,
            resolution,
        });
    }

    pins
}

fn decode_dht(payload: &[u8]) -> Result<Report, DecodeError> {
    require(sysex::DHT_DATA, payload, 8)?;

    let pin = payload[0];
    let sensor_type = payload[1];
    let status = payload[6];
    let flag = payload[7];

    let reading = if flag == 1 {
        // Configuration acknowledgement, byte 10 carries the error code.
        match payload.get(10) {
            Some(code) if *code != 0 => Some(DhtReading::ConfigError),
            _ => None,
        }
    } else if status == 0 {
        let b = |i: usize| payload[i] as f64;
        let (humidity, temperature) = match DhtType::from_repr(sensor_type) {
            Some(DhtType::Dht22) => (
                (b(2) * 256.0 + b(3)) * 0.1,
                ((payload[4] & 0x7F) as f64 * 256.0 + b(5)) * 0.1,
            ),
            Some(DhtType::Dht11) => (b(2) + b(3) * 0.1, b(4) + b(5) * 0.1),
            None => return Err(DecodeError::UnknownDhtType(sensor_type)),
        };
        Some(DhtReading::Valid {
            humidity: round2(humidity),
            temperature: round2(temperature),
        })
    } else if flag == 2 {
        Some(DhtReading::Timeout)
    } else {
        Some(DhtReading::ChecksumError)
    };

    Ok(Report::Dht {
        pin,
        sensor_type,
        reading,
    })
}
