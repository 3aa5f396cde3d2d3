use crate::{
    constants::{
        ir, stepper, sysex, tone, ANALOG_MESSAGE, DIGITAL_MESSAGE, END_SYSEX, REPORTING_DISABLE,
        REPORTING_ENABLE, REPORT_DIGITAL, REPORT_VERSION, SET_DIGITAL_PIN_VALUE,
        SET_PIN_MODE, START_SYSEX, SYSTEM_RESET,
    },
    display::{LcdCommand, OledCommand, TftCommand},
    encoding::{lsb, msb, push_u14, push_u21},
    types::{I2cReadMode, PinMode},
};

/// Every message the host sends to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetPinMode {
        pin: u8,
        mode: PinMode,
    },
    /// Full 8-bit output state of one digital port.
    DigitalPortWrite {
        port: u8,
        mask: u8,
    },
    /// Single pin write without port arithmetic.
    DigitalPinWrite {
        pin: u8,
        value: bool,
    },
    /// PWM/servo value; pins above 15 use the extended sysex form.
    AnalogWrite {
        pin: u8,
        value: u32,
    },
    ReportDigital {
        port: u8,
        enable: bool,
    },
    SamplingInterval {
        millis: u16,
    },
    KeepAlive {
        period_secs: u8,
    },
    AreYouThere,
    FirmwareQuery,
    VersionQuery,
    CapabilityQuery,
    AnalogMappingQuery,
    PinStateQuery {
        pin: u8,
    },
    ServoConfig {
        pin: u8,
        min_pulse: u16,
        max_pulse: u16,
    },
    SonarConfig {
        trigger_pin: u8,
        echo_pin: u8,
        timeout_us: u32,
    },
    DhtConfig {
        pin: u8,
        sensor_type: u8,
    },
    Pm25Config {
        mode: u8,
    },
    I2cConfig {
        read_delay_us: u16,
    },
    I2cRead {
        address: u8,
        register: Option<u16>,
        count: u16,
        mode: I2cReadMode,
    },
    I2cWrite {
        address: u8,
        data: Vec<u8>,
    },
    Tone {
        pin: u8,
        frequency: u16,
        /// `None` plays until [`Command::NoTone`].
        duration_ms: Option<u16>,
    },
    NoTone {
        pin: u8,
    },
    StepperConfig {
        steps_per_revolution: u16,
        pins: Vec<u8>,
    },
    StepperStep {
        speed: u32,
        steps: u16,
        forward: bool,
    },
    IrBeginReceiver,
    IrBeginSender,
    IrSend {
        address: u16,
        data: u16,
    },
    SystemReset,
    Lcd(LcdCommand),
    Oled(OledCommand),
    Tft(TftCommand),
}

fn sysex_frame(id: u8, payload: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
    let mut buf = vec![START_SYSEX, id];
    payload(&mut buf);
    buf.push(END_SYSEX);
    buf
}

impl Command {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Command::SetPinMode { pin, mode } => vec![SET_PIN_MODE, *pin, mode.as_byte()],
            Command::DigitalPortWrite { port, mask } => vec![
                DIGITAL_MESSAGE | (port & 0x0F),
                lsb(*mask as u32),
                msb(*mask as u32),
            ],
            Command::DigitalPinWrite { pin, value } => {
                vec![SET_DIGITAL_PIN_VALUE, *pin, *value as u8]
            }
            Command::AnalogWrite { pin, value } if *pin < 16 => {
                vec![ANALOG_MESSAGE | pin, lsb(*value), msb(*value)]
            }
            Command::AnalogWrite { pin, value } => sysex_frame(sysex::EXTENDED_PWM, |b| {
                b.push(*pin);
                push_u21(b, *value);
            }),
            Command::ReportDigital { port, enable } => vec![
                REPORT_DIGITAL | (port & 0x0F),
                if *enable {
                    REPORTING_ENABLE
                } else {
                    REPORTING_DISABLE
                },
            ],
            Command::SamplingInterval { millis } => {
                sysex_frame(sysex::SAMPLING_INTERVAL, |b| push_u14(b, *millis as u32))
            }
            Command::KeepAlive { period_secs } => {
                sysex_frame(sysex::KEEP_ALIVE, |b| push_u14(b, *period_secs as u32))
            }
            Command::AreYouThere => sysex_frame(sysex::ARE_YOU_THERE, |_| {}),
            Command::FirmwareQuery => sysex_frame(sysex::REPORT_FIRMWARE, |_| {}),
            Command::VersionQuery => vec![REPORT_VERSION],
            Command::CapabilityQuery => sysex_frame(sysex::CAPABILITY_QUERY, |_| {}),
            Command::AnalogMappingQuery => sysex_frame(sysex::ANALOG_MAPPING_QUERY, |_| {}),
            Command::PinStateQuery { pin } => {
                sysex_frame(sysex::PIN_STATE_QUERY, |b| b.push(*pin))
            }
            Command::ServoConfig {
                pin,
                min_pulse,
                max_pulse,
            } => sysex_frame(sysex::SERVO_CONFIG, |b| {
                b.push(*pin);
                push_u14(b, *min_pulse as u32);
                push_u14(b, *max_pulse as u32);
            }),
            Command::SonarConfig {
                trigger_pin,
                echo_pin,
                timeout_us,
            } => sysex_frame(sysex::SONAR_CONFIG, |b| {
                b.extend([*trigger_pin, *echo_pin]);
                push_u14(b, *timeout_us);
            }),
            Command::DhtConfig { pin, sensor_type } => {
                sysex_frame(sysex::DHT_CONFIG, |b| b.extend([*pin, *sensor_type]))
            }
            Command::Pm25Config { mode } => sysex_frame(sysex::PM25_CONFIG, |b| b.push(*mode)),
            Command::I2cConfig { read_delay_us } => {
                sysex_frame(sysex::I2C_CONFIG, |b| push_u14(b, *read_delay_us as u32))
            }
            Command::I2cRead {
                address,
                register,
                count,
                mode,
            } => sysex_frame(sysex::I2C_REQUEST, |b| {
                b.extend([*address, mode.as_byte()]);
                if let Some(register) = register {
                    push_u14(b, *register as u32);
                }
                push_u14(b, *count as u32);
            }),
            Command::I2cWrite { address, data } => sysex_frame(sysex::I2C_REQUEST, |b| {
                b.extend([*address, crate::constants::i2c::WRITE]);
                for byte in data {
                    push_u14(b, *byte as u32);
                }
            }),
            Command::Tone {
                pin,
                frequency,
                duration_ms,
            } => sysex_frame(sysex::TONE_DATA, |b| {
                b.extend([tone::TONE, *pin]);
                push_u14(b, *frequency as u32);
                push_u14(b, duration_ms.unwrap_or(0) as u32);
            }),
            Command::NoTone { pin } => {
                sysex_frame(sysex::TONE_DATA, |b| b.extend([tone::NO_TONE, *pin]))
            }
            Command::StepperConfig {
                steps_per_revolution,
                pins,
            } => sysex_frame(sysex::STEPPER_DATA, |b| {
                b.push(stepper::CONFIGURE);
                push_u14(b, *steps_per_revolution as u32);
                b.extend(pins);
            }),
            Command::StepperStep {
                speed,
                steps,
                forward,
            } => sysex_frame(sysex::STEPPER_DATA, |b| {
                b.push(stepper::STEP);
                push_u21(b, *speed);
                push_u14(b, *steps as u32);
                b.push(*forward as u8);
            }),
            Command::IrBeginReceiver => sysex_frame(sysex::IR_CONFIG, |b| b.push(ir::BEGIN)),
            Command::IrBeginSender => sysex_frame(sysex::IR_CONFIG, |b| b.push(ir::BEGIN_SENDER)),
            Command::IrSend { address, data } => sysex_frame(sysex::IR_CONFIG, |b| {
                b.push(ir::SEND);
                push_u14(b, *address as u32);
                push_u14(b, *data as u32);
            }),
            Command::SystemReset => vec![SYSTEM_RESET],
            Command::Lcd(cmd) => sysex_frame(sysex::LCD_CONFIG, |b| cmd.encode(b)),
            Command::Oled(cmd) => sysex_frame(sysex::OLED_CONFIG, |b| cmd.encode(b)),
            Command::Tft(cmd) => sysex_frame(sysex::LCDSCREEN_CONFIG, |b| cmd.encode(b)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn non_sysex_commands() {
        assert_eq!(
            Command::SetPinMode {
                pin: 13,
                mode: PinMode::Output
            }
            .to_bytes(),
            vec![0xF4, 13, 1]
        );
        assert_eq!(
            Command::DigitalPortWrite {
                port: 1,
                mask: 0xA0
            }
            .to_bytes(),
            vec![0x91, 0x20, 0x01]
        );
        assert_eq!(
            Command::DigitalPinWrite {
                pin: 5,
                value: true
            }
            .to_bytes(),
            vec![0xF5, 5, 1]
        );
        assert_eq!(
            Command::ReportDigital {
                port: 2,
                enable: false
            }
            .to_bytes(),
            vec![0xD2, 0]
        );
        assert_eq!(Command::VersionQuery.to_bytes(), vec![0xF9]);
        assert_eq!(Command::SystemReset.to_bytes(), vec![0xFF]);
    }

    #[test]
    fn analog_write_switches_to_extended_form() {
        assert_eq!(
            Command::AnalogWrite { pin: 9, value: 200 }.to_bytes(),
            vec![0xE9, 0x48, 0x01]
        );
        assert_eq!(
            Command::AnalogWrite {
                pin: 16,
                value: 200
            }
            .to_bytes(),
            vec![0xF0, 0x6F, 16, 0x48, 0x01, 0x00, 0xF7]
        );
    }

    #[test]
    fn queries_are_empty_sysex() {
        assert_eq!(Command::FirmwareQuery.to_bytes(), vec![0xF0, 0x79, 0xF7]);
        assert_eq!(Command::AreYouThere.to_bytes(), vec![0xF0, 0x51, 0xF7]);
        assert_eq!(
            Command::AnalogMappingQuery.to_bytes(),
            vec![0xF0, 0x69, 0xF7]
        );
        assert_eq!(
            Command::PinStateQuery { pin: 3 }.to_bytes(),
            vec![0xF0, 0x6D, 3, 0xF7]
        );
    }

    #[test]
    fn servo_and_sonar_config() {
        assert_eq!(
            Command::ServoConfig {
                pin: 5,
                min_pulse: 544,
                max_pulse: 2400
            }
            .to_bytes(),
            vec![0xF0, 0x70, 5, 0x20, 0x04, 0x60, 0x12, 0xF7]
        );
        assert_eq!(
            Command::SonarConfig {
                trigger_pin: 12,
                echo_pin: 13,
                timeout_us: 80_000
            }
            .to_bytes(),
            vec![0xF0, 0x62, 12, 13, 0x00, 0x71, 0xF7]
        );
    }

    #[test]
    fn i2c_requests() {
        assert_eq!(
            Command::I2cRead {
                address: 0x68,
                register: Some(0x3B),
                count: 6,
                mode: I2cReadMode::Once
            }
            .to_bytes(),
            vec![0xF0, 0x76, 0x68, 0x08, 0x3B, 0, 6, 0, 0xF7]
        );
        assert_eq!(
            Command::I2cRead {
                address: 0x1D,
                register: None,
                count: 2,
                mode: I2cReadMode::RestartTransmission
            }
            .to_bytes(),
            vec![0xF0, 0x76, 0x1D, 0x48, 2, 0, 0xF7]
        );
        assert_eq!(
            Command::I2cWrite {
                address: 0x68,
                data: vec![0x6B, 0x00]
            }
            .to_bytes(),
            vec![0xF0, 0x76, 0x68, 0x00, 0x6B, 0, 0, 0, 0xF7]
        );
    }

    #[test]
    fn tone_commands() {
        assert_eq!(
            Command::Tone {
                pin: 3,
                frequency: 1000,
                duration_ms: Some(500)
            }
            .to_bytes(),
            vec![0xF0, 0x5F, 0, 3, 0x68, 0x07, 0x74, 0x03, 0xF7]
        );
        assert_eq!(
            Command::Tone {
                pin: 3,
                frequency: 1000,
                duration_ms: None
            }
            .to_bytes(),
            vec![0xF0, 0x5F, 0, 3, 0x68, 0x07, 0, 0, 0xF7]
        );
        assert_eq!(
            Command::NoTone { pin: 3 }.to_bytes(),
            vec![0xF0, 0x5F, 1, 3, 0xF7]
        );
    }

    #[test]
    fn stepper_commands() {
        assert_eq!(
            Command::StepperConfig {
                steps_per_revolution: 512,
                pins: vec![8, 9, 10, 11]
            }
            .to_bytes(),
            vec![0xF0, 0x72, 0, 0x00, 0x04, 8, 9, 10, 11, 0xF7]
        );
        assert_eq!(
            Command::StepperStep {
                speed: 20_000,
                steps: 300,
                forward: false
            }
            .to_bytes(),
            vec![0xF0, 0x72, 1, 0x20, 0x1C, 0x01, 0x2C, 0x02, 0, 0xF7]
        );
    }

    #[test]
    fn keep_alive_and_sampling() {
        assert_eq!(
            Command::KeepAlive { period_secs: 2 }.to_bytes(),
            vec![0xF0, 0x50, 2, 0, 0xF7]
        );
        assert_eq!(
            Command::SamplingInterval { millis: 19 }.to_bytes(),
            vec![0xF0, 0x7A, 19, 0, 0xF7]
        );
    }

    #[test]
    fn sensors() {
        assert_eq!(
            Command::DhtConfig {
                pin: 8,
                sensor_type: 22
            }
            .to_bytes(),
            vec![0xF0, 0x64, 8, 22, 0xF7]
        );
        assert_eq!(
            Command::Pm25Config { mode: 0 }.to_bytes(),
            vec![0xF0, 0x66, 0, 0xF7]
        );
        assert_eq!(
            Command::IrSend {
                address: 0x00FF,
                data: 0x45
            }
            .to_bytes(),
            vec![0xF0, 0x53, 1, 0x7F, 0x01, 0x45, 0x00, 0xF7]
        );
    }

    #[test]
    fn display_wrappers() {
        assert_eq!(
            Command::Lcd(LcdCommand::Clear).to_bytes(),
            vec![0xF0, 0x7C, 0x02, 0xF7]
        );
        assert_eq!(
            Command::Oled(OledCommand::SetCursor { x: 2, y: 3 }).to_bytes(),
            vec![0xF0, 0x68, 0x04, 2, 3, 0xF7]
        );
    }
}
