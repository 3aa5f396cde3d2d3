use clap::Subcommand;
use kiddee_board::{
    protocol::types::DhtType, Board, Error, DEFAULT_DHT_DIFFERENTIAL, DEFAULT_SONAR_TIMEOUT_US,
};
use log::{info, warn};
use std::time::Duration;

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Firmware, protocol and pin counts
    Info,
    AnalogMap,
    Capabilities,
    PinState {
        pin: u8,
    },

    DigitalWrite {
        pin: u8,
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
    PwmWrite {
        pin: u8,
        value: u32,
    },
    ServoWrite {
        pin: u8,
        position: u16,
    },
    Tone {
        pin: u8,
        frequency: u16,
        /// Milliseconds
        #[arg(default_value_t = 500)]
        duration: u16,
    },

    /// Read an analog input, numbered from A0
    AnalogRead {
        pin: u8,
    },
    DigitalRead {
        pin: u8,
        #[arg(long)]
        pullup: bool,
    },
    Sonar {
        trigger: u8,
        echo: Option<u8>,
    },
    Dht {
        pin: u8,
        /// 11 or 22
        #[arg(long, default_value_t = 22)]
        sensor: u8,
    },
}

/// Time allowed for a newly configured input to report its first value.
const SETTLE: Duration = Duration::from_millis(200);

async fn configure(board: &Board, command: &Command) -> Result<(), Error> {
    match command {
        Command::ServoWrite { pin, .. } => {
            board
                .set_pin_mode_servo(
                    *pin,
                    kiddee_board::DEFAULT_SERVO_MIN_PULSE,
                    kiddee_board::DEFAULT_SERVO_MAX_PULSE,
                )
                .await?
        }
        Command::DigitalWrite { pin, .. } => board.set_pin_mode_digital_output(*pin).await?,
        Command::PwmWrite { pin, .. } => board.set_pin_mode_pwm_output(*pin).await?,
        Command::Tone { pin, .. } => board.set_pin_mode_tone(*pin).await?,
        Command::AnalogRead { pin } => board.set_pin_mode_analog_input(*pin, None, 1).await?,
        Command::DigitalRead { pin, pullup: true } => {
            board.set_pin_mode_digital_input_pullup(*pin, None).await?
        }
        Command::DigitalRead { pin, pullup: false } => {
            board.set_pin_mode_digital_input(*pin, None).await?
        }
        Command::Sonar { trigger, echo } => {
            board
                .set_pin_mode_sonar(*trigger, *echo, None, DEFAULT_SONAR_TIMEOUT_US)
                .await?
        }
        Command::Dht { pin, sensor } => {
            let sensor_type = DhtType::from_repr(*sensor).ok_or_else(|| {
                Error::InvalidArgument(format!("unknown DHT sensor type {sensor}"))
            })?;
            board
                .set_pin_mode_dht(*pin, sensor_type, DEFAULT_DHT_DIFFERENTIAL, None)
                .await?
        }
        _ => return Ok(()),
    }
    tokio::time::sleep(SETTLE).await;
    Ok(())
}

async fn execute(board: &Board, command: &Command) -> Result<(), Error> {
    match command {
        Command::Info => {
            info!("Client version: {}", board.get_pymata_version());
            info!("Firmware: {:?}", board.get_firmware_version().await?);
            info!("Protocol: {}", board.get_protocol_version().await?);
            info!(
                "{} digital pins, {} analog pins (A0 = D{})",
                board.digital_pin_count(),
                board.analog_pin_count(),
                board.first_analog_pin()
            );
        }
        Command::AnalogMap => info!("Analog map: {:?}", board.get_analog_map().await?),
        Command::Capabilities => {
            for pin in board.get_capability_report().await? {
                let modes: Vec<_> = pin
                    .modes
                    .iter()
                    .map(|m| match m.pin_mode() {
                        Some(mode) => format!("{mode}({})", m.resolution),
                        None => format!("{:#04x}({})", m.mode, m.resolution),
                    })
                    .collect();
                info!("D{}: {}", pin.pin, modes.join(", "));
            }
        }
        Command::PinState { pin } => info!("{:#?}", board.get_pin_state(*pin).await?),
        Command::DigitalWrite { pin, value } => board.digital_write(*pin, *value).await?,
        Command::PwmWrite { pin, value } => board.pwm_write(*pin, *value).await?,
        Command::ServoWrite { pin, position } => board.servo_write(*pin, *position).await?,
        Command::Tone {
            pin,
            frequency,
            duration,
        } => {
            board.play_tone(*pin, *frequency, *duration).await?;
            tokio::time::sleep(Duration::from_millis(*duration as u64)).await;
        }
        Command::AnalogRead { pin } => info!("A{pin}: {:?}", board.analog_read(*pin)?),
        Command::DigitalRead { pin, .. } => info!("D{pin}: {:?}", board.digital_read(*pin)?),
        Command::Sonar { trigger, .. } => {
            info!("Sonar {trigger}: {:?}", board.sonar_read(*trigger))
        }
        Command::Dht { pin, .. } => info!("DHT {pin}: {:?}", board.dht_read(*pin)?),
    }
    Ok(())
}

pub(crate) async fn run(board: &Board, command: &Command, repeat: Option<u64>) -> Result<(), Error> {
    configure(board, command).await?;

    let mut ticker = tokio::time::interval(match repeat {
        Some(ms) => Duration::from_millis(ms),
        None => Duration::MAX,
    });
    ticker.tick().await;

    loop {
        match execute(board, command).await {
            Ok(()) => {}
            Err(e) if repeat.is_some() => warn!("Command failed: {e}"),
            Err(e) => return Err(e),
        }

        if repeat.is_none() {
            break Ok(());
        } else {
            ticker.tick().await;
        }
    }
}
