use crate::{
    config::BoardConfig,
    event::Callback,
    pins::{PinTables, PortShadow},
    query::{PinState, QuerySlot},
    receiver, reporter,
    state::{lock, DhtEntry, I2cEntry, Shared, SonarEntry},
    transport::{self, Transport},
    Error, SHUTDOWN_MESSAGE_INTERVAL,
};
use chrono::{DateTime, Utc};
use kiddee_protocol::{
    constants::{pm25, DIGITAL_PORT_COUNT, MAX_SONARS},
    report::{FirmwareVersion, ProtocolVersion},
    types::{DhtReading, DhtType, I2cReadMode, PinCapabilities, PinMode},
    Command, CLIENT_VERSION, FIRMATA_EXPRESS_VERSION,
};
use log::{debug, info, trace, warn};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::{mpsc, watch},
    task::JoinHandle,
};

pub const DEFAULT_SERVO_MIN_PULSE: u16 = 544;
pub const DEFAULT_SERVO_MAX_PULSE: u16 = 2400;
pub const DEFAULT_SONAR_TIMEOUT_US: u32 = 80_000;
pub const DEFAULT_DHT_DIFFERENTIAL: f64 = 0.1;

const MAX_KEEP_ALIVE_PERIOD_SECS: u8 = 10;
const MIN_KEEP_ALIVE_MARGIN: Duration = Duration::from_millis(100);
const MAX_KEEP_ALIVE_MARGIN: Duration = Duration::from_millis(900);

const PM25_STOP_SETTLE: Duration = Duration::from_secs(1);

/// Most recent value of an input, and when it was reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading<T> {
    pub value: T,
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pm25Value {
    pub pm25: u16,
    pub pm10: u16,
    pub error: bool,
}

/// Bytes from an I2C reply, one per element, and the register they were
/// read from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct I2cData {
    pub register: u16,
    pub data: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IrCode {
    pub address: u16,
    pub data: u16,
}

/// Digital pin number of analog pin `pin`.
fn analog_to_digital(first_analog: usize, pin: u8) -> Result<u8, Error> {
    first_analog
        .checked_add(pin as usize)
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| Error::InvalidArgument(format!("analog pin A{pin} has no digital number")))
}

/// Reporting port of digital pin `pin`.
fn port_of(pin: u8) -> Result<u8, Error> {
    let port = pin / 8;
    if (port as usize) < DIGITAL_PORT_COUNT {
        Ok(port)
    } else {
        Err(Error::InvalidArgument(format!(
            "digital pin {pin} is beyond the last port"
        )))
    }
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Write half of the link. Every outgoing frame goes through the one lock,
/// so sysex frames from different tasks never interleave.
struct Writer {
    half: tokio::sync::Mutex<Option<BoxedWriter>>,
}

impl Writer {
    async fn send(&self, command: &Command) -> Result<(), Error> {
        let bytes = command.to_bytes();
        let mut half = self.half.lock().await;
        let half = half.as_mut().ok_or(Error::NotRunning)?;

        trace!("Tx: {bytes:02x?}");
        half.write_all(&bytes).await?;
        half.flush().await?;
        Ok(())
    }

    async fn close(&self) {
        if let Some(mut half) = self.half.lock().await.take() {
            if let Err(e) = half.shutdown().await {
                debug!("Closing link: {e}");
            }
        }
    }
}

struct Inner {
    writer: Arc<Writer>,
    shared: Arc<Shared>,
    config: BoardConfig,
    firmata_express: bool,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    keep_alive: Mutex<Option<JoinHandle<()>>>,
    ports: Mutex<PortShadow>,
}

/// Handle to a connected board. Cheap to clone; all clones drive the same
/// link.
#[derive(Clone)]
pub struct Board {
    inner: Arc<Inner>,
}

impl Board {
    /// Opens the link described by `config` and runs start-up.
    pub async fn connect(config: BoardConfig) -> Result<Self, Error> {
        let connection = transport::open(&config).await?;
        info!("Connected via {}", connection.description);
        Self::from_transport(connection.transport, config, connection.firmata_express).await
    }

    /// Runs start-up over an already opened link: spawns the receiver and
    /// reporter, checks the firmware and sizes the pin tables from the
    /// analog map.
    pub async fn from_transport<T: Transport>(
        transport: T,
        config: BoardConfig,
        firmata_express: bool,
    ) -> Result<Self, Error> {
        let (reader, writer) = tokio::io::split(transport);
        let shared = Arc::new(Shared::new());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (tx, rx) = mpsc::unbounded_channel();

        let tasks = vec![
            receiver::spawn(reader, tx, shutdown_rx.clone()),
            reporter::spawn(shared.clone(), rx, shutdown_rx),
        ];

        let board = Self {
            inner: Arc::new(Inner {
                writer: Arc::new(Writer {
                    half: tokio::sync::Mutex::new(Some(Box::new(writer))),
                }),
                shared,
                config,
                firmata_express,
                shutdown,
                tasks: Mutex::new(tasks),
                keep_alive: Mutex::new(None),
                ports: Mutex::default(),
            }),
        };

        match board.start().await {
            Ok(()) => Ok(board),
            Err(e) => {
                board.stop_tasks();
                board.inner.writer.close().await;
                Err(e)
            }
        }
    }

    async fn start(&self) -> Result<(), Error> {
        let firmware = self.get_firmware_version().await?;
        if self.inner.firmata_express && firmware.version_number() != FIRMATA_EXPRESS_VERSION {
            return Err(Error::UnsupportedFirmware {
                found: firmware.version_number(),
                expected: FIRMATA_EXPRESS_VERSION.to_owned(),
            });
        }
        info!("Firmware: {firmware}");

        let map = self.get_analog_map().await?;
        let tables = PinTables::from_analog_map(&map);
        info!(
            "Found {} digital and {} analog pins",
            tables.digital.len(),
            tables.analog.len()
        );
        *lock(&self.inner.shared.pins) = tables;

        self.set_sampling_interval(self.inner.config.sampling_interval)
            .await
    }

    pub fn config(&self) -> &BoardConfig {
        &self.inner.config
    }

    /// True when the board identified itself with `I_AM_HERE`.
    pub fn firmata_express(&self) -> bool {
        self.inner.firmata_express
    }

    pub fn digital_pin_count(&self) -> usize {
        lock(&self.inner.shared.pins).digital.len()
    }

    pub fn analog_pin_count(&self) -> usize {
        lock(&self.inner.shared.pins).analog.len()
    }

    /// Digital pin number of A0.
    pub fn first_analog_pin(&self) -> u8 {
        u8::try_from(lock(&self.inner.shared.pins).first_analog_pin()).unwrap_or(u8::MAX)
    }

    pub fn get_pymata_version(&self) -> &'static str {
        CLIENT_VERSION
    }

    pub(crate) async fn send(&self, command: Command) -> Result<(), Error> {
        self.inner.writer.send(&command).await
    }

    fn check_digital(&self, pin: u8) -> Result<(), Error> {
        let count = self.digital_pin_count();
        if (pin as usize) < count {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "digital pin {pin} out of range (board has {count})"
            )))
        }
    }

    fn check_analog(&self, pin: u8) -> Result<(), Error> {
        let count = self.analog_pin_count();
        if (pin as usize) < count {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "analog pin A{pin} out of range (board has {count})"
            )))
        }
    }

    // Reads

    /// Last reported value of analog pin `pin` (A0 is 0).
    pub fn analog_read(&self, pin: u8) -> Result<Reading<u16>, Error> {
        self.check_analog(pin)?;
        let pins = lock(&self.inner.shared.pins);
        let data = &pins.analog[pin as usize];
        Ok(Reading {
            value: data.value,
            time: data.event_time,
        })
    }

    pub fn digital_read(&self, pin: u8) -> Result<Reading<u8>, Error> {
        self.check_digital(pin)?;
        let pins = lock(&self.inner.shared.pins);
        let data = &pins.digital[pin as usize];
        Ok(Reading {
            value: data.value as u8,
            time: data.event_time,
        })
    }

    pub fn dht_read(&self, pin: u8) -> Result<Reading<DhtReading>, Error> {
        let map = lock(&self.inner.shared.dht);
        let entry = map
            .get(&pin)
            .ok_or_else(|| Error::InvalidArgument(format!("no DHT sensor on pin {pin}")))?;
        Ok(Reading {
            value: entry.reading,
            time: entry.time,
        })
    }

    pub fn pm25_read(&self) -> Reading<Pm25Value> {
        let entry = lock(&self.inner.shared.pm25);
        Reading {
            value: Pm25Value {
                pm25: entry.pm25,
                pm10: entry.pm10,
                error: entry.error,
            },
            time: entry.time,
        }
    }

    pub fn ir_read(&self) -> Reading<IrCode> {
        let entry = lock(&self.inner.shared.ir);
        Reading {
            value: IrCode {
                address: entry.address,
                data: entry.data,
            },
            time: entry.time,
        }
    }

    /// Last distance in centimetres; `0` with no timestamp for a pin that
    /// has no sonar configured.
    pub fn sonar_read(&self, trigger_pin: u8) -> Reading<u16> {
        match lock(&self.inner.shared.sonar).get(&trigger_pin) {
            Some(entry) => Reading {
                value: entry.distance_cm,
                time: entry.time,
            },
            None => Reading {
                value: 0,
                time: None,
            },
        }
    }

    /// Cached data from the last I2C reply for `address`, if any has
    /// arrived since the read was requested.
    pub fn i2c_read_saved_data(&self, address: u8) -> Option<Reading<I2cData>> {
        let map = lock(&self.inner.shared.i2c);
        let entry = map.get(&(address as u16))?;
        entry.data.clone().map(|data| Reading {
            value: I2cData {
                register: entry.register,
                data,
            },
            time: entry.time,
        })
    }

    // Writes

    /// Sets one output pin by rewriting its whole port from the shadow copy.
    pub async fn digital_write(&self, pin: u8, value: bool) -> Result<(), Error> {
        let (port, mask) = lock(&self.inner.ports)
            .set(pin, value)
            .ok_or_else(|| Error::InvalidArgument(format!("digital pin {pin} out of range")))?;
        self.send(Command::DigitalPortWrite { port, mask }).await
    }

    pub async fn digital_pin_write(&self, pin: u8, value: bool) -> Result<(), Error> {
        self.send(Command::DigitalPinWrite { pin, value }).await
    }

    pub async fn pwm_write(&self, pin: u8, value: u32) -> Result<(), Error> {
        self.send(Command::AnalogWrite { pin, value }).await
    }

    pub async fn analog_write(&self, pin: u8, value: u32) -> Result<(), Error> {
        self.pwm_write(pin, value).await
    }

    /// Moves a servo configured with [`Board::set_pin_mode_servo`].
    pub async fn servo_write(&self, pin: u8, position: u16) -> Result<(), Error> {
        self.pwm_write(pin, position as u32).await
    }

    /// Steps the stepper motor; positive `steps` runs forward.
    pub async fn stepper_write(&self, speed: u32, steps: i32) -> Result<(), Error> {
        if speed >= 1 << 21 {
            return Err(Error::InvalidArgument(format!(
                "stepper speed {speed} exceeds 21 bits"
            )));
        }
        let count = u16::try_from(steps.unsigned_abs())
            .ok()
            .filter(|count| *count < 1 << 14)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("stepper step count {steps} exceeds 14 bits"))
            })?;

        self.send(Command::StepperStep {
            speed,
            steps: count,
            forward: steps > 0,
        })
        .await
    }

    pub async fn play_tone(&self, pin: u8, frequency: u16, duration_ms: u16) -> Result<(), Error> {
        self.send(Command::Tone {
            pin,
            frequency,
            duration_ms: Some(duration_ms),
        })
        .await
    }

    /// Plays until [`Board::play_tone_off`].
    pub async fn play_tone_continuously(&self, pin: u8, frequency: u16) -> Result<(), Error> {
        self.send(Command::Tone {
            pin,
            frequency,
            duration_ms: None,
        })
        .await
    }

    pub async fn play_tone_off(&self, pin: u8) -> Result<(), Error> {
        self.send(Command::NoTone { pin }).await
    }

    pub async fn send_reset(&self) -> Result<(), Error> {
        self.send(Command::SystemReset).await
    }

    pub async fn i2c_write(&self, address: u8, data: &[u8]) -> Result<(), Error> {
        self.send(Command::I2cWrite {
            address,
            data: data.to_vec(),
        })
        .await
    }

    // Pin modes

    /// Registers an input callback and sends `SET_PIN_MODE`. Analog pins are
    /// numbered from A0; digital inputs also get port reporting enabled.
    async fn set_pin_mode(
        &self,
        pin: u8,
        mode: PinMode,
        callback: Option<Callback>,
        differential: u16,
    ) -> Result<(), Error> {
        let pin_number = {
            let mut pins = lock(&self.inner.shared.pins);
            let first_analog = pins.first_analog_pin();

            let table = if mode == PinMode::Analog {
                &mut pins.analog
            } else {
                &mut pins.digital
            };
            let data = table.get_mut(pin as usize).ok_or_else(|| {
                Error::InvalidArgument(format!("pin {pin} out of range for {mode} mode"))
            })?;

            match (mode, callback) {
                (PinMode::Input, Some(callback)) => data.callback = Some(callback),
                (PinMode::Pullup, Some(callback)) => {
                    data.callback = Some(callback);
                    data.pull_up = true;
                }
                (PinMode::Analog, Some(callback)) => {
                    data.callback = Some(callback);
                    data.differential = differential;
                }
                (mode, Some(_)) => warn!("Callback ignored for {mode} mode"),
                (_, None) => {}
            }

            if mode == PinMode::Analog {
                analog_to_digital(first_analog, pin)?
            } else {
                pin
            }
        };

        self.send(Command::SetPinMode {
            pin: pin_number,
            mode,
        })
        .await?;

        if matches!(mode, PinMode::Input | PinMode::Pullup) {
            self.enable_digital_reporting(pin_number).await?;
        }
        Ok(())
    }

    /// Analog pin `pin` is numbered from A0. The callback fires when the
    /// value moves by at least `differential`.
    pub async fn set_pin_mode_analog_input(
        &self,
        pin: u8,
        callback: Option<Callback>,
        differential: u16,
    ) -> Result<(), Error> {
        self.set_pin_mode(pin, PinMode::Analog, callback, differential)
            .await
    }

    pub async fn set_pin_mode_digital_input(
        &self,
        pin: u8,
        callback: Option<Callback>,
    ) -> Result<(), Error> {
        self.set_pin_mode(pin, PinMode::Input, callback, 1).await
    }

    pub async fn set_pin_mode_digital_input_pullup(
        &self,
        pin: u8,
        callback: Option<Callback>,
    ) -> Result<(), Error> {
        self.set_pin_mode(pin, PinMode::Pullup, callback, 1).await
    }

    pub async fn set_pin_mode_digital_output(&self, pin: u8) -> Result<(), Error> {
        self.set_pin_mode(pin, PinMode::Output, None, 1).await
    }

    pub async fn set_pin_mode_pwm_output(&self, pin: u8) -> Result<(), Error> {
        self.set_pin_mode(pin, PinMode::Pwm, None, 1).await
    }

    /// Pulse widths are in microseconds.
    pub async fn set_pin_mode_servo(
        &self,
        pin: u8,
        min_pulse: u16,
        max_pulse: u16,
    ) -> Result<(), Error> {
        self.send(Command::ServoConfig {
            pin,
            min_pulse,
            max_pulse,
        })
        .await
    }

    /// Configures an HC-SR04 style sensor. `echo_pin` defaults to the
    /// trigger pin. A trigger pin that is already configured is left alone.
    pub async fn set_pin_mode_sonar(
        &self,
        trigger_pin: u8,
        echo_pin: Option<u8>,
        callback: Option<Callback>,
        timeout_us: u32,
    ) -> Result<(), Error> {
        let echo_pin = echo_pin.unwrap_or(trigger_pin);
        {
            let mut map = lock(&self.inner.shared.sonar);
            if map.contains_key(&trigger_pin) {
                debug!("Sonar on pin {trigger_pin} already configured");
                return Ok(());
            }
            if map.len() >= MAX_SONARS {
                return Err(Error::InvalidArgument(format!(
                    "at most {MAX_SONARS} sonar devices are supported"
                )));
            }
            map.insert(
                trigger_pin,
                SonarEntry {
                    callback,
                    distance_cm: 0,
                    time: None,
                },
            );
        }

        self.send(Command::SetPinMode {
            pin: trigger_pin,
            mode: PinMode::Sonar,
        })
        .await?;
        self.send(Command::SetPinMode {
            pin: echo_pin,
            mode: PinMode::Sonar,
        })
        .await?;
        self.send(Command::SonarConfig {
            trigger_pin,
            echo_pin,
            timeout_us,
        })
        .await
    }

    /// Single stepper; `pins` holds either 2 or 4 control pins.
    pub async fn set_pin_mode_stepper(
        &self,
        steps_per_revolution: u16,
        pins: &[u8],
    ) -> Result<(), Error> {
        if !matches!(pins.len(), 2 | 4) {
            return Err(Error::InvalidArgument(format!(
                "stepper needs 2 or 4 pins, got {}",
                pins.len()
            )));
        }
        self.send(Command::StepperConfig {
            steps_per_revolution,
            pins: pins.to_vec(),
        })
        .await
    }

    pub async fn set_pin_mode_tone(&self, pin: u8) -> Result<(), Error> {
        self.send(Command::SetPinMode {
            pin,
            mode: PinMode::Tone,
        })
        .await
    }

    /// Must be called before any I2C request.
    pub async fn set_pin_mode_i2c(&self, read_delay_us: u16) -> Result<(), Error> {
        self.send(Command::I2cConfig { read_delay_us }).await
    }

    /// Configures a DHT sensor. Calling again for the same pin only updates
    /// the differential.
    pub async fn set_pin_mode_dht(
        &self,
        pin: u8,
        sensor_type: DhtType,
        differential: f64,
        callback: Option<Callback>,
    ) -> Result<(), Error> {
        self.check_digital(pin)?;
        {
            let mut map = lock(&self.inner.shared.dht);
            if let Some(entry) = map.get_mut(&pin) {
                entry.differential = differential;
                return Ok(());
            }
            map.insert(
                pin,
                DhtEntry {
                    callback,
                    differential,
                    reading: DhtReading::Valid {
                        humidity: 0.0,
                        temperature: 0.0,
                    },
                    time: None,
                },
            );
        }

        self.send(Command::DhtConfig {
            pin,
            sensor_type: sensor_type as u8,
        })
        .await
    }

    // Reporting

    pub async fn enable_analog_reporting(
        &self,
        pin: u8,
        callback: Option<Callback>,
        differential: u16,
    ) -> Result<(), Error> {
        self.set_pin_mode_analog_input(pin, callback, differential)
            .await
    }

    /// Returns analog pin `pin` (numbered from A0) to digital input.
    pub async fn disable_analog_reporting(&self, pin: u8) -> Result<(), Error> {
        self.check_analog(pin)?;
        let pin = analog_to_digital(lock(&self.inner.shared.pins).first_analog_pin(), pin)?;
        self.set_pin_mode_digital_input(pin, None).await
    }

    /// Reporting is per port, so this covers all 8 pins sharing `pin`'s port.
    pub async fn enable_digital_reporting(&self, pin: u8) -> Result<(), Error> {
        self.send(Command::ReportDigital {
            port: port_of(pin)?,
            enable: true,
        })
        .await
    }

    pub async fn disable_digital_reporting(&self, pin: u8) -> Result<(), Error> {
        self.send(Command::ReportDigital {
            port: port_of(pin)?,
            enable: false,
        })
        .await
    }

    pub async fn set_sampling_interval(&self, millis: u16) -> Result<(), Error> {
        self.send(Command::SamplingInterval { millis }).await
    }

    // I2C

    async fn i2c_read_request(
        &self,
        address: u8,
        register: Option<u16>,
        count: u16,
        mode: I2cReadMode,
        callback: Option<Callback>,
    ) -> Result<(), Error> {
        {
            let mut map = lock(&self.inner.shared.i2c);
            let key = address as u16;
            if !map.contains_key(&key) || callback.is_some() {
                map.insert(
                    key,
                    I2cEntry {
                        callback,
                        register: register.unwrap_or(0),
                        data: None,
                        time: None,
                    },
                );
            }
        }

        self.send(Command::I2cRead {
            address,
            register,
            count,
            mode,
        })
        .await
    }

    /// Reads `count` bytes once. Results arrive through the callback or
    /// [`Board::i2c_read_saved_data`].
    pub async fn i2c_read(
        &self,
        address: u8,
        register: Option<u16>,
        count: u16,
        callback: Option<Callback>,
    ) -> Result<(), Error> {
        self.i2c_read_request(address, register, count, I2cReadMode::Once, callback)
            .await
    }

    pub async fn i2c_read_continuous(
        &self,
        address: u8,
        register: Option<u16>,
        count: u16,
        callback: Option<Callback>,
    ) -> Result<(), Error> {
        self.i2c_read_request(address, register, count, I2cReadMode::Continuous, callback)
            .await
    }

    /// Single read that restarts the transmission afterwards, as needed by
    /// devices such as the MMA8452Q.
    pub async fn i2c_read_restart_transmission(
        &self,
        address: u8,
        register: Option<u16>,
        count: u16,
        callback: Option<Callback>,
    ) -> Result<(), Error> {
        self.i2c_read_request(
            address,
            register,
            count,
            I2cReadMode::RestartTransmission,
            callback,
        )
        .await
    }

    // Queries

    async fn query<T: Clone>(
        &self,
        slot: &QuerySlot<T>,
        command: Command,
        what: &'static str,
    ) -> Result<T, Error> {
        slot.clear();
        self.send(command).await?;
        slot.wait(self.inner.config.query_timeout)
            .await
            .ok_or(Error::Timeout(what))
    }

    pub async fn get_firmware_version(&self) -> Result<FirmwareVersion, Error> {
        let replies = &self.inner.shared.replies;
        self.query(&replies.firmware, Command::FirmwareQuery, "firmware version")
            .await
    }

    pub async fn get_protocol_version(&self) -> Result<ProtocolVersion, Error> {
        let replies = &self.inner.shared.replies;
        self.query(&replies.version, Command::VersionQuery, "protocol version")
            .await
    }

    pub async fn get_capability_report(&self) -> Result<Vec<PinCapabilities>, Error> {
        let replies = &self.inner.shared.replies;
        self.query(
            &replies.capabilities,
            Command::CapabilityQuery,
            "capability report",
        )
        .await
    }

    pub async fn get_analog_map(&self) -> Result<Vec<u8>, Error> {
        let replies = &self.inner.shared.replies;
        self.query(&replies.analog_map, Command::AnalogMappingQuery, "analog map")
            .await
    }

    pub async fn get_pin_state(&self, pin: u8) -> Result<PinState, Error> {
        let replies = &self.inner.shared.replies;
        let state = self
            .query(&replies.pin_state, Command::PinStateQuery { pin }, "pin state")
            .await;
        replies.pin_state.clear();
        state
    }

    // Sensors

    /// Starts the PM2.5 sensor. Its error flag is ignored for the first
    /// second while it spins up.
    pub async fn start_pm25(&self, mode: u8, callback: Option<Callback>) -> Result<(), Error> {
        {
            let mut entry = lock(&self.inner.shared.pm25);
            entry.started = Some(Utc::now());
            if callback.is_some() {
                entry.callback = callback;
            }
        }
        self.send(Command::Pm25Config { mode }).await
    }

    pub async fn stop_pm25(&self) -> Result<(), Error> {
        self.send(Command::Pm25Config { mode: pm25::STOP }).await?;
        tokio::time::sleep(PM25_STOP_SETTLE).await;
        Ok(())
    }

    /// Starts the IR receiver on pin 2. Only the first call has any effect.
    pub async fn ir_start_receiver(&self, callback: Option<Callback>) -> Result<(), Error> {
        {
            let mut entry = lock(&self.inner.shared.ir);
            if entry.receiving {
                return Ok(());
            }
            entry.receiving = true;
            entry.callback = callback;
        }
        self.send(Command::IrBeginReceiver).await?;
        info!("Started IR receiver on pin 2");
        Ok(())
    }

    /// Starts the IR sender on pin 3.
    pub async fn ir_start_sender(&self) -> Result<(), Error> {
        self.send(Command::IrBeginSender).await?;
        info!("Started IR sender on pin 3");
        Ok(())
    }

    pub async fn ir_send(&self, address: u16, data: u16) -> Result<(), Error> {
        self.send(Command::IrSend { address, data }).await
    }

    // Keep-alive

    /// Asks the board to reset itself if it hears nothing for
    /// `period_secs`, and keeps it alive by sending `KEEP_ALIVE` every
    /// `period - margin`. A period of 0 disables the mechanism.
    pub async fn keep_alive(&self, period_secs: u8, margin: Duration) -> Result<(), Error> {
        let period_secs = period_secs.min(MAX_KEEP_ALIVE_PERIOD_SECS);
        let margin = margin.clamp(MIN_KEEP_ALIVE_MARGIN, MAX_KEEP_ALIVE_MARGIN);

        if let Some(task) = lock(&self.inner.keep_alive).take() {
            task.abort();
        }

        let command = Command::KeepAlive { period_secs };
        if period_secs == 0 {
            return self.send(command).await;
        }

        let interval = Duration::from_secs(period_secs as u64) - margin;
        let writer = self.inner.writer.clone();
        let mut shutdown = self.inner.shutdown.subscribe();

        debug!("Keep-alive every {interval:?}");
        let task = tokio::spawn(async move {
            loop {
                if let Err(e) = writer.send(&command).await {
                    warn!("Keep-alive failed: {e}");
                    break;
                }
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.wait_for(|stop| *stop) => break,
                }
            }
        });
        *lock(&self.inner.keep_alive) = Some(task);
        Ok(())
    }

    // Shutdown

    fn stop_tasks(&self) {
        self.inner.shutdown.send_replace(true);
        if let Some(task) = lock(&self.inner.keep_alive).take() {
            task.abort();
        }
        for task in lock(&self.inner.tasks).drain(..) {
            task.abort();
        }
    }

    /// Stops background tasks, turns off all reporting, resets the board and
    /// closes the link. Errors along the way are ignored.
    pub async fn shutdown(&self) {
        info!("Shutting down");
        self.stop_tasks();

        let (analog, digital) = {
            let pins = lock(&self.inner.shared.pins);
            (pins.analog.len(), pins.digital.len())
        };

        for pin in (0..=u8::MAX).take(analog) {
            if let Err(e) = self.disable_analog_reporting(pin).await {
                debug!("Ignoring shutdown error: {e}");
            }
            tokio::time::sleep(SHUTDOWN_MESSAGE_INTERVAL).await;
        }
        for pin in (0..=u8::MAX).take(digital) {
            if let Err(e) = self.disable_digital_reporting(pin).await {
                debug!("Ignoring shutdown error: {e}");
            }
            tokio::time::sleep(SHUTDOWN_MESSAGE_INTERVAL).await;
        }
        if let Err(e) = self.send_reset().await {
            debug!("Ignoring shutdown error: {e}");
        }

        self.inner.writer.close().await;
    }
}
