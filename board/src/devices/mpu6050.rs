use crate::{Board, Callback, Error, Event};
use chrono::{DateTime, Utc};
use kiddee_protocol::{constants::sysex, DecodeError};
use log::{debug, warn};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub const DEFAULT_ADDRESS: u8 = 0x68;

const PWR_MGMT_1: u8 = 0x6B;
const ACCEL_XOUT_H: u8 = 0x3B;
const GYRO_XOUT_H: u8 = 0x43;

const ACCEL_OFFSET_REGISTERS: [u8; 3] = [0x06, 0x08, 0x0A];
const GYRO_OFFSET_REGISTERS: [u8; 3] = [0x13, 0x15, 0x17];

/// LSB per g at the default +-2 g range.
const ACCEL_SCALE: f64 = 16384.0;
/// LSB per degree/s at the default +-250 deg/s range.
const GYRO_SCALE: f64 = 131.0;

const READ_TIMEOUT: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    fn scaled(words: &[i16], scale: f64) -> Self {
        let axis = |i: usize| words.get(i).copied().unwrap_or_default() as f64 / scale;
        Self {
            x: axis(0),
            y: axis(1),
            z: axis(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionReading {
    /// g
    pub accel: Vector3,
    /// Degrees per second.
    pub gyro: Vector3,
    /// Degrees Celsius.
    pub temperature: f64,
}

impl MotionReading {
    /// Decodes the 7 words starting at `ACCEL_XOUT_H`: accelerometer,
    /// temperature, gyroscope.
    fn from_words(words: &[i16]) -> Self {
        Self {
            accel: Vector3::scaled(&words[..3], ACCEL_SCALE),
            temperature: words[3] as f64 / 340.0 + 36.53,
            gyro: Vector3::scaled(&words[4..], GYRO_SCALE),
        }
    }
}

/// A sample delivered to a motion callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    Accelerometer(Vector3),
    Gyroscope(Vector3),
    All(MotionReading),
}

pub type MotionCallback = Arc<dyn Fn(Motion, DateTime<Utc>) + Send + Sync>;

/// Pitch-style rotation about X in degrees from an accelerometer vector.
pub fn rotation_x(v: Vector3) -> f64 {
    v.y.atan2((v.x * v.x + v.z * v.z).sqrt()).to_degrees()
}

pub fn rotation_y(v: Vector3) -> f64 {
    -v.x.atan2((v.y * v.y + v.z * v.z).sqrt()).to_degrees()
}

/// Big-endian byte pairs to signed words. A trailing odd byte is dropped.
fn to_words(bytes: &[u16]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| (((pair[0] & 0xFF) << 8) | (pair[1] & 0xFF)) as i16)
        .collect()
}

/// MPU6050 accelerometer and gyroscope on the board's I2C bus.
pub struct Mpu6050 {
    board: Board,
    address: u8,
}

impl Mpu6050 {
    /// Enables I2C and wakes the sensor from sleep.
    pub async fn start(board: &Board, address: u8) -> Result<Self, Error> {
        board.set_pin_mode_i2c(0).await?;
        board.i2c_write(address, &[PWR_MGMT_1, 0]).await?;
        debug!("MPU6050 at {address:#04x} started");
        Ok(Self {
            board: board.clone(),
            address,
        })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Requests `count` words from `register` and waits for a reply newer
    /// than whatever was cached before the request.
    async fn read_words(&self, register: u8, count: usize) -> Result<Vec<i16>, Error> {
        let previous = self
            .board
            .i2c_read_saved_data(self.address)
            .and_then(|reading| reading.time);

        self.board
            .i2c_read(self.address, Some(register as u16), (count * 2) as u16, None)
            .await?;

        let started = Instant::now();
        loop {
            if let Some(reading) = self.board.i2c_read_saved_data(self.address) {
                if reading.time.is_some() && reading.time != previous {
                    let data = &reading.value.data;
                    if data.len() < count * 2 {
                        return Err(DecodeError::TooShort {
                            command: sysex::I2C_REPLY,
                            expected: count * 2,
                            actual: data.len(),
                        }
                        .into());
                    }
                    return Ok(to_words(data));
                }
            }
            if started.elapsed() > READ_TIMEOUT {
                return Err(Error::Timeout("MPU6050 reply"));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn read_accelerometer(&self) -> Result<Vector3, Error> {
        let words = self.read_words(ACCEL_XOUT_H, 3).await?;
        Ok(Vector3::scaled(&words, ACCEL_SCALE))
    }

    pub async fn read_gyroscope(&self) -> Result<Vector3, Error> {
        let words = self.read_words(GYRO_XOUT_H, 3).await?;
        Ok(Vector3::scaled(&words, GYRO_SCALE))
    }

    pub async fn read_all(&self) -> Result<MotionReading, Error> {
        let words = self.read_words(ACCEL_XOUT_H, 7).await?;
        Ok(MotionReading::from_words(&words))
    }

    async fn read_with_callback(
        &self,
        register: u8,
        count: u16,
        callback: MotionCallback,
    ) -> Result<(), Error> {
        let wrapped: Callback = Arc::new(move |event| {
            let Event::I2c {
                register,
                data,
                time,
                ..
            } = event
            else {
                return;
            };
            let words = to_words(&data);
            let motion = match (register as u8, words.len()) {
                (ACCEL_XOUT_H, 7) => Motion::All(MotionReading::from_words(&words)),
                (ACCEL_XOUT_H, 3) => Motion::Accelerometer(Vector3::scaled(&words, ACCEL_SCALE)),
                (GYRO_XOUT_H, 3) => Motion::Gyroscope(Vector3::scaled(&words, GYRO_SCALE)),
                (register, len) => {
                    warn!("Unexpected MPU6050 reply: register {register:#04x}, {len} words");
                    return;
                }
            };
            callback(motion, time);
        });

        self.board
            .i2c_read(self.address, Some(register as u16), count, Some(wrapped))
            .await
    }

    /// Requests one accelerometer sample delivered through `callback`.
    pub async fn read_accelerometer_with(&self, callback: MotionCallback) -> Result<(), Error> {
        self.read_with_callback(ACCEL_XOUT_H, 6, callback).await
    }

    pub async fn read_gyroscope_with(&self, callback: MotionCallback) -> Result<(), Error> {
        self.read_with_callback(GYRO_XOUT_H, 6, callback).await
    }

    pub async fn read_all_with(&self, callback: MotionCallback) -> Result<(), Error> {
        self.read_with_callback(ACCEL_XOUT_H, 14, callback).await
    }

    /// Writes the accelerometer and gyroscope calibration offsets.
    pub async fn set_offsets(&self, accel: [i16; 3], gyro: [i16; 3]) -> Result<(), Error> {
        let registers = ACCEL_OFFSET_REGISTERS.iter().chain(&GYRO_OFFSET_REGISTERS);
        let values = accel.iter().chain(&gyro);
        for (register, value) in registers.zip(values) {
            let [hi, lo] = value.to_be_bytes();
            self.board
                .i2c_write(self.address, &[*register, hi, lo])
                .await?;
        }
        Ok(())
    }

    /// Reads back `(accel, gyro)` offsets, one register at a time.
    pub async fn get_offsets(&self) -> Result<([i16; 3], [i16; 3]), Error> {
        let mut accel = [0; 3];
        let mut gyro = [0; 3];
        for (slot, register) in accel.iter_mut().zip(ACCEL_OFFSET_REGISTERS) {
            *slot = self.read_words(register, 1).await?[0];
        }
        for (slot, register) in gyro.iter_mut().zip(GYRO_OFFSET_REGISTERS) {
            *slot = self.read_words(register, 1).await?[0];
        }
        Ok((accel, gyro))
    }
}
