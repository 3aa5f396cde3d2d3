use crate::{Board, Error};
use log::info;
use std::time::Duration;

/// Pins of a two-channel H-bridge. Channel A drives the right wheel and
/// channel B the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorPins {
    pub ai1: u8,
    pub ai2: u8,
    pub pwma: u8,
    pub bi1: u8,
    pub bi2: u8,
    pub pwmb: u8,
}

impl MotorPins {
    const fn new(pins: [u8; 6]) -> Self {
        let [ai1, ai2, pwma, bi1, bi2, pwmb] = pins;
        Self {
            ai1,
            ai2,
            pwma,
            bi1,
            bi2,
            pwmb,
        }
    }

    /// Wiring of the Kiddee DIY car revisions `v1` to `v6`.
    pub fn preset(version: &str) -> Option<Self> {
        let pins = match version {
            "v1" => [11, 12, 13, 2, 3, 4],
            "v2" | "v3" => [13, 12, 11, 2, 4, 3],
            "v4" | "v5" => [13, 12, 11, 7, 8, 9],
            "v6" => [13, 12, 11, 7, 8, 6],
            _ => return None,
        };
        Some(Self::new(pins))
    }
}

impl Default for MotorPins {
    fn default() -> Self {
        Self::new([13, 12, 11, 7, 8, 9])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Both inputs low.
    Stop,
    /// IN1 high.
    Forward,
    /// IN2 high.
    Reverse,
}

pub struct MotorDriver {
    board: Board,
    pins: MotorPins,
}

impl MotorDriver {
    /// Configures the driver pins and stops both motors.
    pub async fn start(board: &Board, pins: MotorPins) -> Result<Self, Error> {
        info!("Starting motor driver on {pins:?}");
        for pin in [pins.ai1, pins.ai2, pins.bi1, pins.bi2] {
            board.set_pin_mode_digital_output(pin).await?;
        }
        board.set_pin_mode_pwm_output(pins.pwma).await?;
        board.set_pin_mode_pwm_output(pins.pwmb).await?;

        let driver = Self {
            board: board.clone(),
            pins,
        };
        driver.stop().await?;
        Ok(driver)
    }

    pub fn pins(&self) -> MotorPins {
        self.pins
    }

    async fn set_direction(&self, in1: u8, in2: u8, direction: Direction) -> Result<(), Error> {
        let (high1, high2) = match direction {
            Direction::Stop => (false, false),
            Direction::Forward => (true, false),
            Direction::Reverse => (false, true),
        };
        self.board.digital_write(in1, high1).await?;
        self.board.digital_write(in2, high2).await
    }

    pub async fn set_direction_a(&self, direction: Direction) -> Result<(), Error> {
        self.set_direction(self.pins.ai1, self.pins.ai2, direction)
            .await
    }

    pub async fn set_direction_b(&self, direction: Direction) -> Result<(), Error> {
        self.set_direction(self.pins.bi1, self.pins.bi2, direction)
            .await
    }

    pub async fn set_speed(&self, a: u8, b: u8) -> Result<(), Error> {
        self.board.pwm_write(self.pins.pwma, a as u32).await?;
        self.board.pwm_write(self.pins.pwmb, b as u32).await
    }

    pub async fn stop(&self) -> Result<(), Error> {
        self.set_direction_a(Direction::Stop).await?;
        self.set_direction_b(Direction::Stop).await?;
        self.set_speed(0, 0).await
    }

    /// Signed speeds in `-255..=255`; the sign picks the direction.
    pub async fn set_speed_signed(&self, a: i16, b: i16) -> Result<(), Error> {
        let split = |speed: i16| -> Result<(Direction, u8), Error> {
            let magnitude = u8::try_from(speed.unsigned_abs()).map_err(|_| {
                Error::InvalidArgument(format!("motor speed {speed} outside -255..=255"))
            })?;
            let direction = match speed {
                0 => Direction::Stop,
                s if s < 0 => Direction::Reverse,
                _ => Direction::Forward,
            };
            Ok((direction, magnitude))
        };

        let (direction_a, speed_a) = split(a)?;
        let (direction_b, speed_b) = split(b)?;
        self.set_direction_a(direction_a).await?;
        self.set_direction_b(direction_b).await?;
        self.set_speed(speed_a, speed_b).await
    }

    async fn drive(&self, left: i16, right: i16, duration: Option<Duration>) -> Result<(), Error> {
        self.set_speed_signed(right, left).await?;
        if let Some(duration) = duration {
            tokio::time::sleep(duration).await;
            self.stop().await?;
        }
        Ok(())
    }

    pub async fn move_forward(&self, power: u8, duration: Option<Duration>) -> Result<(), Error> {
        let speed = scale(power);
        self.drive(speed, speed, duration).await
    }

    pub async fn move_backward(&self, power: u8, duration: Option<Duration>) -> Result<(), Error> {
        let speed = scale(power);
        self.drive(-speed, -speed, duration).await
    }

    /// Pivots left on the stopped left wheel.
    pub async fn turn_left(&self, power: u8, duration: Option<Duration>) -> Result<(), Error> {
        self.drive(0, scale(power), duration).await
    }

    pub async fn turn_right(&self, power: u8, duration: Option<Duration>) -> Result<(), Error> {
        self.drive(scale(power), 0, duration).await
    }

    /// Drives each wheel forward at its own power percentage.
    pub async fn move_wheels(
        &self,
        left: u8,
        right: u8,
        duration: Option<Duration>,
    ) -> Result<(), Error> {
        self.drive(scale(left), scale(right), duration).await
    }
}

/// Power percentage, clamped to 100, to a PWM duty of `0..=255`.
fn scale(power: u8) -> i16 {
    power.min(100) as i16 * 255 / 100
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::connect_fake;

    #[test]
    fn presets() {
        assert_eq!(MotorPins::preset("v5"), Some(MotorPins::default()));
        assert_eq!(MotorPins::preset("v2"), MotorPins::preset("v3"));
        assert_eq!(MotorPins::preset("v6").unwrap().pwmb, 6);
        assert_eq!(MotorPins::preset("v1").unwrap().ai1, 11);
        assert_eq!(MotorPins::preset("v7"), None);
    }

    #[test]
    fn power_scaling() {
        assert_eq!(scale(0), 0);
        assert_eq!(scale(50), 127);
        assert_eq!(scale(100), 255);
        assert_eq!(scale(250), 255);
    }

    #[tokio::test]
    async fn start_configures_and_stops() {
        let (board, fake) = connect_fake().await;
        MotorDriver::start(&board, MotorPins::default())
            .await
            .unwrap();

        assert_eq!(
            fake.take(18).await,
            vec![
                0xF4, 13, 0x01, 0xF4, 12, 0x01, 0xF4, 7, 0x01, 0xF4, 8, 0x01, 0xF4, 11, 0x03,
                0xF4, 9, 0x03,
            ]
        );
        // Four direction writes then both PWM channels at zero.
        let stop = fake.take(18).await;
        assert_eq!(&stop[12..], &[0xEB, 0x00, 0x00, 0xE9, 0x00, 0x00]);
    }

    #[tokio::test]
    async fn turn_left_drives_right_wheel_only() {
        let (board, fake) = connect_fake().await;
        let motor = MotorDriver::start(&board, MotorPins::default())
            .await
            .unwrap();
        fake.take(36).await;

        motor.turn_left(100, None).await.unwrap();
        let sent = fake.take(18).await;
        // Channel A (right wheel) forward: AI1 (13) high, AI2 (12) low on
        // the same port.
        assert_eq!(&sent[..6], &[0x91, 0x20, 0x00, 0x91, 0x20, 0x00]);
        // Channel B stopped, then PWMA 255 and PWMB 0.
        assert_eq!(&sent[12..], &[0xEB, 0x7F, 0x01, 0xE9, 0x00, 0x00]);
    }

    #[tokio::test]
    async fn signed_speed_out_of_range() {
        let (board, _fake) = connect_fake().await;
        let motor = MotorDriver::start(&board, MotorPins::default())
            .await
            .unwrap();
        assert!(matches!(
            motor.set_speed_signed(300, 0).await,
            Err(Error::InvalidArgument(_))
        ));
    }
}
