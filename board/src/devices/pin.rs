use crate::{Board, Error, Reading};

/// How a [`DigitalPin`] should be driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitalMode {
    Input,
    Output,
    Pwm,
}

/// A digital pin whose mode is sent to the board on first use rather than
/// up front.
pub struct DigitalPin {
    board: Board,
    pin: u8,
    mode: Option<DigitalMode>,
    applied: Option<DigitalMode>,
}

impl DigitalPin {
    pub fn new(board: &Board, pin: u8) -> Self {
        Self {
            board: board.clone(),
            pin,
            mode: None,
            applied: None,
        }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn set_mode(&mut self, mode: DigitalMode) {
        self.mode = Some(mode);
    }

    async fn apply(&mut self) -> Result<Option<DigitalMode>, Error> {
        if self.mode != self.applied {
            match self.mode {
                Some(DigitalMode::Input) => {
                    self.board.set_pin_mode_digital_input(self.pin, None).await?
                }
                Some(DigitalMode::Output) => {
                    self.board.set_pin_mode_digital_output(self.pin).await?
                }
                Some(DigitalMode::Pwm) => self.board.set_pin_mode_pwm_output(self.pin).await?,
                None => {}
            }
            self.applied = self.mode;
        }
        Ok(self.applied)
    }

    /// Writes a level in output mode or a duty cycle in PWM mode.
    pub async fn write(&mut self, value: u32) -> Result<(), Error> {
        match self.apply().await? {
            Some(DigitalMode::Output) => self.board.digital_write(self.pin, value != 0).await,
            Some(DigitalMode::Pwm) => self.board.pwm_write(self.pin, value).await,
            mode => Err(Error::InvalidArgument(format!(
                "pin {} is not an output (mode {mode:?})",
                self.pin
            ))),
        }
    }

    pub async fn read(&mut self) -> Result<Reading<u8>, Error> {
        match self.apply().await? {
            Some(DigitalMode::Input) => self.board.digital_read(self.pin),
            mode => Err(Error::InvalidArgument(format!(
                "pin {} is not an input (mode {mode:?})",
                self.pin
            ))),
        }
    }
}

/// An analog input, numbered from A0. Reporting is enabled on the first
/// read.
pub struct AnalogPin {
    board: Board,
    pin: u8,
    enabled: bool,
}

impl AnalogPin {
    pub fn new(board: &Board, pin: u8) -> Self {
        Self {
            board: board.clone(),
            pin,
            enabled: false,
        }
    }

    pub async fn read(&mut self) -> Result<Reading<u16>, Error> {
        if !self.enabled {
            self.board
                .set_pin_mode_analog_input(self.pin, None, 1)
                .await?;
            self.enabled = true;
        }
        self.board.analog_read(self.pin)
    }
}

impl Board {
    pub fn digital_pin(&self, pin: u8) -> DigitalPin {
        DigitalPin::new(self, pin)
    }

    pub fn analog_pin(&self, pin: u8) -> AnalogPin {
        AnalogPin::new(self, pin)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::connect_fake;

    #[tokio::test]
    async fn mode_applied_once_on_first_write() {
        let (board, fake) = connect_fake().await;
        let mut led = board.digital_pin(13);

        assert!(matches!(led.write(1).await, Err(Error::InvalidArgument(_))));

        led.set_mode(DigitalMode::Output);
        led.write(1).await.unwrap();
        led.write(0).await.unwrap();

        assert_eq!(
            fake.take(9).await,
            vec![0xF4, 13, 0x01, 0x91, 0x20, 0x00, 0x91, 0x00, 0x00]
        );
        assert!(led.read().await.is_err());
    }

    #[tokio::test]
    async fn analog_pin_enables_reporting_lazily() {
        let (board, fake) = connect_fake().await;
        let mut a1 = board.analog_pin(1);

        let reading = a1.read().await.unwrap();
        assert_eq!(reading.value, 0);
        assert!(reading.time.is_none());
        a1.read().await.unwrap();

        assert_eq!(fake.take(3).await, vec![0xF4, 15, 0x02]);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(fake.pending(), 0);
    }
}
