//! Peripherals built on top of [`crate::Board`]: the Kiddee car motor
//! driver, an MPU6050 IMU, the three display extensions, pin handles and the
//! standalone serial joystick.

mod joystick;
mod lcd;
mod motor;
mod mpu6050;
mod oled;
mod pin;
mod tft;

pub use joystick::{Joystick, JoystickState};
pub use lcd::Lcd;
pub use motor::{Direction, MotorDriver, MotorPins};
pub use mpu6050::{
    rotation_x, rotation_y, Motion, MotionCallback, MotionReading, Mpu6050, Vector3,
    DEFAULT_ADDRESS as MPU6050_DEFAULT_ADDRESS,
};
pub use oled::Oled;
pub use pin::{AnalogPin, DigitalMode, DigitalPin};
pub use tft::Tft;
