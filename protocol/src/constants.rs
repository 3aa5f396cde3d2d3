//! Command bytes and sysex identifiers understood by FirmataExpress and the
//! Kiddee sketch extensions.

/// Any byte at or above this value starts a message.
pub const MSG_CMD_MIN: u8 = 0x80;

pub const DIGITAL_MESSAGE: u8 = 0x90;
pub const REPORT_ANALOG: u8 = 0xC0;
pub const REPORT_DIGITAL: u8 = 0xD0;
pub const ANALOG_MESSAGE: u8 = 0xE0;
/// Analog input reports and PWM output writes share a command byte.
pub const PWM_MESSAGE: u8 = ANALOG_MESSAGE;
pub const START_SYSEX: u8 = 0xF0;
pub const SET_PIN_MODE: u8 = 0xF4;
pub const SET_DIGITAL_PIN_VALUE: u8 = 0xF5;
pub const END_SYSEX: u8 = 0xF7;
pub const REPORT_VERSION: u8 = 0xF9;
pub const SYSTEM_RESET: u8 = 0xFF;

pub mod sysex {
    pub const KEEP_ALIVE: u8 = 0x50;
    pub const ARE_YOU_THERE: u8 = 0x51;
    pub const I_AM_HERE: u8 = 0x52;
    pub const IR_CONFIG: u8 = 0x53;
    pub const IR_DATA: u8 = 0x54;
    pub const TONE_DATA: u8 = 0x5F;
    pub const SONAR_CONFIG: u8 = 0x62;
    pub const SONAR_DATA: u8 = 0x63;
    pub const DHT_CONFIG: u8 = 0x64;
    pub const DHT_DATA: u8 = 0x65;
    pub const PM25_CONFIG: u8 = 0x66;
    pub const PM25_DATA: u8 = 0x67;
    pub const OLED_CONFIG: u8 = 0x68;
    pub const ANALOG_MAPPING_QUERY: u8 = 0x69;
    pub const ANALOG_MAPPING_RESPONSE: u8 = 0x6A;
    pub const CAPABILITY_QUERY: u8 = 0x6B;
    pub const CAPABILITY_RESPONSE: u8 = 0x6C;
    pub const PIN_STATE_QUERY: u8 = 0x6D;
    pub const PIN_STATE_RESPONSE: u8 = 0x6E;
    pub const EXTENDED_PWM: u8 = 0x6F;
    pub const SERVO_CONFIG: u8 = 0x70;
    pub const STRING_DATA: u8 = 0x71;
    pub const STEPPER_DATA: u8 = 0x72;
    pub const I2C_REQUEST: u8 = 0x76;
    pub const I2C_REPLY: u8 = 0x77;
    pub const I2C_CONFIG: u8 = 0x78;
    pub const REPORT_FIRMWARE: u8 = 0x79;
    pub const SAMPLING_INTERVAL: u8 = 0x7A;
    pub const LCD_CONFIG: u8 = 0x7C;
    pub const LCDSCREEN_CONFIG: u8 = 0x7D;
    pub const SYSEX_NON_REALTIME: u8 = 0x7E;
    pub const SYSEX_REALTIME: u8 = 0x7F;
}

/// Marks a pin that is not an analog input in an analog mapping response,
/// and terminates each pin's entry in a capability response.
pub const IGNORE: u8 = 0x7F;

pub const REPORTING_ENABLE: u8 = 1;
pub const REPORTING_DISABLE: u8 = 0;

pub mod i2c {
    pub const WRITE: u8 = 0b0000_0000;
    pub const READ: u8 = 0b0000_1000;
    pub const READ_CONTINUOUSLY: u8 = 0b0001_0000;
    pub const STOP_READING: u8 = 0b0001_1000;
    pub const READ_WRITE_MODE_MASK: u8 = 0b0001_1000;
    pub const TEN_BIT_ADDRESS_MODE_MASK: u8 = 0b0010_0000;
    pub const END_TX_MASK: u8 = 0b0100_0000;
}

pub mod tone {
    pub const TONE: u8 = 0;
    pub const NO_TONE: u8 = 1;
}

pub mod stepper {
    pub const CONFIGURE: u8 = 0;
    pub const STEP: u8 = 1;
    pub const LIBRARY_VERSION: u8 = 2;
}

pub mod ir {
    pub const BEGIN: u8 = 0x00;
    pub const SEND: u8 = 0x01;
    pub const BEGIN_SENDER: u8 = 0x02;

    /// The sketch hard-wires the receiver to this digital pin.
    pub const RECEIVER_PIN: u8 = 2;
}

pub mod pm25 {
    pub const START: u8 = 0;
    pub const STOP: u8 = 1;
}

/// Number of digital ports tracked by the output shadow registers.
pub const DIGITAL_PORT_COUNT: usize = 16;

/// FirmataExpress supports at most this many sonar devices.
pub const MAX_SONARS: usize = 6;

/// Upper bound on a sysex payload before the decoder gives up on a frame.
pub const MAX_SYSEX_LEN: usize = 4096;

/// Sub-commands of `LCD_CONFIG` (16x2 character display).
pub mod lcd {
    pub const BEGIN: u8 = 0x00;
    pub const HOME: u8 = 0x01;
    pub const CLEAR: u8 = 0x02;
    pub const BACKLIGHT: u8 = 0x03;
    pub const CURSOR: u8 = 0x04;
    pub const BLINK: u8 = 0x05;
    pub const DISPLAY: u8 = 0x06;
    pub const SET_CURSOR: u8 = 0x07;
    pub const SCROLL_LEFT: u8 = 0x08;
    pub const SCROLL_RIGHT: u8 = 0x09;
    pub const PRINT: u8 = 0x7F;
}

/// Sub-commands of `LCDSCREEN_CONFIG` (320x240 TFT).
pub mod tft {
    pub const INIT: u8 = 0x00;
    pub const FILL_SCREEN: u8 = 0x01;
    pub const SET_CURSOR: u8 = 0x02;
    pub const SET_TEXT_COLOR: u8 = 0x03;
    pub const PRINT: u8 = 0x04;
    pub const SET_TEXT_SIZE: u8 = 0x05;
    pub const DRAW_LOGO: u8 = 0x06;
    pub const DRAW_LINE: u8 = 0x07;
    pub const DRAW_FAST_H_LINE: u8 = 0x08;
    pub const DRAW_FAST_V_LINE: u8 = 0x09;
    pub const DRAW_RECT: u8 = 0x0A;
    pub const FILL_RECT: u8 = 0x0B;
    pub const DRAW_CIRCLE: u8 = 0x0C;
    pub const FILL_CIRCLE: u8 = 0x0D;
    pub const DRAW_TRIANGLE: u8 = 0x0F;
    pub const FILL_TRIANGLE: u8 = 0x10;
    pub const DRAW_ROUND_RECT: u8 = 0x11;
    pub const FILL_ROUND_RECT: u8 = 0x12;
    pub const DRAW_PIXEL: u8 = 0x13;
    pub const ENABLE_DISPLAY: u8 = 0x14;
    pub const SET_PART_AREA: u8 = 0x15;
    pub const PARTIAL_DISPLAY: u8 = 0x16;
    pub const SET_ROTATION: u8 = 0x17;
    pub const SET_SCROLL_AREA: u8 = 0x18;
    pub const INVERT_DISPLAY: u8 = 0x19;
    pub const TEXT_WRAP: u8 = 0x20;
    pub const SET_SCROLL: u8 = 0x7F;

    pub const WIDTH: u16 = 320;
    pub const HEIGHT: u16 = 240;
}

/// Sub-commands of `OLED_CONFIG` (128x64 monochrome).
pub mod oled {
    pub const INIT: u8 = 0x00;
    pub const CLEAR_DISPLAY: u8 = 0x01;
    pub const FILL_DISPLAY: u8 = 0x02;
    pub const CLEAR_LINE: u8 = 0x03;
    pub const SET_CURSOR: u8 = 0x04;
    pub const SET_INVERSE_FONT: u8 = 0x05;
    pub const SET_FONT: u8 = 0x06;
    pub const SET_TEXT_SIZE: u8 = 0x07;
    pub const PRINT: u8 = 0x08;
    pub const DRAW_TILE: u8 = 0x09;
    pub const SET_CONTRAST: u8 = 0x0A;
    pub const SET_POWER_SAVE: u8 = 0x0B;
    pub const SET_FLIP_MODE: u8 = 0x0C;
    pub const DRAW_2_TILE: u8 = 0x0D;
    pub const DRAW_4_TILE: u8 = 0x0E;

    pub const COLUMNS: u8 = 16;
    pub const LINES: u8 = 8;
}
