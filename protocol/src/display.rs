//! Sub-commands for the display extensions of the Kiddee sketch.
//!
//! Each enum encodes to the payload of a single sysex frame; the frame ID is
//! [`sysex::LCD_CONFIG`], [`sysex::OLED_CONFIG`] or [`sysex::LCDSCREEN_CONFIG`].
//!
//! [`sysex::LCD_CONFIG`]: crate::constants::sysex::LCD_CONFIG
//! [`sysex::OLED_CONFIG`]: crate::constants::sysex::OLED_CONFIG
//! [`sysex::LCDSCREEN_CONFIG`]: crate::constants::sysex::LCDSCREEN_CONFIG

use crate::{
    constants::{lcd, oled, tft},
    encoding::{push_u14, push_u21},
    types::Rgb,
};

/// 16x2 I2C character LCD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LcdCommand {
    Begin,
    Home,
    Clear,
    Backlight(bool),
    Cursor(bool),
    Blink(bool),
    Display(bool),
    SetCursor { column: u8, line: u8 },
    ScrollLeft,
    ScrollRight,
    Print(u8),
}

impl LcdCommand {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            LcdCommand::Begin => buf.push(lcd::BEGIN),
            LcdCommand::Home => buf.push(lcd::HOME),
            LcdCommand::Clear => buf.push(lcd::CLEAR),
            LcdCommand::Backlight(on) => buf.extend([lcd::BACKLIGHT, *on as u8]),
            LcdCommand::Cursor(on) => buf.extend([lcd::CURSOR, *on as u8]),
            LcdCommand::Blink(on) => buf.extend([lcd::BLINK, *on as u8]),
            LcdCommand::Display(on) => buf.extend([lcd::DISPLAY, *on as u8]),
            LcdCommand::SetCursor { column, line } => {
                buf.extend([lcd::SET_CURSOR, *column, *line])
            }
            LcdCommand::ScrollLeft => buf.push(lcd::SCROLL_LEFT),
            LcdCommand::ScrollRight => buf.push(lcd::SCROLL_RIGHT),
            LcdCommand::Print(c) => {
                buf.push(lcd::PRINT);
                push_u14(buf, *c as u32);
            }
        }
    }
}

/// 128x64 monochrome OLED, addressed in 8x8 tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OledCommand {
    Init,
    ClearDisplay,
    FillDisplay,
    ClearLine(u8),
    SetCursor { x: u8, y: u8 },
    SetInverseFont(bool),
    SetTextSize(u8),
    Print(u8),
    SetContrast(u8),
    SetPowerSave(bool),
    SetFlipMode(bool),
    DrawTile([u8; 8]),
    Draw2Tile([u8; 16]),
    Draw4Tile([u8; 32]),
}

impl OledCommand {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        let tiles = |buf: &mut Vec<u8>, sub: u8, bytes: &[u8]| {
            buf.push(sub);
            for b in bytes {
                push_u14(buf, *b as u32);
            }
        };

        match self {
            OledCommand::Init => buf.push(oled::INIT),
            OledCommand::ClearDisplay => buf.push(oled::CLEAR_DISPLAY),
            OledCommand::FillDisplay => buf.push(oled::FILL_DISPLAY),
            OledCommand::ClearLine(line) => buf.extend([oled::CLEAR_LINE, *line]),
            OledCommand::SetCursor { x, y } => buf.extend([oled::SET_CURSOR, *x, *y]),
            OledCommand::SetInverseFont(on) => buf.extend([oled::SET_INVERSE_FONT, *on as u8]),
            OledCommand::SetTextSize(size) => buf.extend([oled::SET_TEXT_SIZE, *size]),
            OledCommand::Print(c) => {
                buf.push(oled::PRINT);
                push_u14(buf, *c as u32);
            }
            OledCommand::SetContrast(value) => {
                buf.push(oled::SET_CONTRAST);
                push_u14(buf, *value as u32);
            }
            OledCommand::SetPowerSave(on) => buf.extend([oled::SET_POWER_SAVE, *on as u8]),
            OledCommand::SetFlipMode(on) => buf.extend([oled::SET_FLIP_MODE, *on as u8]),
            OledCommand::DrawTile(bytes) => tiles(buf, oled::DRAW_TILE, bytes),
            OledCommand::Draw2Tile(bytes) => tiles(buf, oled::DRAW_2_TILE, bytes),
            OledCommand::Draw4Tile(bytes) => tiles(buf, oled::DRAW_4_TILE, bytes),
        }
    }
}

/// 320x240 colour TFT. Coordinates are 14-bit, colours are RGB565 sent as
/// three 7-bit groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TftCommand {
    Init,
    SetCursor {
        x: u16,
        y: u16,
    },
    SetTextColor {
        text: Rgb,
        background: Option<Rgb>,
    },
    Print(u8),
    SetTextSize(u8),
    DrawLogo {
        x: u16,
        y: u16,
    },
    DrawLine {
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        color: Rgb,
    },
    FillRect {
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        color: Rgb,
    },
    DrawCircle {
        x: u16,
        y: u16,
        r: u16,
        color: Rgb,
    },
    FillCircle {
        x: u16,
        y: u16,
        r: u16,
        color: Rgb,
    },
    FillTriangle {
        points: [(u16, u16); 3],
        color: Rgb,
    },
    DrawRoundRect {
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        r: u16,
        color: Rgb,
    },
    FillRoundRect {
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        r: u16,
        color: Rgb,
    },
    DrawPixel {
        x: u16,
        y: u16,
        color: Rgb,
    },
    EnableDisplay(bool),
    SetPartArea {
        top: u16,
        bottom: u16,
    },
    PartialDisplay(bool),
    SetRotation(u8),
    SetScrollArea {
        top: u16,
        bottom: u16,
    },
    InvertDisplay(bool),
    TextWrap(bool),
    SetScroll(u16),
}

fn coords(buf: &mut Vec<u8>, values: &[u16]) {
    for v in values {
        push_u14(buf, *v as u32);
    }
}

fn color(buf: &mut Vec<u8>, c: Rgb) {
    push_u21(buf, c.to_rgb565() as u32);
}

impl TftCommand {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            TftCommand::Init => buf.push(tft::INIT),
            TftCommand::SetCursor { x, y } => {
                buf.push(tft::SET_CURSOR);
                coords(buf, &[*x, *y]);
            }
            TftCommand::SetTextColor { text, background } => {
                buf.push(tft::SET_TEXT_COLOR);
                color(buf, *text);
                if let Some(bg) = background {
                    color(buf, *bg);
                }
            }
            TftCommand::Print(c) => {
                buf.push(tft::PRINT);
                push_u14(buf, *c as u32);
            }
            TftCommand::SetTextSize(size) => buf.extend([tft::SET_TEXT_SIZE, *size]),
            TftCommand::DrawLogo { x, y } => {
                buf.push(tft::DRAW_LOGO);
                coords(buf, &[*x, *y]);
            }
            TftCommand::DrawLine {
                x1,
                y1,
                x2,
                y2,
                color: c,
            } => {
                buf.push(tft::DRAW_LINE);
                coords(buf, &[*x1, *y1, *x2, *y2]);
                color(buf, *c);
            }
            TftCommand::FillRect {
                x,
                y,
                w,
                h,
                color: c,
            } => {
                buf.push(tft::FILL_RECT);
                coords(buf, &[*x, *y, *w, *h]);
                color(buf, *c);
            }
            TftCommand::DrawCircle { x, y, r, color: c } => {
                buf.push(tft::DRAW_CIRCLE);
                coords(buf, &[*x, *y, *r]);
                color(buf, *c);
            }
            TftCommand::FillCircle { x, y, r, color: c } => {
                buf.push(tft::FILL_CIRCLE);
                coords(buf, &[*x, *y, *r]);
                color(buf, *c);
            }
            TftCommand::FillTriangle { points, color: c } => {
                buf.push(tft::FILL_TRIANGLE);
                for (x, y) in points {
                    coords(buf, &[*x, *y]);
                }
                color(buf, *c);
            }
            TftCommand::DrawRoundRect {
                x1,
                y1,
                x2,
                y2,
                r,
                color: c,
            } => {
                buf.push(tft::DRAW_ROUND_RECT);
                coords(buf, &[*x1, *y1, *x2, *y2, *r]);
                color(buf, *c);
            }
            TftCommand::FillRoundRect {
                x1,
                y1,
                x2,
                y2,
                r,
                color: c,
            } => {
                buf.push(tft::FILL_ROUND_RECT);
                coords(buf, &[*x1, *y1, *x2, *y2, *r]);
                color(buf, *c);
            }
            TftCommand::DrawPixel { x, y, color: c } => {
                buf.push(tft::DRAW_PIXEL);
                coords(buf, &[*x, *y]);
                color(buf, *c);
            }
            TftCommand::EnableDisplay(on) => buf.extend([tft::ENABLE_DISPLAY, *on as u8]),
            TftCommand::SetPartArea { top, bottom } => {
                buf.push(tft::SET_PART_AREA);
                coords(buf, &[*top, *bottom]);
            }
            TftCommand::PartialDisplay(on) => buf.extend([tft::PARTIAL_DISPLAY, *on as u8]),
            TftCommand::SetRotation(rot) => buf.extend([tft::SET_ROTATION, *rot]),
            TftCommand::SetScrollArea { top, bottom } => {
                buf.push(tft::SET_SCROLL_AREA);
                coords(buf, &[*top, *bottom]);
            }
            TftCommand::InvertDisplay(on) => buf.extend([tft::INVERT_DISPLAY, *on as u8]),
            TftCommand::TextWrap(on) => buf.extend([tft::TEXT_WRAP, *on as u8]),
            TftCommand::SetScroll(value) => {
                buf.push(tft::SET_SCROLL);
                push_u14(buf, *value as u32);
            }
        }
    }
}
