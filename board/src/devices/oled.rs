use crate::{Board, Error};
use kiddee_protocol::{
    constants::oled::{COLUMNS, LINES},
    display::OledCommand,
    Command,
};
use std::time::Duration;

const CHAR_DELAY: Duration = Duration::from_millis(8);
const MAX_TEXT_SIZE: u8 = 2;

/// 128x64 monochrome OLED. Text is laid out on a 16x8 grid of 8x8 tiles.
pub struct Oled {
    board: Board,
}

fn check(value: u8, max: u8, what: &str) -> Result<(), Error> {
    if value > max {
        return Err(Error::InvalidArgument(format!(
            "OLED {what} {value} outside 0..={max}"
        )));
    }
    Ok(())
}

impl Oled {
    pub async fn start(board: &Board) -> Result<Self, Error> {
        let oled = Self {
            board: board.clone(),
        };
        oled.send(OledCommand::Init).await?;
        Ok(oled)
    }

    async fn send(&self, command: OledCommand) -> Result<(), Error> {
        self.board.send(Command::Oled(command)).await
    }

    pub async fn clear(&self) -> Result<(), Error> {
        self.send(OledCommand::ClearDisplay).await
    }

    pub async fn fill(&self) -> Result<(), Error> {
        self.send(OledCommand::FillDisplay).await
    }

    pub async fn clear_line(&self, line: u8) -> Result<(), Error> {
        check(line, LINES - 1, "line")?;
        self.send(OledCommand::ClearLine(line)).await
    }

    /// Moves the text cursor to tile column `x`, tile row `y`.
    pub async fn set_cursor(&self, x: u8, y: u8) -> Result<(), Error> {
        check(x, COLUMNS - 1, "cursor column")?;
        check(y, LINES - 1, "cursor line")?;
        self.send(OledCommand::SetCursor { x, y }).await
    }

    pub async fn set_inverse_font(&self, on: bool) -> Result<(), Error> {
        self.send(OledCommand::SetInverseFont(on)).await
    }

    pub async fn set_text_size(&self, size: u8) -> Result<(), Error> {
        check(size, MAX_TEXT_SIZE, "text size")?;
        self.send(OledCommand::SetTextSize(size)).await
    }

    pub async fn set_contrast(&self, value: u8) -> Result<(), Error> {
        self.send(OledCommand::SetContrast(value)).await
    }

    pub async fn set_power_save(&self, on: bool) -> Result<(), Error> {
        self.send(OledCommand::SetPowerSave(on)).await
    }

    pub async fn set_flip_mode(&self, on: bool) -> Result<(), Error> {
        self.send(OledCommand::SetFlipMode(on)).await
    }

    /// Prints text, pausing after each character for the display to keep
    /// up. `extra` lengthens the pause for slow boards.
    pub async fn print(&self, text: &str, extra: Duration) -> Result<(), Error> {
        self.print_bytes(text.as_bytes(), extra).await
    }

    /// Prints raw glyph indices from the display font.
    pub async fn print_bytes(&self, bytes: &[u8], extra: Duration) -> Result<(), Error> {
        for b in bytes {
            self.send(OledCommand::Print(*b)).await?;
            tokio::time::sleep(CHAR_DELAY + extra).await;
        }
        Ok(())
    }

    /// Draws one 8x8 tile at the cursor. Each byte is a column, LSB at the
    /// top.
    pub async fn draw_tile(&self, tile: [u8; 8]) -> Result<(), Error> {
        self.send(OledCommand::DrawTile(tile)).await
    }

    pub async fn draw_2_tile(&self, tiles: [u8; 16]) -> Result<(), Error> {
        self.send(OledCommand::Draw2Tile(tiles)).await
    }

    pub async fn draw_4_tile(&self, tiles: [u8; 32]) -> Result<(), Error> {
        self.send(OledCommand::Draw4Tile(tiles)).await
    }
}
