use crate::{Board, Error};
use kiddee_protocol::{display::LcdCommand, Command};
use log::warn;
use std::time::Duration;

const MAX_PRINT_LEN: usize = 64;
const CHAR_DELAY: Duration = Duration::from_millis(1);

/// 16x2 character LCD on the board's I2C backpack.
pub struct Lcd {
    board: Board,
}

impl Lcd {
    pub async fn start(board: &Board) -> Result<Self, Error> {
        let lcd = Self {
            board: board.clone(),
        };
        lcd.send(LcdCommand::Begin).await?;
        Ok(lcd)
    }

    async fn send(&self, command: LcdCommand) -> Result<(), Error> {
        self.board.send(Command::Lcd(command)).await
    }

    pub async fn home(&self) -> Result<(), Error> {
        self.send(LcdCommand::Home).await
    }

    pub async fn clear(&self) -> Result<(), Error> {
        self.send(LcdCommand::Clear).await
    }

    pub async fn backlight(&self, on: bool) -> Result<(), Error> {
        self.send(LcdCommand::Backlight(on)).await
    }

    pub async fn cursor(&self, on: bool) -> Result<(), Error> {
        self.send(LcdCommand::Cursor(on)).await
    }

    pub async fn blink(&self, on: bool) -> Result<(), Error> {
        self.send(LcdCommand::Blink(on)).await
    }

    pub async fn display(&self, on: bool) -> Result<(), Error> {
        self.send(LcdCommand::Display(on)).await
    }

    pub async fn set_cursor(&self, column: u8, line: u8) -> Result<(), Error> {
        self.send(LcdCommand::SetCursor { column, line }).await
    }

    pub async fn scroll_left(&self) -> Result<(), Error> {
        self.send(LcdCommand::ScrollLeft).await
    }

    pub async fn scroll_right(&self) -> Result<(), Error> {
        self.send(LcdCommand::ScrollRight).await
    }

    /// Prints ASCII text one character per message. The display buffer holds
    /// 64 characters; anything beyond that is still sent.
    pub async fn print(&self, text: &str) -> Result<(), Error> {
        if !text.is_ascii() {
            return Err(Error::InvalidArgument(format!(
                "LCD text must be ASCII: {text:?}"
            )));
        }
        if text.len() > MAX_PRINT_LEN {
            warn!(
                "LCD text is {} characters, display holds {MAX_PRINT_LEN}",
                text.len()
            );
        }

        for c in text.bytes() {
            self.send(LcdCommand::Print(c)).await?;
            tokio::time::sleep(CHAR_DELAY).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::connect_fake;

    #[tokio::test]
    async fn print_sends_one_frame_per_character() {
        let (board, fake) = connect_fake().await;
        let lcd = Lcd::start(&board).await.unwrap();
        lcd.set_cursor(3, 1).await.unwrap();
        lcd.print("Hi").await.unwrap();

        assert_eq!(
            fake.take(19).await,
            vec![
                0xF0, 0x7C, 0x00, 0xF7, // begin
                0xF0, 0x7C, 0x07, 0x03, 0x01, 0xF7, // cursor
                0xF0, 0x7C, 0x7F, b'H', 0x00, 0xF7, 0xF0, 0x7C, 0x7F,
            ]
        );
    }

    #[tokio::test]
    async fn print_rejects_non_ascii() {
        let (board, fake) = connect_fake().await;
        let lcd = Lcd::start(&board).await.unwrap();
        fake.take(4).await;

        assert!(matches!(
            lcd.print("café").await,
            Err(Error::InvalidArgument(_))
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fake.pending(), 0);
    }
}
