use crate::{Board, Error};
use kiddee_protocol::{
    constants::tft::{HEIGHT, WIDTH},
    display::TftCommand,
    types::Rgb,
    Command,
};
use log::warn;
use std::time::Duration;

const INIT_SETTLE: Duration = Duration::from_secs(1);
const CHAR_DELAY: Duration = Duration::from_millis(2);
/// Outlines are drawn as separate lines with this gap between them.
const LINE_DELAY: Duration = Duration::from_millis(3);
const MAX_TEXT_SIZE: u8 = 12;
const MAX_ROTATION: u8 = 3;

/// 320x240 colour TFT screen.
pub struct Tft {
    board: Board,
}

impl Tft {
    /// Initialises the screen and waits for it to come up.
    pub async fn start(board: &Board) -> Result<Self, Error> {
        let tft = Self {
            board: board.clone(),
        };
        tft.send(TftCommand::Init).await?;
        tokio::time::sleep(INIT_SETTLE).await;
        Ok(tft)
    }

    async fn send(&self, command: TftCommand) -> Result<(), Error> {
        self.board.send(Command::Tft(command)).await
    }

    pub async fn fill_screen(&self, color: Rgb) -> Result<(), Error> {
        self.fill_rect(0, 0, WIDTH, HEIGHT, color).await
    }

    pub async fn set_cursor(&self, x: u16, y: u16) -> Result<(), Error> {
        self.send(TftCommand::SetCursor { x, y }).await
    }

    /// Without a background the text is drawn transparently.
    pub async fn set_text_color(&self, text: Rgb, background: Option<Rgb>) -> Result<(), Error> {
        self.send(TftCommand::SetTextColor { text, background })
            .await
    }

    pub async fn print(&self, text: &str, extra: Duration) -> Result<(), Error> {
        if !text.is_ascii() {
            return Err(Error::InvalidArgument(format!(
                "TFT text must be ASCII: {text:?}"
            )));
        }
        for c in text.bytes() {
            self.send(TftCommand::Print(c)).await?;
            tokio::time::sleep(CHAR_DELAY + extra).await;
        }
        Ok(())
    }

    pub async fn set_text_size(&self, size: u8) -> Result<(), Error> {
        let size = if size > MAX_TEXT_SIZE {
            warn!("TFT text size {size} clamped to {MAX_TEXT_SIZE}");
            MAX_TEXT_SIZE
        } else {
            size
        };
        self.send(TftCommand::SetTextSize(size)).await
    }

    pub async fn draw_logo(&self, x: u16, y: u16) -> Result<(), Error> {
        self.send(TftCommand::DrawLogo { x, y }).await
    }

    pub async fn draw_line(&self, from: (u16, u16), to: (u16, u16), color: Rgb) -> Result<(), Error> {
        self.send(TftCommand::DrawLine {
            x1: from.0,
            y1: from.1,
            x2: to.0,
            y2: to.1,
            color,
        })
        .await
    }

    async fn draw_outline(&self, corners: &[(u16, u16)], color: Rgb) -> Result<(), Error> {
        let edges = corners.iter().zip(corners.iter().cycle().skip(1));
        for (i, (from, to)) in edges.enumerate() {
            if i > 0 {
                tokio::time::sleep(LINE_DELAY).await;
            }
            self.draw_line(*from, *to, color).await?;
        }
        Ok(())
    }

    pub async fn draw_rect(&self, x: u16, y: u16, w: u16, h: u16, color: Rgb) -> Result<(), Error> {
        let (x2, y2) = (x.saturating_add(w), y.saturating_add(h));
        self.draw_outline(&[(x, y), (x2, y), (x2, y2), (x, y2)], color)
            .await
    }

    pub async fn fill_rect(&self, x: u16, y: u16, w: u16, h: u16, color: Rgb) -> Result<(), Error> {
        self.send(TftCommand::FillRect { x, y, w, h, color }).await
    }

    pub async fn draw_circle(&self, x: u16, y: u16, r: u16, color: Rgb) -> Result<(), Error> {
        self.send(TftCommand::DrawCircle { x, y, r, color }).await
    }

    pub async fn fill_circle(&self, x: u16, y: u16, r: u16, color: Rgb) -> Result<(), Error> {
        self.send(TftCommand::FillCircle { x, y, r, color }).await
    }

    pub async fn draw_triangle(&self, points: [(u16, u16); 3], color: Rgb) -> Result<(), Error> {
        self.draw_outline(&points, color).await
    }

    pub async fn fill_triangle(&self, points: [(u16, u16); 3], color: Rgb) -> Result<(), Error> {
        self.send(TftCommand::FillTriangle { points, color }).await
    }

    /// Rounded rectangle between corners `(x1, y1)` and `(x2, y2)`.
    pub async fn draw_round_rect(
        &self,
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        r: u16,
        color: Rgb,
    ) -> Result<(), Error> {
        self.send(TftCommand::DrawRoundRect {
            x1,
            y1,
            x2,
            y2,
            r,
            color,
        })
        .await
    }

    pub async fn fill_round_rect(
        &self,
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        r: u16,
        color: Rgb,
    ) -> Result<(), Error> {
        self.send(TftCommand::FillRoundRect {
            x1,
            y1,
            x2,
            y2,
            r,
            color,
        })
        .await
    }

    pub async fn draw_pixel(&self, x: u16, y: u16, color: Rgb) -> Result<(), Error> {
        self.send(TftCommand::DrawPixel { x, y, color }).await
    }

    pub async fn enable_display(&self, on: bool) -> Result<(), Error> {
        self.send(TftCommand::EnableDisplay(on)).await
    }

    pub async fn set_part_area(&self, top: u16, bottom: u16) -> Result<(), Error> {
        self.send(TftCommand::SetPartArea { top, bottom }).await
    }

    pub async fn partial_display(&self, on: bool) -> Result<(), Error> {
        self.send(TftCommand::PartialDisplay(on)).await
    }

    /// Rotation in quarter turns, `0..=3`.
    pub async fn set_rotation(&self, rotation: u8) -> Result<(), Error> {
        if rotation > MAX_ROTATION {
            return Err(Error::InvalidArgument(format!(
                "TFT rotation {rotation} outside 0..={MAX_ROTATION}"
            )));
        }
        self.send(TftCommand::SetRotation(rotation)).await
    }

    pub async fn set_scroll_area(&self, top: u16, bottom: u16) -> Result<(), Error> {
        self.send(TftCommand::SetScrollArea { top, bottom }).await
    }

    pub async fn invert_display(&self, on: bool) -> Result<(), Error> {
        self.send(TftCommand::InvertDisplay(on)).await
    }

    pub async fn text_wrap(&self, on: bool) -> Result<(), Error> {
        self.send(TftCommand::TextWrap(on)).await
    }

    pub async fn set_scroll(&self, offset: u16) -> Result<(), Error> {
        if offset > WIDTH {
            return Err(Error::InvalidArgument(format!(
                "TFT scroll {offset} beyond {WIDTH}"
            )));
        }
        self.send(TftCommand::SetScroll(offset)).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::connect_fake;

    const LINE_FRAME: usize = 15;

    #[tokio::test]
    async fn fill_screen_covers_whole_panel() {
        let (board, fake) = connect_fake().await;
        let tft = Tft::start(&board).await.unwrap();
        assert_eq!(fake.take(4).await, vec![0xF0, 0x7D, 0x00, 0xF7]);

        tft.fill_screen(Rgb::new(255, 0, 0)).await.unwrap();
        assert_eq!(
            fake.take(15).await,
            vec![
                0xF0, 0x7D, 0x0B, 0x00, 0x00, 0x00, 0x00, 0x40, 0x02, 0x70, 0x01, 0x00, 0x70,
                0x03, 0xF7
            ]
        );
    }

    #[tokio::test]
    async fn rect_outline_is_four_lines() {
        let (board, fake) = connect_fake().await;
        let tft = Tft::start(&board).await.unwrap();
        fake.take(4).await;

        tft.draw_rect(10, 20, 30, 40, Rgb::WHITE).await.unwrap();
        let sent = fake.take(4 * LINE_FRAME).await;
        let lines: Vec<_> = sent.chunks(LINE_FRAME).map(|f| (f[3], f[5], f[7], f[9])).collect();
        assert_eq!(
            lines,
            vec![(10, 20, 40, 20), (40, 20, 40, 60), (40, 60, 10, 60), (10, 60, 10, 20)]
        );
    }

    #[tokio::test]
    async fn rotation_and_text_size_limits() {
        let (board, fake) = connect_fake().await;
        let tft = Tft::start(&board).await.unwrap();
        fake.take(4).await;

        assert!(tft.set_rotation(4).await.is_err());
        assert!(tft.set_scroll(321).await.is_err());
        tft.set_text_size(20).await.unwrap();
        assert_eq!(fake.take(5).await, vec![0xF0, 0x7D, 0x05, 12, 0xF7]);
    }
}
