//! The Kiddee USB joystick: a standalone serial device, not driven through
//! the board.
//!
//! After a start byte the joystick streams 9-byte status frames, each byte
//! an ASCII `'0'` or `'1'`.

use crate::Error;
use log::{debug, info};
use std::{
    io,
    time::{Duration, Instant},
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

const START: u8 = 0xF1;
const STOP: u8 = 0xF2;

const FRAME_LEN: usize = 9;
const SETTLE: Duration = Duration::from_millis(500);
const RETRY_INTERVAL: Duration = Duration::from_millis(500);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const UPDATE_TIMEOUT: Duration = Duration::from_secs(1);

/// Button states from one status frame; `true` is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoystickState {
    pub x: bool,
    pub y: bool,
    pub a: bool,
    pub b: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub alive: bool,
}

impl JoystickState {
    pub fn parse(frame: &[u8]) -> Result<Self, Error> {
        if frame.len() != FRAME_LEN {
            return Err(invalid_frame(frame));
        }
        let mut flags = [false; FRAME_LEN];
        for (flag, c) in flags.iter_mut().zip(frame) {
            *flag = match c {
                b'0' => false,
                b'1' => true,
                _ => return Err(invalid_frame(frame)),
            };
        }
        let [x, y, a, b, up, down, left, right, alive] = flags;

        Ok(Self {
            x,
            y,
            a,
            b,
            up,
            down,
            left,
            right,
            alive,
        })
    }
}

fn invalid_frame(frame: &[u8]) -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("bad joystick frame {frame:02x?}"),
    ))
}

/// Sends the start byte until the joystick answers with anything.
async fn handshake<S: AsyncRead + AsyncWrite + Unpin>(stream: &mut S) -> Result<(), Error> {
    let started = Instant::now();
    let mut byte = [0u8; 1];
    loop {
        stream.write_all(&[START]).await?;
        stream.flush().await?;

        if let Ok(read) = tokio::time::timeout(RETRY_INTERVAL, stream.read(&mut byte)).await {
            if read? == 1 {
                return Ok(());
            }
        }
        if started.elapsed() >= CONNECT_TIMEOUT {
            return Err(Error::Timeout("joystick handshake"));
        }
        debug!("No joystick reply yet, retrying");
    }
}

async fn read_state<R: AsyncRead + Unpin>(reader: &mut R) -> Result<JoystickState, Error> {
    let mut frame = [0u8; FRAME_LEN];
    tokio::time::timeout(UPDATE_TIMEOUT, reader.read_exact(&mut frame))
        .await
        .map_err(|_| Error::Timeout("joystick frame"))??;
    JoystickState::parse(&frame)
}

pub struct Joystick {
    port: SerialStream,
}

impl Joystick {
    pub async fn open(path: &str, baud_rate: u32) -> Result<Self, Error> {
        info!("Opening joystick on {path}");
        let mut port = tokio_serial::new(path, baud_rate).open_native_async()?;

        tokio::time::sleep(SETTLE).await;
        port.write_all(&[STOP]).await?;
        tokio::time::sleep(SETTLE).await;
        handshake(&mut port).await?;
        info!("Joystick connected");

        Ok(Self { port })
    }

    /// Discards anything buffered and reads a fresh status frame.
    pub async fn update(&mut self) -> Result<JoystickState, Error> {
        self.port.clear(ClearBuffer::Input)?;
        read_state(&mut self.port).await
    }

    pub async fn stop(&mut self) -> Result<(), Error> {
        self.port.write_all(&[STOP]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_frame() {
        let state = JoystickState::parse(b"100010001").unwrap();
        assert_eq!(
            state,
            JoystickState {
                x: true,
                up: true,
                alive: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn parse_rejects_bad_frames() {
        assert!(JoystickState::parse(b"10001000").is_err());
        assert!(JoystickState::parse(b"10001000x").is_err());
    }

    #[tokio::test]
    async fn handshake_retries_until_reply() {
        let (mut host, mut device) = tokio::io::duplex(64);
        let device = tokio::spawn(async move {
            let mut buf = [0u8; 1];
            device.read_exact(&mut buf).await.unwrap();
            assert_eq!(buf[0], START);
            // Ignore the first start byte, answer the retry.
            device.read_exact(&mut buf).await.unwrap();
            device.write_all(b"000000001").await.unwrap();
            device
        });

        handshake(&mut host).await.unwrap();
        let _device = device.await.unwrap();

        // The rest of the first frame is still buffered.
        let mut rest = [0u8; 8];
        host.read_exact(&mut rest).await.unwrap();
        assert_eq!(&rest, b"00000001");
    }

    #[tokio::test]
    async fn read_state_times_out() {
        let (mut host, _device) = tokio::io::duplex(64);
        assert!(matches!(
            read_state(&mut host).await,
            Err(Error::Timeout(_))
        ));
    }
}
