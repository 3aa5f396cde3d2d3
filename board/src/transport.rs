use crate::{BoardConfig, Error, IDENTIFY_TIMEOUT};
use kiddee_protocol::{
    constants::{sysex, END_SYSEX, START_SYSEX},
    Command,
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialPortType, SerialStream};

/// Longest `I_AM_HERE` reply read before giving up on a port.
const MAX_IDENTIFY_REPLY: usize = 64;

/// A byte stream a board can be driven over.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + 'static> Transport for T {}

/// An opened link, and whether the far end answered as FirmataExpress.
pub struct Connection {
    pub transport: Box<dyn Transport>,
    pub firmata_express: bool,
    pub description: String,
}

/// Opens the link described by `config`: TCP when an IP address is given,
/// otherwise the named serial port, otherwise the first USB serial port whose
/// board reports the configured instance ID.
pub async fn open(config: &BoardConfig) -> Result<Connection, Error> {
    if let Some(address) = &config.ip_address {
        let stream = TcpStream::connect((address.as_str(), config.ip_port)).await?;
        info!("Connected to {address}:{}", config.ip_port);
        return Ok(Connection {
            transport: Box::new(stream),
            firmata_express: false,
            description: format!("{address}:{}", config.ip_port),
        });
    }

    match &config.com_port {
        Some(port) => manual_open(port, config).await,
        None => discover(config).await,
    }
}

fn open_serial(port: &str, baud: u32) -> Result<SerialStream, Error> {
    let stream = tokio_serial::new(port, baud).open_native_async()?;
    stream.clear(ClearBuffer::All)?;
    Ok(stream)
}

async fn manual_open(port: &str, config: &BoardConfig) -> Result<Connection, Error> {
    info!("Opening {port}");
    let mut stream = open_serial(port, config.baud_rate)?;

    info!(
        "Waiting {:?} for the board to reset",
        config.arduino_wait
    );
    tokio::time::sleep(config.arduino_wait).await;

    let firmata_express = if config.expects_firmata_express() {
        match identify(&mut stream).await? {
            Some(id) if id == config.arduino_instance_id => true,
            Some(id) => {
                return Err(Error::Identification(format!(
                    "board on {port} has instance ID {id}, expected {}",
                    config.arduino_instance_id
                )))
            }
            None => {
                return Err(Error::Identification(format!(
                    "no valid I_AM_HERE reply on {port}"
                )))
            }
        }
    } else {
        false
    };

    Ok(Connection {
        transport: Box::new(stream),
        firmata_express,
        description: port.to_owned(),
    })
}

async fn discover(config: &BoardConfig) -> Result<Connection, Error> {
    let mut candidates = Vec::new();

    for port in tokio_serial::available_ports()? {
        if !matches!(port.port_type, SerialPortType::UsbPort(_)) {
            continue;
        }
        match open_serial(&port.port_name, config.baud_rate) {
            Ok(stream) => {
                debug!("Opened {}", port.port_name);
                candidates.push((port.port_name, stream));
            }
            Err(e) => debug!("Skipping {}: {e}", port.port_name),
        }
    }

    info!(
        "Opened {} candidate port(s), waiting {:?} for boards to reset",
        candidates.len(),
        config.arduino_wait
    );
    tokio::time::sleep(config.arduino_wait).await;

    for (name, mut stream) in candidates {
        match identify(&mut stream).await {
            Ok(Some(id)) if id == config.arduino_instance_id => {
                info!("Found board with instance ID {id} on {name}");
                return Ok(Connection {
                    transport: Box::new(stream),
                    firmata_express: true,
                    description: name,
                });
            }
            Ok(Some(id)) => debug!("{name} has instance ID {id}"),
            Ok(None) => debug!("{name} did not identify"),
            Err(e) => warn!("Identifying {name} failed: {e}"),
        }
    }

    Err(Error::BoardNotFound(config.arduino_instance_id))
}

/// Sends `ARE_YOU_THERE` and returns the instance ID from a well-formed
/// `I_AM_HERE` reply, or `None` if the reply is missing or malformed.
pub async fn identify<T>(stream: &mut T) -> Result<Option<u8>, Error>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&Command::AreYouThere.to_bytes()).await?;
    stream.flush().await?;

    let mut reply = Vec::new();
    let read = async {
        while reply.len() < MAX_IDENTIFY_REPLY {
            let byte = stream.read_u8().await?;
            reply.push(byte);
            if byte == END_SYSEX {
                break;
            }
        }
        Ok::<_, std::io::Error>(())
    };

    match tokio::time::timeout(IDENTIFY_TIMEOUT, read).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {}
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => debug!("Identification timed out"),
    }

    debug!("Identification reply: {reply:02x?}");
    Ok(match reply.as_slice() {
        [START_SYSEX, sysex::I_AM_HERE, id, END_SYSEX] => Some(*id),
        _ => None,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::io::duplex;

    async fn identify_with_reply(reply: &'static [u8]) -> Option<u8> {
        let (mut host, mut board) = duplex(64);

        let responder = tokio::spawn(async move {
            let mut request = [0u8; 3];
            board.read_exact(&mut request).await.unwrap();
            assert_eq!(request, [0xF0, 0x51, 0xF7]);
            board.write_all(reply).await.unwrap();
            board
        });

        let id = identify(&mut host).await.unwrap();
        drop(responder.await.unwrap());
        id
    }

    #[tokio::test]
    async fn well_formed_reply() {
        assert_eq!(identify_with_reply(&[0xF0, 0x52, 0x01, 0xF7]).await, Some(1));
    }

    #[tokio::test]
    async fn wrong_command_rejected() {
        assert_eq!(identify_with_reply(&[0xF0, 0x79, 0x01, 0xF7]).await, None);
    }

    #[tokio::test]
    async fn wrong_length_rejected() {
        assert_eq!(
            identify_with_reply(&[0xF0, 0x52, 0x01, 0x00, 0xF7]).await,
            None
        );
    }

    #[tokio::test]
    async fn silence_times_out() {
        let (mut host, _board) = duplex(64);
        assert_eq!(identify(&mut host).await.unwrap(), None);
    }
}
