use log::{debug, error, trace};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::{mpsc::UnboundedSender, watch},
    task::JoinHandle,
};

/// Copies every byte received from the board into the reporter's FIFO.
pub(crate) fn spawn<R>(
    mut reader: R,
    tx: UnboundedSender<u8>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut buffer = [0u8; 256];

        loop {
            let read = tokio::select! {
                read = reader.read(&mut buffer) => read,
                _ = shutdown.wait_for(|stop| *stop) => {
                    debug!("Receiver stopping");
                    break;
                }
            };

            match read {
                Ok(0) => {
                    debug!("Link closed");
                    break;
                }
                Ok(n) => {
                    trace!("Rx: {:02x?}", &buffer[..n]);
                    if buffer[..n].iter().any(|b| tx.send(*b).is_err()) {
                        debug!("Reporter gone, receiver exiting");
                        break;
                    }
                }
                Err(e) => {
                    error!("Read failed: {e}");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::{io::AsyncWriteExt, sync::mpsc};

    #[tokio::test]
    async fn forwards_bytes_until_eof() {
        let (mut board, host) = tokio::io::duplex(16);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (_stop, shutdown) = watch::channel(false);

        let task = spawn(host, tx, shutdown);
        board.write_all(&[0xE0, 0x01, 0x02]).await.unwrap();
        drop(board);
        task.await.unwrap();

        let mut bytes = Vec::new();
        while let Ok(b) = rx.try_recv() {
            bytes.push(b);
        }
        assert_eq!(bytes, vec![0xE0, 0x01, 0x02]);
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let (_board, host) = tokio::io::duplex(16);
        let (tx, _rx) = mpsc::unbounded_channel();
        let (stop, shutdown) = watch::channel(false);

        let task = spawn(host, tx, shutdown);
        stop.send_replace(true);
        task.await.unwrap();
    }
}
