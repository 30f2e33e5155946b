//! Link over any tokio byte stream.
//!
//! [`IoStream`] adapts an `AsyncRead + AsyncWrite` value (a TCP connection to
//! a serial-over-network bridge, a unix socket, `tokio::io::duplex`, ...) to
//! the link traits. Reads are buffered; end of file and broken pipes are
//! reported as `StreamClosed`.

use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cardreader_core::{ByteSink, ByteSource, ByteStream, Error, Result};
use tokio::io::{
    AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tracing::debug;

/// Link over a tokio I/O object.
///
/// # Example
///
/// ```rust,no_run
/// use cardreader_hardware::IoStream;
/// use tokio::net::TcpStream;
///
/// # async fn example() -> std::io::Result<()> {
/// let tcp = TcpStream::connect("192.168.0.20:4000").await?;
/// let stream = IoStream::new(tcp);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct IoStream<T> {
    inner: T,
    open: Arc<AtomicBool>,
}

impl<T> IoStream<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            open: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl<T> ByteStream for IoStream<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    type Source = IoSource<T>;
    type Sink = IoSink<T>;

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn split(self) -> (IoSource<T>, IoSink<T>) {
        let (reader, writer) = tokio::io::split(self.inner);
        (
            IoSource {
                reader: BufReader::new(reader),
                open: Arc::clone(&self.open),
            },
            IoSink {
                writer,
                open: self.open,
            },
        )
    }
}

/// Read half of an [`IoStream`].
#[derive(Debug)]
pub struct IoSource<T> {
    reader: BufReader<ReadHalf<T>>,
    open: Arc<AtomicBool>,
}

impl<T> ByteSource for IoSource<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn read_byte(&mut self) -> Result<u8> {
        if !self.is_open() {
            return Err(Error::StreamClosed);
        }

        match self.reader.read_u8().await {
            Ok(byte) => Ok(byte),
            Err(e) => Err(close_on_error(&self.open, e)),
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Write half of an [`IoStream`].
#[derive(Debug)]
pub struct IoSink<T> {
    writer: WriteHalf<T>,
    open: Arc<AtomicBool>,
}

impl<T> ByteSink for IoSink<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.is_open() {
            return Err(Error::StreamClosed);
        }

        let result = async {
            self.writer.write_all(bytes).await?;
            self.writer.flush().await
        }
        .await;

        result.map_err(|e| close_on_error(&self.open, e))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Map an I/O error, marking the link closed if the peer went away.
fn close_on_error(open: &AtomicBool, error: std::io::Error) -> Error {
    match error.kind() {
        ErrorKind::UnexpectedEof
        | ErrorKind::BrokenPipe
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected => {
            debug!("Link closed: {}", error);
            open.store(false, Ordering::SeqCst);
            Error::StreamClosed
        }
        _ => Error::Io(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_io_stream_reads_and_writes() {
        let (host, mut firmware) = tokio::io::duplex(64);
        let (mut source, mut sink) = IoStream::new(host).split();

        firmware.write_all(&[0x02, 0x01]).await.unwrap();
        assert_eq!(source.read_byte().await.unwrap(), 0x02);
        assert_eq!(source.read_byte().await.unwrap(), 0x01);

        sink.write(&[0x01]).await.unwrap();
        let mut buf = [0u8; 1];
        firmware.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x01]);
    }

    #[tokio::test]
    async fn test_io_stream_eof_is_stream_closed() {
        let (host, firmware) = tokio::io::duplex(64);
        let (mut source, sink) = IoStream::new(host).split();

        drop(firmware);

        assert!(matches!(source.read_byte().await, Err(Error::StreamClosed)));
        assert!(!source.is_open());
        assert!(!sink.is_open());
    }

    #[tokio::test]
    async fn test_io_stream_write_after_close_fails() {
        let (host, firmware) = tokio::io::duplex(64);
        let (mut source, mut sink) = IoStream::new(host).split();

        drop(firmware);
        let _ = source.read_byte().await;

        assert!(matches!(
            sink.write(&[0x01]).await,
            Err(Error::StreamClosed)
        ));
    }
}
