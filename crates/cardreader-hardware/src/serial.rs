//! Serial port link to the reader firmware.
//!
//! The `serialport` crate exposes blocking ports, so the read half runs a
//! dedicated thread that polls the port and forwards chunks over a tokio
//! channel. Writes are short (a single unlock byte) and are pushed to the
//! blocking pool.
//!
//! ```text
//! ┌────────────┐  chunks  ┌──────────────┐  read_byte()  ┌──────────┐
//! │ reader     │─────────►│ SerialSource │──────────────►│ listener │
//! │ thread     │  (mpsc)  └──────────────┘               └──────────┘
//! └────────────┘                                              │ write()
//!        ▲                ┌──────────────┐  spawn_blocking     │
//!        └── port clone ──│  SerialSink  │◄────────────────────┘
//!                         └──────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::{Buf, Bytes};
use cardreader_core::constants::{DEFAULT_BAUD_RATE, SERIAL_READ_POLL_MS};
use cardreader_core::{ByteSink, ByteSource, ByteStream, Error};
use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use crate::{HardwareError, Result};

/// Chunks buffered between the reader thread and the source.
const READ_CHANNEL_CAPACITY: usize = 64;

/// Serial line settings.
///
/// Defaults match the reader firmware: 9600 baud, 8 data bits, no parity,
/// one stop bit, no flow control, RTS asserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path (`/dev/ttyACM0`, `COM3`, ...).
    pub port_name: String,

    /// Line speed in bits per second.
    pub baud_rate: u32,

    /// Assert RTS after opening.
    pub rts: bool,

    /// How long a blocking read waits before checking for shutdown.
    pub read_poll: Duration,
}

impl SerialConfig {
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            rts: true,
            read_poll: Duration::from_millis(SERIAL_READ_POLL_MS),
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Check the settings before opening a port.
    pub fn validate(&self) -> Result<()> {
        if self.port_name.trim().is_empty() {
            return Err(HardwareError::configuration("port name must not be empty"));
        }
        if self.baud_rate == 0 {
            return Err(HardwareError::configuration("baud rate must be nonzero"));
        }
        if self.read_poll.is_zero() {
            return Err(HardwareError::configuration("read poll must be nonzero"));
        }
        Ok(())
    }
}

/// An open serial port.
pub struct SerialStream {
    name: String,
    reader: Box<dyn SerialPort>,
    writer: Box<dyn SerialPort>,
    open: Arc<AtomicBool>,
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("name", &self.name)
            .field("open", &self.open.load(Ordering::SeqCst))
            .finish()
    }
}

impl SerialStream {
    /// Open and configure the port.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid, the port cannot be
    /// opened, or the handle cannot be cloned for the reader thread.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        config.validate()?;

        let mut port = serialport::new(&config.port_name, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_poll)
            .open()?;

        if config.rts {
            port.write_request_to_send(true)?;
        }

        let reader = port.try_clone()?;
        info!(
            "Opened serial port {} at {} baud",
            config.port_name, config.baud_rate
        );

        Ok(Self {
            name: config.port_name.clone(),
            reader,
            writer: port,
            open: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ByteStream for SerialStream {
    type Source = SerialSource;
    type Sink = SerialSink;

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn split(self) -> (SerialSource, SerialSink) {
        let (chunk_tx, chunk_rx) = mpsc::channel(READ_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));

        let thread_open = Arc::clone(&self.open);
        let thread_stop = Arc::clone(&stop);
        let thread_name = self.name.clone();
        let reader = self.reader;
        let spawned = std::thread::Builder::new()
            .name(format!("serial-reader-{}", self.name))
            .spawn(move || read_loop(thread_name, reader, chunk_tx, thread_open, thread_stop));

        // Without a reader thread the channel is already closed
        if let Err(e) = spawned {
            error!("Failed to spawn serial reader thread: {}", e);
            self.open.store(false, Ordering::SeqCst);
        }

        (
            SerialSource {
                chunk_rx,
                pending: Bytes::new(),
                open: Arc::clone(&self.open),
                stop,
            },
            SerialSink {
                name: self.name,
                port: Some(self.writer),
                open: self.open,
            },
        )
    }
}

/// Blocking read loop run on the reader thread.
///
/// Ends when the port fails, the source is dropped, or a stop is requested.
/// In every case the link is marked closed and the channel is dropped, which
/// the source reports as `StreamClosed`.
fn read_loop(
    name: String,
    mut port: Box<dyn SerialPort>,
    chunk_tx: mpsc::Sender<Bytes>,
    open: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
) {
    let mut buf = [0u8; 256];

    while !stop.load(Ordering::SeqCst) {
        match port.read(&mut buf) {
            Ok(0) => {
                debug!("Serial port {} reached end of stream", name);
                break;
            }
            Ok(n) => {
                trace!("Read {} bytes from {}", n, name);
                if chunk_tx
                    .blocking_send(Bytes::copy_from_slice(&buf[..n]))
                    .is_err()
                {
                    break; // Source dropped
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Serial port {} read failed: {}", name, e);
                break;
            }
        }
    }

    open.store(false, Ordering::SeqCst);
    debug!("Serial reader for {} stopped", name);
}

/// Read half of a [`SerialStream`].
#[derive(Debug)]
pub struct SerialSource {
    chunk_rx: mpsc::Receiver<Bytes>,
    pending: Bytes,
    open: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl ByteSource for SerialSource {
    async fn read_byte(&mut self) -> cardreader_core::Result<u8> {
        loop {
            if self.pending.has_remaining() {
                return Ok(self.pending.get_u8());
            }

            match self.chunk_rx.recv().await {
                Some(chunk) => self.pending = chunk,
                None => return Err(Error::StreamClosed),
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Drop for SerialSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Write half of a [`SerialStream`].
pub struct SerialSink {
    name: String,
    port: Option<Box<dyn SerialPort>>,
    open: Arc<AtomicBool>,
}

impl std::fmt::Debug for SerialSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSink")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}

impl ByteSink for SerialSink {
    async fn write(&mut self, bytes: &[u8]) -> cardreader_core::Result<()> {
        if !self.is_open() {
            return Err(Error::StreamClosed);
        }
        let mut port = self.port.take().ok_or(Error::StreamClosed)?;

        let data = bytes.to_vec();
        let joined = tokio::task::spawn_blocking(move || {
            let result = port.write_all(&data).and_then(|()| port.flush());
            (port, result)
        })
        .await;

        let (port, result) = match joined {
            Ok(out) => out,
            Err(e) => {
                error!("Serial write task for {} failed: {}", self.name, e);
                self.open.store(false, Ordering::SeqCst);
                return Err(Error::StreamClosed);
            }
        };
        self.port = Some(port);

        result.map_err(|e| match e.kind() {
            ErrorKind::BrokenPipe | ErrorKind::NotConnected => {
                self.open.store(false, Ordering::SeqCst);
                Error::StreamClosed
            }
            _ => Error::Io(e),
        })
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && self.port.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new("/dev/ttyACM0");

        assert_eq!(config.port_name, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 9600);
        assert!(config.rts);
        assert_eq!(config.read_poll, Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serial_config_with_baud_rate() {
        let config = SerialConfig::new("COM3").with_baud_rate(115_200);
        assert_eq!(config.baud_rate, 115_200);
    }

    #[test]
    fn test_serial_config_rejects_empty_port() {
        let config = SerialConfig::new("  ");
        assert!(matches!(
            config.validate(),
            Err(HardwareError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_serial_config_rejects_zero_baud() {
        let config = SerialConfig::new("COM3").with_baud_rate(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_open_missing_port_fails() {
        let config = SerialConfig::new("/dev/cardreader-does-not-exist");
        assert!(SerialStream::open(&config).is_err());
    }
}
