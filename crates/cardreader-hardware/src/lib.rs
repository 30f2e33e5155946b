//! Link implementations for the card reader.
//!
//! This crate provides the concrete byte streams the listener runs on:
//!
//! - [`SerialStream`]: a real serial port opened through `serialport`,
//!   configured the way the reader firmware expects (9600 8N1, RTS on).
//! - [`IoStream`]: any tokio `AsyncRead + AsyncWrite`, e.g. a TCP
//!   connection to a serial-over-network bridge or an in-process duplex pipe.
//! - [`MockStream`](mock::MockStream): an in-memory link controlled through
//!   a handle, for development and tests without hardware.
//!
//! It also enumerates serial ports to find the reader
//! ([`discovery`]).
//!
//! # Examples
//!
//! ```no_run
//! use cardreader_core::{ByteSource, ByteStream};
//! use cardreader_hardware::{SerialConfig, SerialStream, discovery};
//!
//! # async fn example() -> cardreader_hardware::Result<()> {
//! let port = discovery::discover_reader_port()?;
//! let stream = SerialStream::open(&SerialConfig::new(port.name))?;
//! let (mut source, _sink) = stream.split();
//! let opcode = source.read_byte().await?;
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod error;
pub mod io;
pub mod mock;
pub mod serial;

// Re-export commonly used types for convenience
pub use discovery::PortCandidate;
pub use error::{HardwareError, Result};
pub use io::{IoSink, IoSource, IoStream};
pub use mock::{MockSink, MockSource, MockStream, MockStreamHandle, WriteRecord};
pub use serial::{SerialConfig, SerialSink, SerialSource, SerialStream};
