//! Mock reader link.
//!
//! The mock stands in for the serial connection to the reader firmware.
//! Bytes pushed through the [`MockStreamHandle`] come out of the stream's
//! read half in order, and every write made on the stream's write half is
//! recorded with the (tokio) instant it happened, so tests can check unlock
//! timing under a paused clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Buf, Bytes};
use cardreader_core::{ByteSink, ByteSource, ByteStream, Error, Result};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Mock reader link for testing and development.
///
/// # Examples
///
/// ```
/// use cardreader_core::{ByteSink, ByteSource, ByteStream};
/// use cardreader_hardware::mock::MockStream;
///
/// #[tokio::main]
/// async fn main() -> cardreader_core::Result<()> {
///     let (stream, mut handle) = MockStream::new();
///     let (mut source, mut sink) = stream.split();
///
///     // The "firmware" reports a lock state
///     handle.send(&[0x02, 0x01])?;
///     assert_eq!(source.read_byte().await?, 0x02);
///     assert_eq!(source.read_byte().await?, 0x01);
///
///     // The host answers with an unlock byte
///     sink.write(&[0x01]).await?;
///     let write = handle.next_write().await.unwrap();
///     assert_eq!(write.bytes.as_ref(), &[0x01]);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockStream {
    source: MockSource,
    sink: MockSink,
}

impl MockStream {
    /// Create a new open mock link.
    ///
    /// Returns a tuple of (MockStream, MockStreamHandle) where the handle
    /// plays the part of the reader firmware.
    pub fn new() -> (Self, MockStreamHandle) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));

        let stream = Self {
            source: MockSource {
                input_rx,
                pending: Bytes::new(),
                open: Arc::clone(&open),
            },
            sink: MockSink {
                write_tx,
                open: Arc::clone(&open),
            },
        };

        let handle = MockStreamHandle {
            input_tx: Some(input_tx),
            write_rx,
            open,
        };

        (stream, handle)
    }
}

impl ByteStream for MockStream {
    type Source = MockSource;
    type Sink = MockSink;

    fn is_open(&self) -> bool {
        self.source.is_open()
    }

    fn split(self) -> (MockSource, MockSink) {
        (self.source, self.sink)
    }
}

/// Read half of a [`MockStream`].
#[derive(Debug)]
pub struct MockSource {
    input_rx: mpsc::UnboundedReceiver<Bytes>,
    pending: Bytes,
    open: Arc<AtomicBool>,
}

impl ByteSource for MockSource {
    async fn read_byte(&mut self) -> Result<u8> {
        loop {
            if self.pending.has_remaining() {
                return Ok(self.pending.get_u8());
            }

            match self.input_rx.recv().await {
                Some(chunk) => self.pending = chunk,
                None => return Err(Error::StreamClosed),
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Write half of a [`MockStream`].
#[derive(Debug)]
pub struct MockSink {
    write_tx: mpsc::UnboundedSender<WriteRecord>,
    open: Arc<AtomicBool>,
}

impl ByteSink for MockSink {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.is_open() {
            return Err(Error::StreamClosed);
        }

        let record = WriteRecord {
            bytes: Bytes::copy_from_slice(bytes),
            at: Instant::now(),
        };

        // A dropped handle means nobody is listening on the other end
        self.write_tx.send(record).map_err(|_| Error::StreamClosed)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// A write observed on the mock link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    /// Bytes passed to a single `write` call.
    pub bytes: Bytes,

    /// When the write happened.
    pub at: Instant,
}

/// Handle for driving a mock link from the firmware side.
#[derive(Debug)]
pub struct MockStreamHandle {
    input_tx: Option<mpsc::UnboundedSender<Bytes>>,
    write_rx: mpsc::UnboundedReceiver<WriteRecord>,
    open: Arc<AtomicBool>,
}

impl MockStreamHandle {
    /// Queue bytes for the read half.
    ///
    /// # Errors
    ///
    /// Returns `Error::StreamClosed` if the input side was finished or the
    /// read half has been dropped.
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        let tx = self.input_tx.as_ref().ok_or(Error::StreamClosed)?;
        tx.send(Bytes::copy_from_slice(bytes))
            .map_err(|_| Error::StreamClosed)
    }

    /// Stop sending input while leaving the link open for writes.
    ///
    /// The read half returns the bytes already queued and then reports
    /// `StreamClosed`.
    pub fn finish_input(&mut self) {
        self.input_tx = None;
    }

    /// Close the link in both directions.
    ///
    /// Queued input is still delivered; writes fail from now on.
    pub fn close(&mut self) {
        self.input_tx = None;
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Wait for the next write made on the link.
    ///
    /// Returns `None` once the write half is dropped and all writes were
    /// consumed.
    pub async fn next_write(&mut self) -> Option<WriteRecord> {
        self.write_rx.recv().await
    }

    /// Take the next write if one already happened.
    pub fn try_next_write(&mut self) -> Option<WriteRecord> {
        self.write_rx.try_recv().ok()
    }

    /// Drain every write observed so far.
    pub fn drain_writes(&mut self) -> Vec<WriteRecord> {
        let mut writes = Vec::new();
        while let Ok(write) = self.write_rx.try_recv() {
            writes.push(write);
        }
        writes
    }
}
