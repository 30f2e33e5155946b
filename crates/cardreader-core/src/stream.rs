//! Byte stream abstraction over the reader link.
//!
//! The listener never opens, configures or closes the link itself. It only
//! sees an ordered channel of bytes with an open/closed state, split into a
//! read half ([`ByteSource`]) and a write half ([`ByteSink`]) so that the
//! read loop and the unlock writes can live on different tasks.
//!
//! The methods return `impl Future + Send` rather than using plain
//! `async fn`, so generic code can spawn them on a multi-threaded runtime.
//! Implementors can still write `async fn` in their impl blocks.

use std::future::Future;

use crate::Result;

/// Read half of the link.
pub trait ByteSource: Send {
    /// Read the next byte, waiting until one is available.
    ///
    /// # Errors
    ///
    /// Returns `Error::StreamClosed` once the link has ended. After that
    /// every further call fails the same way.
    fn read_byte(&mut self) -> impl Future<Output = Result<u8>> + Send;

    /// Check whether the link is still open.
    fn is_open(&self) -> bool;
}

/// Write half of the link.
pub trait ByteSink: Send {
    /// Write all of `bytes` to the link.
    ///
    /// # Errors
    ///
    /// Returns `Error::StreamClosed` if the link has ended.
    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Check whether the link is still open.
    fn is_open(&self) -> bool;
}

/// An open link that can be split into its two halves.
pub trait ByteStream {
    type Source: ByteSource + 'static;
    type Sink: ByteSink + 'static;

    /// Check whether the link is still open.
    fn is_open(&self) -> bool;

    /// Split into independently owned read and write halves.
    fn split(self) -> (Self::Source, Self::Sink);
}
