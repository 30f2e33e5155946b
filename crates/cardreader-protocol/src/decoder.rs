//! Pull-based frame decoder.
//!
//! The decoder reads exactly as many bytes as the current frame needs and
//! never looks ahead, so the byte following a frame is always treated as a
//! fresh opcode. There is no resynchronisation: an unrecognised opcode
//! consumes only its own byte.
//!
//! # State Machine
//!
//! ```text
//! ┌────────┐ 0x01 ┌────────────┐ n ┌──────────────┐ n bytes ┌──────────┐
//! │ Opcode │─────►│ Length (1) │──►│ Identifier(n)│────────►│ RfidRead │
//! └────────┘      └────────────┘   └──────────────┘         └──────────┘
//!     │ 0x02  ┌───────────┐                                ┌───────────┐
//!     ├──────►│ State (1) │───────────────────────────────►│ LockState │
//!     │       └───────────┘                                └───────────┘
//!     │ other                                              ┌──────────────┐
//!     └───────────────────────────────────────────────────►│ Unrecognized │
//!                                                          └──────────────┘
//! ```
//!
//! If the source closes part way through a frame the bytes read so far are
//! dropped and `Error::StreamClosed` is returned.

use cardreader_core::{ByteSource, Result, TagIdentifier};
use tracing::trace;

use crate::{Frame, OpCode};

/// Read one complete frame from `source`.
///
/// Waits until every byte of the frame has arrived. There is no timeout;
/// wrap the call in `tokio::time::timeout` if one is needed.
///
/// # Errors
/// Returns `Error::StreamClosed` if the source ends before the frame is
/// complete.
pub async fn decode_frame<S: ByteSource>(source: &mut S) -> Result<Frame> {
    let opcode = OpCode::from_byte(source.read_byte().await?);
    trace!(%opcode, "Read opcode");

    let frame = match opcode {
        OpCode::RfidRead => {
            let len = usize::from(source.read_byte().await?);
            let mut bytes = Vec::with_capacity(len);
            for _ in 0..len {
                bytes.push(source.read_byte().await?);
            }
            Frame::RfidRead {
                identifier: TagIdentifier::new(bytes),
            }
        }
        OpCode::RfidLockState => Frame::LockState {
            locked: source.read_byte().await? > 0,
        },
        OpCode::Unrecognized(byte) => Frame::Unrecognized { opcode: byte },
    };

    trace!(%frame, "Decoded frame");
    Ok(frame)
}

/// Decoder that owns its byte source.
///
/// # Example
///
/// ```rust,no_run
/// use cardreader_core::ByteSource;
/// use cardreader_protocol::{Frame, FrameDecoder};
///
/// # async fn example<S: ByteSource>(source: S) -> cardreader_core::Result<()> {
/// let mut decoder = FrameDecoder::new(source);
/// loop {
///     match decoder.next_frame().await? {
///         Frame::RfidRead { identifier } => println!("scan {identifier}"),
///         Frame::LockState { locked } => println!("locked={locked}"),
///         Frame::Unrecognized { .. } => {}
///     }
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct FrameDecoder<S> {
    source: S,
    frames_decoded: u64,
}

impl<S: ByteSource> FrameDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            frames_decoded: 0,
        }
    }

    /// Decode the next frame.
    ///
    /// Cancelling the returned future drops any partially read frame.
    pub async fn next_frame(&mut self) -> Result<Frame> {
        let frame = decode_frame(&mut self.source).await?;
        self.frames_decoded += 1;
        Ok(frame)
    }

    /// Number of frames decoded so far, unrecognised ones included.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn is_open(&self) -> bool {
        self.source.is_open()
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}
