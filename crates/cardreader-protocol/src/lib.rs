//! Opcode protocol spoken by the card reader firmware.
//!
//! Frames are an opcode byte followed by an opcode-specific payload. This
//! crate models the opcodes and frames, encodes frames to their wire form,
//! and decodes frames one at a time from a [`ByteSource`].
//!
//! [`ByteSource`]: cardreader_core::ByteSource

pub mod decoder;
pub mod frame;
pub mod opcode;

pub use decoder::{FrameDecoder, decode_frame};
pub use frame::Frame;
pub use opcode::OpCode;
