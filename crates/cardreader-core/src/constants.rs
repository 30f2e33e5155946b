//! Wire-level constants for the card reader protocol.
//!
//! The microcontroller speaks a tiny opcode protocol. Every frame starts
//! with a single opcode byte followed by an opcode-specific payload:
//!
//! ```text
//! RFID_READ        0x01 <len> <len identifier bytes>
//! RFID_LOCK_STATE  0x02 <state>
//! unlock response  0x01
//! ```
//!
//! There is no start/end marker and no checksum; the link is assumed to be
//! reliable at the byte level.
//!
//! # Usage
//!
//! ```
//! use cardreader_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(OPCODE_RFID_READ, 0x01);
//! assert_eq!(Duration::from_millis(DEFAULT_SETTLE_DELAY_MS).as_secs(), 2);
//! ```

// ============================================================================
// Opcodes
// ============================================================================

/// Opcode of a tag scan frame sent by the reader.
pub const OPCODE_RFID_READ: u8 = 0x01;

/// Opcode of a lock state report sent by the reader.
pub const OPCODE_RFID_LOCK_STATE: u8 = 0x02;

// ============================================================================
// Payload
// ============================================================================

/// Largest identifier a single `RFID_READ` frame can carry.
///
/// The length prefix is one byte wide.
pub const MAX_IDENTIFIER_LENGTH: usize = u8::MAX as usize;

/// Typical identifier length of a Mifare tag (4-byte single size UID).
pub const TYPICAL_IDENTIFIER_LENGTH: usize = 4;

// ============================================================================
// Unlock
// ============================================================================

/// Byte written back to release the reader after a scan.
///
/// The reader accepts any nonzero byte; `0x01` is the canonical choice.
pub const UNLOCK_BYTE: u8 = 0x01;

/// Settle interval between a decoded scan and the unlock write (milliseconds).
///
/// # Value: 2000ms (2 seconds)
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;

// ============================================================================
// Serial link defaults
// ============================================================================

/// Default baud rate of the reader firmware.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Poll interval of the blocking serial reader (milliseconds).
///
/// The reader thread wakes up at this rate to notice shutdown requests.
pub const SERIAL_READ_POLL_MS: u64 = 100;

/// Text matched against USB manufacturer/product strings during discovery.
pub const ARDUINO_PRODUCT_MARKER: &str = "Arduino";

/// USB vendor ID assigned to Arduino boards.
pub const ARDUINO_USB_VID: u16 = 0x2341;
