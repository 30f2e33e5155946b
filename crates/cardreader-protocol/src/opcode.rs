//! Opcode definitions for the card reader protocol.
//!
//! Every frame starts with one opcode byte:
//!
//! | Opcode | Byte | Payload |
//! |--------|------|---------|
//! | `RFID_READ` | `0x01` | length byte + identifier bytes |
//! | `RFID_LOCK_STATE` | `0x02` | one state byte (nonzero = locked) |
//!
//! Any other byte maps to [`OpCode::Unrecognized`]. That is a normal outcome
//! rather than an error: the byte is skipped and the next byte is read as a
//! fresh opcode.
//!
//! # Examples
//!
//! ```
//! use cardreader_protocol::OpCode;
//!
//! assert_eq!(OpCode::from_byte(0x01), OpCode::RfidRead);
//! assert_eq!(OpCode::from_byte(0xFF), OpCode::Unrecognized(0xFF));
//! assert_eq!(OpCode::RfidLockState.as_byte(), 0x02);
//! ```

use cardreader_core::constants::{OPCODE_RFID_LOCK_STATE, OPCODE_RFID_READ};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame type identified by the first byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpCode {
    /// Tag scan request (`0x01`).
    RfidRead,

    /// Lock state report (`0x02`).
    RfidLockState,

    /// Any byte without a known meaning.
    Unrecognized(u8),
}

impl OpCode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            OPCODE_RFID_READ => OpCode::RfidRead,
            OPCODE_RFID_LOCK_STATE => OpCode::RfidLockState,
            other => OpCode::Unrecognized(other),
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            OpCode::RfidRead => OPCODE_RFID_READ,
            OpCode::RfidLockState => OPCODE_RFID_LOCK_STATE,
            OpCode::Unrecognized(byte) => *byte,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, OpCode::Unrecognized(_))
    }

    /// Protocol name of the opcode.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::RfidRead => "RFID_READ",
            OpCode::RfidLockState => "RFID_LOCK_STATE",
            OpCode::Unrecognized(_) => "UNRECOGNIZED",
        }
    }
}

impl From<u8> for OpCode {
    fn from(byte: u8) -> Self {
        OpCode::from_byte(byte)
    }
}

impl From<OpCode> for u8 {
    fn from(opcode: OpCode) -> Self {
        opcode.as_byte()
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OpCode::Unrecognized(byte) => write!(f, "UNRECOGNIZED(0x{byte:02X})"),
            known => f.write_str(known.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x01, OpCode::RfidRead)]
    #[case(0x02, OpCode::RfidLockState)]
    #[case(0x00, OpCode::Unrecognized(0x00))]
    #[case(0x03, OpCode::Unrecognized(0x03))]
    #[case(0xFF, OpCode::Unrecognized(0xFF))]
    fn test_from_byte(#[case] byte: u8, #[case] expected: OpCode) {
        assert_eq!(OpCode::from_byte(byte), expected);
        assert_eq!(OpCode::from(byte).as_byte(), byte);
    }

    #[test]
    fn test_recognized() {
        assert!(OpCode::RfidRead.is_recognized());
        assert!(OpCode::RfidLockState.is_recognized());
        assert!(!OpCode::Unrecognized(0x7F).is_recognized());
    }

    #[test]
    fn test_display() {
        assert_eq!(OpCode::RfidRead.to_string(), "RFID_READ");
        assert_eq!(OpCode::RfidLockState.to_string(), "RFID_LOCK_STATE");
        assert_eq!(OpCode::Unrecognized(0xFF).to_string(), "UNRECOGNIZED(0xFF)");
    }
}
