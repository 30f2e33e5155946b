use crate::OpCode;
use bytes::{BufMut, Bytes, BytesMut};
use cardreader_core::{Error, Result, TagIdentifier, constants::MAX_IDENTIFIER_LENGTH};
use std::fmt;

/// One decoded protocol frame.
///
/// # Wire Format
/// ```text
/// RfidRead      01 <len> <id bytes...>     e.g. 01 04 A3 47 64 B7
/// LockState     02 <state>                 e.g. 02 01   (locked)
/// Unrecognized  <opcode>                   no payload is consumed
/// ```
///
/// # Basic Usage
/// ```
/// use cardreader_protocol::{Frame, OpCode};
/// use cardreader_core::TagIdentifier;
///
/// let frame = Frame::RfidRead {
///     identifier: TagIdentifier::new(vec![0xA3, 0x47, 0x64, 0xB7]),
/// };
///
/// assert_eq!(frame.opcode(), OpCode::RfidRead);
/// assert_eq!(
///     frame.encode().unwrap().as_ref(),
///     &[0x01, 0x04, 0xA3, 0x47, 0x64, 0xB7]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A tag was scanned.
    RfidRead { identifier: TagIdentifier },

    /// The reader reported its lock state.
    LockState { locked: bool },

    /// Opcode byte without a known payload shape.
    Unrecognized { opcode: u8 },
}

impl Frame {
    pub fn opcode(&self) -> OpCode {
        match self {
            Frame::RfidRead { .. } => OpCode::RfidRead,
            Frame::LockState { .. } => OpCode::RfidLockState,
            Frame::Unrecognized { opcode } => OpCode::Unrecognized(*opcode),
        }
    }

    /// Payload bytes following the opcode on the wire.
    pub fn payload(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len().saturating_sub(1));
        self.put_payload(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Encode the frame to its wire form.
    ///
    /// # Errors
    /// Returns `Error::InvalidIdentifier` if an identifier is too long for
    /// the one-byte length prefix.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Append the wire form of the frame to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u8(self.opcode().as_byte());
        self.put_payload(buf)
    }

    /// Number of bytes the frame occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        match self {
            Frame::RfidRead { identifier } => 2 + identifier.len(),
            Frame::LockState { .. } => 2,
            Frame::Unrecognized { .. } => 1,
        }
    }

    fn put_payload(&self, buf: &mut BytesMut) -> Result<()> {
        match self {
            Frame::RfidRead { identifier } => {
                let len = u8::try_from(identifier.len()).map_err(|_| {
                    Error::invalid_identifier(format!(
                        "identifier of {} bytes exceeds {MAX_IDENTIFIER_LENGTH}",
                        identifier.len()
                    ))
                })?;
                buf.put_u8(len);
                buf.put_slice(identifier.as_bytes());
            }
            Frame::LockState { locked } => buf.put_u8(u8::from(*locked)),
            Frame::Unrecognized { .. } => {}
        }
        Ok(())
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Frame::RfidRead { identifier } => write!(f, "RFID_READ [{identifier}]"),
            Frame::LockState { locked } => write!(f, "RFID_LOCK_STATE locked={locked}"),
            Frame::Unrecognized { opcode } => write!(f, "UNRECOGNIZED 0x{opcode:02X}"),
        }
    }
}
