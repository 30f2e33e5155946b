use crate::{Result, constants::MAX_IDENTIFIER_LENGTH, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Tag identifier (UID) as read from an RFID tag.
///
/// The canonical text form is uppercase two-digit hex pairs separated by a
/// single space (`A3 47 64 B7`). That form is used as the registry key and
/// in every notification.
///
/// # Security
/// Equality is constant-time over identifiers of the same length, so
/// comparing a scanned UID against a registered one does not leak how many
/// leading bytes matched. [`TagRegistry::lookup`](crate::TagRegistry::lookup)
/// matches scans through this equality rather than through its hash keys.
///
/// # Examples
///
/// ```
/// use cardreader_core::TagIdentifier;
///
/// let id = TagIdentifier::new(vec![0xA3, 0x47, 0x64, 0xB7]);
/// assert_eq!(id.to_string(), "A3 47 64 B7");
///
/// let parsed: TagIdentifier = "a3 47 64 b7".parse().unwrap();
/// assert_eq!(parsed, id);
/// ```
#[derive(Debug, Clone, Default, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagIdentifier(Vec<u8>);

impl TagIdentifier {
    /// Wrap raw identifier bytes.
    ///
    /// Any length is accepted here, including zero: an empty identifier is
    /// what the reader sends for a zero-length scan. Registration is where
    /// empty identifiers get rejected.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        TagIdentifier(bytes)
    }

    /// Get the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the identifier.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the identifier carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical text form used as the registry key.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// Consume the identifier and return its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Display for TagIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for TagIdentifier {
    type Err = Error;

    /// Parse hex pairs separated by whitespace.
    ///
    /// Lowercase digits and runs of whitespace are accepted; each token must
    /// be exactly two hex digits. Blank input parses to the empty identifier.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidHex {
            input: s.to_string(),
        };

        let bytes = s
            .split_whitespace()
            .map(|token| {
                if token.len() != 2 {
                    return Err(invalid());
                }
                u8::from_str_radix(token, 16).map_err(|_| invalid())
            })
            .collect::<Result<Vec<u8>>>()?;

        if bytes.len() > MAX_IDENTIFIER_LENGTH {
            return Err(Error::invalid_identifier(format!(
                "identifier exceeds {MAX_IDENTIFIER_LENGTH} bytes"
            )));
        }

        Ok(TagIdentifier(bytes))
    }
}

impl PartialEq for TagIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice().ct_eq(other.0.as_slice()).into()
    }
}

impl std::hash::Hash for TagIdentifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl From<Vec<u8>> for TagIdentifier {
    fn from(bytes: Vec<u8>) -> Self {
        TagIdentifier(bytes)
    }
}

impl From<&[u8]> for TagIdentifier {
    fn from(bytes: &[u8]) -> Self {
        TagIdentifier(bytes.to_vec())
    }
}

impl TryFrom<String> for TagIdentifier {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TagIdentifier> for String {
    fn from(id: TagIdentifier) -> Self {
        id.to_string()
    }
}

/// A registered tag: a human readable label bound to an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    /// Label shown when the tag is scanned (e.g. "Key Tag").
    pub label: String,

    /// Identifier of the physical tag.
    pub identifier: TagIdentifier,
}

impl TagRecord {
    pub fn new(label: impl Into<String>, identifier: TagIdentifier) -> Self {
        Self {
            label: label.into(),
            identifier,
        }
    }
}

/// Result of looking up a scanned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "tag", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The identifier is registered.
    Known(TagRecord),

    /// The identifier is not registered (or empty).
    Unknown(TagIdentifier),
}

impl ScanOutcome {
    /// Identifier that was scanned.
    pub fn identifier(&self) -> &TagIdentifier {
        match self {
            Self::Known(record) => &record.identifier,
            Self::Unknown(identifier) => identifier,
        }
    }

    /// Label of the registered tag, if any.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Known(record) => Some(&record.label),
            Self::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}
