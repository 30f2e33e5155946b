use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Link errors
    #[error("Byte stream closed")]
    StreamClosed,

    // Registry errors
    #[error("Invalid tag identifier: {reason}")]
    InvalidIdentifier { reason: String },

    #[error("Invalid hex identifier text: {input:?}")]
    InvalidHex { input: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new invalid identifier error.
    pub fn invalid_identifier(reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            reason: reason.into(),
        }
    }

    /// Check whether this error means the link is gone.
    pub fn is_stream_closed(&self) -> bool {
        matches!(self, Self::StreamClosed)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
