//! Error types for link operations.
//!
//! These cover opening and discovering links. Once a link is split into its
//! halves, failures surface as [`cardreader_core::Error`] instead, with a
//! lost device reported as `StreamClosed`.

/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while discovering or opening a link.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// No serial port matched the discovery criteria.
    #[error("Port not found: {message}")]
    PortNotFound { message: String },

    /// Device configuration error.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Error reported by the serial port driver.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the shared link layer.
    #[error(transparent)]
    Core(#[from] cardreader_core::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new port not found error.
    pub fn port_not_found(message: impl Into<String>) -> Self {
        Self::PortNotFound {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}

impl From<HardwareError> for cardreader_core::Error {
    fn from(error: HardwareError) -> Self {
        match error {
            HardwareError::Disconnected { .. } => cardreader_core::Error::StreamClosed,
            HardwareError::Io(e) => cardreader_core::Error::Io(e),
            HardwareError::Core(e) => e,
            other => cardreader_core::Error::Config(other.to_string()),
        }
    }
}
