//! Listener configuration.

use std::time::Duration;

use cardreader_core::constants::{DEFAULT_SETTLE_DELAY_MS, UNLOCK_BYTE};
use cardreader_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the dispatch engine and unlock sequencer.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cardreader_listener::ListenerConfig;
///
/// let config = ListenerConfig::default().with_settle_delay(Duration::from_millis(500));
/// assert_eq!(config.unlock_byte, 0x01);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Wait between a scan and the unlock write.
    pub settle_delay: Duration,

    /// Byte written to the reader to release the lock.
    pub unlock_byte: u8,

    /// Report known and unknown tags as distinct notifications.
    ///
    /// When false both are reported as a single `CardScanned` carrying the
    /// lookup outcome.
    pub split_valid_invalid_events: bool,

    /// Pick the serial port automatically when none is given.
    pub auto_discover: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            unlock_byte: UNLOCK_BYTE,
            split_valid_invalid_events: true,
            auto_discover: true,
        }
    }
}

impl ListenerConfig {
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_unlock_byte(mut self, byte: u8) -> Self {
        self.unlock_byte = byte;
        self
    }

    pub fn with_split_events(mut self, split: bool) -> Self {
        self.split_valid_invalid_events = split;
        self
    }

    pub fn with_auto_discover(mut self, enabled: bool) -> Self {
        self.auto_discover = enabled;
        self
    }

    /// Check the configuration before starting a listener.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the unlock byte is zero. The firmware only
    /// releases the lock on a nonzero byte.
    pub fn validate(&self) -> Result<()> {
        if self.unlock_byte == 0 {
            return Err(Error::Config("unlock byte must be nonzero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = ListenerConfig::default();

        assert_eq!(config.settle_delay, Duration::from_secs(2));
        assert_eq!(config.unlock_byte, 0x01);
        assert!(config.split_valid_invalid_events);
        assert!(config.auto_discover);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = ListenerConfig::default()
            .with_settle_delay(Duration::ZERO)
            .with_unlock_byte(0x7F)
            .with_split_events(false)
            .with_auto_discover(false);

        assert_eq!(config.settle_delay, Duration::ZERO);
        assert_eq!(config.unlock_byte, 0x7F);
        assert!(!config.split_valid_invalid_events);
        assert!(!config.auto_discover);
    }

    #[rstest]
    #[case(0x00, false)]
    #[case(0x01, true)]
    #[case(0xFF, true)]
    fn test_validate_unlock_byte(#[case] byte: u8, #[case] valid: bool) {
        let config = ListenerConfig::default().with_unlock_byte(byte);
        assert_eq!(config.validate().is_ok(), valid);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ListenerConfig =
            serde_json::from_str(r#"{ "split_valid_invalid_events": false }"#).unwrap();

        assert!(!config.split_valid_invalid_events);
        assert_eq!(config.settle_delay, Duration::from_secs(2));
    }
}
