//! Delayed unlock after a scan.
//!
//! Every RFID scan schedules one unlock: wait the settle delay, then write
//! the unlock byte to the reader. Each unlock runs as its own task, so the
//! read loop keeps decoding frames while the delay elapses. Concurrent
//! unlocks share the write half through an async mutex and never interleave.
//!
//! The unlock fires for unknown tags too. Whether to open the lock is the
//! reader firmware's decision; the host only acknowledges the scan.

use std::sync::Arc;
use std::time::Duration;

use cardreader_core::{ByteSink, Error, Result, TagIdentifier};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::ListenerConfig;
use crate::events::{Notification, NotificationSink};

/// Writes the unlock byte after the settle delay.
pub struct UnlockSequencer<W> {
    sink: Arc<Mutex<W>>,
    settle_delay: Duration,
    unlock_byte: u8,
    notifications: Arc<dyn NotificationSink>,
}

impl<W> Clone for UnlockSequencer<W> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            settle_delay: self.settle_delay,
            unlock_byte: self.unlock_byte,
            notifications: Arc::clone(&self.notifications),
        }
    }
}

impl<W> std::fmt::Debug for UnlockSequencer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnlockSequencer")
            .field("settle_delay", &self.settle_delay)
            .field("unlock_byte", &self.unlock_byte)
            .finish_non_exhaustive()
    }
}

impl<W: ByteSink + 'static> UnlockSequencer<W> {
    pub fn new(sink: W, config: &ListenerConfig, notifications: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
            settle_delay: config.settle_delay,
            unlock_byte: config.unlock_byte,
            notifications,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Wait the settle delay, then write the unlock byte.
    ///
    /// # Errors
    ///
    /// Returns `Error::StreamClosed` if the link closed during the delay, or
    /// the write error. Either way an `UnlockFailed` notification is sent.
    pub async fn unlock(&self, identifier: TagIdentifier) -> Result<()> {
        tokio::time::sleep(self.settle_delay).await;

        let result = {
            let mut sink = self.sink.lock().await;
            if sink.is_open() {
                sink.write(&[self.unlock_byte]).await
            } else {
                Err(Error::StreamClosed)
            }
        };

        match result {
            Ok(()) => {
                debug!(uid = %identifier, "Unlock byte sent");
                Ok(())
            }
            Err(e) => {
                warn!(uid = %identifier, "Unlock failed: {}", e);
                self.notifications.notify(Notification::UnlockFailed {
                    identifier,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Spawn an unlock for `identifier` onto `tasks`.
    pub fn schedule(&self, tasks: &mut JoinSet<Result<()>>, identifier: TagIdentifier) {
        let sequencer = self.clone();
        tasks.spawn(async move { sequencer.unlock(identifier).await });
    }
}
