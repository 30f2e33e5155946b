//! Notifications produced by the listener.
//!
//! The listener never renders anything itself. It reports what happened on
//! the link as [`Notification`] values to a [`NotificationSink`], in the
//! order the frames arrived. Unlock failures are reported from the unlock
//! task and may therefore arrive after notifications for later frames.
//!
//! # Sinks
//!
//! - [`ChannelSink`]: forwards notifications over an unbounded tokio channel,
//!   for a console or UI task to consume.
//! - Any `Fn(Notification) + Send + Sync` closure.
//!
//! ```
//! use cardreader_listener::events::{ChannelSink, Notification, NotificationSink};
//!
//! let (sink, mut rx) = ChannelSink::new();
//! sink.notify(Notification::LockStateReported { locked: true });
//!
//! assert_eq!(
//!     rx.try_recv().unwrap(),
//!     Notification::LockStateReported { locked: true }
//! );
//! ```

use cardreader_core::{ScanOutcome, TagIdentifier, TagRecord};
use cardreader_protocol::OpCode;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

/// Something the listener observed on the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Notification {
    /// A frame with a recognised opcode arrived.
    ///
    /// Sent before the frame's own notification.
    OpCodeReceived { opcode: OpCode },

    /// A tag was scanned (combined form).
    CardScanned { outcome: ScanOutcome },

    /// A registered tag was scanned (split form).
    ValidCardScanned { record: TagRecord },

    /// An unregistered tag was scanned (split form).
    InvalidCardScanned { identifier: TagIdentifier },

    /// The reader reported its lock state.
    LockStateReported { locked: bool },

    /// The unlock byte for a scan could not be written.
    UnlockFailed {
        identifier: TagIdentifier,
        reason: String,
    },

    /// A frame was lost to a read error other than the link closing.
    FrameDropped { reason: String },

    /// The read loop ended.
    ListenerStopped { reason: String },
}

impl Notification {
    /// Build the card notification for a scan outcome.
    ///
    /// With `split` set, known and unknown tags get distinct notifications;
    /// otherwise both are reported as [`Notification::CardScanned`].
    pub fn for_scan(outcome: ScanOutcome, split: bool) -> Self {
        match (outcome, split) {
            (ScanOutcome::Known(record), true) => Notification::ValidCardScanned { record },
            (ScanOutcome::Unknown(identifier), true) => {
                Notification::InvalidCardScanned { identifier }
            }
            (outcome, false) => Notification::CardScanned { outcome },
        }
    }

    /// Short name of the notification kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::OpCodeReceived { .. } => "opcode_received",
            Notification::CardScanned { .. } => "card_scanned",
            Notification::ValidCardScanned { .. } => "valid_card_scanned",
            Notification::InvalidCardScanned { .. } => "invalid_card_scanned",
            Notification::LockStateReported { .. } => "lock_state_reported",
            Notification::UnlockFailed { .. } => "unlock_failed",
            Notification::FrameDropped { .. } => "frame_dropped",
            Notification::ListenerStopped { .. } => "listener_stopped",
        }
    }
}

/// Receiver of listener notifications.
///
/// `notify` is called from the listener task and from unlock tasks, so it
/// must not block for long.
pub trait NotificationSink: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

impl<F> NotificationSink for F
where
    F: Fn(Notification) + Send + Sync + 'static,
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

/// Sink that forwards notifications over a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    /// Create a sink and the receiver its notifications arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        trace!(kind = notification.kind(), "Notification");
        // Nobody listening is not an error for the listener
        let _ = self.tx.send(notification);
    }
}
