//! Rendering notifications on stdout.

use cardreader_core::ScanOutcome;
use cardreader_listener::Notification;
use clap::ValueEnum;
use tokio::sync::mpsc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One human readable line per notification.
    Text,
    /// One JSON object per notification.
    Json,
}

/// Human readable line for a notification.
pub fn render_text(notification: &Notification) -> String {
    match notification {
        Notification::OpCodeReceived { opcode } => {
            format!("Received OpCode '{}' from reader.", opcode.name())
        }
        Notification::ValidCardScanned { record } => {
            scanned_line(Some(record.label.as_str()), &record.identifier)
        }
        Notification::InvalidCardScanned { identifier } => scanned_line(None, identifier),
        Notification::CardScanned { outcome } => match outcome {
            ScanOutcome::Known(record) => {
                scanned_line(Some(record.label.as_str()), &record.identifier)
            }
            ScanOutcome::Unknown(identifier) => scanned_line(None, identifier),
        },
        Notification::LockStateReported { locked: true } => "Card reader is locked.".to_string(),
        Notification::LockStateReported { locked: false } => "Card reader is unlocked.".to_string(),
        Notification::UnlockFailed { identifier, reason } => {
            format!("Failed to unlock card reader after UID '{identifier}': {reason}.")
        }
        Notification::FrameDropped { reason } => format!("Dropped frame: {reason}."),
        Notification::ListenerStopped { reason } => format!("Stopped listening ({reason})."),
        other => format!("{other:?}"),
    }
}

fn scanned_line(label: Option<&str>, identifier: &impl std::fmt::Display) -> String {
    match label {
        Some(label) => format!("NFC tag '{label}' with UID '{identifier}' scanned."),
        None => format!("Unknown NFC tag with UID '{identifier}' scanned."),
    }
}

/// Render one notification in `format`.
pub fn render(notification: &Notification, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render_text(notification),
        OutputFormat::Json => {
            serde_json::to_string(notification).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

/// Print notifications until the channel closes or the listener stops.
pub async fn print_notifications(
    mut rx: mpsc::UnboundedReceiver<Notification>,
    format: OutputFormat,
) {
    while let Some(notification) = rx.recv().await {
        println!("{}", render(&notification, format));
        if matches!(notification, Notification::ListenerStopped { .. }) {
            break;
        }
    }
}
