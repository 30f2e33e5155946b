//! Card reader listener.
//!
//! Ties the protocol decoder, the tag registry and the unlock sequencer
//! together into a single read loop over a byte stream.
//!
//! # Overview
//!
//! ```text
//! ┌──────────┐ bytes ┌────────────────┐ frames ┌────────────────┐ notifications
//! │ reader   │──────►│ FrameDecoder   │───────►│ DispatchEngine │──────────────►
//! │ firmware │       └────────────────┘        └────────────────┘
//! │          │◄──────────── 0x01 after settle delay ─────┘ (UnlockSequencer)
//! └──────────┘
//! ```
//!
//! - [`config`]: listener settings
//! - [`events`]: notifications and where they are delivered
//! - [`sequencer`]: delayed unlock writes
//! - [`dispatch`]: the frame dispatch loop
//! - [`handle`]: running the loop on a background task

pub mod config;
pub mod dispatch;
pub mod events;
pub mod handle;
pub mod sequencer;

pub use config::ListenerConfig;
pub use dispatch::{DispatchEngine, DispatchStats};
pub use events::{ChannelSink, Notification, NotificationSink};
pub use handle::{ListenerError, ListenerHandle};
pub use sequencer::UnlockSequencer;
