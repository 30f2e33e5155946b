//! Common test utilities for listener integration tests.
//!
//! Each test drives a [`MockStream`] from the firmware side and observes
//! the notifications and unlock writes the listener produces.
//!
//! ```ignore
//! let mut rig = common::Rig::start(ListenerConfig::default());
//! rig.firmware.send(&common::scan_frame(&common::KEY_TAG))?;
//! rig.firmware.finish_input();
//! let stats = rig.listener.join().await?;
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use cardreader_core::{TagIdentifier, TagRegistry};
use cardreader_hardware::mock::{MockStream, MockStreamHandle};
use cardreader_listener::{
    ChannelSink, DispatchEngine, ListenerConfig, ListenerHandle, Notification,
};
use cardreader_protocol::Frame;
use tokio::sync::mpsc;

/// Registered tag "Key Tag".
pub const KEY_TAG: [u8; 4] = [0xA3, 0x47, 0x64, 0xB7];

/// Registered tag "Card".
pub const CARD: [u8; 4] = [0x04, 0x9C, 0x21, 0x5A];

/// Tag that is never registered.
pub const STRANGER: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

/// Registry holding `KEY_TAG` and `CARD`.
pub fn registry() -> TagRegistry {
    let mut registry = TagRegistry::new();
    registry
        .register("Key Tag", TagIdentifier::from(&KEY_TAG[..]))
        .unwrap();
    registry
        .register("Card", TagIdentifier::from(&CARD[..]))
        .unwrap();
    registry
}

/// Encoded `RFID_READ` frame for `uid`.
pub fn scan_frame(uid: &[u8]) -> Vec<u8> {
    Frame::RfidRead {
        identifier: TagIdentifier::from(uid),
    }
    .encode()
    .unwrap()
    .to_vec()
}

/// Encoded `RFID_LOCK_STATE` frame.
pub fn lock_frame(locked: bool) -> Vec<u8> {
    Frame::LockState { locked }.encode().unwrap().to_vec()
}

/// A running listener wired to a mock link.
pub struct Rig {
    pub listener: ListenerHandle,
    pub firmware: MockStreamHandle,
    pub notifications: mpsc::UnboundedReceiver<Notification>,
}

impl Rig {
    /// Spawn a listener over a fresh mock link with [`registry`].
    pub fn start(config: ListenerConfig) -> Self {
        let (stream, firmware) = MockStream::new();
        let (sink, notifications) = ChannelSink::new();
        let engine =
            DispatchEngine::new(stream, Arc::new(registry()), Arc::new(sink), config).unwrap();

        Self {
            listener: ListenerHandle::spawn(engine),
            firmware,
            notifications,
        }
    }

    /// Collect every notification up to and including `ListenerStopped`.
    pub async fn notifications_until_stopped(&mut self) -> Vec<Notification> {
        until_stopped(&mut self.notifications).await
    }
}

/// Receive notifications up to and including `ListenerStopped`.
pub async fn until_stopped(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut seen = Vec::new();
    while let Some(notification) = rx.recv().await {
        let stopped = matches!(notification, Notification::ListenerStopped { .. });
        seen.push(notification);
        if stopped {
            break;
        }
    }
    seen
}

/// Drop the `OpCodeReceived` notifications from `seen`.
pub fn without_opcodes(seen: Vec<Notification>) -> Vec<Notification> {
    seen.into_iter()
        .filter(|n| !matches!(n, Notification::OpCodeReceived { .. }))
        .collect()
}
