//! Integration tests for the read, dispatch and unlock flow.
//!
//! The firmware side of each test is a `MockStreamHandle`. Tests that check
//! unlock timing run on a paused clock so the two second settle delay
//! elapses instantly while still being measurable.

mod common;

use std::sync::Arc;
use std::time::Duration;

use cardreader_core::{ScanOutcome, TagIdentifier, TagRecord};
use cardreader_hardware::IoStream;
use cardreader_listener::{
    ChannelSink, DispatchEngine, ListenerConfig, ListenerHandle, Notification,
};
use cardreader_protocol::OpCode;
use common::{
    CARD, KEY_TAG, Rig, STRANGER, lock_frame, scan_frame, until_stopped, without_opcodes,
};
use rstest::rstest;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn key_tag_record() -> TagRecord {
    TagRecord::new("Key Tag", TagIdentifier::from(&KEY_TAG[..]))
}

// ============================================================================
// Scans
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_known_scan_reports_valid_card() {
    let mut rig = Rig::start(ListenerConfig::default());

    rig.firmware.send(&scan_frame(&KEY_TAG)).unwrap();
    rig.firmware.finish_input();

    let seen = rig.notifications_until_stopped().await;
    assert_eq!(
        seen[..2],
        [
            Notification::OpCodeReceived {
                opcode: OpCode::RfidRead
            },
            Notification::ValidCardScanned {
                record: key_tag_record()
            },
        ]
    );

    let stats = rig.listener.join().await.unwrap();
    assert_eq!(stats.known, 1);
    assert_eq!(stats.unlocks_sent, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_scan_reports_invalid_card() {
    let mut rig = Rig::start(ListenerConfig::default());

    rig.firmware.send(&scan_frame(&STRANGER)).unwrap();
    rig.firmware.finish_input();

    let seen = without_opcodes(rig.notifications_until_stopped().await);
    assert_eq!(
        seen[0],
        Notification::InvalidCardScanned {
            identifier: TagIdentifier::from(&STRANGER[..])
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_identifier_is_unknown() {
    let mut rig = Rig::start(ListenerConfig::default());

    rig.firmware.send(&[0x01, 0x00]).unwrap();
    rig.firmware.finish_input();

    let seen = without_opcodes(rig.notifications_until_stopped().await);
    assert_eq!(
        seen[0],
        Notification::InvalidCardScanned {
            identifier: TagIdentifier::default()
        }
    );

    // Unlock still fires for an empty scan
    let writes = rig.firmware.drain_writes();
    assert_eq!(writes.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_combined_events() {
    let mut rig = Rig::start(ListenerConfig::default().with_split_events(false));

    rig.firmware.send(&scan_frame(&KEY_TAG)).unwrap();
    rig.firmware.send(&scan_frame(&STRANGER)).unwrap();
    rig.firmware.finish_input();

    let seen = without_opcodes(rig.notifications_until_stopped().await);
    assert_eq!(
        seen[..2],
        [
            Notification::CardScanned {
                outcome: ScanOutcome::Known(key_tag_record())
            },
            Notification::CardScanned {
                outcome: ScanOutcome::Unknown(TagIdentifier::from(&STRANGER[..]))
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_frames_split_across_chunks() {
    let mut rig = Rig::start(ListenerConfig::default());

    let frame = scan_frame(&CARD);
    for byte in &frame {
        rig.firmware.send(&[*byte]).unwrap();
        tokio::task::yield_now().await;
    }
    rig.firmware.finish_input();

    let seen = without_opcodes(rig.notifications_until_stopped().await);
    assert!(matches!(
        &seen[0],
        Notification::ValidCardScanned { record } if record.label == "Card"
    ));
}

// ============================================================================
// Lock state
// ============================================================================

#[rstest]
#[case(0x00, false)]
#[case(0x01, true)]
#[case(0x7F, true)]
#[case(0xFF, true)]
#[tokio::test]
async fn test_lock_state_reported(#[case] state: u8, #[case] locked: bool) {
    let mut rig = Rig::start(ListenerConfig::default());

    rig.firmware.send(&[0x02, state]).unwrap();
    rig.firmware.finish_input();

    let seen = rig.notifications_until_stopped().await;
    assert_eq!(
        seen,
        vec![
            Notification::OpCodeReceived {
                opcode: OpCode::RfidLockState
            },
            Notification::LockStateReported { locked },
            Notification::ListenerStopped {
                reason: "stream closed".to_string()
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_lock_state_never_writes() {
    let mut rig = Rig::start(ListenerConfig::default());

    rig.firmware.send(&lock_frame(true)).unwrap();
    rig.firmware.send(&lock_frame(false)).unwrap();
    rig.firmware.finish_input();

    rig.notifications_until_stopped().await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(rig.firmware.drain_writes().is_empty());
}

// ============================================================================
// Unlock timing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unlock_written_once_after_settle_delay() {
    let mut rig = Rig::start(ListenerConfig::default());
    let start = tokio::time::Instant::now();

    rig.firmware.send(&scan_frame(&KEY_TAG)).unwrap();

    let write = rig.firmware.next_write().await.unwrap();
    assert_eq!(write.bytes.as_ref(), &[0x01]);
    assert!(write.at - start >= Duration::from_secs(2));

    rig.firmware.finish_input();
    rig.listener.join().await.unwrap();
    assert!(rig.firmware.drain_writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reading_continues_during_settle_delay() {
    let mut rig = Rig::start(ListenerConfig::default());

    rig.firmware.send(&scan_frame(&KEY_TAG)).unwrap();
    rig.firmware.send(&lock_frame(true)).unwrap();

    // Both frames are dispatched before the first unlock is due
    let mut seen = Vec::new();
    while seen.len() < 4 {
        seen.push(rig.notifications.recv().await.unwrap());
    }
    assert_eq!(seen[3], Notification::LockStateReported { locked: true });
    assert!(rig.firmware.try_next_write().is_none());

    rig.firmware.finish_input();
    let stats = rig.listener.join().await.unwrap();
    assert_eq!(stats.unlocks_sent, 1);
}

#[tokio::test(start_paused = true)]
async fn test_back_to_back_scans_unlock_separately() {
    let mut rig = Rig::start(ListenerConfig::default());

    rig.firmware.send(&scan_frame(&KEY_TAG)).unwrap();
    rig.firmware.send(&scan_frame(&CARD)).unwrap();
    rig.firmware.finish_input();

    let stats = rig.listener.join().await.unwrap();
    assert_eq!(stats.unlocks_sent, 2);

    let writes = rig.firmware.drain_writes();
    assert_eq!(writes.len(), 2);
    assert!(writes.iter().all(|w| w.bytes.as_ref() == [0x01]));
}

#[tokio::test(start_paused = true)]
async fn test_custom_settle_delay() {
    let config = ListenerConfig::default().with_settle_delay(Duration::from_millis(250));
    let mut rig = Rig::start(config);
    let start = tokio::time::Instant::now();

    rig.firmware.send(&scan_frame(&KEY_TAG)).unwrap();
    let write = rig.firmware.next_write().await.unwrap();

    let elapsed = write.at - start;
    assert!(elapsed >= Duration::from_millis(250));
    assert!(elapsed < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_unlock_on_closed_link_fails() {
    let mut rig = Rig::start(ListenerConfig::default());

    rig.firmware.send(&scan_frame(&KEY_TAG)).unwrap();
    rig.firmware.close();

    let seen = without_opcodes(rig.notifications_until_stopped().await);
    assert_eq!(seen.len(), 3);
    assert!(matches!(
        &seen[1],
        Notification::UnlockFailed { identifier, .. } if identifier.as_bytes() == KEY_TAG
    ));
    assert!(matches!(seen[2], Notification::ListenerStopped { .. }));

    let stats = rig.listener.join().await.unwrap();
    assert_eq!(stats.unlocks_failed, 1);
    assert!(rig.firmware.drain_writes().is_empty());
}

// ============================================================================
// Framing edge cases
// ============================================================================

#[tokio::test]
async fn test_unrecognized_opcode_is_skipped() {
    let mut rig = Rig::start(ListenerConfig::default());

    rig.firmware.send(&[0xFF, 0x02, 0x01]).unwrap();
    rig.firmware.finish_input();

    let seen = rig.notifications_until_stopped().await;
    assert_eq!(
        seen[..2],
        [
            Notification::OpCodeReceived {
                opcode: OpCode::RfidLockState
            },
            Notification::LockStateReported { locked: true },
        ]
    );

    let stats = rig.listener.join().await.unwrap();
    assert_eq!(stats.skipped, 1);
}

#[tokio::test]
async fn test_close_mid_frame_stops_without_scan() {
    let mut rig = Rig::start(ListenerConfig::default());

    rig.firmware.send(&[0x01, 0x04, 0xA3, 0x47]).unwrap();
    rig.firmware.close();

    let seen = rig.notifications_until_stopped().await;
    assert_eq!(
        seen,
        vec![Notification::ListenerStopped {
            reason: "stream closed".to_string()
        }]
    );
}

#[tokio::test]
async fn test_shutdown_while_idle() {
    let Rig {
        listener,
        firmware: _firmware,
        mut notifications,
    } = Rig::start(ListenerConfig::default());

    let stats = listener.shutdown().await.unwrap();
    assert_eq!(stats.frames, 0);

    let seen = until_stopped(&mut notifications).await;
    assert_eq!(
        seen,
        vec![Notification::ListenerStopped {
            reason: "shutdown requested".to_string()
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_pending_unlock() {
    let mut rig = Rig::start(ListenerConfig::default());

    rig.firmware.send(&scan_frame(&KEY_TAG)).unwrap();
    // Let the scan be dispatched
    for _ in 0..2 {
        rig.notifications.recv().await.unwrap();
    }

    let stats = rig.listener.shutdown().await.unwrap();
    assert_eq!(stats.unlocks_sent, 1);
    assert_eq!(rig.firmware.drain_writes().len(), 1);
}

// ============================================================================
// Tokio I/O link
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_listener_over_duplex_link() {
    let (host, mut device) = tokio::io::duplex(64);
    let (sink, mut notifications) = ChannelSink::new();
    let engine = DispatchEngine::new(
        IoStream::new(host),
        Arc::new(common::registry()),
        Arc::new(sink),
        ListenerConfig::default(),
    )
    .unwrap();
    let listener = ListenerHandle::spawn(engine);

    device.write_all(&scan_frame(&KEY_TAG)).await.unwrap();

    let mut unlock = [0u8; 1];
    device.read_exact(&mut unlock).await.unwrap();
    assert_eq!(unlock, [0x01]);

    assert_eq!(
        notifications.recv().await,
        Some(Notification::OpCodeReceived {
            opcode: OpCode::RfidRead
        })
    );
    assert_eq!(
        notifications.recv().await,
        Some(Notification::ValidCardScanned {
            record: key_tag_record()
        })
    );

    drop(device);
    let stats = listener.join().await.unwrap();
    assert_eq!(stats.unlocks_sent, 1);
}
