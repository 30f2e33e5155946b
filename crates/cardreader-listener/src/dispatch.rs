//! Frame dispatch loop.
//!
//! The [`DispatchEngine`] owns the read half of the link. It decodes one
//! frame at a time and turns each into notifications:
//!
//! | Frame             | Notifications                                   | Side effect      |
//! |-------------------|-------------------------------------------------|------------------|
//! | `RFID_READ`       | `OpCodeReceived`, then the scan notification    | unlock scheduled |
//! | `RFID_LOCK_STATE` | `OpCodeReceived`, then `LockStateReported`      | none             |
//! | anything else     | none                                            | byte skipped     |
//!
//! The loop ends when the link closes or the shutdown token fires. Unlocks
//! still waiting out their settle delay are allowed to finish before the
//! engine reports `ListenerStopped`.

use std::sync::Arc;

use cardreader_core::{ByteSink, ByteSource, ByteStream, Error, Result, TagRegistry};
use cardreader_protocol::{Frame, FrameDecoder};
use serde::Serialize;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ListenerConfig;
use crate::events::{Notification, NotificationSink};
use crate::sequencer::UnlockSequencer;

/// Counters collected while the engine runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Frames decoded, including unrecognized opcodes.
    pub frames: u64,

    /// `RFID_READ` frames.
    pub scans: u64,

    /// Scans of registered tags.
    pub known: u64,

    /// Scans of unregistered tags.
    pub unknown: u64,

    /// `RFID_LOCK_STATE` frames.
    pub lock_reports: u64,

    /// Unrecognized opcode bytes skipped.
    pub skipped: u64,

    /// Unlock bytes written.
    pub unlocks_sent: u64,

    /// Unlocks that failed to write.
    pub unlocks_failed: u64,
}

/// Why the dispatch loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    StreamClosed,
    Shutdown,
}

impl StopReason {
    fn as_str(self) -> &'static str {
        match self {
            StopReason::StreamClosed => "stream closed",
            StopReason::Shutdown => "shutdown requested",
        }
    }
}

/// Decodes frames from the link and dispatches them.
pub struct DispatchEngine<R, W> {
    decoder: FrameDecoder<R>,
    registry: Arc<TagRegistry>,
    sequencer: UnlockSequencer<W>,
    notifications: Arc<dyn NotificationSink>,
    config: ListenerConfig,
    unlocks: JoinSet<Result<()>>,
    stats: DispatchStats,
}

impl<R, W> std::fmt::Debug for DispatchEngine<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("registered_tags", &self.registry.len())
            .field("config", &self.config)
            .field("pending_unlocks", &self.unlocks.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<R, W> DispatchEngine<R, W>
where
    R: ByteSource + 'static,
    W: ByteSink + 'static,
{
    /// Create an engine over an open link.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid, or
    /// `Error::StreamClosed` if the link is already closed.
    pub fn new<S>(
        stream: S,
        registry: Arc<TagRegistry>,
        notifications: Arc<dyn NotificationSink>,
        config: ListenerConfig,
    ) -> Result<Self>
    where
        S: ByteStream<Source = R, Sink = W>,
    {
        if !stream.is_open() {
            return Err(Error::StreamClosed);
        }
        let (source, sink) = stream.split();
        Self::from_parts(source, sink, registry, notifications, config)
    }

    /// Create an engine from already split link halves.
    pub fn from_parts(
        source: R,
        sink: W,
        registry: Arc<TagRegistry>,
        notifications: Arc<dyn NotificationSink>,
        config: ListenerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let sequencer = UnlockSequencer::new(sink, &config, Arc::clone(&notifications));

        Ok(Self {
            decoder: FrameDecoder::new(source),
            registry,
            sequencer,
            notifications,
            config,
            unlocks: JoinSet::new(),
            stats: DispatchStats::default(),
        })
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Number of unlocks still waiting or writing.
    pub fn pending_unlocks(&self) -> usize {
        self.unlocks.len()
    }

    /// Dispatch a single decoded frame.
    pub fn dispatch(&mut self, frame: Frame) {
        self.stats.frames += 1;

        let opcode = frame.opcode();
        if !opcode.is_recognized() {
            debug!("Skipping unrecognized opcode 0x{:02X}", opcode.as_byte());
            self.stats.skipped += 1;
            return;
        }

        self.notifications
            .notify(Notification::OpCodeReceived { opcode });

        match frame {
            Frame::RfidRead { identifier } => {
                self.stats.scans += 1;

                let outcome = self.registry.lookup(&identifier);
                if outcome.is_known() {
                    self.stats.known += 1;
                } else {
                    self.stats.unknown += 1;
                }
                info!(
                    uid = %identifier,
                    label = outcome.label().unwrap_or("<unknown>"),
                    "Tag scanned"
                );

                self.notifications.notify(Notification::for_scan(
                    outcome,
                    self.config.split_valid_invalid_events,
                ));
                self.sequencer.schedule(&mut self.unlocks, identifier);
            }
            Frame::LockState { locked } => {
                self.stats.lock_reports += 1;
                debug!(locked, "Lock state reported");
                self.notifications
                    .notify(Notification::LockStateReported { locked });
            }
            Frame::Unrecognized { .. } => {}
        }
    }

    /// Run until the link closes or `shutdown` is cancelled.
    ///
    /// Returns the counters collected over the run.
    pub async fn run(mut self, shutdown: CancellationToken) -> DispatchStats {
        info!(
            tags = self.registry.len(),
            settle_ms = self.sequencer.settle_delay().as_millis() as u64,
            "Listener started"
        );

        let reason = loop {
            while let Some(result) = self.unlocks.try_join_next() {
                self.record_unlock(result);
            }

            // Only the shutdown branch may drop a half-read frame
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break StopReason::Shutdown,
                next = self.decoder.next_frame() => next,
            };

            match next {
                Ok(frame) => self.dispatch(frame),
                Err(e) if e.is_stream_closed() => break StopReason::StreamClosed,
                Err(e) => {
                    warn!("Dropped frame: {}", e);
                    self.notifications.notify(Notification::FrameDropped {
                        reason: e.to_string(),
                    });
                }
            }
        };

        if !self.unlocks.is_empty() {
            debug!("Waiting for {} pending unlocks", self.unlocks.len());
        }
        while let Some(result) = self.unlocks.join_next().await {
            self.record_unlock(result);
        }

        info!(
            reason = reason.as_str(),
            frames = self.stats.frames,
            scans = self.stats.scans,
            unlocks_sent = self.stats.unlocks_sent,
            "Listener stopped"
        );
        self.notifications.notify(Notification::ListenerStopped {
            reason: reason.as_str().to_string(),
        });

        self.stats
    }

    fn record_unlock(&mut self, result: std::result::Result<Result<()>, JoinError>) {
        match result {
            Ok(Ok(())) => self.stats.unlocks_sent += 1,
            // Already reported by the sequencer
            Ok(Err(_)) => self.stats.unlocks_failed += 1,
            Err(e) => {
                warn!("Unlock task failed: {}", e);
                self.stats.unlocks_failed += 1;
            }
        }
    }
}
