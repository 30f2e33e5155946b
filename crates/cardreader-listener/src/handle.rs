//! Background listener task.

use cardreader_core::{ByteSink, ByteSource};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::dispatch::{DispatchEngine, DispatchStats};

/// Errors from a listener running in the background.
#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("Listener task panicked: {0}")]
    TaskPanicked(String),

    #[error("Listener task was aborted")]
    TaskAborted,
}

impl From<tokio::task::JoinError> for ListenerError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_cancelled() {
            Self::TaskAborted
        } else {
            Self::TaskPanicked(e.to_string())
        }
    }
}

/// Handle to a [`DispatchEngine`] running on its own task.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use cardreader_core::TagRegistry;
/// use cardreader_hardware::mock::MockStream;
/// use cardreader_listener::{ChannelSink, DispatchEngine, ListenerConfig, ListenerHandle};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (stream, _firmware) = MockStream::new();
/// let (sink, mut notifications) = ChannelSink::new();
/// let engine = DispatchEngine::new(
///     stream,
///     Arc::new(TagRegistry::new()),
///     Arc::new(sink),
///     ListenerConfig::default(),
/// )?;
///
/// let listener = ListenerHandle::spawn(engine);
/// while let Some(notification) = notifications.recv().await {
///     println!("{notification:?}");
/// }
/// let stats = listener.shutdown().await?;
/// println!("{} frames", stats.frames);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ListenerHandle {
    task: JoinHandle<DispatchStats>,
    shutdown: CancellationToken,
}

impl ListenerHandle {
    /// Spawn `engine` on the current tokio runtime.
    pub fn spawn<R, W>(engine: DispatchEngine<R, W>) -> Self
    where
        R: ByteSource + 'static,
        W: ByteSink + 'static,
    {
        Self::spawn_with_token(engine, CancellationToken::new())
    }

    /// Spawn `engine`, stopping it when `shutdown` is cancelled.
    pub fn spawn_with_token<R, W>(engine: DispatchEngine<R, W>, shutdown: CancellationToken) -> Self
    where
        R: ByteSource + 'static,
        W: ByteSink + 'static,
    {
        let task = tokio::spawn(engine.run(shutdown.clone()));
        Self { task, shutdown }
    }

    /// Token that stops the listener when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop reading and wait for pending unlocks to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener task panicked.
    pub async fn shutdown(self) -> Result<DispatchStats, ListenerError> {
        self.shutdown.cancel();
        self.join().await
    }

    /// Wait for the listener to stop on its own.
    pub async fn join(self) -> Result<DispatchStats, ListenerError> {
        self.task.await.map_err(|e| {
            error!("Listener task failed: {}", e);
            ListenerError::from(e)
        })
    }
}
