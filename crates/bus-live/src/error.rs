//! Error types for the live monitor

use bus_monitor::MonitorError;
use thiserror::Error;

/// Errors returned by [`MonitorHandle`](crate::MonitorHandle)
#[derive(Debug, Error)]
pub enum LiveError {
    /// The actor task has exited and its command channel is closed
    #[error("monitor actor has stopped")]
    MonitorStopped,

    /// The actor dropped a request without answering
    #[error("monitor actor did not respond")]
    NoResponse,

    /// The command queue is full; the frame was not queued
    #[error("monitor command queue is full")]
    QueueFull,

    /// The engine rejected an operator request
    #[error(transparent)]
    Monitor(#[from] MonitorError),
}
