//! Error types for the monitor engine

use thiserror::Error;

use crate::id::FrameId;

/// Errors reported by the monitor engine
///
/// None of these are fatal: the engine state is left untouched and the
/// stream keeps running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// Payload longer than the configured maximum
    #[error("malformed frame {id}: payload is {len} bytes, maximum is {max}")]
    MalformedFrame {
        /// Identifier the frame was addressed to
        id: FrameId,
        /// Received payload length
        len: usize,
        /// Configured maximum payload length
        max: usize,
    },

    /// Byte position outside the trackable range
    #[error("invalid byte position {position}: must be below {max}")]
    InvalidBytePosition {
        /// Requested position
        position: usize,
        /// Exclusive upper bound
        max: usize,
    },

    /// Configuration rejected by validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
