//! Error types for the bus simulator

use bus_live::LiveError;
use thiserror::Error;

/// Errors that can occur while simulating a bus
#[derive(Debug, Error)]
pub enum SimError {
    /// Node configuration cannot produce valid frames
    #[error("invalid node: {0}")]
    InvalidNode(String),

    /// The live monitor stopped accepting frames
    #[error("monitor unavailable: {0}")]
    Live(#[from] LiveError),
}
