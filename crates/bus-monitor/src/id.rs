//! Frame identifiers and raw frames

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Composite key naming one traffic stream on the bus
///
/// Ordering is `(source, address)` ascending, which is also the tie-break
/// order used by every sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId {
    /// Channel the frame was received on
    pub source: u8,
    /// Numeric bus address
    pub address: u32,
}

impl FrameId {
    /// Create a new identifier
    pub const fn new(source: u8, address: u32) -> Self {
        Self { source, address }
    }

    /// Address formatted as uppercase hex without prefix
    pub fn address_hex(&self) -> String {
        format!("{:X}", self.address)
    }

    /// Display name used when no definition exists for this identifier
    pub fn fallback_name(&self) -> String {
        format!("UNTITLED_{:X}", self.address)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:X}", self.source, self.address)
    }
}

/// Error returned when parsing a [`FrameId`] from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frame id: {0:?} (expected \"source:ADDRESS\")")]
pub struct ParseFrameIdError(pub String);

impl FromStr for FrameId {
    type Err = ParseFrameIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFrameIdError(s.to_string());
        let (source, address) = s.trim().split_once(':').ok_or_else(err)?;
        let source = source.trim().parse::<u8>().map_err(|_| err())?;
        let address = address.trim();
        let address = address
            .strip_prefix("0x")
            .or_else(|| address.strip_prefix("0X"))
            .unwrap_or(address);
        let address = u32::from_str_radix(address, 16).map_err(|_| err())?;
        Ok(Self { source, address })
    }
}

/// One observed frame: identifier, payload and stream-relative timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Identifier the frame belongs to
    pub id: FrameId,
    /// Raw payload bytes
    pub data: Vec<u8>,
    /// Monotonic time since the stream started
    pub timestamp: Duration,
}

impl Frame {
    /// Create a new frame
    pub fn new(id: FrameId, data: impl Into<Vec<u8>>, timestamp: Duration) -> Self {
        Self {
            id,
            data: data.into(),
            timestamp,
        }
    }
}

/// Format bytes as contiguous uppercase hex (`[0x01, 0xAB]` -> `"01AB"`)
pub fn hex_string(bytes: &[u8]) -> String {
    use fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02X}", byte);
    }
    out
}
