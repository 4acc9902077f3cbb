//! Externally visible row projections

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::changes::ByteHighlight;
use crate::id::{hex_string, FrameId};

/// Columns of the message table
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Column {
    /// Display name from the definition catalog
    #[default]
    Name,
    /// Source channel
    Source,
    /// Bus address
    Address,
    /// Frames per second
    Frequency,
    /// Frames received
    Count,
    /// Latest payload
    Data,
}

impl Column {
    /// All columns in table order
    pub const ALL: [Column; 6] = [
        Column::Name,
        Column::Source,
        Column::Address,
        Column::Frequency,
        Column::Count,
        Column::Data,
    ];

    /// Header title
    pub fn title(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Source => "Bus",
            Self::Address => "ID",
            Self::Frequency => "Freq",
            Self::Count => "Count",
            Self::Data => "Bytes",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Error returned when parsing a [`Column`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown column: {0:?}")]
pub struct ParseColumnError(pub String);

impl FromStr for Column {
    type Err = ParseColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "source" | "bus" => Ok(Self::Source),
            "address" | "id" | "addr" => Ok(Self::Address),
            "frequency" | "freq" => Ok(Self::Frequency),
            "count" => Ok(Self::Count),
            "data" | "bytes" => Ok(Self::Data),
            _ => Err(ParseColumnError(s.to_string())),
        }
    }
}

/// Non-fatal condition attached to a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowWarning {
    /// Payload length differs from the catalog's expected size
    SizeMismatch {
        /// Size from the definition
        expected: usize,
        /// Size of the latest payload
        actual: usize,
    },
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch { expected, actual } => {
                write!(f, "message size ({}) is incorrect, got {}", expected, actual)
            }
        }
    }
}

/// Point-in-time copy of one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSnapshot {
    /// Identifier
    pub id: FrameId,
    /// Display name (catalog name or synthesized fallback)
    pub name: String,
    /// Whether the catalog knows this identifier
    pub has_definition: bool,
    /// Smoothed frames per second
    pub frequency: f64,
    /// Accepted frames
    pub count: u64,
    /// Latest payload
    pub payload: Vec<u8>,
    /// Timestamp of the newest frame
    pub last_seen: Duration,
    /// Active, non-suppressed highlights
    pub highlights: Vec<ByteHighlight>,
    /// Non-fatal warnings
    pub warnings: Vec<RowWarning>,
}

impl RowSnapshot {
    /// Source channel
    pub fn source(&self) -> u8 {
        self.id.source
    }

    /// Bus address
    pub fn address(&self) -> u32 {
        self.id.address
    }

    /// Payload as contiguous uppercase hex
    pub fn data_hex(&self) -> String {
        hex_string(&self.payload)
    }

    /// Check whether a byte position is currently highlighted
    pub fn is_highlighted(&self, position: usize) -> bool {
        self.highlights.iter().any(|h| h.position == position)
    }
}

/// Committed view handed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    /// Visible rows in display order
    pub rows: Vec<RowSnapshot>,
    /// Identifiers known to the store (visible or not)
    pub total_rows: usize,
    /// Newest accepted timestamp
    pub current_time: Duration,
    /// Frames rejected as malformed since the last reset
    pub rejected_frames: u64,
    /// Suppressed `(identifier, position)` pairs
    pub suppressed_bytes: usize,
}

impl ViewSnapshot {
    /// Number of visible rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if no row is visible
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find a visible row
    pub fn row(&self, id: FrameId) -> Option<&RowSnapshot> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Display-order position of a visible row
    pub fn position(&self, id: FrameId) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    /// Identifiers in display order
    pub fn ids(&self) -> Vec<FrameId> {
        self.rows.iter().map(|row| row.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_parse() {
        assert_eq!("freq".parse::<Column>().unwrap(), Column::Frequency);
        assert_eq!(" Address ".parse::<Column>().unwrap(), Column::Address);
        assert_eq!("bytes".parse::<Column>().unwrap(), Column::Data);
        assert!("signal".parse::<Column>().is_err());
    }

    #[test]
    fn test_warning_display() {
        let warning = RowWarning::SizeMismatch {
            expected: 8,
            actual: 6,
        };
        assert_eq!(warning.to_string(), "message size (8) is incorrect, got 6");
    }
}
