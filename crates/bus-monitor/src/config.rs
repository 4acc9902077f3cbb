//! Engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;
use crate::mask::MAX_PAYLOAD_LEN;

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Longest accepted payload in bytes (1..=64)
    pub max_payload_len: usize,
    /// Time constant of the frequency moving average (ms)
    ///
    /// Arrivals older than roughly this window contribute little to the estimate.
    pub frequency_window_ms: u64,
    /// Smallest inter-frame interval used when computing `1 / dt` (us)
    pub min_frame_interval_us: u64,
    /// Number of further updates a changed byte stays highlighted
    pub highlight_fade_ticks: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_payload_len: MAX_PAYLOAD_LEN,
            frequency_window_ms: 1000,
            min_frame_interval_us: 100,
            highlight_fade_ticks: 8,
        }
    }
}

impl MonitorConfig {
    /// Check the configuration for values the engine cannot honour
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.max_payload_len == 0 || self.max_payload_len > MAX_PAYLOAD_LEN {
            return Err(MonitorError::InvalidConfig(format!(
                "max_payload_len must be between 1 and {}, got {}",
                MAX_PAYLOAD_LEN, self.max_payload_len
            )));
        }
        if self.frequency_window_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "frequency_window_ms must be greater than zero".to_string(),
            ));
        }
        if self.min_frame_interval_us == 0 {
            return Err(MonitorError::InvalidConfig(
                "min_frame_interval_us must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Frequency smoothing window as a duration
    pub fn frequency_window(&self) -> Duration {
        Duration::from_millis(self.frequency_window_ms)
    }

    /// Minimum inter-frame interval as a duration
    pub fn min_frame_interval(&self) -> Duration {
        Duration::from_micros(self.min_frame_interval_us)
    }
}
