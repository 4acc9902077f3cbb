//! Live monitor configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the monitor actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Capacity of the command channel
    pub command_buffer: usize,

    /// How often frame updates are committed to readers (milliseconds)
    pub publish_interval_ms: u64,

    /// Capacity of the notification broadcast channel
    pub event_capacity: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            command_buffer: 1024,
            publish_interval_ms: 50,
            event_capacity: 256,
        }
    }
}

impl LiveConfig {
    /// Publish interval, at least one millisecond
    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms.max(1))
    }
}
