//! Change notifications emitted by the monitor
//!
//! Observers poll [`Monitor::drain_events`](crate::Monitor::drain_events)
//! and pull fresh data with `snapshot()` or `row()`; events only say *what*
//! changed. Per-row updates are coalesced between drains, so the buffer is
//! bounded by the number of known identifiers.

use crate::id::FrameId;

/// Notification that part of the monitor state changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// First frame seen for an identifier
    RowAdded {
        /// New identifier
        id: FrameId,
    },

    /// An existing row's data or highlights changed
    RowUpdated {
        /// Updated identifier
        id: FrameId,
    },

    /// Membership or order of the whole view changed (filter, sort,
    /// suppression clear, definition refresh)
    ViewInvalidated,

    /// All rows were dropped; observers must re-render from scratch
    Reset,

    /// Frames were rejected as malformed since the last drain
    FramesRejected {
        /// Rejected since the last drain
        count: u64,
        /// Rejected since the last reset
        total: u64,
    },
}

impl MonitorEvent {
    /// Identifier this event concerns, if it concerns a single row
    pub fn frame_id(&self) -> Option<FrameId> {
        match self {
            MonitorEvent::RowAdded { id } | MonitorEvent::RowUpdated { id } => Some(*id),
            _ => None,
        }
    }

    /// True if observers must rebuild their whole view
    pub fn requires_full_refresh(&self) -> bool {
        matches!(self, MonitorEvent::ViewInvalidated | MonitorEvent::Reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_classification() {
        let id = FrameId::new(0, 0x100);
        assert_eq!(MonitorEvent::RowAdded { id }.frame_id(), Some(id));
        assert_eq!(MonitorEvent::RowUpdated { id }.frame_id(), Some(id));
        assert_eq!(MonitorEvent::Reset.frame_id(), None);

        assert!(MonitorEvent::Reset.requires_full_refresh());
        assert!(MonitorEvent::ViewInvalidated.requires_full_refresh());
        assert!(!MonitorEvent::RowUpdated { id }.requires_full_refresh());
    }
}
