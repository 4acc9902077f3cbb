//! Byte-level change detection with highlight aging

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::FrameId;
use crate::mask::{ByteMask, MAX_PAYLOAD_LEN};
use crate::suppress::SuppressionSet;

/// Direction of a byte's most recent change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteTrend {
    /// New value greater than the previous one
    Rising,
    /// New value smaller than the previous one
    Falling,
}

/// One highlighted byte position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteHighlight {
    /// Byte position in the payload
    pub position: usize,
    /// Updates since the byte last changed (0 = changed in the latest frame)
    pub age: u32,
    /// Direction of the change
    pub trend: ByteTrend,
}

/// Highlight state for one identifier
#[derive(Debug, Clone)]
struct ActiveBytes {
    mask: ByteMask,
    rising: ByteMask,
    ages: [u32; MAX_PAYLOAD_LEN],
}

impl ActiveBytes {
    fn new() -> Self {
        Self {
            mask: ByteMask::EMPTY,
            rising: ByteMask::EMPTY,
            ages: [0; MAX_PAYLOAD_LEN],
        }
    }

    /// Age every active position by one tick, dropping those past `fade_ticks`
    fn age(&mut self, fade_ticks: u32) {
        for position in self.mask {
            self.ages[position] += 1;
            if self.ages[position] > fade_ticks {
                self.mask.remove(position);
            }
        }
    }

    fn retain(&mut self, keep: ByteMask) {
        self.mask = self.mask.intersection(keep);
    }

    fn mark(&mut self, changed: ByteMask, rising: ByteMask) {
        for position in changed {
            self.ages[position] = 0;
        }
        self.mask = self.mask.union(changed);
        self.rising = self.rising.difference(changed).union(rising);
    }

    fn highlights(&self) -> Vec<ByteHighlight> {
        self.mask
            .iter()
            .map(|position| ByteHighlight {
                position,
                age: self.ages[position],
                trend: if self.rising.contains(position) {
                    ByteTrend::Rising
                } else {
                    ByteTrend::Falling
                },
            })
            .collect()
    }
}

/// Tracks which bytes of each identifier changed recently
///
/// Every diff ages the identifier's existing highlights by one tick, so a
/// highlight fades after `fade_ticks` further frames unless the byte changes
/// again.
///
/// Aging is driven only by frames of the same identifier. A row that stops
/// transmitting keeps its last highlights until it sends again or the
/// monitor is reset.
#[derive(Debug)]
pub struct ChangeTracker {
    fade_ticks: u32,
    active: HashMap<FrameId, ActiveBytes>,
}

impl ChangeTracker {
    /// Create a tracker with the given fade threshold
    pub fn new(fade_ticks: u32) -> Self {
        Self {
            fade_ticks,
            active: HashMap::new(),
        }
    }

    /// Fade threshold in ticks
    pub fn fade_ticks(&self) -> u32 {
        self.fade_ticks
    }

    /// Compare two consecutive payloads and update the highlight set
    ///
    /// Only positions present in both payloads can be reported. Suppressed
    /// positions are never reported and never highlighted. Returns the
    /// positions that changed in this update.
    pub fn diff(
        &mut self,
        id: FrameId,
        previous: &[u8],
        current: &[u8],
        suppression: &SuppressionSet,
    ) -> ByteMask {
        let suppressed = suppression.mask(id);
        let shared = previous.len().min(current.len()).min(MAX_PAYLOAD_LEN);

        let mut changed = ByteMask::EMPTY;
        let mut rising = ByteMask::EMPTY;
        for (position, (old, new)) in previous[..shared]
            .iter()
            .zip(&current[..shared])
            .enumerate()
        {
            if old != new && !suppressed.contains(position) {
                changed.insert(position);
                if new > old {
                    rising.insert(position);
                }
            }
        }

        if changed.is_empty() && !self.active.contains_key(&id) {
            return changed;
        }

        let fade_ticks = self.fade_ticks;
        let entry = self.active.entry(id).or_insert_with(ActiveBytes::new);
        entry.age(fade_ticks);
        entry.retain(ByteMask::first(current.len()).difference(suppressed));
        entry.mark(changed, rising);

        if entry.mask.is_empty() {
            self.active.remove(&id);
        }

        changed
    }

    /// Positions currently highlighted for an identifier
    pub fn active(&self, id: FrameId) -> ByteMask {
        self.active
            .get(&id)
            .map(|entry| entry.mask)
            .unwrap_or_default()
    }

    /// Highlighted positions with age and trend, in position order
    pub fn highlights(&self, id: FrameId) -> Vec<ByteHighlight> {
        self.active
            .get(&id)
            .map(ActiveBytes::highlights)
            .unwrap_or_default()
    }

    /// Identifiers with at least one highlighted position
    pub fn active_ids(&self) -> impl Iterator<Item = (FrameId, ByteMask)> + '_ {
        self.active.iter().map(|(id, entry)| (*id, entry.mask))
    }

    /// Stop highlighting the given positions
    pub fn clear_positions(&mut self, id: FrameId, positions: ByteMask) {
        if let Some(entry) = self.active.get_mut(&id) {
            entry.mask = entry.mask.difference(positions);
            if entry.mask.is_empty() {
                self.active.remove(&id);
            }
        }
    }

    /// Drop all highlight state
    pub fn reset(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: FrameId = FrameId::new(0, 0x100);

    fn positions(mask: ByteMask) -> Vec<usize> {
        mask.iter().collect()
    }

    #[test]
    fn test_reports_differing_positions() {
        let mut tracker = ChangeTracker::new(8);
        let none = SuppressionSet::new();
        let changed = tracker.diff(ID, &[1, 2, 3, 4], &[1, 9, 3, 0], &none);
        assert_eq!(positions(changed), vec![1, 3]);
        assert_eq!(positions(tracker.active(ID)), vec![1, 3]);
    }

    #[test]
    fn test_identical_payload_reports_nothing() {
        let mut tracker = ChangeTracker::new(8);
        let none = SuppressionSet::new();
        assert!(tracker.diff(ID, &[1, 2], &[1, 2], &none).is_empty());
        assert!(tracker.active_ids().next().is_none());
    }

    #[test]
    fn test_quiet_row_keeps_highlight() {
        let mut tracker = ChangeTracker::new(2);
        let none = SuppressionSet::new();
        let other = FrameId::new(0, 0x200);
        tracker.diff(ID, &[0], &[1], &none);

        for _ in 0..10 {
            tracker.diff(other, &[5], &[5], &none);
        }
        assert_eq!(tracker.highlights(ID)[0].age, 0);

        for _ in 0..3 {
            tracker.diff(ID, &[1], &[1], &none);
        }
        assert!(tracker.active(ID).is_empty());
    }

    #[test]
    fn test_length_change_is_not_a_change() {
        let mut tracker = ChangeTracker::new(8);
        let none = SuppressionSet::new();
        let grown = tracker.diff(ID, &[1, 2], &[1, 2, 3, 4], &none);
        assert!(grown.is_empty());

        let shrunk = tracker.diff(ID, &[0; 8], &[0, 0, 0, 1], &none);
        assert_eq!(positions(shrunk), vec![3]);
    }

    #[test]
    fn test_shrink_prunes_highlights_beyond_length() {
        let mut tracker = ChangeTracker::new(8);
        let none = SuppressionSet::new();
        tracker.diff(ID, &[0; 8], &[0, 0, 0, 0, 0, 0, 0, 1], &none);
        assert!(tracker.active(ID).contains(7));

        tracker.diff(ID, &[0, 0, 0, 0, 0, 0, 0, 1], &[0; 4], &none);
        assert!(tracker.active(ID).is_empty());
    }

    #[test]
    fn test_suppressed_positions_dropped() {
        let mut tracker = ChangeTracker::new(8);
        let mut suppression = SuppressionSet::new();
        suppression.suppress_byte(ID, 1);

        let changed = tracker.diff(ID, &[1, 2, 3], &[2, 3, 4], &suppression);
        assert_eq!(positions(changed), vec![0, 2]);
        assert!(!tracker.active(ID).contains(1));
    }

    #[test]
    fn test_highlight_fades_after_threshold() {
        let mut tracker = ChangeTracker::new(2);
        let none = SuppressionSet::new();
        tracker.diff(ID, &[0], &[1], &none);
        assert_eq!(tracker.highlights(ID)[0].age, 0);

        tracker.diff(ID, &[1], &[1], &none);
        assert_eq!(tracker.highlights(ID)[0].age, 1);
        tracker.diff(ID, &[1], &[1], &none);
        assert_eq!(tracker.highlights(ID)[0].age, 2);

        tracker.diff(ID, &[1], &[1], &none);
        assert!(tracker.highlights(ID).is_empty());
    }

    #[test]
    fn test_repeated_change_resets_age() {
        let mut tracker = ChangeTracker::new(2);
        let none = SuppressionSet::new();
        tracker.diff(ID, &[0], &[1], &none);
        tracker.diff(ID, &[1], &[1], &none);
        tracker.diff(ID, &[1], &[2], &none);
        assert_eq!(tracker.highlights(ID)[0].age, 0);
    }

    #[test]
    fn test_trend() {
        let mut tracker = ChangeTracker::new(8);
        let none = SuppressionSet::new();
        tracker.diff(ID, &[5, 5], &[6, 4], &none);
        let highlights = tracker.highlights(ID);
        assert_eq!(highlights[0].trend, ByteTrend::Rising);
        assert_eq!(highlights[1].trend, ByteTrend::Falling);

        tracker.diff(ID, &[6, 4], &[5, 4], &none);
        assert_eq!(tracker.highlights(ID)[0].trend, ByteTrend::Falling);
    }

    #[test]
    fn test_clear_positions() {
        let mut tracker = ChangeTracker::new(8);
        let none = SuppressionSet::new();
        tracker.diff(ID, &[0, 0], &[1, 1], &none);
        tracker.clear_positions(ID, [0].into_iter().collect());
        assert_eq!(positions(tracker.active(ID)), vec![1]);
        tracker.clear_positions(ID, [1].into_iter().collect());
        assert!(tracker.active_ids().next().is_none());
    }
}
