//! Operator-maintained byte suppression

use std::collections::HashMap;

use crate::id::FrameId;
use crate::mask::ByteMask;

/// Set of `(identifier, byte position)` pairs excluded from change highlighting
///
/// All operations are idempotent.
#[derive(Debug, Default, Clone)]
pub struct SuppressionSet {
    entries: HashMap<FrameId, ByteMask>,
}

impl SuppressionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress one position; returns true if it was not already suppressed
    pub fn suppress_byte(&mut self, id: FrameId, position: usize) -> bool {
        let mask = self.entries.entry(id).or_default();
        let before = *mask;
        mask.insert(position);
        let added = *mask != before;
        if mask.is_empty() {
            self.entries.remove(&id);
        }
        added
    }

    /// Suppress every position in `positions`; returns how many were new
    ///
    /// This is a snapshot: positions that start changing later are not
    /// covered.
    pub fn suppress_mask(&mut self, id: FrameId, positions: ByteMask) -> usize {
        if positions.is_empty() {
            return 0;
        }
        let mask = self.entries.entry(id).or_default();
        let added = positions.difference(*mask).len();
        *mask = mask.union(positions);
        added
    }

    /// Remove all suppressions for one identifier
    pub fn clear(&mut self, id: FrameId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Remove every suppression
    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// Check whether a position is suppressed
    pub fn contains(&self, id: FrameId, position: usize) -> bool {
        self.mask(id).contains(position)
    }

    /// Suppressed positions of one identifier
    pub fn mask(&self, id: FrameId) -> ByteMask {
        self.entries.get(&id).copied().unwrap_or_default()
    }

    /// Total number of suppressed `(identifier, position)` pairs
    pub fn len(&self) -> usize {
        self.entries.values().map(ByteMask::len).sum()
    }

    /// True if nothing is suppressed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
