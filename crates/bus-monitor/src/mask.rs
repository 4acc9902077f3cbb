//! Fixed-width set of payload byte positions

use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest payload the engine can track, in bytes
pub const MAX_PAYLOAD_LEN: usize = 64;

/// Set of byte positions `0..64`, one bit per position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteMask(u64);

impl ByteMask {
    /// The empty set
    pub const EMPTY: ByteMask = ByteMask(0);

    /// Create from raw bits (bit `n` = position `n`)
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw bits
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Mask with every position below `len` set
    pub fn first(len: usize) -> Self {
        if len >= MAX_PAYLOAD_LEN {
            Self(u64::MAX)
        } else {
            Self((1u64 << len) - 1)
        }
    }

    /// Add a position; positions outside `0..64` are ignored
    pub fn insert(&mut self, position: usize) {
        if position < MAX_PAYLOAD_LEN {
            self.0 |= 1u64 << position;
        }
    }

    /// Remove a position
    pub fn remove(&mut self, position: usize) {
        if position < MAX_PAYLOAD_LEN {
            self.0 &= !(1u64 << position);
        }
    }

    /// Check whether a position is in the set
    pub fn contains(&self, position: usize) -> bool {
        position < MAX_PAYLOAD_LEN && self.0 & (1u64 << position) != 0
    }

    /// Number of positions in the set
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// True if no position is set
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Positions in both sets
    pub fn intersection(self, other: ByteMask) -> ByteMask {
        ByteMask(self.0 & other.0)
    }

    /// Positions in either set
    pub fn union(self, other: ByteMask) -> ByteMask {
        ByteMask(self.0 | other.0)
    }

    /// Positions in `self` but not in `other`
    pub fn difference(self, other: ByteMask) -> ByteMask {
        ByteMask(self.0 & !other.0)
    }

    /// Iterate set positions in ascending order
    pub fn iter(&self) -> ByteMaskIter {
        ByteMaskIter(self.0)
    }
}

impl FromIterator<usize> for ByteMask {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut mask = ByteMask::EMPTY;
        for position in iter {
            mask.insert(position);
        }
        mask
    }
}

impl IntoIterator for ByteMask {
    type Item = usize;
    type IntoIter = ByteMaskIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ByteMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the positions of a [`ByteMask`]
#[derive(Debug, Clone)]
pub struct ByteMaskIter(u64);

impl Iterator for ByteMaskIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let position = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for ByteMaskIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_contains_remove() {
        let mut mask = ByteMask::EMPTY;
        mask.insert(0);
        mask.insert(63);
        mask.insert(64); // ignored
        assert!(mask.contains(0));
        assert!(mask.contains(63));
        assert!(!mask.contains(64));
        assert_eq!(mask.len(), 2);

        mask.remove(0);
        assert!(!mask.contains(0));
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![63]);
    }

    #[test]
    fn test_first() {
        assert_eq!(ByteMask::first(0), ByteMask::EMPTY);
        assert_eq!(ByteMask::first(4).iter().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(ByteMask::first(64).len(), 64);
        assert_eq!(ByteMask::first(100).len(), 64);
    }

    #[test]
    fn test_set_operations() {
        let a: ByteMask = [1, 2, 3].into_iter().collect();
        let b: ByteMask = [3, 4].into_iter().collect();
        assert_eq!(a.intersection(b).iter().collect::<Vec<_>>(), vec![3]);
        assert_eq!(a.union(b).len(), 4);
        assert_eq!(a.difference(b).iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(a.to_string(), "{1, 2, 3}");
    }
}
