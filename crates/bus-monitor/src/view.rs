//! Filtered, sorted projection of the known identifiers
//!
//! The view keeps only identifiers and their cached sort keys in a
//! `BTreeSet`, so a single frame moves its row in `O(log n)` while filter
//! and sort changes rebuild the whole index.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::filter::FilterSet;
use crate::id::FrameId;
use crate::row::{Column, RowSnapshot};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

impl SortOrder {
    /// The other direction
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Frames per second with a total order
#[derive(Debug, Clone, Copy)]
struct Rate(f64);

impl PartialEq for Rate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rate {}

impl PartialOrd for Rate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Value a row is ordered by under the current sort column
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Text(String),
    Number(u64),
    Rate(Rate),
    Bytes(Vec<u8>),
}

impl SortKey {
    fn extract(column: Column, row: &RowSnapshot) -> Self {
        match column {
            Column::Name => Self::Text(row.name.to_lowercase()),
            Column::Source => Self::Number(row.id.source as u64),
            Column::Address => Self::Number(row.id.address as u64),
            Column::Frequency => Self::Rate(Rate(row.frequency)),
            Column::Count => Self::Number(row.count),
            Column::Data => Self::Bytes(row.payload.clone()),
        }
    }
}

/// Sort key with the direction folded in
///
/// All keys in one index share a variant. Ties always fall through to the
/// identifier, which is compared ascending in both directions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum DirectedKey {
    Ascending(SortKey),
    Descending(Reverse<SortKey>),
}

impl DirectedKey {
    fn new(key: SortKey, order: SortOrder) -> Self {
        match order {
            SortOrder::Ascending => Self::Ascending(key),
            SortOrder::Descending => Self::Descending(Reverse(key)),
        }
    }
}

/// How a single-row update affected the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Row became visible
    Inserted,
    /// Row stayed visible and changed position
    Moved,
    /// Row stayed visible at the same position
    Unchanged,
    /// Row stopped being visible
    Removed,
    /// Row was and stays hidden
    Hidden,
}

/// Ordered sequence of visible identifiers
#[derive(Debug, Default)]
pub struct OrderedView {
    column: Column,
    order: SortOrder,
    filters: FilterSet,
    index: BTreeSet<(DirectedKey, FrameId)>,
    keys: HashMap<FrameId, DirectedKey>,
}

impl OrderedView {
    /// Create an empty view sorted by name, ascending, with no filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Current sort column and direction
    pub fn sort(&self) -> (Column, SortOrder) {
        (self.column, self.order)
    }

    /// Current filter
    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Re-evaluate one row's membership and position
    pub fn on_frame(&mut self, row: &RowSnapshot) -> Placement {
        let id = row.id;
        let visible = self.filters.matches(row);
        let old = self.keys.remove(&id);

        if let Some(old_key) = &old {
            self.index.remove(&(old_key.clone(), id));
        }

        if !visible {
            return match old {
                Some(_) => Placement::Removed,
                None => Placement::Hidden,
            };
        }

        let key = DirectedKey::new(SortKey::extract(self.column, row), self.order);
        let placement = match &old {
            None => Placement::Inserted,
            Some(old_key) if *old_key == key => Placement::Unchanged,
            Some(_) => Placement::Moved,
        };
        self.index.insert((key.clone(), id));
        self.keys.insert(id, key);
        placement
    }

    /// Replace the filter and re-evaluate every row
    pub fn set_filter<I>(&mut self, filters: FilterSet, rows: I)
    where
        I: IntoIterator<Item = RowSnapshot>,
    {
        self.filters = filters;
        self.rebuild(rows);
    }

    /// Change the sort column and direction and re-sort every row
    pub fn set_sort<I>(&mut self, column: Column, order: SortOrder, rows: I)
    where
        I: IntoIterator<Item = RowSnapshot>,
    {
        self.column = column;
        self.order = order;
        self.rebuild(rows);
    }

    /// Discard the index and re-evaluate `rows` from scratch
    pub fn rebuild<I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = RowSnapshot>,
    {
        self.index.clear();
        self.keys.clear();
        for row in rows {
            if self.filters.matches(&row) {
                let key = DirectedKey::new(SortKey::extract(self.column, &row), self.order);
                self.index.insert((key.clone(), row.id));
                self.keys.insert(row.id, key);
            }
        }
    }

    /// Drop one identifier
    pub fn remove(&mut self, id: FrameId) -> bool {
        match self.keys.remove(&id) {
            Some(key) => self.index.remove(&(key, id)),
            None => false,
        }
    }

    /// Drop every identifier, keeping filter and sort settings
    pub fn clear(&mut self) {
        self.index.clear();
        self.keys.clear();
    }

    /// Check whether an identifier is visible
    pub fn contains(&self, id: FrameId) -> bool {
        self.keys.contains_key(&id)
    }

    /// Visible identifiers in display order
    pub fn ids(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.index.iter().map(|(_, id)| *id)
    }

    /// Display position of an identifier (linear scan)
    pub fn position(&self, id: FrameId) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        self.ids().position(|visible| visible == id)
    }

    /// Number of visible identifiers
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if nothing is visible
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn row(source: u8, address: u32, name: &str, count: u64, freq: f64, data: &[u8]) -> RowSnapshot {
        RowSnapshot {
            id: FrameId::new(source, address),
            name: name.to_string(),
            has_definition: true,
            frequency: freq,
            count,
            payload: data.to_vec(),
            last_seen: Duration::ZERO,
            highlights: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn sample() -> Vec<RowSnapshot> {
        vec![
            row(1, 0x300, "brake", 5, 10.0, &[3]),
            row(0, 0x200, "Airbag", 50, 100.0, &[1, 2]),
            row(0, 0x100, "cruise", 5, 10.0, &[1]),
        ]
    }

    fn ids(view: &OrderedView) -> Vec<FrameId> {
        view.ids().collect()
    }

    #[test]
    fn test_default_sort_is_name_case_insensitive() {
        let mut view = OrderedView::new();
        view.rebuild(sample());
        assert_eq!(
            ids(&view),
            vec![
                FrameId::new(0, 0x200),
                FrameId::new(1, 0x300),
                FrameId::new(0, 0x100),
            ]
        );
    }

    #[test]
    fn test_descending_ties_break_by_id_ascending() {
        let mut view = OrderedView::new();
        view.set_sort(Column::Frequency, SortOrder::Descending, sample());
        assert_eq!(
            ids(&view),
            vec![
                FrameId::new(0, 0x200),
                FrameId::new(0, 0x100),
                FrameId::new(1, 0x300),
            ]
        );
    }

    #[test]
    fn test_data_sorts_lexicographically() {
        let mut view = OrderedView::new();
        view.set_sort(Column::Data, SortOrder::Ascending, sample());
        assert_eq!(
            ids(&view),
            vec![
                FrameId::new(0, 0x100),
                FrameId::new(0, 0x200),
                FrameId::new(1, 0x300),
            ]
        );
    }

    #[test]
    fn test_on_frame_moves_row() {
        let mut view = OrderedView::new();
        view.set_sort(Column::Count, SortOrder::Ascending, sample());
        assert_eq!(view.position(FrameId::new(0, 0x100)), Some(0));

        let placement = view.on_frame(&row(0, 0x100, "cruise", 500, 10.0, &[1]));
        assert_eq!(placement, Placement::Moved);
        assert_eq!(view.position(FrameId::new(0, 0x100)), Some(2));

        let placement = view.on_frame(&row(0, 0x100, "cruise", 500, 10.0, &[2]));
        assert_eq!(placement, Placement::Unchanged);
    }

    #[test]
    fn test_on_frame_respects_filter() {
        let mut view = OrderedView::new();
        view.set_filter(FilterSet::new().with(Column::Count, ">=10"), sample());
        assert_eq!(ids(&view), vec![FrameId::new(0, 0x200)]);

        let placement = view.on_frame(&row(0, 0x100, "cruise", 10, 10.0, &[1]));
        assert_eq!(placement, Placement::Inserted);
        assert_eq!(view.len(), 2);

        let placement = view.on_frame(&row(9, 0x1, "new", 1, 0.0, &[]));
        assert_eq!(placement, Placement::Hidden);
        assert!(!view.contains(FrameId::new(9, 0x1)));
    }

    #[test]
    fn test_filter_change_can_hide_row() {
        let mut view = OrderedView::new();
        view.set_filter(FilterSet::new().with(Column::Data, "01"), sample());
        assert_eq!(view.len(), 2);
        let placement = view.on_frame(&row(0, 0x100, "cruise", 6, 10.0, &[0xFF]));
        assert_eq!(placement, Placement::Removed);
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_set_sort_is_idempotent() {
        let mut view = OrderedView::new();
        view.set_sort(Column::Count, SortOrder::Descending, sample());
        let first = ids(&view);
        view.set_sort(Column::Count, SortOrder::Descending, sample());
        assert_eq!(ids(&view), first);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut view = OrderedView::new();
        view.rebuild(sample());
        assert!(view.remove(FrameId::new(0, 0x100)));
        assert!(!view.remove(FrameId::new(0, 0x100)));
        assert_eq!(view.len(), 2);
        view.clear();
        assert!(view.is_empty());
        assert_eq!(view.sort(), (Column::Name, SortOrder::Ascending));
    }
}
