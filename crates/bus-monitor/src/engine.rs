//! Monitor engine
//!
//! Wires the frame store, change tracker, suppression set and ordered view
//! into the per-frame pipeline:
//!
//! frame -> store -> diff (minus suppressed bytes) -> filter -> view position

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::changes::{ByteHighlight, ChangeTracker};
use crate::config::MonitorConfig;
use crate::definitions::{DefinitionProvider, NoDefinitions};
use crate::error::MonitorError;
use crate::events::MonitorEvent;
use crate::filter::FilterSet;
use crate::id::{Frame, FrameId};
use crate::mask::ByteMask;
use crate::row::{Column, RowSnapshot, RowWarning, ViewSnapshot};
use crate::store::{FrameStats, FrameStore};
use crate::suppress::SuppressionSet;
use crate::view::{OrderedView, Placement, SortOrder};

/// What applying one frame did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// First frame for this identifier
    pub is_new: bool,
    /// Positions reported as changed by this frame
    pub changed: ByteMask,
    /// Effect on the ordered view
    pub placement: Placement,
}

/// Totals from [`Monitor::apply_batch`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Frames accepted
    pub accepted: usize,
    /// Frames rejected as malformed
    pub rejected: usize,
    /// Identifiers seen for the first time
    pub new_rows: usize,
}

/// The live traffic monitor
pub struct Monitor {
    config: MonitorConfig,
    store: FrameStore,
    changes: ChangeTracker,
    suppressed: SuppressionSet,
    view: OrderedView,
    definitions: Arc<dyn DefinitionProvider>,
    event_buffer: Vec<MonitorEvent>,
    pending_updates: HashSet<FrameId>,
    rejected_since_drain: u64,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("config", &self.config)
            .field("rows", &self.store.len())
            .field("visible", &self.view.len())
            .field("suppressed", &self.suppressed.len())
            .field("definitions", &"<provider>")
            .finish()
    }
}

impl Monitor {
    /// Create a monitor with default configuration and no definitions
    pub fn new() -> Self {
        Self::build(MonitorConfig::default(), Arc::new(NoDefinitions))
    }

    /// Create a monitor with a validated configuration
    pub fn with_config(
        config: MonitorConfig,
        definitions: Arc<dyn DefinitionProvider>,
    ) -> Result<Self, MonitorError> {
        config.validate()?;
        Ok(Self::build(config, definitions))
    }

    fn build(config: MonitorConfig, definitions: Arc<dyn DefinitionProvider>) -> Self {
        info!(
            "Monitor created (max payload {} bytes, fade {} ticks, window {}ms)",
            config.max_payload_len, config.highlight_fade_ticks, config.frequency_window_ms
        );
        Self {
            store: FrameStore::new(&config),
            changes: ChangeTracker::new(config.highlight_fade_ticks),
            suppressed: SuppressionSet::new(),
            view: OrderedView::new(),
            definitions,
            event_buffer: Vec::new(),
            pending_updates: HashSet::new(),
            rejected_since_drain: 0,
            config,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Ingestion
    // -------------------------------------------------------------------------

    /// Apply one frame
    ///
    /// A malformed frame returns an error and leaves every row untouched.
    pub fn apply(
        &mut self,
        id: FrameId,
        data: &[u8],
        timestamp: Duration,
    ) -> Result<ApplyOutcome, MonitorError> {
        let update = match self.store.apply(id, data, timestamp) {
            Ok(update) => update,
            Err(e) => {
                self.rejected_since_drain += 1;
                return Err(e);
            }
        };

        let is_new = update.is_new;
        let changed = if is_new {
            ByteMask::EMPTY
        } else {
            self.changes
                .diff(id, update.previous, update.current, &self.suppressed)
        };

        let placement = if !is_new && self.placement_is_stable() {
            if self.view.contains(id) {
                Placement::Unchanged
            } else {
                Placement::Hidden
            }
        } else {
            match self.build_row(id) {
                Some(row) => self.view.on_frame(&row),
                None => Placement::Hidden,
            }
        };

        if is_new {
            trace!("New row {}", id);
            self.pending_updates.insert(id);
            self.event_buffer.push(MonitorEvent::RowAdded { id });
        } else if self.pending_updates.insert(id) {
            self.event_buffer.push(MonitorEvent::RowUpdated { id });
        }

        Ok(ApplyOutcome {
            is_new,
            changed,
            placement,
        })
    }

    /// Apply one [`Frame`]
    pub fn apply_frame(&mut self, frame: &Frame) -> Result<ApplyOutcome, MonitorError> {
        self.apply(frame.id, &frame.data, frame.timestamp)
    }

    /// Apply many frames in order, absorbing malformed ones
    pub fn apply_batch<'a, I>(&mut self, frames: I) -> BatchSummary
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        let mut summary = BatchSummary::default();
        for frame in frames {
            match self.apply_frame(frame) {
                Ok(outcome) => {
                    summary.accepted += 1;
                    if outcome.is_new {
                        summary.new_rows += 1;
                    }
                }
                Err(_) => summary.rejected += 1,
            }
        }
        summary
    }

    /// True when a frame for a known row can neither change its visibility
    /// nor its position
    fn placement_is_stable(&self) -> bool {
        let (column, _) = self.view.sort();
        self.view.filters().is_static()
            && matches!(column, Column::Name | Column::Source | Column::Address)
    }

    // -------------------------------------------------------------------------
    // Filtering and sorting
    // -------------------------------------------------------------------------

    /// Replace the whole filter set and re-evaluate every row
    pub fn set_filter(&mut self, filters: FilterSet) {
        debug!("Filter changed: {:?}", filters.iter().collect::<Vec<_>>());
        let rows = self.unordered_rows();
        self.view.set_filter(filters, rows);
        self.invalidate_view();
    }

    /// Change one column's filter text; blank text removes it
    pub fn set_column_filter(&mut self, column: Column, text: &str) {
        let mut filters = self.view.filters().clone();
        if filters.set(column, text) {
            self.set_filter(filters);
        }
    }

    /// Current filter set
    pub fn filters(&self) -> &FilterSet {
        self.view.filters()
    }

    /// Change the sort column and direction and re-sort every row
    pub fn set_sort(&mut self, column: Column, order: SortOrder) {
        debug!("Sort changed: {} {:?}", column, order);
        let rows = self.unordered_rows();
        self.view.set_sort(column, order, rows);
        self.invalidate_view();
    }

    /// Current sort column and direction
    pub fn sort(&self) -> (Column, SortOrder) {
        self.view.sort()
    }

    // -------------------------------------------------------------------------
    // Suppression
    // -------------------------------------------------------------------------

    /// Stop highlighting one byte of one identifier
    ///
    /// Returns false if it was already suppressed.
    pub fn suppress_byte(&mut self, id: FrameId, position: usize) -> Result<bool, MonitorError> {
        if position >= self.config.max_payload_len {
            return Err(MonitorError::InvalidBytePosition {
                position,
                max: self.config.max_payload_len,
            });
        }

        let added = self.suppressed.suppress_byte(id, position);
        if added {
            debug!("Suppressed byte {} of {}", position, id);
            self.changes.clear_positions(id, ByteMask::from_iter([position]));
            self.mark_updated(id);
        }
        Ok(added)
    }

    /// Suppress every byte of `id` that is highlighted right now
    ///
    /// Returns the number of newly suppressed positions.
    pub fn suppress_all(&mut self, id: FrameId) -> usize {
        let active = self.changes.active(id);
        if active.is_empty() {
            return 0;
        }
        let added = self.suppressed.suppress_mask(id, active);
        self.changes.clear_positions(id, active);
        self.mark_updated(id);
        debug!("Suppressed {} highlighted bytes of {}", added, id);
        added
    }

    /// Suppress every highlighted byte of every row
    pub fn suppress_active(&mut self) -> usize {
        let active: Vec<(FrameId, ByteMask)> = self.changes.active_ids().collect();
        let mut added = 0;
        for (id, mask) in active {
            added += self.suppressed.suppress_mask(id, mask);
            self.changes.clear_positions(id, mask);
            self.mark_updated(id);
        }
        if added > 0 {
            debug!("Suppressed {} highlighted bytes across all rows", added);
        }
        added
    }

    /// Remove all suppressions of one identifier
    pub fn clear_suppression(&mut self, id: FrameId) -> bool {
        let cleared = self.suppressed.clear(id);
        if cleared {
            debug!("Cleared suppression of {}", id);
            self.mark_updated(id);
        }
        cleared
    }

    /// Remove every suppression and re-evaluate the view
    pub fn clear_all_suppressions(&mut self) {
        if self.suppressed.is_empty() {
            return;
        }
        debug!("Cleared {} suppressed bytes", self.suppressed.len());
        self.suppressed.clear_all();
        let rows = self.unordered_rows();
        self.view.rebuild(rows);
        self.invalidate_view();
    }

    /// Check whether a byte is suppressed
    pub fn is_suppressed(&self, id: FrameId, position: usize) -> bool {
        self.suppressed.contains(id, position)
    }

    /// Suppressed positions of one identifier
    pub fn suppressed_bytes(&self, id: FrameId) -> ByteMask {
        self.suppressed.mask(id)
    }

    /// Total suppressed `(identifier, position)` pairs
    pub fn suppressed_count(&self) -> usize {
        self.suppressed.len()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Drop every row, highlight, suppression and counter
    ///
    /// Filter and sort settings are kept. Pending notifications are replaced
    /// by a single [`MonitorEvent::Reset`].
    pub fn reset(&mut self) {
        info!("Resetting monitor ({} rows)", self.store.len());
        self.store.reset();
        self.changes.reset();
        self.suppressed.clear_all();
        self.view.clear();
        self.event_buffer.clear();
        self.pending_updates.clear();
        self.rejected_since_drain = 0;
        self.event_buffer.push(MonitorEvent::Reset);
    }

    /// Swap the definition provider and refresh names
    pub fn set_definitions(&mut self, definitions: Arc<dyn DefinitionProvider>) {
        self.definitions = definitions;
        self.refresh_definitions();
    }

    /// Re-read names and sizes from the provider and re-key the view
    pub fn refresh_definitions(&mut self) {
        debug!("Refreshing definitions for {} rows", self.store.len());
        let rows = self.unordered_rows();
        self.view.rebuild(rows);
        self.invalidate_view();
    }

    /// Take pending notifications
    pub fn drain_events(&mut self) -> Vec<MonitorEvent> {
        if self.rejected_since_drain > 0 {
            self.event_buffer.push(MonitorEvent::FramesRejected {
                count: self.rejected_since_drain,
                total: self.store.rejected_frames(),
            });
            self.rejected_since_drain = 0;
        }
        self.pending_updates.clear();
        std::mem::take(&mut self.event_buffer)
    }

    fn mark_updated(&mut self, id: FrameId) {
        if self.store.contains(id) && self.pending_updates.insert(id) {
            self.event_buffer.push(MonitorEvent::RowUpdated { id });
        }
    }

    fn invalidate_view(&mut self) {
        if self.event_buffer.last() != Some(&MonitorEvent::ViewInvalidated) {
            self.event_buffer.push(MonitorEvent::ViewInvalidated);
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Visible rows in display order, plus counters
    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            rows: self.view.ids().filter_map(|id| self.build_row(id)).collect(),
            total_rows: self.store.len(),
            current_time: self.store.current_time(),
            rejected_frames: self.store.rejected_frames(),
            suppressed_bytes: self.suppressed.len(),
        }
    }

    /// Every known row regardless of filter, ordered by identifier
    pub fn all_rows(&self) -> Vec<RowSnapshot> {
        let mut ids: Vec<FrameId> = self.store.ids().collect();
        ids.sort_unstable();
        ids.into_iter().filter_map(|id| self.build_row(id)).collect()
    }

    /// One row regardless of filter
    pub fn row(&self, id: FrameId) -> Option<RowSnapshot> {
        self.build_row(id)
    }

    /// Copy of one identifier's statistics
    pub fn stats(&self, id: FrameId) -> Option<FrameStats> {
        self.store.stats(id)
    }

    /// Active highlight set of one identifier
    pub fn highlights(&self, id: FrameId) -> Vec<ByteHighlight> {
        self.changes.highlights(id)
    }

    /// Positions highlighted for one identifier
    pub fn active_changes(&self, id: FrameId) -> ByteMask {
        self.changes.active(id)
    }

    /// Identifiers in display order
    pub fn visible_ids(&self) -> Vec<FrameId> {
        self.view.ids().collect()
    }

    /// Number of visible rows
    pub fn visible_rows(&self) -> usize {
        self.view.len()
    }

    /// Number of known identifiers
    pub fn total_rows(&self) -> usize {
        self.store.len()
    }

    /// Newest accepted timestamp (the live clock)
    pub fn current_time(&self) -> Duration {
        self.store.current_time()
    }

    /// Frames rejected since the last reset
    pub fn rejected_frames(&self) -> u64 {
        self.store.rejected_frames()
    }

    fn unordered_rows(&self) -> Vec<RowSnapshot> {
        self.store
            .ids()
            .filter_map(|id| self.build_row(id))
            .collect()
    }

    fn build_row(&self, id: FrameId) -> Option<RowSnapshot> {
        let record = self.store.get(id)?;
        let mut warnings = Vec::new();

        let (name, has_definition) = match self.definitions.definition(id) {
            Some(def) => {
                if def.size != record.payload().len() {
                    warnings.push(RowWarning::SizeMismatch {
                        expected: def.size,
                        actual: record.payload().len(),
                    });
                }
                (def.name, true)
            }
            None => (id.fallback_name(), false),
        };

        Some(RowSnapshot {
            id,
            name,
            has_definition,
            frequency: record.frequency(),
            count: record.count(),
            payload: record.payload().to_vec(),
            last_seen: record.last_seen(),
            highlights: self.changes.highlights(id),
            warnings,
        })
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::DefinitionCatalog;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    const ID: FrameId = FrameId::new(0, 0x100);

    #[test]
    fn test_apply_reports_changes() {
        let mut monitor = Monitor::new();
        let first = monitor.apply(ID, &[0x01, 0x02], ms(0)).unwrap();
        assert!(first.is_new);
        assert!(first.changed.is_empty());
        assert_eq!(first.placement, Placement::Inserted);

        let second = monitor.apply(ID, &[0x01, 0x03], ms(10)).unwrap();
        assert!(!second.is_new);
        assert_eq!(second.changed.iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_malformed_frame_is_absorbed() {
        let mut monitor = Monitor::new();
        assert!(monitor.apply(ID, &[0; 65], ms(0)).is_err());
        assert_eq!(monitor.total_rows(), 0);
        assert_eq!(monitor.rejected_frames(), 1);

        let events = monitor.drain_events();
        assert_eq!(
            events,
            vec![MonitorEvent::FramesRejected { count: 1, total: 1 }]
        );
    }

    #[test]
    fn test_updates_are_coalesced_between_drains() {
        let mut monitor = Monitor::new();
        monitor.apply(ID, &[1], ms(0)).unwrap();
        monitor.apply(ID, &[2], ms(1)).unwrap();
        monitor.apply(ID, &[3], ms(2)).unwrap();
        assert_eq!(monitor.drain_events(), vec![MonitorEvent::RowAdded { id: ID }]);

        monitor.apply(ID, &[4], ms(3)).unwrap();
        monitor.apply(ID, &[5], ms(4)).unwrap();
        assert_eq!(monitor.drain_events(), vec![MonitorEvent::RowUpdated { id: ID }]);
        assert!(monitor.drain_events().is_empty());
    }

    #[test]
    fn test_suppress_byte_clears_highlight() {
        let mut monitor = Monitor::new();
        monitor.apply(ID, &[1, 2], ms(0)).unwrap();
        monitor.apply(ID, &[1, 3], ms(1)).unwrap();
        assert!(monitor.active_changes(ID).contains(1));

        assert!(monitor.suppress_byte(ID, 1).unwrap());
        assert!(!monitor.suppress_byte(ID, 1).unwrap());
        assert!(monitor.active_changes(ID).is_empty());
        assert!(monitor.suppress_byte(ID, 64).is_err());
    }

    #[test]
    fn test_suppress_all_is_a_snapshot() {
        let mut monitor = Monitor::new();
        monitor.apply(ID, &[0, 0, 0], ms(0)).unwrap();
        monitor.apply(ID, &[1, 0, 0], ms(1)).unwrap();
        assert_eq!(monitor.suppress_all(ID), 1);

        let outcome = monitor.apply(ID, &[2, 1, 0], ms(2)).unwrap();
        assert_eq!(outcome.changed.iter().collect::<Vec<_>>(), vec![1]);
        assert!(monitor.is_suppressed(ID, 0));
        assert!(!monitor.is_suppressed(ID, 1));
    }

    #[test]
    fn test_suppress_active_covers_every_row() {
        let other = FrameId::new(1, 0x200);
        let mut monitor = Monitor::new();
        monitor.apply(ID, &[0], ms(0)).unwrap();
        monitor.apply(other, &[0, 0], ms(0)).unwrap();
        monitor.apply(ID, &[1], ms(1)).unwrap();
        monitor.apply(other, &[0, 1], ms(1)).unwrap();

        assert_eq!(monitor.suppress_active(), 2);
        assert_eq!(monitor.suppressed_count(), 2);
        assert!(monitor.highlights(ID).is_empty());
        assert!(monitor.highlights(other).is_empty());

        monitor.clear_all_suppressions();
        assert_eq!(monitor.suppressed_count(), 0);
    }

    #[test]
    fn test_reset_keeps_view_settings() {
        let mut monitor = Monitor::new();
        monitor.set_sort(Column::Count, SortOrder::Descending);
        monitor.set_column_filter(Column::Source, "0");
        monitor.apply(ID, &[1], ms(0)).unwrap();
        monitor.suppress_byte(ID, 0).unwrap();

        monitor.reset();
        assert_eq!(monitor.total_rows(), 0);
        assert_eq!(monitor.suppressed_count(), 0);
        assert_eq!(monitor.sort(), (Column::Count, SortOrder::Descending));
        assert_eq!(monitor.filters().get(Column::Source), Some("0"));
        assert_eq!(monitor.drain_events(), vec![MonitorEvent::Reset]);

        let outcome = monitor.apply(ID, &[1], ms(5)).unwrap();
        assert!(outcome.is_new);
        assert_eq!(monitor.stats(ID).unwrap().count, 1);
    }

    #[test]
    fn test_definitions_decorate_rows() {
        let mut catalog = DefinitionCatalog::new();
        catalog.insert(ID, "STEERING", 4);

        let mut monitor =
            Monitor::with_config(MonitorConfig::default(), Arc::new(catalog)).unwrap();
        monitor.apply(ID, &[1, 2], ms(0)).unwrap();
        monitor.apply(FrameId::new(0, 0x2A), &[1], ms(0)).unwrap();

        let row = monitor.row(ID).unwrap();
        assert_eq!(row.name, "STEERING");
        assert!(row.has_definition);
        assert_eq!(
            row.warnings,
            vec![RowWarning::SizeMismatch {
                expected: 4,
                actual: 2
            }]
        );

        let unknown = monitor.row(FrameId::new(0, 0x2A)).unwrap();
        assert_eq!(unknown.name, "UNTITLED_2A");
        assert!(!unknown.has_definition);
        assert!(unknown.warnings.is_empty());
    }

    #[test]
    fn test_set_definitions_resorts_by_name() {
        let a = FrameId::new(0, 0x1);
        let b = FrameId::new(0, 0x2);
        let mut monitor = Monitor::new();
        monitor.apply(a, &[0], ms(0)).unwrap();
        monitor.apply(b, &[0], ms(0)).unwrap();
        assert_eq!(monitor.visible_ids(), vec![a, b]);

        let mut catalog = DefinitionCatalog::new();
        catalog.insert(a, "ZETA", 1);
        catalog.insert(b, "ALPHA", 1);
        monitor.set_definitions(Arc::new(catalog));
        assert_eq!(monitor.visible_ids(), vec![b, a]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MonitorConfig {
            max_payload_len: 0,
            ..Default::default()
        };
        assert!(Monitor::with_config(config, Arc::new(NoDefinitions)).is_err());
    }

    #[test]
    fn test_apply_batch() {
        let mut monitor = Monitor::new();
        let frames = vec![
            Frame::new(ID, vec![1], ms(0)),
            Frame::new(ID, vec![0; 80], ms(1)),
            Frame::new(FrameId::new(1, 1), vec![1], ms(2)),
            Frame::new(ID, vec![2], ms(3)),
        ];
        let summary = monitor.apply_batch(&frames);
        assert_eq!(
            summary,
            BatchSummary {
                accepted: 3,
                rejected: 1,
                new_rows: 2
            }
        );
        assert_eq!(monitor.current_time(), ms(3));
    }
}
