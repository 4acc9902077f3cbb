//! Bus Traffic Monitor Engine
//!
//! This crate aggregates a live stream of bus frames into one row per
//! identifier and keeps a filtered, sorted view of those rows up to date as
//! frames arrive.
//!
//! # Architecture
//!
//! Every frame flows through the same pipeline:
//!
//! - **FrameStore**: latest payload, previous payload, count and smoothed
//!   frequency per identifier
//! - **ChangeTracker**: which bytes changed, with highlights that fade out
//!   after a configurable number of frames
//! - **SuppressionSet**: byte positions the operator has muted
//! - **FilterSet**: per-column predicates, ANDed together
//! - **OrderedView**: the visible identifiers, kept sorted incrementally
//!
//! The [`Monitor`] facade owns all of them. It is synchronous and has a
//! single writer; see the `bus-live` crate for the actor that shares it with
//! a concurrent reader.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use bus_monitor::{Column, FrameId, Monitor, SortOrder};
//!
//! let mut monitor = Monitor::new();
//! monitor.set_sort(Column::Count, SortOrder::Descending);
//!
//! let id = FrameId::new(0, 0x100);
//! monitor.apply(id, &[0x01, 0x02], Duration::from_millis(0)).unwrap();
//! let outcome = monitor.apply(id, &[0x01, 0x03], Duration::from_millis(10)).unwrap();
//! assert!(outcome.changed.contains(1));
//!
//! let view = monitor.snapshot();
//! assert_eq!(view.rows[0].count, 2);
//! ```

pub mod changes;
pub mod config;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod events;
pub mod filter;
pub mod id;
pub mod mask;
pub mod row;
pub mod store;
pub mod suppress;
pub mod view;

pub use changes::{ByteHighlight, ByteTrend, ChangeTracker};
pub use config::MonitorConfig;
pub use definitions::{DefinitionCatalog, DefinitionProvider, MessageDefinition, NoDefinitions};
pub use engine::{ApplyOutcome, BatchSummary, Monitor};
pub use error::MonitorError;
pub use events::MonitorEvent;
pub use filter::{format_frequency, matches, FilterSet};
pub use id::{hex_string, Frame, FrameId, ParseFrameIdError};
pub use mask::{ByteMask, MAX_PAYLOAD_LEN};
pub use row::{Column, ParseColumnError, RowSnapshot, RowWarning, ViewSnapshot};
pub use store::{FrameRecord, FrameStats, FrameStore, FrameUpdate};
pub use suppress::SuppressionSet;
pub use view::{OrderedView, Placement, SortOrder};
