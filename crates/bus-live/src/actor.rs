//! Monitor Actor
//!
//! The actor owns the [`Monitor`] and is its only writer. Frames and operator
//! commands arrive on one mpsc channel and are applied in order.
//!
//! Readers never touch the engine. Every commit builds a complete
//! [`ViewSnapshot`] and swaps it into a watch channel, so a reader holds
//! either the previous view or the new one and never a half-applied update.
//! Notifications drained from the engine follow on a broadcast channel.
//!
//! Frame updates are committed on the publish interval; operator commands
//! (filter, sort, suppression, reset) are committed immediately.

use std::sync::Arc;

use bus_monitor::{
    Column, DefinitionProvider, FilterSet, Frame, FrameId, FrameStats, Monitor, MonitorError,
    MonitorEvent, RowSnapshot, SortOrder, ViewSnapshot,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::LiveConfig;

/// Commands sent to the monitor actor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Apply one frame
    Frame(Frame),

    /// Apply several frames as one unit; readers see all or none of them
    Batch(Vec<Frame>),

    /// Replace the whole filter set
    SetFilter(FilterSet),

    /// Change one column's filter text
    SetColumnFilter {
        /// Column to filter
        column: Column,
        /// Filter text; blank removes the filter
        text: String,
    },

    /// Change the sort column and direction
    SetSort {
        /// Column to sort by
        column: Column,
        /// Direction
        order: SortOrder,
    },

    /// Suppress one byte position of one identifier
    SuppressByte {
        /// Identifier
        id: FrameId,
        /// Byte position
        position: usize,
        /// Whether the position was newly suppressed
        response: oneshot::Sender<Result<bool, MonitorError>>,
    },

    /// Suppress every currently highlighted byte of one identifier
    SuppressAll {
        /// Identifier
        id: FrameId,
        /// Number of newly suppressed positions
        response: oneshot::Sender<usize>,
    },

    /// Suppress every currently highlighted byte of every identifier
    SuppressActive {
        /// Number of newly suppressed positions
        response: oneshot::Sender<usize>,
    },

    /// Remove the suppressions of one identifier
    ClearSuppression {
        /// Identifier
        id: FrameId,
    },

    /// Remove every suppression
    ClearAllSuppressions,

    /// Swap the definition provider
    SetDefinitions(Arc<dyn DefinitionProvider>),

    /// Re-read names and sizes from the current provider
    RefreshDefinitions,

    /// Drop all rows; answered once the empty view is committed
    Reset {
        /// Acknowledgement
        response: oneshot::Sender<()>,
    },

    /// Query one row regardless of filter
    QueryRow {
        /// Identifier
        id: FrameId,
        /// The row, if known
        response: oneshot::Sender<Option<RowSnapshot>>,
    },

    /// Query every known row regardless of filter
    QueryAllRows {
        /// Rows ordered by identifier
        response: oneshot::Sender<Vec<RowSnapshot>>,
    },

    /// Query one identifier's statistics
    QueryStats {
        /// Identifier
        id: FrameId,
        /// The statistics, if known
        response: oneshot::Sender<Option<FrameStats>>,
    },

    /// Commit pending updates now and return the committed view
    Flush {
        /// The committed view
        response: oneshot::Sender<Arc<ViewSnapshot>>,
    },

    /// Stop the actor
    Shutdown,
}

/// Actor-owned state
struct MonitorActorState {
    monitor: Monitor,
    snapshot_tx: watch::Sender<Arc<ViewSnapshot>>,
    event_tx: broadcast::Sender<MonitorEvent>,
    dirty: bool,
}

impl MonitorActorState {
    /// Build a complete snapshot, swap it in, then announce what changed
    fn publish(&mut self) -> Arc<ViewSnapshot> {
        let snapshot = Arc::new(self.monitor.snapshot());
        self.snapshot_tx.send_replace(Arc::clone(&snapshot));
        for event in self.monitor.drain_events() {
            // No subscribers is fine
            let _ = self.event_tx.send(event);
        }
        self.dirty = false;
        snapshot
    }

    fn apply(&mut self, frame: &Frame) {
        // Malformed frames are counted and logged by the engine; the rejected
        // counter still needs publishing
        let _ = self.monitor.apply_frame(frame);
        self.dirty = true;
    }
}

/// Run the monitor actor
///
/// Runs until a [`MonitorCommand::Shutdown`] arrives or every command sender
/// is dropped. The final state is committed before returning.
pub async fn run_monitor_actor(
    monitor: Monitor,
    config: LiveConfig,
    mut cmd_rx: mpsc::Receiver<MonitorCommand>,
    snapshot_tx: watch::Sender<Arc<ViewSnapshot>>,
    event_tx: broadcast::Sender<MonitorEvent>,
) {
    let mut state = MonitorActorState {
        monitor,
        snapshot_tx,
        event_tx,
        dirty: false,
    };
    info!(
        "Monitor actor started (publish every {}ms)",
        config.publish_interval().as_millis()
    );

    let mut publish_timer = interval(config.publish_interval());
    publish_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break; };
                match cmd {
                    MonitorCommand::Frame(frame) => state.apply(&frame),

                    MonitorCommand::Batch(frames) => {
                        for frame in &frames {
                            state.apply(frame);
                        }
                    }

                    MonitorCommand::SetFilter(filters) => {
                        state.monitor.set_filter(filters);
                        state.publish();
                    }

                    MonitorCommand::SetColumnFilter { column, text } => {
                        state.monitor.set_column_filter(column, &text);
                        state.publish();
                    }

                    MonitorCommand::SetSort { column, order } => {
                        state.monitor.set_sort(column, order);
                        state.publish();
                    }

                    MonitorCommand::SuppressByte { id, position, response } => {
                        let result = state.monitor.suppress_byte(id, position);
                        state.publish();
                        let _ = response.send(result);
                    }

                    MonitorCommand::SuppressAll { id, response } => {
                        let added = state.monitor.suppress_all(id);
                        state.publish();
                        let _ = response.send(added);
                    }

                    MonitorCommand::SuppressActive { response } => {
                        let added = state.monitor.suppress_active();
                        state.publish();
                        let _ = response.send(added);
                    }

                    MonitorCommand::ClearSuppression { id } => {
                        state.monitor.clear_suppression(id);
                        state.publish();
                    }

                    MonitorCommand::ClearAllSuppressions => {
                        state.monitor.clear_all_suppressions();
                        state.publish();
                    }

                    MonitorCommand::SetDefinitions(provider) => {
                        state.monitor.set_definitions(provider);
                        state.publish();
                    }

                    MonitorCommand::RefreshDefinitions => {
                        state.monitor.refresh_definitions();
                        state.publish();
                    }

                    MonitorCommand::Reset { response } => {
                        state.monitor.reset();
                        state.publish();
                        let _ = response.send(());
                    }

                    MonitorCommand::QueryRow { id, response } => {
                        let _ = response.send(state.monitor.row(id));
                    }

                    MonitorCommand::QueryAllRows { response } => {
                        let _ = response.send(state.monitor.all_rows());
                    }

                    MonitorCommand::QueryStats { id, response } => {
                        let _ = response.send(state.monitor.stats(id));
                    }

                    MonitorCommand::Flush { response } => {
                        let snapshot = state.publish();
                        let _ = response.send(snapshot);
                    }

                    MonitorCommand::Shutdown => {
                        debug!("Monitor actor received shutdown");
                        break;
                    }
                }
            }

            _ = publish_timer.tick() => {
                if state.dirty {
                    state.publish();
                }
            }
        }
    }

    if state.dirty {
        state.publish();
    }
    info!(
        "Monitor actor stopped ({} rows, {} rejected frames)",
        state.monitor.total_rows(),
        state.monitor.rejected_frames()
    );
}
