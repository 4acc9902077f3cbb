//! Cloneable handle to a running monitor actor

use std::sync::Arc;

use bus_monitor::{
    Column, DefinitionProvider, FilterSet, Frame, FrameId, FrameStats, Monitor, MonitorEvent,
    RowSnapshot, SortOrder, ViewSnapshot,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::actor::{run_monitor_actor, MonitorCommand};
use crate::config::LiveConfig;
use crate::error::LiveError;

/// Handle used by the stream source (writer side) and the presentation
/// layer (reader side)
///
/// Reads never go through the actor: [`MonitorHandle::snapshot`] returns the
/// latest committed view directly.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    cmd_tx: mpsc::Sender<MonitorCommand>,
    snapshot_rx: watch::Receiver<Arc<ViewSnapshot>>,
    event_tx: broadcast::Sender<MonitorEvent>,
}

/// Spawn a monitor actor on the current tokio runtime
pub fn spawn_monitor(monitor: Monitor, config: LiveConfig) -> (MonitorHandle, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer.max(1));
    let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(monitor.snapshot()));
    let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

    let task = tokio::spawn(run_monitor_actor(
        monitor,
        config,
        cmd_rx,
        snapshot_tx,
        event_tx.clone(),
    ));

    let handle = MonitorHandle {
        cmd_tx,
        snapshot_rx,
        event_tx,
    };
    (handle, task)
}

impl MonitorHandle {
    async fn send(&self, cmd: MonitorCommand) -> Result<(), LiveError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| LiveError::MonitorStopped)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> MonitorCommand,
    ) -> Result<T, LiveError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        rx.await.map_err(|_| LiveError::NoResponse)
    }

    // -------------------------------------------------------------------------
    // Ingestion
    // -------------------------------------------------------------------------

    /// Queue one frame, waiting for queue space
    pub async fn send_frame(&self, frame: Frame) -> Result<(), LiveError> {
        self.send(MonitorCommand::Frame(frame)).await
    }

    /// Queue one frame without waiting
    pub fn try_send_frame(&self, frame: Frame) -> Result<(), LiveError> {
        self.cmd_tx
            .try_send(MonitorCommand::Frame(frame))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => LiveError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => LiveError::MonitorStopped,
            })
    }

    /// Queue frames that must be committed together
    pub async fn send_batch(&self, frames: Vec<Frame>) -> Result<(), LiveError> {
        if frames.is_empty() {
            return Ok(());
        }
        self.send(MonitorCommand::Batch(frames)).await
    }

    // -------------------------------------------------------------------------
    // Operator actions
    // -------------------------------------------------------------------------

    /// Replace the whole filter set
    pub async fn set_filter(&self, filters: FilterSet) -> Result<(), LiveError> {
        self.send(MonitorCommand::SetFilter(filters)).await
    }

    /// Change one column's filter text
    pub async fn set_column_filter(
        &self,
        column: Column,
        text: impl Into<String>,
    ) -> Result<(), LiveError> {
        self.send(MonitorCommand::SetColumnFilter {
            column,
            text: text.into(),
        })
        .await
    }

    /// Change the sort column and direction
    pub async fn set_sort(&self, column: Column, order: SortOrder) -> Result<(), LiveError> {
        self.send(MonitorCommand::SetSort { column, order }).await
    }

    /// Suppress one byte of one identifier
    pub async fn suppress_byte(&self, id: FrameId, position: usize) -> Result<bool, LiveError> {
        let result = self
            .request(|response| MonitorCommand::SuppressByte {
                id,
                position,
                response,
            })
            .await?;
        Ok(result?)
    }

    /// Suppress the currently highlighted bytes of one identifier
    pub async fn suppress_all(&self, id: FrameId) -> Result<usize, LiveError> {
        self.request(|response| MonitorCommand::SuppressAll { id, response })
            .await
    }

    /// Suppress the currently highlighted bytes of every identifier
    pub async fn suppress_active(&self) -> Result<usize, LiveError> {
        self.request(|response| MonitorCommand::SuppressActive { response })
            .await
    }

    /// Remove the suppressions of one identifier
    pub async fn clear_suppression(&self, id: FrameId) -> Result<(), LiveError> {
        self.send(MonitorCommand::ClearSuppression { id }).await
    }

    /// Remove every suppression
    pub async fn clear_all_suppressions(&self) -> Result<(), LiveError> {
        self.send(MonitorCommand::ClearAllSuppressions).await
    }

    /// Swap the definition provider
    pub async fn set_definitions(
        &self,
        provider: Arc<dyn DefinitionProvider>,
    ) -> Result<(), LiveError> {
        self.send(MonitorCommand::SetDefinitions(provider)).await
    }

    /// Re-read names and sizes from the current provider
    pub async fn refresh_definitions(&self) -> Result<(), LiveError> {
        self.send(MonitorCommand::RefreshDefinitions).await
    }

    /// Drop all rows
    ///
    /// Returns once the empty view has been committed.
    pub async fn reset(&self) -> Result<(), LiveError> {
        self.request(|response| MonitorCommand::Reset { response })
            .await
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Latest committed view
    pub fn snapshot(&self) -> Arc<ViewSnapshot> {
        Arc::clone(&self.snapshot_rx.borrow())
    }

    /// Receiver that wakes whenever a new view is committed
    pub fn watch_snapshots(&self) -> watch::Receiver<Arc<ViewSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_tx.subscribe()
    }

    /// Commit pending frames and return the resulting view
    pub async fn flush(&self) -> Result<Arc<ViewSnapshot>, LiveError> {
        self.request(|response| MonitorCommand::Flush { response })
            .await
    }

    /// One row regardless of filter
    pub async fn row(&self, id: FrameId) -> Result<Option<RowSnapshot>, LiveError> {
        self.request(|response| MonitorCommand::QueryRow { id, response })
            .await
    }

    /// Every known row, for consumers joining mid-session
    pub async fn all_rows(&self) -> Result<Vec<RowSnapshot>, LiveError> {
        self.request(|response| MonitorCommand::QueryAllRows { response })
            .await
    }

    /// One identifier's statistics
    pub async fn stats(&self, id: FrameId) -> Result<Option<FrameStats>, LiveError> {
        self.request(|response| MonitorCommand::QueryStats { id, response })
            .await
    }

    /// Ask the actor to stop
    pub async fn shutdown(&self) -> Result<(), LiveError> {
        self.send(MonitorCommand::Shutdown).await
    }

    /// True once the actor has exited
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}
