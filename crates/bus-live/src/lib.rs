//! Live Bus Monitor
//!
//! Runs a [`bus_monitor::Monitor`] inside a tokio actor so one stream source
//! can feed it while the presentation layer reads committed views.
//!
//! - The writer side sends frames and operator commands through a
//!   [`MonitorHandle`]
//! - The reader side calls [`MonitorHandle::snapshot`], which never waits on
//!   the actor, or awaits [`MonitorHandle::watch_snapshots`]
//! - Coalesced [`MonitorEvent`](bus_monitor::MonitorEvent)s are broadcast
//!   after each commit
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use bus_live::{spawn_monitor, LiveConfig};
//! use bus_monitor::{Frame, FrameId, Monitor};
//!
//! # async fn demo() -> Result<(), bus_live::LiveError> {
//! let (handle, _task) = spawn_monitor(Monitor::new(), LiveConfig::default());
//! handle
//!     .send_frame(Frame::new(FrameId::new(0, 0x100), vec![1, 2], Duration::ZERO))
//!     .await?;
//! let view = handle.flush().await?;
//! assert_eq!(view.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod config;
pub mod error;
pub mod handle;

pub use actor::{run_monitor_actor, MonitorCommand};
pub use config::LiveConfig;
pub use error::LiveError;
pub use handle::{spawn_monitor, MonitorHandle};
