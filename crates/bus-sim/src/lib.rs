//! Bus Simulation Library
//!
//! Simulated stream source for exercising the monitor without hardware:
//!
//! - **VirtualNode**: transmits one identifier at a fixed period, with
//!   constant, counting, toggling or noisy payload bytes
//! - **VirtualBus**: a set of nodes sharing one deterministic clock
//! - **run_virtual_bus_task**: drives a bus in real time into a live monitor
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use bus_sim::{VirtualBus, VirtualBusConfig};
//!
//! let mut bus = VirtualBus::new(&VirtualBusConfig::demo()).unwrap();
//! let frames = bus.advance(Duration::from_millis(100));
//! assert!(!frames.is_empty());
//! ```

pub mod error;
pub mod node;
pub mod task;

pub use error::SimError;
pub use node::{BytePattern, VirtualBus, VirtualBusConfig, VirtualNode, VirtualNodeConfig};
pub use task::{run_virtual_bus_task, VirtualBusCommand};
