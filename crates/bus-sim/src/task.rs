//! Virtual bus task
//!
//! Drives a [`VirtualBus`] in real time and feeds every tick's frames into a
//! live monitor as one batch. Simulated time advances by a fixed step per
//! tick, so traffic stays reproducible even when ticks are late.

use std::time::Duration;

use bus_live::MonitorHandle;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::SimError;
use crate::node::VirtualBus;

/// Commands that can be sent to a running virtual bus task
#[derive(Debug, Clone)]
pub enum VirtualBusCommand {
    /// Stop or resume transmitting; the simulated clock stands still while paused
    SetPaused(bool),
    /// Shutdown the task
    Shutdown,
}

/// Run the virtual bus until shutdown
///
/// Returns an error if the monitor stops accepting frames.
pub async fn run_virtual_bus_task(
    mut bus: VirtualBus,
    tick: Duration,
    monitor: MonitorHandle,
    mut cmd_rx: mpsc::Receiver<VirtualBusCommand>,
) -> Result<(), SimError> {
    let tick = tick.max(Duration::from_millis(1));
    info!(
        "Virtual bus started ({} nodes, {}ms tick)",
        bus.nodes().len(),
        tick.as_millis()
    );

    let mut timer = interval(tick);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut paused = false;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(VirtualBusCommand::SetPaused(value)) => {
                        debug!("Virtual bus {}", if value { "paused" } else { "resumed" });
                        paused = value;
                    }
                    Some(VirtualBusCommand::Shutdown) | None => break,
                }
            }

            _ = timer.tick() => {
                if paused {
                    continue;
                }
                let frames = bus.advance(tick);
                monitor.send_batch(frames).await?;
            }
        }
    }

    let sent: u64 = bus.nodes().iter().map(|node| node.frames_sent()).sum();
    info!(
        "Virtual bus stopped after {:?} simulated ({} frames)",
        bus.clock(),
        sent
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use bus_live::{spawn_monitor, LiveConfig};
    use bus_monitor::Monitor;

    use super::*;
    use crate::node::VirtualBusConfig;

    #[tokio::test]
    async fn test_bus_feeds_monitor() {
        let (monitor, monitor_task) = spawn_monitor(Monitor::new(), LiveConfig::default());
        let bus = VirtualBus::new(&VirtualBusConfig::demo()).unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let bus_task = tokio::spawn(run_virtual_bus_task(
            bus,
            Duration::from_millis(5),
            monitor.clone(),
            cmd_rx,
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        cmd_tx.send(VirtualBusCommand::Shutdown).await.unwrap();
        bus_task.await.unwrap().unwrap();

        let view = monitor.flush().await.unwrap();
        assert_eq!(view.total_rows, 5);
        assert!(view.current_time > Duration::ZERO);

        monitor.shutdown().await.unwrap();
        monitor_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_stopped_monitor_ends_task() {
        let (monitor, monitor_task) = spawn_monitor(Monitor::new(), LiveConfig::default());
        monitor.shutdown().await.unwrap();
        monitor_task.await.unwrap();

        let bus = VirtualBus::new(&VirtualBusConfig::demo()).unwrap();
        let (_cmd_tx, cmd_rx) = mpsc::channel(8);
        let result = run_virtual_bus_task(bus, Duration::from_millis(1), monitor, cmd_rx).await;
        assert!(matches!(result, Err(SimError::Live(_))));
    }
}
