//! busview: live bus traffic monitor console
//!
//! Runs a simulated bus into the live monitor and prints the filtered,
//! sorted message table at a fixed interval.
//!
//! Run: `busview --sort count --desc --filter "freq=>=10"`

mod render;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bus_live::spawn_monitor;
use bus_monitor::{Column, DefinitionCatalog, Monitor, SortOrder};
use bus_sim::{run_virtual_bus_task, VirtualBus, VirtualBusCommand};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use render::render_table;
use settings::Settings;

/// busview: live bus traffic monitor
#[derive(Parser, Debug)]
#[command(name = "busview")]
#[command(version)]
#[command(about = "Aggregate, diff, filter and sort live bus traffic", long_about = None)]
struct Cli {
    /// Settings file (defaults to $XDG_CONFIG_HOME/busview/settings.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Table refresh rate in milliseconds
    #[arg(short, long)]
    refresh: Option<u64>,

    /// Column filter as COLUMN=TEXT, may be repeated
    #[arg(short, long = "filter", value_parser = parse_filter)]
    filters: Vec<(Column, String)>,

    /// Sort column (name, bus, id, freq, count, bytes)
    #[arg(short, long, default_value = "name")]
    sort: Column,

    /// Sort descending
    #[arg(long)]
    desc: bool,

    /// Maximum rows printed per table
    #[arg(long)]
    rows: Option<usize>,

    /// Seed for the simulated bus
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress every highlighted byte after this many seconds
    #[arg(long)]
    suppress_after: Option<u64>,

    /// Exit after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    duration: Option<u64>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_settings: bool,
}

/// Parse a `COLUMN=TEXT` filter argument
fn parse_filter(arg: &str) -> Result<(Column, String), String> {
    let (column, text) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=TEXT, got {:?}", arg))?;
    let column = column.parse::<Column>().map_err(|e| e.to_string())?;
    Ok((column, text.to_string()))
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::load(),
    };

    if let Some(refresh) = cli.refresh {
        settings.refresh_ms = refresh;
    }
    if let Some(rows) = cli.rows {
        settings.max_rows = rows;
    }
    if let Some(seed) = cli.seed {
        settings.bus.seed = seed;
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "busview=info,bus_monitor=info,bus_live=info,bus_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    if cli.save_settings {
        match &cli.config {
            Some(path) => settings.save_to(path)?,
            None => {
                let path = settings.save()?;
                info!("Saved settings to {}", path.display());
            }
        }
    }

    let bus = VirtualBus::new(&settings.bus)?;
    let mut catalog = if settings.use_sim_names {
        bus.catalog()
    } else {
        DefinitionCatalog::new()
    };
    settings.extend_catalog(&mut catalog)?;
    info!("Starting busview ({} definitions)", catalog.len());

    let monitor = Monitor::with_config(settings.monitor.clone(), Arc::new(catalog))?;
    let (handle, monitor_task) = spawn_monitor(monitor, settings.live.clone());

    let order = if cli.desc {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    };
    handle.set_sort(cli.sort, order).await?;
    let mut filters = bus_monitor::FilterSet::new();
    for (column, text) in &cli.filters {
        filters.set(*column, text);
    }
    handle.set_filter(filters.clone()).await?;

    let (bus_tx, bus_rx) = mpsc::channel(8);
    let bus_task = tokio::spawn(run_virtual_bus_task(
        bus,
        Duration::from_millis(settings.sim_tick_ms),
        handle.clone(),
        bus_rx,
    ));

    let mut refresh = interval(Duration::from_millis(settings.refresh_ms.max(10)));
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let run_for = cli.duration.map(Duration::from_secs);
    let deadline = sleep(run_for.unwrap_or(Duration::MAX));
    tokio::pin!(deadline);

    let suppress_at = sleep(cli.suppress_after.map_or(Duration::MAX, Duration::from_secs));
    tokio::pin!(suppress_at);
    let mut suppress_pending = cli.suppress_after.is_some();

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                let view = handle.snapshot();
                println!("{}", render_table(&view, (cli.sort, order), &filters, settings.max_rows));
            }

            _ = &mut suppress_at, if suppress_pending => {
                suppress_pending = false;
                let added = handle.suppress_active().await?;
                info!("Suppressed {} highlighted bytes", added);
            }

            _ = &mut deadline, if run_for.is_some() => break,

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    let _ = bus_tx.send(VirtualBusCommand::Shutdown).await;
    match bus_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Virtual bus stopped with error: {}", e),
        Err(e) => warn!("Virtual bus task failed: {}", e),
    }

    let view = handle.flush().await?;
    println!("{}", render_table(&view, (cli.sort, order), &filters, settings.max_rows));

    handle.shutdown().await?;
    monitor_task.await.context("monitor task failed")?;
    Ok(())
}
