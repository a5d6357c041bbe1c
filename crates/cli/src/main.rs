// VMScope - Live VM Debug State Monitor
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod replay;
mod view;

use anyhow::Context;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use vmscope_config::ScopeConfig;
use vmscope_core::Monitor;

use crate::replay::{ReplayProvider, ReplaySession};
use crate::view::{MemoryPager, PagerKey};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "VMScope - live debug state monitor for a running VM",
    long_about = None
)]
struct Args {
    /// Name of the VM to monitor
    #[arg(long)]
    vm: String,

    /// Recorded debug session (JSON) to play back
    #[arg(short, long)]
    session: PathBuf,

    /// Path to the VMScope config (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of view refreshes before exiting
    #[arg(long, default_value = "10")]
    refreshes: usize,

    /// Memory window keys replayed once a dump is available:
    /// a/s scroll up/down, d/f page up/down, g home
    #[arg(long, default_value = "")]
    keys: String,

    /// Write the final monitor state as JSON to this path
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable debug logging of worker activity
    #[arg(short, long)]
    trace: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    info!("Starting VMScope");

    let config = match &args.config {
        Some(path) => {
            info!("Loading config: {:?}", path);
            ScopeConfig::from_file(path)?
        }
        None => {
            info!("Using default configuration");
            ScopeConfig::default()
        }
    };

    info!("Loading session: {:?}", args.session);
    let session = ReplaySession::from_file(&args.session)?;

    let provider = Arc::new(ReplayProvider::new(session));
    let monitor = Monitor::with_config(args.vm.as_str(), provider, config.monitor.clone());

    let window = config.memory_window_bytes()? as usize;
    let bytes_per_line = config.view.bytes_per_line;
    let mut pager = MemoryPager::new(bytes_per_line, window.div_ceil(bytes_per_line));
    let keys = PagerKey::parse_script(&args.keys)
        .map_err(|key| anyhow::anyhow!("Unknown memory window key '{}' in --keys", key))?;
    pager.queue_keys(keys);

    monitor.start()?;

    let ticker = crossbeam_channel::tick(Duration::from_millis(config.view.refresh_ms));
    let stdout = io::stdout();
    for _ in 0..args.refreshes {
        if ticker.recv().is_err() {
            break;
        }
        let mut out = stdout.lock();
        view::render(&mut out, &monitor, &mut pager, config.view.max_stack_frames)?;
    }

    monitor.stop();

    if pager.has_pending_keys() {
        warn!("No memory dump arrived; --keys were not applied");
    }

    if let Some(path) = &args.snapshot {
        let json = serde_json::to_string_pretty(&monitor.snapshot())?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write snapshot to {:?}", path))?;
        info!("Snapshot written to {:?}", path);
    }

    Ok(())
}
