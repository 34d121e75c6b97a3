//! CLI Entry Point for gpio-mux
//!
//! Provides command-line interface for:
//! - Running the multiplexer daemon on the configured line backend
//! - One-shot client commands against a running daemon (read, toggle, select, status)
//! - Polling the active signal (`watch`)
//! - Inspecting the signal table and the effective configuration
//!
//! # Usage
//!
//! Start daemon:
//! ```bash
//! gpio-mux --config gpio-mux.toml daemon
//! ```
//!
//! Sample the active signal, then switch to the next one:
//! ```bash
//! gpio-mux read
//! gpio-mux toggle
//! ```

// Global allocator (Microsoft Rust Guidelines: M-MIMALLOC-APPS)
#[cfg(not(test))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gpio_mux::config::MuxConfig;
use gpio_mux::device::MuxDevice;
use gpio_mux::hardware::build_backend;
use gpio_mux::logging;
use gpio_mux::network::{MuxClient, MuxServer};
use mux_core::SignalTable;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Bytes requested per read unless overridden.
const DEFAULT_CAPACITY: u32 = 64;

#[derive(Parser)]
#[command(name = "gpio-mux")]
#[command(about = "GPIO signal multiplexer daemon and client", long_about = None)]
struct Cli {
    /// Configuration file (TOML format)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Daemon address, overriding `daemon.listen`
    #[arg(long, global = true)]
    addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire all lines and serve the stream endpoint
    Daemon,

    /// Read the active signal once
    Read {
        /// Read buffer size in bytes
        #[arg(long, default_value_t = DEFAULT_CAPACITY)]
        capacity: u32,
    },

    /// Advance to the next signal
    Toggle,

    /// Select a signal by index
    Select {
        /// Signal index in the table
        index: u32,
    },

    /// Show daemon status
    Status,

    /// Print the compiled-in signal table
    Table,

    /// Print the effective configuration as TOML
    Config,

    /// Poll the active signal
    Watch {
        /// Poll interval, overriding `client.watch_interval_ms`
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop after this many samples
        #[arg(long)]
        count: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = MuxConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    logging::init_from_config(&config).map_err(anyhow::Error::msg)?;

    let addr = cli.addr.unwrap_or(config.daemon.listen);

    match cli.command {
        Commands::Daemon => run_daemon(&config, addr).await,
        Commands::Read { capacity } => {
            let mut client = connect(addr).await?;
            let bytes = client.read(capacity).await.context("Read failed")?;
            print_sample(&bytes)
        }
        Commands::Toggle => {
            let mut client = connect(addr).await?;
            client.write(b"a").await.context("Toggle failed")?;
            let status = client.status().await?;
            println!("Active signal: {} ({})", status.active_name, status.active_signal);
            Ok(())
        }
        Commands::Select { index } => {
            let mut client = connect(addr).await?;
            let active = client.select(index).await.context("Select failed")?;
            println!("Active signal: {}", active);
            Ok(())
        }
        Commands::Status => {
            let mut client = connect(addr).await?;
            let status = client.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Commands::Table => {
            for (index, signal) in SignalTable::builtin().signals().iter().enumerate() {
                let lines: Vec<String> = signal.lines.iter().map(|l| l.id.to_string()).collect();
                println!("{} {}: {}", index, signal.name, lines.join(" "));
            }
            Ok(())
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Watch { interval_ms, count } => {
            let interval = Duration::from_millis(interval_ms.unwrap_or(config.client.watch_interval_ms));
            run_watch(addr, interval, count).await
        }
    }
}

async fn run_daemon(config: &MuxConfig, addr: SocketAddr) -> Result<()> {
    let backend = build_backend(&config.backend).context("Failed to create line backend")?;
    let device = Arc::new(MuxDevice::new(SignalTable::builtin(), backend));

    device.on_start().context("Failed to bring multiplexer up")?;

    let server = MuxServer::bind(addr, device.clone())
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let served = server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await;

    device.on_stop();
    info!("Daemon stopped");
    served?;
    Ok(())
}

async fn run_watch(addr: SocketAddr, interval: Duration, count: Option<u64>) -> Result<()> {
    let mut taken = 0u64;
    loop {
        if count.is_some_and(|limit| taken >= limit) {
            return Ok(());
        }

        // A fresh connection per sample: each session reads once.
        let mut client = connect(addr).await?;
        let bytes = client.read(DEFAULT_CAPACITY).await.context("Read failed")?;
        print_sample(&bytes)?;
        taken += 1;

        tokio::time::sleep(interval).await;
    }
}

async fn connect(addr: SocketAddr) -> Result<MuxClient> {
    MuxClient::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to daemon at {}", addr))
}

fn print_sample(bytes: &[u8]) -> Result<()> {
    let bits = std::str::from_utf8(bytes).context("Daemon returned non-ASCII sample")?;
    if bits.is_empty() {
        println!();
        return Ok(());
    }
    let value = u32::from_str_radix(bits, 2).context("Daemon returned a malformed bit string")?;
    println!("{} {}", bits, value);
    Ok(())
}
