//! Dumbify DNS filter - Entry point.
//!
//! This binary opens a TUN interface, answers DNS queries for blocked domains
//! with NXDOMAIN and passes every other packet straight back. Subcommands
//! edit the persisted blocklist store.
//!
//! Pointing the host's default route and resolver at the interface is left
//! to the platform.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use dumbify::blocklist::BlocklistEntry;
use dumbify::blocklist::loader::collect_entries;
use dumbify::blocklist::store::BlocklistStore;
use dumbify::config::Config;
use dumbify::network::TunRsProvider;
use dumbify::service::FilterService;

#[derive(Parser)]
#[command(name = "dumbify")]
#[command(version)]
#[command(about = "DNS filter over a local tunnel", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "CONFIG_PATH",
        default_value = "config.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the filter until Ctrl-C (default)
    Run,
    /// Add or replace a blocked domain in the store
    Block {
        domain: String,

        #[arg(short, long, default_value = "custom")]
        category: String,
    },
    /// Remove a domain from the store
    Unblock { domain: String },
    /// Enable a stored domain
    Enable { domain: String },
    /// Disable a stored domain without removing it
    Disable { domain: String },
    /// Print the stored entries
    List,
}

fn open_store(config: &Config) -> Result<BlocklistStore> {
    let path = config
        .blocklist
        .store_path
        .as_ref()
        .context("blocklist.store_path is not set in the configuration")?;
    Ok(BlocklistStore::new(path))
}

async fn set_enabled(config: &Config, domain: &str, enabled: bool) -> Result<()> {
    if !open_store(config)?.set_enabled(domain, enabled).await? {
        anyhow::bail!("{domain} is not in the blocklist store");
    }
    info!("{domain} {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

async fn run_filter(config: Config) -> Result<()> {
    // Initialize metrics before the pump records anything
    dumbify::metrics::init(&config.metrics).context("Failed to initialize metrics")?;

    info!("Starting Dumbify DNS filter...");
    info!("Tunnel address: {}", config.tunnel.local_address);
    info!("Route: {}", config.tunnel.route);
    info!("Upstream DNS: {}", config.tunnel.upstream_dns);

    let entries = collect_entries(&config.blocklist)
        .await
        .context("Failed to load blocklist")?;
    let enabled = entries.iter().filter(|entry| entry.enabled).count();
    info!("Blocklist entries: {} ({enabled} enabled)", entries.len());

    let mut service = FilterService::new(TunRsProvider::new());
    service
        .start(&config.tunnel, &entries)
        .await
        .context("Failed to start DNS filter")?;

    let stats = service
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Ctrl-C received, shutting down...");
        })
        .await
        .context("DNS filter terminated")?;

    info!(
        "Shutdown complete after {} frames ({} blocked).",
        stats.frames, stats.blocked
    );
    Ok(())
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_filter(config).await,
        Commands::Block { domain, category } => {
            let entry = BlocklistEntry::new(&domain, category);
            info!("Blocking {}", entry.domain);
            open_store(&config)?.add(entry).await?;
            Ok(())
        }
        Commands::Unblock { domain } => {
            if !open_store(&config)?.remove(&domain).await? {
                anyhow::bail!("{domain} is not in the blocklist store");
            }
            info!("Unblocked {domain}");
            Ok(())
        }
        Commands::Enable { domain } => set_enabled(&config, &domain, true).await,
        Commands::Disable { domain } => set_enabled(&config, &domain, false).await,
        Commands::List => {
            for entry in open_store(&config)?.load().await? {
                let state = if entry.enabled { "on" } else { "off" };
                println!("{state:>3}  {:<12} {}", entry.category, entry.domain);
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    run().await
}
