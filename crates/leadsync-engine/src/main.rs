//! leadsync - lead list to campaign synchronization

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leadsync_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use leadsync_engine::{
    ConnectivityProbe, Credentials, IdempotencyTracker, MemberFetchMode, ProbeTarget, SqliteStore,
    SyncConfig, SyncOrchestrator,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "leadsync")]
#[command(author, version, about = "Sync lead lists into matching campaigns")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Source API token
    #[arg(long, global = true, env = "LEADSYNC_SOURCE_TOKEN", hide_env_values = true)]
    source_token: Option<String>,

    /// Destination API token
    #[arg(long, global = true, env = "LEADSYNC_DESTINATION_TOKEN", hide_env_values = true)]
    destination_token: Option<String>,

    /// Destination write API key (defaults to the destination token)
    #[arg(long, global = true, env = "LEADSYNC_DESTINATION_API_KEY", hide_env_values = true)]
    destination_api_key: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one synchronization pass and print the report
    Sync {
        /// Marker database; without one every list is sent again
        #[arg(long)]
        store: Option<PathBuf>,

        /// How list members are fetched (paginated, embedded)
        #[arg(long)]
        member_fetch: Option<MemberFetchMode>,
    },

    /// Check connectivity to both APIs
    Probe {
        /// test-source, test-destination or both
        #[arg(long, default_value = "both")]
        action: ProbeTarget,
    },

    /// Manage processed markers
    Markers {
        #[command(subcommand)]
        action: MarkersAction,
    },
}

#[derive(Subcommand, Debug)]
enum MarkersAction {
    /// Delete expired markers
    Purge {
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };

    // stdout carries the JSON report; environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .output(LogOutput::Stderr)
        .log_file_prefix("leadsync")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let mut config = SyncConfig::from_env().context("Invalid engine configuration")?;

    match cli.command {
        Command::Sync {
            store,
            member_fetch,
        } => {
            if store.is_some() {
                config.store_path = store;
            }
            if let Some(mode) = member_fetch {
                config.member_fetch = mode;
            }

            let credentials = Credentials::resolve(
                cli.source_token,
                cli.destination_token,
                cli.destination_api_key,
            )?;
            let tracker = IdempotencyTracker::from_config(&config)?;

            let report = SyncOrchestrator::from_config(&config, &credentials, tracker)?
                .run()
                .await?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        },
        Command::Probe { action } => {
            let credentials = Credentials::resolve(
                cli.source_token,
                cli.destination_token,
                cli.destination_api_key,
            )?;

            let report = ConnectivityProbe::new(&config, &credentials)?
                .run(action)
                .await;

            println!("{}", serde_json::to_string_pretty(&report)?);
        },
        Command::Markers {
            action: MarkersAction::Purge { store },
        } => {
            let path = store
                .or(config.store_path)
                .context("No marker store given (--store or LEADSYNC_STORE_PATH)")?;

            let purged = SqliteStore::open(&path)?.cleanup_expired()?;
            info!(purged, path = %path.display(), "Expired markers purged");
        },
    }

    Ok(())
}
