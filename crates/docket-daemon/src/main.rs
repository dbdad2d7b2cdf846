//! Docket daemon
//!
//! Polls an inbox area for new files, turns them into searchable document
//! records, and keeps a full-text index reconciled with the document store.
//!
//! # Usage
//!
//! ```bash
//! docket start [--foreground] [--db-path PATH] [--blob-root PATH] [--no-inbox] [--no-indexing]
//! docket stop
//! docket status
//! docket ingest
//! docket reindex
//! docket search <QUERY> [--tenant T] [--doc-type D] [-n N]
//! docket admin [--db-path PATH] stats|compact|batches|delete
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/docket/config.toml)
//! 3. `--config` file
//! 4. Environment variables (DOCKET_*, `__` between sections)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use docket_daemon::{
    handle_admin, run_ingest, run_reindex, run_search, show_status, start_daemon, stop_daemon,
    Cli, Commands, StartOptions,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let log_level = cli.log_level.as_deref();

    match cli.command {
        Commands::Start {
            foreground,
            db_path,
            blob_root,
            no_inbox,
            no_indexing,
        } => {
            let options = StartOptions {
                foreground,
                db_path,
                blob_root,
                no_inbox,
                no_indexing,
            };
            start_daemon(config, log_level, options).await?;
        }
        Commands::Stop => {
            stop_daemon()?;
        }
        Commands::Status => {
            show_status()?;
        }
        Commands::Ingest => {
            run_ingest(config, log_level).await?;
        }
        Commands::Reindex => {
            run_reindex(config, log_level).await?;
        }
        Commands::Search {
            query,
            tenant,
            doc_type,
            limit,
        } => {
            run_search(config, &query, tenant, doc_type, limit)?;
        }
        Commands::Admin { db_path, command } => {
            handle_admin(config, db_path, command)?;
        }
    }

    Ok(())
}
