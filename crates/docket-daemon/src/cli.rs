//! CLI argument parsing for the docket daemon.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Docket
///
/// Ingests files dropped into an inbox and keeps a full-text index of them.
#[derive(Parser, Debug)]
#[command(name = "docket")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/docket/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the daemon (inbox polling and index reconciliation)
    Start {
        /// Run in foreground (don't daemonize)
        #[arg(short, long)]
        foreground: bool,

        /// Override database path
        #[arg(long)]
        db_path: Option<String>,

        /// Override blob root directory
        #[arg(long)]
        blob_root: Option<String>,

        /// Do not poll the inbox
        #[arg(long)]
        no_inbox: bool,

        /// Do not run background index reconciliation
        #[arg(long)]
        no_indexing: bool,
    },

    /// Stop the running daemon
    Stop,

    /// Show daemon status
    Status,

    /// Run one inbox cycle and exit
    Ingest,

    /// Run one reconciliation cycle and exit
    Reindex,

    /// Search indexed documents
    Search {
        /// Query text
        query: String,

        /// Restrict to one tenant
        #[arg(long)]
        tenant: Option<String>,

        /// Restrict to one document type
        #[arg(long)]
        doc_type: Option<String>,

        /// Maximum results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Administrative commands
    Admin {
        /// Database path (default from config)
        #[arg(long)]
        db_path: Option<String>,

        #[command(subcommand)]
        command: AdminCommands,
    },
}

/// Admin subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommands {
    /// Show database statistics
    Stats,

    /// Trigger RocksDB compaction
    Compact,

    /// List recent batch outcomes, newest first
    Batches {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Soft-delete a document; the next reconciliation removes it from the index
    Delete {
        /// Document id
        document_id: String,

        /// Reason recorded on the document
        #[arg(long)]
        reason: String,
    },
}
