//! Command implementations for the docket daemon.
//!
//! Handles:
//! - start: load config, open storage/blobs/index, run the scheduler
//! - stop / status: PID-file based process control
//! - ingest / reindex: one cycle of either loop, then exit
//! - search / admin: read-only queries and maintenance

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use docket_blob::{AreaLayout, LocalBlobStore};
use docket_inbox::{InboxConfig, InboxProcessor};
use docket_indexing::{ReconcileConfig, Reconciler};
use docket_processing::DocumentProcessor;
use docket_scheduler::jobs::{register_inbox_job, register_reconcile_job};
use docket_scheduler::{SchedulerConfig, SchedulerService};
use docket_search::{DocumentSearcher, SearchIndex, SearchIndexConfig, SearchIndexer, SearchOptions};
use docket_storage::Storage;
use docket_types::Settings;

use crate::cli::AdminCommands;

/// Actor recorded on documents deleted from the CLI
const CLI_ACTOR: &str = "cli";

/// Get the PID file path
fn pid_file_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| {
            #[cfg(unix)]
            {
                dirs.runtime_dir()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| dirs.cache_dir().to_path_buf())
            }
            #[cfg(not(unix))]
            {
                dirs.cache_dir().to_path_buf()
            }
        })
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("docket")
        .join("daemon.pid")
}

fn write_pid_file() -> Result<()> {
    let pid_path = pid_file_path();
    if let Some(parent) = pid_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&pid_path, std::process::id().to_string())?;
    info!(path = ?pid_path, "Wrote PID file");
    Ok(())
}

fn remove_pid_file() {
    let pid_path = pid_file_path();
    if pid_path.exists() {
        if let Err(e) = fs::remove_file(&pid_path) {
            warn!(error = %e, "Failed to remove PID file");
        } else {
            info!("Removed PID file");
        }
    }
}

fn read_pid_file() -> Option<u32> {
    fs::read_to_string(pid_file_path())
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

/// Check if a process is running
#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    // Signal 0 only checks that the process exists
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_running(_pid: u32) -> bool {
    true
}

/// Load settings, apply CLI overrides and validate.
///
/// Validation failures are fatal configuration errors.
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    db_path_override: Option<&str>,
    blob_root_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;

    if let Some(db_path) = db_path_override {
        settings.db_path = db_path.to_string();
    }
    if let Some(blob_root) = blob_root_override {
        settings.blob_root = blob_root.to_string();
    }
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn open_storage(settings: &Settings) -> Result<Arc<Storage>> {
    let db_path = settings.expanded_db_path();
    info!(path = ?db_path, "Opening storage");
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let storage = Storage::open(&db_path)
        .with_context(|| format!("Failed to open storage at {:?} (is the daemon running?)", db_path))?;
    Ok(Arc::new(storage))
}

fn open_search_index(settings: &Settings) -> Result<SearchIndex> {
    let config =
        SearchIndexConfig::from_settings(settings.expanded_search_index_path(), &settings.indexing);
    SearchIndex::open_or_create(config).context("Failed to open search index")
}

async fn build_inbox_processor(
    settings: &Settings,
    storage: Arc<Storage>,
) -> Result<InboxProcessor> {
    let layout = AreaLayout::from_settings(&settings.inbox);
    let blobs = LocalBlobStore::new(settings.expanded_blob_root(), layout)
        .await
        .context("Failed to open blob store")?;
    Ok(InboxProcessor::new(
        Arc::new(blobs),
        storage,
        Arc::new(DocumentProcessor::default()),
        InboxConfig::from_settings(&settings.inbox),
    ))
}

fn build_reconciler(settings: &Settings, storage: Arc<Storage>) -> Result<Reconciler> {
    let index = open_search_index(settings)?;
    let indexer = SearchIndexer::new(&index).context("Failed to open index writer")?;
    Ok(Reconciler::new(
        storage,
        Arc::new(indexer),
        ReconcileConfig::from_settings(&settings.indexing),
    ))
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}

/// Options for `docket start`.
#[derive(Debug, Default, Clone)]
pub struct StartOptions {
    pub foreground: bool,
    pub db_path: Option<String>,
    pub blob_root: Option<String>,
    pub no_inbox: bool,
    pub no_indexing: bool,
}

/// Start the daemon.
///
/// 1. Load and validate configuration
/// 2. Open RocksDB storage, the blob areas and the search index
/// 3. Register the inbox and reconciliation jobs per their enabled flags
/// 4. Run until SIGINT/SIGTERM, then shut the scheduler down
pub async fn start_daemon(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    options: StartOptions,
) -> Result<()> {
    let settings = load_settings(
        config_path,
        log_level_override,
        options.db_path.as_deref(),
        options.blob_root.as_deref(),
    )?;
    init_tracing(&settings.log_level)?;

    info!("Docket daemon starting...");
    info!(
        db_path = %settings.db_path,
        search_index_path = %settings.search_index_path,
        blob_root = %settings.blob_root,
        log_level = %settings.log_level,
        "Configuration"
    );

    if !options.foreground {
        warn!("Background mode not implemented, running in foreground");
        warn!("Use a process manager (systemd, launchd) for background operation");
    }

    let storage = open_storage(&settings)?;
    let mut scheduler = SchedulerService::new(SchedulerConfig::from_settings(&settings.scheduler));

    if settings.inbox.enabled && !options.no_inbox {
        let processor = build_inbox_processor(&settings, storage.clone()).await?;
        register_inbox_job(&mut scheduler, Arc::new(processor), &settings.inbox)
            .context("Failed to register inbox job")?;
    } else {
        info!("Inbox processing disabled");
    }

    if settings.indexing.background_enabled && !options.no_indexing {
        let reconciler = build_reconciler(&settings, storage.clone())?;
        register_reconcile_job(&mut scheduler, Arc::new(reconciler), &settings.indexing)
            .context("Failed to register reconcile job")?;
    } else {
        info!("Background indexing disabled");
    }

    write_pid_file()?;
    scheduler.start().context("Failed to start scheduler")?;

    shutdown_signal().await;

    let result = scheduler.shutdown().await;
    for status in scheduler.registry().get_all_status() {
        info!(
            job = %status.job_name,
            runs = status.run_count,
            errors = status.error_count,
            last_result = ?status.last_result,
            "Job summary"
        );
    }
    if let Err(e) = storage.flush() {
        warn!(error = %e, "Failed to flush storage on shutdown");
    }
    remove_pid_file();

    result.context("Scheduler shutdown failed")
}

/// Stop the running daemon by sending SIGTERM.
pub fn stop_daemon() -> Result<()> {
    let pid = read_pid_file().context("No PID file found - daemon may not be running")?;

    if !is_process_running(pid) {
        remove_pid_file();
        anyhow::bail!("Daemon not running (stale PID file removed)");
    }

    #[cfg(unix)]
    {
        unsafe {
            if libc::kill(pid as i32, libc::SIGTERM) != 0 {
                anyhow::bail!("Failed to send SIGTERM to daemon");
            }
        }
        println!("Sent SIGTERM to daemon (PID {})", pid);
    }

    #[cfg(not(unix))]
    {
        anyhow::bail!("Stop command not implemented on this platform");
    }

    Ok(())
}

/// Show daemon status.
pub fn show_status() -> Result<()> {
    let pid_path = pid_file_path();

    match read_pid_file() {
        Some(pid) if is_process_running(pid) => {
            println!("Docket daemon is running (PID {})", pid);
            println!("PID file: {:?}", pid_path);
        }
        Some(pid) => {
            println!(
                "Docket daemon is NOT running (stale PID {} in {:?})",
                pid, pid_path
            );
        }
        None => println!("Docket daemon is NOT running (no PID file)"),
    }
    Ok(())
}

/// Run one inbox cycle and print its summary.
pub async fn run_ingest(config_path: Option<&str>, log_level: Option<&str>) -> Result<()> {
    let settings = load_settings(config_path, log_level, None, None)?;
    init_tracing(&settings.log_level)?;

    let storage = open_storage(&settings)?;
    let processor = build_inbox_processor(&settings, storage.clone()).await?;
    let report = processor
        .run_cycle(&CancellationToken::new())
        .await
        .context("Inbox cycle failed")?;
    storage.flush().context("Failed to flush storage")?;

    if report.disabled {
        println!("Inbox processor is disabled by configuration");
        return Ok(());
    }
    println!(
        "listed={} ingested={} duplicates={} failed={} retained={}",
        report.listed, report.ingested, report.duplicates, report.failed, report.retained
    );
    for (name, outcome) in &report.items {
        println!("  {:<40} {:?}", name, outcome);
    }
    Ok(())
}

/// Run one reconciliation cycle and print its summary.
pub async fn run_reindex(config_path: Option<&str>, log_level: Option<&str>) -> Result<()> {
    let settings = load_settings(config_path, log_level, None, None)?;
    init_tracing(&settings.log_level)?;

    let storage = open_storage(&settings)?;
    let reconciler = build_reconciler(&settings, storage.clone())?;
    let report = tokio::task::spawn_blocking(move || reconciler.run_cycle(&CancellationToken::new()))
        .await
        .context("Reconcile task failed")?
        .context("Reconciliation cycle failed")?;
    storage.flush().context("Failed to flush storage")?;

    println!(
        "candidates={} indexed={} failed={} stale={} removed={}",
        report.candidates, report.indexed, report.failed, report.stale, report.removed
    );
    Ok(())
}

/// Query the search index.
pub fn run_search(
    config_path: Option<&str>,
    query: &str,
    tenant: Option<String>,
    doc_type: Option<String>,
    limit: usize,
) -> Result<()> {
    let settings = load_settings(config_path, None, None, None)?;
    let index = open_search_index(&settings)?;
    let searcher = DocumentSearcher::new(&index).context("Failed to open index reader")?;

    let mut options = SearchOptions::new().with_limit(limit);
    if let Some(tenant) = tenant {
        options = options.with_tenant(tenant);
    }
    if let Some(doc_type) = doc_type {
        options = options.with_document_type(doc_type);
    }

    let hits = searcher.search(query, &options).context("Search failed")?;
    if hits.is_empty() {
        println!("No matches");
        return Ok(());
    }
    for hit in hits {
        println!(
            "{:>7.3}  {}  {}/{}  {}",
            hit.score, hit.document_id, hit.tenant_id, hit.document_type_id, hit.title
        );
    }
    Ok(())
}

/// Handle admin commands.
///
/// Opens storage directly; fails while the daemon holds the database lock.
pub fn handle_admin(
    config_path: Option<&str>,
    db_path: Option<String>,
    command: AdminCommands,
) -> Result<()> {
    let settings = load_settings(config_path, None, db_path.as_deref(), None)?;
    let storage = open_storage(&settings)?;

    match command {
        AdminCommands::Stats => {
            let stats = storage.get_stats().context("Failed to read stats")?;
            println!("Database: {}", settings.db_path);
            println!("  documents:       {}", stats.document_count);
            println!("  soft-deleted:    {}", stats.deleted_count);
            println!("  needs indexing:  {}", stats.needs_indexing_count);
            println!("  batch outcomes:  {}", stats.batch_count);
            println!("  disk usage:      {} bytes", stats.disk_usage_bytes);
        }
        AdminCommands::Compact => {
            println!("Compacting {}...", settings.db_path);
            storage.compact().context("Compaction failed")?;
            println!("Compaction complete");
        }
        AdminCommands::Batches { limit } => {
            let outcomes = storage
                .recent_batch_outcomes(limit)
                .context("Failed to read batch outcomes")?;
            for outcome in outcomes {
                println!(
                    "{}  {:<14} {}  processed={} succeeded={} failed={} duration_ms={}",
                    outcome.batch_id,
                    outcome.kind.to_string(),
                    outcome.started_at.to_rfc3339(),
                    outcome.processed,
                    outcome.succeeded,
                    outcome.failed,
                    outcome
                        .duration_ms()
                        .map(|ms| ms.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        AdminCommands::Delete {
            document_id,
            reason,
        } => {
            let doc = storage
                .soft_delete(&document_id, &reason, CLI_ACTOR)
                .with_context(|| format!("Failed to delete {}", document_id))?;
            println!(
                "Soft-deleted {} ({}); it leaves the index on the next reconciliation",
                doc.document_id, doc.title
            );
        }
    }

    storage.flush().context("Failed to flush storage")?;
    Ok(())
}
