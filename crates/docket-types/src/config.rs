//! Configuration loading for docket.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/docket/config.toml`.
//! Environment variables use the `DOCKET_` prefix and `__` between
//! nesting levels, e.g. `DOCKET_INBOX__BATCH_SIZE=25`.

use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::error::DocketError;

const APP_NAME: &str = "docket";

/// Inbox ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboxSettings {
    /// When false the inbox loop never lists, downloads or moves anything.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Area new files are dropped into
    #[serde(default = "default_inbox_container")]
    pub container_name: String,

    /// Area successfully ingested sources are moved to
    #[serde(default = "default_processed_container")]
    pub processed_container_name: String,

    /// Area failed sources are moved to, annotated with the error
    #[serde(default = "default_failed_container")]
    pub failed_container_name: String,

    /// Long-term storage for ingested content
    #[serde(default = "default_documents_container")]
    pub documents_container_name: String,

    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,

    /// Maximum items taken per cycle
    #[serde(default = "default_inbox_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_tenant_id")]
    pub default_tenant_id: String,

    #[serde(default = "default_document_type_id")]
    pub default_document_type_id: String,

    /// Label written into audit fields (created_by, moved_by)
    #[serde(default = "default_system_user")]
    pub system_user: String,

    /// Reuse an existing document when tenant + content hash already exist.
    #[serde(default = "default_true")]
    pub dedup_by_content_hash: bool,

    /// Upper bound for the back-off after a failed cycle
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_inbox_container() -> String {
    "inbox".to_string()
}

fn default_processed_container() -> String {
    "processed".to_string()
}

fn default_failed_container() -> String {
    "failed".to_string()
}

fn default_documents_container() -> String {
    "documents".to_string()
}

fn default_polling_interval() -> u64 {
    30
}

fn default_inbox_batch_size() -> usize {
    10
}

fn default_tenant_id() -> String {
    "default".to_string()
}

fn default_document_type_id() -> String {
    "general".to_string()
}

fn default_system_user() -> String {
    "system".to_string()
}

fn default_max_backoff() -> u64 {
    300
}

impl Default for InboxSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            container_name: default_inbox_container(),
            processed_container_name: default_processed_container(),
            failed_container_name: default_failed_container(),
            documents_container_name: default_documents_container(),
            polling_interval_secs: default_polling_interval(),
            batch_size: default_inbox_batch_size(),
            default_tenant_id: default_tenant_id(),
            default_document_type_id: default_document_type_id(),
            system_user: default_system_user(),
            dedup_by_content_hash: true,
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl InboxSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.polling_interval_secs == 0 {
            return Err("inbox.polling_interval_secs must be > 0".to_string());
        }
        if self.batch_size == 0 {
            return Err("inbox.batch_size must be > 0".to_string());
        }
        if self.max_backoff_secs < self.polling_interval_secs {
            return Err(format!(
                "inbox.max_backoff_secs ({}) must be >= polling_interval_secs ({})",
                self.max_backoff_secs, self.polling_interval_secs
            ));
        }
        if self.default_tenant_id.trim().is_empty() {
            return Err("inbox.default_tenant_id must not be empty".to_string());
        }
        if self.default_document_type_id.trim().is_empty() {
            return Err("inbox.default_document_type_id must not be empty".to_string());
        }

        let containers = [
            ("container_name", &self.container_name),
            ("processed_container_name", &self.processed_container_name),
            ("failed_container_name", &self.failed_container_name),
            ("documents_container_name", &self.documents_container_name),
        ];
        for (i, (key, name)) in containers.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(format!("inbox.{} must not be empty", key));
            }
            if name.contains('/') || name.contains("..") {
                return Err(format!("inbox.{} must be a single path segment", key));
            }
            if let Some((other, _)) = containers[..i].iter().find(|(_, n)| n == name) {
                return Err(format!(
                    "inbox.{} duplicates inbox.{} ({})",
                    key, other, name
                ));
            }
        }
        Ok(())
    }
}

/// Search index reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexingSettings {
    /// Run the reconciliation loop in the background
    #[serde(default = "default_true")]
    pub background_enabled: bool,

    #[serde(default = "default_indexing_interval")]
    pub interval_minutes: u64,

    /// Documents per `index_batch` call
    #[serde(default = "default_indexing_batch_size")]
    pub batch_size: usize,

    /// Grace period before the first cycle after process start
    #[serde(default = "default_startup_delay")]
    pub startup_delay_secs: u64,

    /// Cap on documents considered in one cycle
    #[serde(default = "default_max_documents_per_cycle")]
    pub max_documents_per_cycle: usize,

    /// Tantivy writer memory budget
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,
}

fn default_indexing_interval() -> u64 {
    5
}

fn default_indexing_batch_size() -> usize {
    100
}

fn default_startup_delay() -> u64 {
    10
}

fn default_max_documents_per_cycle() -> usize {
    1000
}

fn default_writer_memory_mb() -> usize {
    50
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            background_enabled: true,
            interval_minutes: default_indexing_interval(),
            batch_size: default_indexing_batch_size(),
            startup_delay_secs: default_startup_delay(),
            max_documents_per_cycle: default_max_documents_per_cycle(),
            writer_memory_mb: default_writer_memory_mb(),
        }
    }
}

impl IndexingSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_minutes == 0 {
            return Err("indexing.interval_minutes must be > 0".to_string());
        }
        if self.batch_size == 0 {
            return Err("indexing.batch_size must be > 0".to_string());
        }
        if self.max_documents_per_cycle < self.batch_size {
            return Err(format!(
                "indexing.max_documents_per_cycle ({}) must be >= batch_size ({})",
                self.max_documents_per_cycle, self.batch_size
            ));
        }
        // Tantivy refuses writer budgets below 15MB
        if self.writer_memory_mb < 15 {
            return Err("indexing.writer_memory_mb must be >= 15".to_string());
        }
        Ok(())
    }
}

/// Background scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerSettings {
    /// How long shutdown waits for running jobs before giving up.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Path to RocksDB storage directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Path to the Tantivy index directory
    #[serde(default = "default_search_index_path")]
    pub search_index_path: String,

    /// Root directory for the local blob areas
    #[serde(default = "default_blob_root")]
    pub blob_root: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub inbox: InboxSettings,

    #[serde(default)]
    pub indexing: IndexingSettings,

    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

fn data_dir_path(leaf: &str) -> String {
    ProjectDirs::from("", "", APP_NAME)
        .map(|p| p.data_local_dir().join(leaf))
        .unwrap_or_else(|| PathBuf::from(format!("./{}", leaf)))
        .to_string_lossy()
        .to_string()
}

fn default_db_path() -> String {
    data_dir_path("db")
}

fn default_search_index_path() -> String {
    data_dir_path("search-index")
}

fn default_blob_root() -> String {
    data_dir_path("blobs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            search_index_path: default_search_index_path(),
            blob_root: default_blob_root(),
            log_level: default_log_level(),
            inbox: InboxSettings::default(),
            indexing: IndexingSettings::default(),
            scheduler: SchedulerSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/docket/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (DOCKET_*)
    ///
    /// CLI flags should be applied by the caller after this returns, then
    /// `validate()` called once the final values are known.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, DocketError> {
        let config_dir = ProjectDirs::from("", "", APP_NAME)
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(|e| DocketError::Config(e.to_string()))?
            .set_default("search_index_path", default_search_index_path())
            .map_err(|e| DocketError::Config(e.to_string()))?
            .set_default("blob_root", default_blob_root())
            .map_err(|e| DocketError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| DocketError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // DOCKET_DB_PATH, DOCKET_INBOX__BATCH_SIZE, DOCKET_INDEXING__INTERVAL_MINUTES, ...
        builder = builder.add_source(
            Environment::with_prefix("DOCKET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| DocketError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| DocketError::Config(e.to_string()))
    }

    /// Check every section. Any failure is a fatal configuration error.
    pub fn validate(&self) -> Result<(), DocketError> {
        for (key, value) in [
            ("db_path", &self.db_path),
            ("search_index_path", &self.search_index_path),
            ("blob_root", &self.blob_root),
        ] {
            if value.trim().is_empty() {
                return Err(DocketError::Config(format!("{} must not be empty", key)));
            }
        }
        self.inbox.validate().map_err(DocketError::Config)?;
        self.indexing.validate().map_err(DocketError::Config)?;
        if self.scheduler.shutdown_timeout_secs == 0 {
            return Err(DocketError::Config(
                "scheduler.shutdown_timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn expanded_db_path(&self) -> PathBuf {
        expand_home(&self.db_path)
    }

    pub fn expanded_search_index_path(&self) -> PathBuf {
        expand_home(&self.search_index_path)
    }

    pub fn expanded_blob_root(&self) -> PathBuf {
        expand_home(&self.blob_root)
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.inbox.container_name, "inbox");
        assert_eq!(settings.inbox.polling_interval_secs, 30);
        assert_eq!(settings.indexing.batch_size, 100);
        assert_eq!(settings.indexing.interval_minutes, 5);
        assert!(settings.indexing.background_enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.inbox.processed_container_name, "processed");
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("docket.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "db_path = \"/tmp/docket-db\"\n\n[inbox]\nbatch_size = 3\nenabled = false\n\n[indexing]\ninterval_minutes = 2"
        )
        .unwrap();

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.db_path, "/tmp/docket-db");
        assert_eq!(settings.inbox.batch_size, 3);
        assert!(!settings.inbox.enabled);
        assert_eq!(settings.indexing.interval_minutes, 2);
        // Untouched keys keep their defaults
        assert_eq!(settings.inbox.failed_container_name, "failed");
        assert_eq!(settings.indexing.batch_size, 100);
    }

    #[test]
    fn test_missing_cli_file_is_error() {
        let result = Settings::load(Some("/nonexistent/docket-config.toml"));
        assert!(matches!(result, Err(DocketError::Config(_))));
    }

    #[test]
    fn test_validate_zero_batch_size() {
        let mut settings = Settings::default();
        settings.inbox.batch_size = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("inbox.batch_size"));

        let mut settings = Settings::default();
        settings.indexing.batch_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_containers() {
        let mut settings = Settings::default();
        settings.inbox.failed_container_name = "processed".to_string();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("duplicates"));
    }

    #[test]
    fn test_validate_empty_container() {
        let mut settings = Settings::default();
        settings.inbox.container_name = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_backoff_below_interval() {
        let mut settings = Settings::default();
        settings.inbox.max_backoff_secs = 5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/var/lib/docket"), PathBuf::from("/var/lib/docket"));
        let expanded = expand_home("~/docket");
        assert!(expanded.ends_with("docket"));
    }
}
