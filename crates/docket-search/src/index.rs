//! On-disk search index.
//!
//! One Tantivy index directory per daemon. The writer takes Tantivy's
//! directory lock, so a second process opening a writer on the same path
//! gets [`SearchError::IndexLocked`].

use std::path::{Path, PathBuf};

use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyError};
use tracing::{debug, info};

use docket_types::IndexingSettings;

use crate::error::SearchError;
use crate::schema::{build_document_schema, SearchSchema};

const WRITER_MEMORY_MB: usize = 50;
/// Tantivy refuses writer budgets below 15MB
const MIN_WRITER_MEMORY_MB: usize = 15;
const META_FILE: &str = "meta.json";

/// Where the index lives and how much memory its writer may use.
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    pub index_path: PathBuf,
    pub writer_memory_mb: usize,
}

impl SearchIndexConfig {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            writer_memory_mb: WRITER_MEMORY_MB,
        }
    }

    pub fn from_settings(index_path: impl Into<PathBuf>, settings: &IndexingSettings) -> Self {
        Self::new(index_path).with_memory_mb(settings.writer_memory_mb)
    }

    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb.max(MIN_WRITER_MEMORY_MB);
        self
    }

    fn memory_budget_bytes(&self) -> usize {
        self.writer_memory_mb * 1024 * 1024
    }
}

/// An opened index with its resolved schema fields.
pub struct SearchIndex {
    index: Index,
    schema: SearchSchema,
    config: SearchIndexConfig,
}

impl SearchIndex {
    /// Open the index at the configured path, creating it if absent.
    ///
    /// An existing index whose schema lacks document fields is rejected
    /// with [`SearchError::SchemaMismatch`] rather than written into.
    pub fn open_or_create(config: SearchIndexConfig) -> Result<Self, SearchError> {
        let index = open_or_create_index(&config.index_path)?;
        let schema = SearchSchema::from_schema(index.schema())?;
        info!(path = ?config.index_path, "Search index ready");
        Ok(Self {
            index,
            schema,
            config,
        })
    }

    pub fn schema(&self) -> &SearchSchema {
        &self.schema
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn path(&self) -> &Path {
        &self.config.index_path
    }

    /// Take the single writer for this index.
    pub fn writer(&self) -> Result<IndexWriter, SearchError> {
        match self.index.writer(self.config.memory_budget_bytes()) {
            Ok(writer) => {
                debug!(memory_mb = self.config.writer_memory_mb, "Index writer acquired");
                Ok(writer)
            }
            Err(TantivyError::LockFailure(_, _)) => Err(SearchError::IndexLocked(
                self.config.index_path.display().to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Reader that picks up commits shortly after they land.
    pub fn reader(&self) -> Result<IndexReader, SearchError> {
        Ok(self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?)
    }
}

/// Whether a committed index exists at `path`.
pub fn index_exists(path: &Path) -> bool {
    path.join(META_FILE).exists()
}

/// Open the index directory at `path`, creating it with the document
/// schema on first use.
pub fn open_or_create_index(path: &Path) -> Result<Index, SearchError> {
    if index_exists(path) {
        debug!(path = ?path, "Opening existing index");
        return Ok(Index::open_in_dir(path)?);
    }
    info!(path = ?path, "Creating search index");
    std::fs::create_dir_all(path)?;
    Ok(Index::create_in_dir(path, build_document_schema().schema().clone())?)
}
