//! Storage layer for docket.
//!
//! Provides RocksDB-backed storage with:
//! - Column family isolation for documents, the dedup index and batch audit
//! - Atomic writes via WriteBatch
//! - Idempotent document creation keyed by id, and optionally by
//!   tenant + content hash
//! - Index bookkeeping that never disturbs a document's modification time

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;
pub mod repository;

pub use db::{Storage, StorageStats};
pub use error::StorageError;
pub use keys::{BatchKey, ContentHashKey, DocumentKey};
pub use repository::DocumentRepository;
