//! # docket-types
//!
//! Shared domain types for the docket ingestion system.
//!
//! This crate defines the core data structures used throughout the system:
//! - Document: durable, searchable record produced by the inbox pipeline
//! - InboxItem: ephemeral file awaiting ingestion
//! - ProcessingResult: success-or-failure outcome of processing one item
//! - BatchOutcome: audit record for bulk operations
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use docket_types::Document;
//!
//! let doc = Document::new("acme", "invoice", "scan.pdf", "application/pdf", "ab12", 42);
//! assert!(doc.needs_indexing());
//! ```

pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod inbox;
pub mod processing;

pub use batch::{BatchKind, BatchOutcome};
pub use config::{expand_home, IndexingSettings, InboxSettings, SchedulerSettings, Settings};
pub use document::{document_storage_path, new_document_id, Document};
pub use error::{DocketError, ErrorKind};
pub use inbox::{
    resolve_identity, InboxItem, ItemDefaults, META_DOCUMENT_TYPE_ID, META_TENANT_ID,
};
pub use processing::ProcessingResult;
