//! # docket-search
//!
//! Full-text index for docket documents using Tantivy.
//!
//! - [`SearchBackend`]: batch-oriented indexing contract with per-item
//!   confirmation, consumed by the reconciliation loop
//! - [`SearchIndexer`]: Tantivy implementation of that contract
//! - [`DocumentSearcher`]: BM25 queries filtered by tenant, type and
//!   current version

pub mod backend;
pub mod document;
pub mod error;
pub mod index;
pub mod indexer;
pub mod schema;
pub mod searcher;

pub use backend::SearchBackend;
pub use document::{document_to_doc, index_id_for};
pub use error::SearchError;
pub use index::{index_exists, open_or_create_index, SearchIndex, SearchIndexConfig};
pub use indexer::SearchIndexer;
pub use schema::{build_document_schema, SearchSchema};
pub use searcher::{DocumentSearcher, SearchHit, SearchOptions};
