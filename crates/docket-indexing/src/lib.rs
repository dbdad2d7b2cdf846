//! # docket-indexing
//!
//! Background reconciliation between the document store and the search
//! index.
//!
//! A document needs indexing when it is not soft-deleted and has no index
//! entry, or its entry predates its last modification. Each cycle indexes
//! such documents in batches, marks only the ones the backend confirmed,
//! and removes soft-deleted documents from the index.

pub mod config;
pub mod error;
pub mod reconciler;
pub mod report;

pub use config::ReconcileConfig;
pub use error::IndexingError;
pub use reconciler::Reconciler;
pub use report::ReconcileReport;
