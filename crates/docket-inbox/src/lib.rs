//! # docket-inbox
//!
//! Drives the ingestion cycle: list the inbox area, process each item,
//! persist a document and move the source blob to `processed` or
//! `failed`.
//!
//! An item leaves the inbox only through a successful move. Retryable
//! download, upload, persistence and move failures leave it in place for
//! the next cycle; an item that can never be stored (an unusable storage
//! path, a document that fails validation) is moved to `failed`.

pub mod config;
pub mod error;
pub mod processor;
pub mod report;

pub use config::InboxConfig;
pub use error::InboxError;
pub use processor::{
    InboxProcessor, META_DOCUMENT_ID, META_DUPLICATE_OF, META_ERROR, META_ERROR_DETAIL,
    META_FAILED_AT, META_PROCESSED_AT,
};
pub use report::{CycleReport, ItemOutcome};
