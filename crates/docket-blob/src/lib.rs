//! # docket-blob
//!
//! Object storage facade with four named areas: inbox, processed, failed
//! and documents. Ingestion lists and downloads from the inbox, uploads
//! ingested content into documents, and moves each source to processed or
//! failed.
//!
//! Backends:
//! - [`LocalBlobStore`]: directory per area with JSON metadata sidecars
//! - [`MemoryBlobStore`]: map-backed, used by tests

pub mod area;
pub mod error;
pub mod local;
pub mod memory;
pub mod store;

pub use area::{AreaLayout, BlobArea};
pub use error::{BlobError, BlobResult};
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use store::{
    guess_content_type, validate_name, BlobItem, BlobMetadata, BlobObject, BlobStore, META_DIR,
};
