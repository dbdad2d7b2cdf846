//! Column family definitions for RocksDB.
//!
//! - documents: Document records keyed by id (default compaction)
//! - content_hashes: (tenant, content hash) -> document id dedup index
//! - batches: BatchOutcome audit trail, time-ordered (Zstd compressed)

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for document records
pub const CF_DOCUMENTS: &str = "documents";

/// Column family name for the tenant + content hash index
pub const CF_CONTENT_HASHES: &str = "content_hashes";

/// Column family name for batch outcome records
pub const CF_BATCHES: &str = "batches";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_DOCUMENTS, CF_CONTENT_HASHES, CF_BATCHES];

/// Documents carry extracted text, so compress them
fn documents_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Append-only audit records
fn batches_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_DOCUMENTS, documents_options()),
        ColumnFamilyDescriptor::new(CF_CONTENT_HASHES, Options::default()),
        ColumnFamilyDescriptor::new(CF_BATCHES, batches_options()),
    ]
}
