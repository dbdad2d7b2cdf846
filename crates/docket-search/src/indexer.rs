//! Tantivy-backed implementation of [`SearchBackend`].
//!
//! The indexer wraps IndexWriter with shared access via Arc<Mutex>.
//! Every mutating call commits before returning, so a confirmed id is
//! durable and searchable once the reader reloads.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tantivy::{IndexWriter, Term};
use tracing::{debug, info, warn};

use docket_types::Document;

use crate::backend::SearchBackend;
use crate::document::{document_to_doc, index_id_for};
use crate::error::SearchError;
use crate::index::{index_exists, SearchIndex};
use crate::schema::SearchSchema;

pub struct SearchIndexer {
    writer: Arc<Mutex<IndexWriter>>,
    schema: SearchSchema,
    index_path: PathBuf,
}

impl SearchIndexer {
    /// Create a new indexer from a SearchIndex.
    pub fn new(index: &SearchIndex) -> Result<Self, SearchError> {
        let writer = index.writer()?;
        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            schema: index.schema().clone(),
            index_path: index.path().to_path_buf(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, IndexWriter>, SearchError> {
        self.writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))
    }

    /// Replace the entry for `document`. Not visible until commit.
    fn stage(
        &self,
        writer: &IndexWriter,
        document: &Document,
    ) -> Result<String, SearchError> {
        let index_id = index_id_for(document);
        let tantivy_doc = document_to_doc(&self.schema, document, &index_id)?;

        writer.delete_term(Term::from_field_text(self.schema.index_id, &index_id));
        writer.add_document(tantivy_doc)?;
        Ok(index_id)
    }

    /// Commit, rolling back staged changes if the commit fails.
    fn commit(&self, writer: &mut IndexWriter) -> Result<u64, SearchError> {
        match writer.commit() {
            Ok(opstamp) => Ok(opstamp),
            Err(e) => {
                if let Err(rollback_err) = writer.rollback() {
                    warn!(error = %rollback_err, "Rollback after failed commit also failed");
                }
                Err(e.into())
            }
        }
    }
}

impl SearchBackend for SearchIndexer {
    fn index_one(&self, document: &Document) -> Result<String, SearchError> {
        let mut writer = self.lock()?;
        let index_id = self.stage(&writer, document)?;
        self.commit(&mut writer)?;
        debug!(document_id = %document.document_id, index_id = %index_id, "Indexed document");
        Ok(index_id)
    }

    /// Items that cannot be staged are logged and left out of the result;
    /// a failed commit fails the whole batch.
    fn index_batch(&self, documents: &[Document]) -> Result<HashMap<String, String>, SearchError> {
        let mut writer = self.lock()?;
        let mut confirmed = HashMap::with_capacity(documents.len());

        for document in documents {
            match self.stage(&writer, document) {
                Ok(index_id) => {
                    confirmed.insert(document.document_id.clone(), index_id);
                }
                Err(e) => {
                    warn!(
                        document_id = %document.document_id,
                        tenant = %document.tenant_id,
                        error = %e,
                        "Skipping document in batch"
                    );
                }
            }
        }

        let opstamp = self.commit(&mut writer)?;
        info!(
            requested = documents.len(),
            indexed = confirmed.len(),
            opstamp,
            "Committed index batch"
        );
        Ok(confirmed)
    }

    fn update(&self, document: &Document) -> Result<(), SearchError> {
        self.index_one(document).map(|_| ())
    }

    fn remove(&self, index_id: &str) -> Result<(), SearchError> {
        let mut writer = self.lock()?;
        writer.delete_term(Term::from_field_text(self.schema.index_id, index_id));
        self.commit(&mut writer)?;
        debug!(index_id, "Removed document from index");
        Ok(())
    }

    fn remove_batch(&self, index_ids: &[String]) -> Result<Vec<String>, SearchError> {
        let mut writer = self.lock()?;
        for index_id in index_ids {
            writer.delete_term(Term::from_field_text(self.schema.index_id, index_id));
        }
        self.commit(&mut writer)?;
        info!(count = index_ids.len(), "Removed documents from index");
        Ok(index_ids.to_vec())
    }

    fn is_healthy(&self) -> bool {
        self.writer.lock().is_ok() && index_exists(&self.index_path)
    }

    fn name(&self) -> &str {
        "tantivy"
    }
}
