//! Mapping from docket documents to Tantivy documents.

use tantivy::doc;
use tantivy::TantivyDocument;

use docket_types::Document;

use crate::error::SearchError;
use crate::schema::SearchSchema;

/// Deterministic index id, so re-indexing replaces the previous entry.
pub fn index_id_for(document: &Document) -> String {
    format!("{}/{}", document.tenant_id, document.document_id)
}

/// Convert a document into an indexable Tantivy document.
///
/// Soft-deleted documents are refused.
pub fn document_to_doc(
    schema: &SearchSchema,
    document: &Document,
    index_id: &str,
) -> Result<TantivyDocument, SearchError> {
    if document.is_deleted {
        return Err(SearchError::Rejected(format!(
            "{} is soft-deleted",
            document.document_id
        )));
    }
    if document.document_id.is_empty() || document.tenant_id.is_empty() {
        return Err(SearchError::Rejected(
            "document id and tenant id are required".to_string(),
        ));
    }

    let is_current = if document.is_current_version { "true" } else { "false" };

    Ok(doc!(
        schema.index_id => index_id,
        schema.document_id => document.document_id.clone(),
        schema.tenant_id => document.tenant_id.clone(),
        schema.document_type_id => document.document_type_id.clone(),
        schema.title => document.title.clone(),
        schema.text => document.extracted_text.clone(),
        schema.tags => document.tags.join(" "),
        schema.mime_type => document.mime_type.clone(),
        schema.is_current => is_current,
        schema.updated_ms => document.updated_at.timestamp_millis().to_string()
    ))
}
