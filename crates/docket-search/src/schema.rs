//! Tantivy schema for document search.
//!
//! One Tantivy document per docket document, keyed by its index id.

use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};

use crate::SearchError;

/// Schema field handles for efficient access
#[derive(Debug, Clone)]
pub struct SearchSchema {
    schema: Schema,
    /// Primary key: `{tenant_id}/{document_id}` (STRING | STORED)
    pub index_id: Field,
    pub document_id: Field,
    /// Tenant for filtering (STRING | STORED)
    pub tenant_id: Field,
    /// Document type for filtering (STRING | STORED)
    pub document_type_id: Field,
    /// Title (TEXT | STORED)
    pub title: Field,
    /// Extracted text (TEXT, not stored)
    pub text: Field,
    /// Tags joined by spaces (TEXT | STORED)
    pub tags: Field,
    pub mime_type: Field,
    /// "true" for the current version of a chain (STRING)
    pub is_current: Field,
    /// Last modification in milliseconds (STRING | STORED)
    pub updated_ms: Field,
}

impl SearchSchema {
    /// Get the underlying Tantivy schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Create a SearchSchema from an existing Tantivy Schema
    pub fn from_schema(schema: Schema) -> Result<Self, SearchError> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| SearchError::SchemaMismatch(format!("missing {} field", name)))
        };

        Ok(Self {
            index_id: field("index_id")?,
            document_id: field("document_id")?,
            tenant_id: field("tenant_id")?,
            document_type_id: field("document_type_id")?,
            title: field("title")?,
            text: field("text")?,
            tags: field("tags")?,
            mime_type: field("mime_type")?,
            is_current: field("is_current")?,
            updated_ms: field("updated_ms")?,
            schema,
        })
    }
}

/// Build the document search schema.
pub fn build_document_schema() -> SearchSchema {
    let mut schema_builder = Schema::builder();

    let index_id = schema_builder.add_text_field("index_id", STRING | STORED);
    let document_id = schema_builder.add_text_field("document_id", STRING | STORED);
    let tenant_id = schema_builder.add_text_field("tenant_id", STRING | STORED);
    let document_type_id = schema_builder.add_text_field("document_type_id", STRING | STORED);
    let title = schema_builder.add_text_field("title", TEXT | STORED);

    // Extracted text can be large; it already lives in the document store
    let text = schema_builder.add_text_field("text", TEXT);

    let tags = schema_builder.add_text_field("tags", TEXT | STORED);
    let mime_type = schema_builder.add_text_field("mime_type", STRING | STORED);
    let is_current = schema_builder.add_text_field("is_current", STRING);
    let updated_ms = schema_builder.add_text_field("updated_ms", STRING | STORED);

    let schema = schema_builder.build();

    SearchSchema {
        schema,
        index_id,
        document_id,
        tenant_id,
        document_type_id,
        title,
        text,
        tags,
        mime_type,
        is_current,
        updated_ms,
    }
}
