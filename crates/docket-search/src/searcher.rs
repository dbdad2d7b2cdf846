//! BM25 search over indexed documents.

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{IndexReader, TantivyDocument, Term};
use tracing::{debug, info};

use crate::error::SearchError;
use crate::index::SearchIndex;
use crate::schema::SearchSchema;

/// A search result with relevance score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub index_id: String,
    pub document_id: String,
    pub tenant_id: String,
    pub document_type_id: String,
    pub title: String,
    /// BM25 relevance score
    pub score: f32,
    pub updated_ms: Option<i64>,
}

/// Search options for filtering and limiting results.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub tenant_id: Option<String>,
    pub document_type_id: Option<String>,
    /// Only the current version of each chain
    pub current_only: bool,
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            tenant_id: None,
            document_type_id: None,
            current_only: true,
            limit: 10,
        }
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_document_type(mut self, document_type_id: impl Into<String>) -> Self {
        self.document_type_id = Some(document_type_id.into());
        self
    }

    pub fn include_old_versions(mut self) -> Self {
        self.current_only = false;
        self
    }
}

pub struct DocumentSearcher {
    reader: IndexReader,
    schema: SearchSchema,
    query_parser: QueryParser,
}

impl DocumentSearcher {
    pub fn new(index: &SearchIndex) -> Result<Self, SearchError> {
        let reader = index.reader()?;
        let schema = index.schema().clone();
        let query_parser = QueryParser::for_index(
            index.index(),
            vec![schema.title, schema.text, schema.tags],
        );

        Ok(Self {
            reader,
            schema,
            query_parser,
        })
    }

    /// Reload the reader to see recent commits.
    pub fn reload(&self) -> Result<(), SearchError> {
        self.reader.reload()?;
        debug!("Reloaded search reader");
        Ok(())
    }

    fn term_filter(&self, field: tantivy::schema::Field, value: &str) -> Box<dyn Query> {
        Box::new(TermQuery::new(
            Term::from_field_text(field, value),
            IndexRecordOption::Basic,
        ))
    }

    pub fn search(
        &self,
        query_str: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if query_str.trim().is_empty() || options.limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let text_query = self.query_parser.parse_query(query_str)?;

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, text_query)];
        if let Some(tenant_id) = &options.tenant_id {
            clauses.push((Occur::Must, self.term_filter(self.schema.tenant_id, tenant_id)));
        }
        if let Some(document_type_id) = &options.document_type_id {
            clauses.push((
                Occur::Must,
                self.term_filter(self.schema.document_type_id, document_type_id),
            ));
        }
        if options.current_only {
            clauses.push((Occur::Must, self.term_filter(self.schema.is_current, "true")));
        }
        let query = BooleanQuery::new(clauses);

        let top_docs = searcher.search(&query, &TopDocs::with_limit(options.limit))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            let text = |field| {
                doc.get_first(field)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string()
            };

            results.push(SearchHit {
                index_id: text(self.schema.index_id),
                document_id: text(self.schema.document_id),
                tenant_id: text(self.schema.tenant_id),
                document_type_id: text(self.schema.document_type_id),
                title: text(self.schema.title),
                score,
                updated_ms: text(self.schema.updated_ms).parse().ok(),
            });
        }

        info!(query = query_str, results = results.len(), "Document search complete");
        Ok(results)
    }

    /// Get the number of indexed documents.
    pub fn num_docs(&self) -> u64 {
        let searcher = self.reader.searcher();
        searcher
            .segment_readers()
            .iter()
            .map(|r| r.num_docs() as u64)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SearchBackend;
    use crate::index::SearchIndexConfig;
    use crate::indexer::SearchIndexer;
    use docket_types::Document;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SearchIndex, SearchIndexer) {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open_or_create(SearchIndexConfig::new(temp_dir.path())).unwrap();
        let indexer = SearchIndexer::new(&index).unwrap();
        (temp_dir, index, indexer)
    }

    fn doc(tenant: &str, doc_type: &str, title: &str, text: &str) -> Document {
        Document::new(tenant, doc_type, "f.txt", "text/plain", text, 1)
            .with_title(title)
            .with_extracted_text(text)
    }

    #[test]
    fn test_search_matches_text_and_title() {
        let (_temp, index, indexer) = setup();
        let invoice = doc("acme", "invoice", "March invoice", "total due on receipt");
        let memo = doc("acme", "memo", "Offsite plan", "the offsite is in spring");
        indexer.index_batch(&[invoice.clone(), memo.clone()]).unwrap();

        let searcher = DocumentSearcher::new(&index).unwrap();
        let hits = searcher.search("receipt", &SearchOptions::new()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, invoice.document_id);
        assert!(hits[0].score > 0.0);

        let hits = searcher.search("offsite", &SearchOptions::new()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Offsite plan");
    }

    #[test]
    fn test_tenant_and_type_filters() {
        let (_temp, index, indexer) = setup();
        indexer
            .index_batch(&[
                doc("acme", "invoice", "a", "quarterly report"),
                doc("globex", "invoice", "b", "quarterly report"),
                doc("acme", "memo", "c", "quarterly report"),
            ])
            .unwrap();

        let searcher = DocumentSearcher::new(&index).unwrap();
        let all = searcher.search("quarterly", &SearchOptions::new()).unwrap();
        assert_eq!(all.len(), 3);

        let acme = searcher
            .search("quarterly", &SearchOptions::new().with_tenant("acme"))
            .unwrap();
        assert_eq!(acme.len(), 2);
        assert!(acme.iter().all(|h| h.tenant_id == "acme"));

        let acme_memos = searcher
            .search(
                "quarterly",
                &SearchOptions::new().with_tenant("acme").with_document_type("memo"),
            )
            .unwrap();
        assert_eq!(acme_memos.len(), 1);
    }

    #[test]
    fn test_old_versions_hidden_by_default() {
        let (_temp, index, indexer) = setup();
        let mut old = doc("acme", "memo", "v1", "budget draft");
        old.is_current_version = false;
        indexer.index_one(&old).unwrap();

        let searcher = DocumentSearcher::new(&index).unwrap();
        assert!(searcher.search("budget", &SearchOptions::new()).unwrap().is_empty());
        let all = searcher
            .search("budget", &SearchOptions::new().include_old_versions())
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_removed_document_not_returned() {
        let (_temp, index, indexer) = setup();
        let d = doc("acme", "memo", "gone", "ephemeral words");
        let index_id = indexer.index_one(&d).unwrap();
        indexer.remove(&index_id).unwrap();

        let searcher = DocumentSearcher::new(&index).unwrap();
        assert!(searcher.search("ephemeral", &SearchOptions::new()).unwrap().is_empty());
        assert_eq!(searcher.num_docs(), 0);
    }

    #[test]
    fn test_empty_query() {
        let (_temp, index, _indexer) = setup();
        let searcher = DocumentSearcher::new(&index).unwrap();
        assert!(searcher.search("   ", &SearchOptions::new()).unwrap().is_empty());
    }
}
