//! Retrieval capability
//!
//! Embedding stores are external. The crate builds an index from
//! `(path, content)` pairs and asks it for the top-k documents for a query.
//! [`KeywordIndexer`] is a dependency-free stand-in used when no embedding
//! backend is configured.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::types::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: String,
    pub content: String,
}

impl Document {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub document: Document,
    pub score: f32,
}

#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Up to `k` documents, best first
    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedDocument>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
pub trait DocumentIndexer: Send + Sync {
    async fn build_index(&self, documents: Vec<Document>) -> Result<Arc<dyn DocumentIndex>>;
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.len() > 2)
        .map(str::to_lowercase)
}

/// Term-overlap index
#[derive(Debug, Default)]
pub struct KeywordIndexer;

struct KeywordIndex {
    documents: Vec<(Document, HashMap<String, usize>)>,
}

#[async_trait]
impl DocumentIndexer for KeywordIndexer {
    async fn build_index(&self, documents: Vec<Document>) -> Result<Arc<dyn DocumentIndex>> {
        let documents = documents
            .into_iter()
            .map(|doc| {
                let mut terms: HashMap<String, usize> = HashMap::new();
                for t in tokens(&doc.content).chain(tokens(&doc.path)) {
                    *terms.entry(t).or_default() += 1;
                }
                (doc, terms)
            })
            .collect();
        Ok(Arc::new(KeywordIndex { documents }))
    }
}

#[async_trait]
impl DocumentIndex for KeywordIndex {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        let query: HashSet<String> = tokens(text).collect();
        if query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<RetrievedDocument> = self
            .documents
            .iter()
            .filter_map(|(doc, terms)| {
                let hits: usize = query.iter().filter_map(|q| terms.get(q)).sum();
                (hits > 0).then(|| RetrievedDocument {
                    document: doc.clone(),
                    score: hits as f32 / (1.0 + terms.len() as f32).sqrt(),
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.document.path.cmp(&b.document.path))
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn len(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keyword_index_ranks_by_overlap() {
        let index = KeywordIndexer
            .build_index(vec![
                Document::new("src/cache.rs", "cache store quarantine rename"),
                Document::new("src/diff.rs", "snapshot diff changed files"),
                Document::new("README.md", "cache overview"),
            ])
            .await
            .unwrap();
        assert_eq!(index.len(), 3);

        let hits = index.query("How does the cache quarantine work?", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.path, "src/cache.rs");
        assert!(hits.iter().all(|h| h.document.path != "src/diff.rs"));
    }

    #[tokio::test]
    async fn test_empty_query_returns_nothing() {
        let index = KeywordIndexer
            .build_index(vec![Document::new("a", "alpha")])
            .await
            .unwrap();
        assert!(index.query("?!", 5).await.unwrap().is_empty());
        assert!(index.query("alpha", 0).await.unwrap().is_empty());
    }
}
