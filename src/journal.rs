//! An ordered, keyed collection of [`Article`]s.

use crate::article::{Article, ArticleSnapshot};
use crate::backend::SharedBackend;
use crate::error::{AdsError, Result};
use crate::fields::{Fields, KEY_FIELD};
use crate::handles::{ExportHandle, MetricsHandle, PdfHandle, VisualHandle};
use crate::paginate::{Paginator, SearchOptions};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Persisted state of a [`Journal`]: its articles, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalSnapshot {
    pub articles: Vec<ArticleSnapshot>,
}

/// Articles keyed by bibcode, kept in insertion order.
///
/// Adding a bibcode that is already present keeps its position; removing
/// one leaves the relative order of the rest unchanged.
#[derive(Clone)]
pub struct Journal {
    backend: SharedBackend,
    articles: IndexMap<String, Article>,
}

impl Journal {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            articles: IndexMap::new(),
        }
    }

    /// Unfetched articles for each bibcode. Duplicates collapse onto the
    /// first occurrence.
    pub fn from_bibcodes<I, S>(backend: SharedBackend, bibcodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut journal = Self::new(backend);
        for bibcode in bibcodes {
            journal.add_bibcode(bibcode);
        }
        journal
    }

    /// Articles from already fetched field maps.
    pub fn from_data<I>(backend: SharedBackend, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Fields>,
    {
        let mut journal = Self::new(backend);
        for record in records {
            journal.add_data(record)?;
        }
        Ok(journal)
    }

    pub fn from_articles<I>(backend: SharedBackend, articles: I) -> Result<Self>
    where
        I: IntoIterator<Item = Article>,
    {
        let mut journal = Self::new(backend);
        for article in articles {
            journal.add_article(article)?;
        }
        Ok(journal)
    }

    /// Every record matching `query`, fetched with `options`.
    pub async fn from_query(
        backend: SharedBackend,
        query: &str,
        options: SearchOptions,
    ) -> Result<Self> {
        let records = Paginator::new(backend.as_ref(), query, options)?
            .collect_all()
            .await?;
        tracing::debug!(%query, count = records.len(), "built journal from query");
        Self::from_data(backend, records)
    }

    /// Rebuild a journal, caches included, without touching the network.
    pub fn restore(backend: SharedBackend, snapshot: JournalSnapshot) -> Result<Self> {
        let articles: Vec<Article> = snapshot
            .articles
            .into_iter()
            .map(|a| Article::restore(Arc::clone(&backend), a))
            .collect();
        Self::from_articles(backend, articles)
    }

    pub fn snapshot(&self) -> JournalSnapshot {
        JournalSnapshot {
            articles: self.articles.values().map(Article::snapshot).collect(),
        }
    }

    /// Add an unfetched article. No-op when the bibcode is already present.
    pub fn add_bibcode(&mut self, bibcode: impl Into<String>) {
        let bibcode = bibcode.into();
        if !self.articles.contains_key(&bibcode) {
            let article = Article::new(Arc::clone(&self.backend), bibcode.clone());
            self.articles.insert(bibcode, article);
        }
    }

    /// Add (or replace in place) the article described by `data`.
    pub fn add_data(&mut self, data: Fields) -> Result<()> {
        if data.get(KEY_FIELD).and_then(Value::as_str).is_none() {
            return Err(AdsError::Precondition(
                "record has no bibcode and cannot be added".to_string(),
            ));
        }
        self.add_article(Article::from_data(Arc::clone(&self.backend), data))
    }

    /// Add (or replace in place) an article.
    pub fn add_article(&mut self, article: Article) -> Result<()> {
        let bibcode = article
            .bibcode()
            .ok_or_else(|| {
                AdsError::Precondition("article has no bibcode and cannot be added".to_string())
            })?
            .to_string();
        self.articles.insert(bibcode, article);
        Ok(())
    }

    /// Remove the given bibcodes, returning the removed articles. Unknown
    /// bibcodes are ignored.
    pub fn pop<I, S>(&mut self, bibcodes: I) -> Vec<Article>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        bibcodes
            .into_iter()
            .filter_map(|b| self.articles.shift_remove(b.as_ref()))
            .collect()
    }

    pub fn get(&self, bibcode: &str) -> Option<&Article> {
        self.articles.get(bibcode)
    }

    pub fn get_mut(&mut self, bibcode: &str) -> Option<&mut Article> {
        self.articles.get_mut(bibcode)
    }

    /// The article at `index` in insertion order.
    pub fn get_index(&self, index: usize) -> Option<&Article> {
        self.articles.get_index(index).map(|(_, a)| a)
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut Article> {
        self.articles.get_index_mut(index).map(|(_, a)| a)
    }

    pub fn contains(&self, bibcode: &str) -> bool {
        self.articles.contains_key(bibcode)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn bibcodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.articles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Article> + '_ {
        self.articles.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Article> + '_ {
        self.articles.values_mut()
    }

    /// `field` of every article, fetching where not cached.
    pub async fn field(&mut self, name: &str) -> Result<IndexMap<String, Value>> {
        let mut values = IndexMap::with_capacity(self.articles.len());
        for (bibcode, article) in self.articles.iter_mut() {
            let value = article.get(name).await?.clone();
            values.insert(bibcode.clone(), value);
        }
        Ok(values)
    }

    /// Total citations of the members. With `dedupe`, a paper citing several
    /// members counts once.
    pub async fn citation_count(&mut self, dedupe: bool) -> Result<usize> {
        if !dedupe {
            let mut total = 0;
            for article in self.articles.values_mut() {
                total += article.citation_count().await?;
            }
            return Ok(total);
        }

        let mut unique: IndexSet<String> = IndexSet::new();
        for article in self.articles.values_mut() {
            unique.extend(article.citations().await?.bibcodes().map(String::from));
        }
        Ok(unique.len())
    }

    /// Total references of the members. With `dedupe`, a paper referenced by
    /// several members counts once.
    pub async fn reference_count(&mut self, dedupe: bool) -> Result<usize> {
        if !dedupe {
            let mut total = 0;
            for article in self.articles.values_mut() {
                total += article.reference_count().await?;
            }
            return Ok(total);
        }

        let mut unique: IndexSet<String> = IndexSet::new();
        for article in self.articles.values_mut() {
            unique.extend(article.references().await?.bibcodes().map(String::from));
        }
        Ok(unique.len())
    }

    /// Each member's citing papers.
    pub async fn citations(&mut self) -> Result<IndexMap<&str, &Journal>> {
        for article in self.articles.values_mut() {
            article.citations().await?;
        }
        Ok(self
            .articles
            .iter()
            .filter_map(|(key, a)| a.cached_citations().map(|j| (key.as_str(), j)))
            .collect())
    }

    /// Each member's referenced papers.
    pub async fn references(&mut self) -> Result<IndexMap<&str, &Journal>> {
        for article in self.articles.values_mut() {
            article.references().await?;
        }
        Ok(self
            .articles
            .iter()
            .filter_map(|(key, a)| a.cached_references().map(|j| (key.as_str(), j)))
            .collect())
    }

    fn keys(&self) -> Vec<String> {
        self.articles.keys().cloned().collect()
    }

    pub fn export(&self) -> ExportHandle {
        ExportHandle::new(self.keys())
    }

    pub fn metrics(&self) -> MetricsHandle {
        MetricsHandle::new(self.keys())
    }

    pub fn visual(&self) -> VisualHandle {
        VisualHandle::new(self.keys())
    }

    /// Full-text proxy; only defined for a single-article journal.
    pub fn pdf(&self) -> Result<PdfHandle> {
        PdfHandle::new(&self.keys())
    }
}

impl<'a> IntoIterator for &'a Journal {
    type Item = &'a Article;
    type IntoIter = indexmap::map::Values<'a, String, Article>;

    fn into_iter(self) -> Self::IntoIter {
        self.articles.values()
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.articles.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fields, numbered_records, MockBackend};
    use serde_json::json;

    fn setup(mock: MockBackend) -> (Arc<MockBackend>, SharedBackend) {
        let mock = Arc::new(mock.with_records(numbered_records(5)));
        let backend: SharedBackend = mock.clone();
        (mock, backend)
    }

    fn order(journal: &Journal) -> Vec<&str> {
        journal.bibcodes().collect()
    }

    #[tokio::test]
    async fn test_pop_preserves_order() {
        let (_mock, backend) = setup(MockBackend::new());
        let mut journal = Journal::from_bibcodes(backend, ["A", "B", "C"]);

        let removed = journal.pop(["B"]);

        assert_eq!(removed.len(), 1);
        assert_eq!(journal.len(), 2);
        assert_eq!(journal.get_index(1).unwrap().bibcode(), Some("C"));
        assert!(journal.pop(["Z"]).is_empty());
        assert_eq!(order(&journal), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_pop_single_key() {
        let (mock, backend) = setup(MockBackend::new());
        let mut journal = Journal::from_bibcodes(backend, ["K1", "K2"]);

        journal.pop(["K1"]);

        assert_eq!(journal.len(), 1);
        assert!(!journal.contains("K1"));
        assert!(journal.contains("K2"));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_add_bibcode_is_idempotent() {
        let (mock, backend) = setup(MockBackend::new());
        let mut journal = Journal::from_bibcodes(backend, ["K1", "K2", "K1"]);
        journal.add_bibcode("K2");

        assert_eq!(order(&journal), vec!["K1", "K2"]);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_add_data_replaces_in_place() {
        let (_mock, backend) = setup(MockBackend::new());
        let mut journal = Journal::from_bibcodes(backend, ["K1", "K2", "K3"]);

        journal
            .add_data(fields(json!({"bibcode": "K2", "title": ["Replaced"]})))
            .unwrap();

        assert_eq!(order(&journal), vec!["K1", "K2", "K3"]);
        assert!(journal.get("K2").unwrap().is_cached("title"));
    }

    #[tokio::test]
    async fn test_records_without_bibcode_are_rejected() {
        let (_mock, backend) = setup(MockBackend::new());
        let mut journal = Journal::new(backend.clone());

        let err = journal
            .add_data(fields(json!({"title": ["Orphan"]})))
            .unwrap_err();
        assert!(matches!(err, AdsError::Precondition(_)));

        let orphan = Article::from_data(backend, fields(json!({"year": "2001"})));
        assert!(journal.add_article(orphan).is_err());
        assert!(journal.is_empty());
    }

    #[tokio::test]
    async fn test_from_query_keeps_result_order() {
        let (mock, backend) = setup(MockBackend::new().with_query("year:2020", &["K3", "K1", "K2"]));
        let journal = Journal::from_query(backend, "year:2020", SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(order(&journal), vec!["K3", "K1", "K2"]);
        assert!(journal.get_index(0).unwrap().is_cached("title"));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_field_fetches_uncached_members() {
        let (mock, backend) = setup(MockBackend::new());
        let mut journal = Journal::from_bibcodes(backend, ["K1", "K2"]);
        journal
            .add_data(fields(json!({"bibcode": "K3", "year": "1999"})))
            .unwrap();

        let years = journal.field("year").await.unwrap();

        assert_eq!(years["K1"], json!("2020"));
        assert_eq!(years["K3"], json!("1999"));
        assert_eq!(years.keys().collect::<Vec<_>>(), vec!["K1", "K2", "K3"]);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_citation_count_dedupe() {
        let (mock, backend) = setup(MockBackend::new());
        let mut journal = Journal::from_data(
            backend,
            vec![
                fields(json!({"bibcode": "K1", "citation": ["X", "Y"]})),
                fields(json!({"bibcode": "K2", "citation": ["Y", "Z"]})),
            ],
        )
        .unwrap();

        assert_eq!(journal.citation_count(false).await.unwrap(), 4);
        assert_eq!(journal.citation_count(true).await.unwrap(), 3);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_reference_count_dedupe() {
        let (mock, backend) = setup(MockBackend::new());
        let mut journal = Journal::from_data(
            backend,
            vec![
                fields(json!({"bibcode": "K1", "reference": ["R1", "R2"]})),
                fields(json!({"bibcode": "K2", "reference": ["R2"]})),
                fields(json!({"bibcode": "K3", "reference": null})),
            ],
        )
        .unwrap();

        assert_eq!(journal.reference_count(false).await.unwrap(), 3);
        assert_eq!(mock.calls(), 0);

        // The key union needs K3's list, which is only known as null.
        assert_eq!(journal.reference_count(true).await.unwrap(), 2);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_references_per_member() {
        let (mock, backend) = setup(
            MockBackend::new()
                .with_query("references(bibcode:K1)", &["K4", "K5"])
                .with_query("references(bibcode:K2)", &["K5"]),
        );
        let mut journal = Journal::from_bibcodes(backend, ["K1", "K2"]);

        let refs = journal.references().await.unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs["K1"].len(), 2);
        assert_eq!(refs["K2"].len(), 1);

        journal.references().await.unwrap();
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_citations_per_member() {
        let (_mock, backend) = setup(MockBackend::new().with_query("citations(bibcode:K1)", &["K2"]));
        let mut journal = Journal::from_bibcodes(backend, ["K1"]);

        let cites = journal.citations().await.unwrap();
        assert_eq!(cites["K1"].bibcodes().collect::<Vec<_>>(), vec!["K2"]);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let (mock, backend) = setup(MockBackend::new());
        let mut journal = Journal::from_bibcodes(backend.clone(), ["K2", "K1", "K3"]);
        journal.get_mut("K1").unwrap().get("title").await.unwrap();
        let calls = mock.calls();

        let json = serde_json::to_string(&journal.snapshot()).unwrap();
        let restored = Journal::restore(backend, serde_json::from_str(&json).unwrap()).unwrap();

        assert_eq!(order(&restored), vec!["K2", "K1", "K3"]);
        assert_eq!(
            restored.get("K1").unwrap().cached("title"),
            Some(&json!(["Paper 1"]))
        );
        assert!(!restored.get("K2").unwrap().is_cached("title"));
        assert!(!restored.get("K3").unwrap().is_cached("title"));
        assert_eq!(restored.snapshot(), journal.snapshot());
        assert_eq!(mock.calls(), calls);
    }

    #[tokio::test]
    async fn test_pdf_needs_exactly_one_article() {
        let (_mock, backend) = setup(MockBackend::new());
        let many = Journal::from_bibcodes(backend.clone(), ["K1", "K2"]);
        assert!(matches!(many.pdf(), Err(AdsError::TypeMismatch(_))));

        let empty = Journal::new(backend.clone());
        assert!(matches!(empty.pdf(), Err(AdsError::TypeMismatch(_))));

        let one = Journal::from_bibcodes(backend, ["K1"]);
        assert_eq!(one.pdf().unwrap().bibcode(), "K1");
        assert_eq!(one.export().bibcodes(), &["K1".to_string()]);
    }

    #[tokio::test]
    async fn test_iteration_follows_insertion_order() {
        let (_mock, backend) = setup(MockBackend::new());
        let journal = Journal::from_bibcodes(backend, ["K3", "K1", "K2"]);

        let seen: Vec<_> = (&journal).into_iter().filter_map(Article::bibcode).collect();
        assert_eq!(seen, vec!["K3", "K1", "K2"]);
        assert!(journal.contains("K1"));
        assert!(!journal.contains("K9"));
    }
}
