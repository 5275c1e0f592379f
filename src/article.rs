//! A single bibliographic record whose fields are fetched on first access.
//!
//! Creating an [`Article`] from a bibcode costs nothing; the first
//! [`get`](Article::get) of a field that is not cached sends one
//! single-result query for that field plus whichever default fields are
//! still missing, and merges the answer into the cache. Cached fields are
//! never overwritten except by [`refresh`](Article::refresh).

use crate::backend::{SearchBackend, SharedBackend};
use crate::error::{AdsError, Result};
use crate::fields::{self, Fields, DEFAULT_FIELDS, KEY_FIELD};
use crate::handles::{ExportHandle, MetricsHandle, PdfHandle, VisualHandle};
use crate::journal::Journal;
use crate::paginate::{Paginator, SearchOptions};
use crate::parse::{extract_arxiv_id, extract_doi};
use crate::search::{bibcode_query, citations_query, references_query};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Persisted state of an [`Article`]: its key and its field cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSnapshot {
    pub bibcode: Option<String>,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy)]
enum Link {
    References,
    Citations,
}

impl Link {
    fn cached_field(self) -> &'static str {
        match self {
            Link::References => "reference",
            Link::Citations => "citation",
        }
    }

    fn query(self, bibcode: &str) -> String {
        match self {
            Link::References => references_query(bibcode),
            Link::Citations => citations_query(bibcode),
        }
    }
}

/// One bibliographic record with a lazily populated field cache.
///
/// Two articles are equal when their bibcodes are, whatever else they have
/// cached.
#[derive(Clone)]
pub struct Article {
    backend: SharedBackend,
    bibcode: Option<String>,
    fields: Fields,
    references: Option<Journal>,
    citations: Option<Journal>,
}

impl Article {
    /// An article known only by its bibcode. Nothing is fetched.
    pub fn new(backend: SharedBackend, bibcode: impl Into<String>) -> Self {
        let bibcode = bibcode.into();
        let mut fields = Fields::new();
        fields.insert(KEY_FIELD.to_string(), Value::String(bibcode.clone()));
        Self {
            backend,
            bibcode: Some(bibcode),
            fields,
            references: None,
            citations: None,
        }
    }

    /// An article from an already fetched field map. The bibcode is taken
    /// from the map when present.
    pub fn from_data(backend: SharedBackend, data: Fields) -> Self {
        let bibcode = data.get(KEY_FIELD).and_then(Value::as_str).map(String::from);
        Self {
            backend,
            bibcode,
            fields: data,
            references: None,
            citations: None,
        }
    }

    /// The first record matching `query`, with the default fields.
    pub async fn from_query(backend: SharedBackend, query: &str) -> Result<Self> {
        let options = SearchOptions::default().with_limit(1);
        let first = Paginator::new(backend.as_ref(), query, options)?.next().await;
        match first {
            Some(record) => Ok(Self::from_data(backend, record?)),
            None => Err(AdsError::NotFound(format!("No records for query {}", query))),
        }
    }

    /// Look up an article by DOI, arXiv id or bibcode.
    pub async fn from_identifier(backend: SharedBackend, identifier: &str) -> Result<Self> {
        let data = backend.resolve(identifier).await?;
        if data.get(KEY_FIELD).and_then(Value::as_str).is_none() {
            return Err(AdsError::Parse(format!(
                "record for {} has no bibcode",
                identifier
            )));
        }
        Ok(Self::from_data(backend, data))
    }

    /// Rebuild an article from a snapshot without touching the network.
    ///
    /// The snapshot's key wins over a conflicting `bibcode` in its fields.
    pub fn restore(backend: SharedBackend, snapshot: ArticleSnapshot) -> Self {
        let mut fields = snapshot.fields;
        let bibcode = snapshot
            .bibcode
            .or_else(|| fields.get(KEY_FIELD).and_then(Value::as_str).map(String::from));
        if let Some(bibcode) = &bibcode {
            fields.insert(KEY_FIELD.to_string(), Value::String(bibcode.clone()));
        }
        Self {
            backend,
            bibcode,
            fields,
            references: None,
            citations: None,
        }
    }

    /// Capture the key and the field cache.
    pub fn snapshot(&self) -> ArticleSnapshot {
        ArticleSnapshot {
            bibcode: self.bibcode.clone(),
            fields: self.fields.clone(),
        }
    }

    pub fn bibcode(&self) -> Option<&str> {
        self.bibcode.as_deref()
    }

    /// Every cached field.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }

    pub fn is_cached(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// A cached value, without fetching.
    pub fn cached(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    fn require_bibcode(&self) -> Result<&str> {
        self.bibcode.as_deref().ok_or_else(|| {
            AdsError::Precondition("Bibcode must be set before fetching fields".to_string())
        })
    }

    /// The value of `field`, fetching it on first access.
    ///
    /// Fields the server does not have for this record are cached as `null`.
    pub async fn get(&mut self, field: &str) -> Result<&Value> {
        if !self.fields.contains_key(field) {
            self.fetch(field).await?;
        }
        self.fields
            .get(field)
            .ok_or_else(|| AdsError::NotFound(format!("field {} missing from response", field)))
    }

    async fn fetch(&mut self, field: &str) -> Result<()> {
        let bibcode = self.require_bibcode()?.to_string();

        let mut wanted = vec![field.to_string()];
        wanted.extend(
            DEFAULT_FIELDS
                .iter()
                .filter(|f| **f != field && !self.fields.contains_key(**f))
                .map(|f| f.to_string()),
        );

        tracing::debug!(%bibcode, %field, "fetching fields");
        let record = lookup(self.backend.as_ref(), &bibcode, wanted).await?;
        for (name, value) in record {
            self.fields.entry(name).or_insert(value);
        }
        Ok(())
    }

    /// Re-fetch the default fields and every cached field, overwriting the
    /// cache, and forget memoized references and citations.
    pub async fn refresh(&mut self) -> Result<()> {
        let bibcode = self.require_bibcode()?.to_string();

        let mut wanted: Vec<String> = DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect();
        for name in self.fields.keys() {
            if fields::is_known(name) && !wanted.contains(name) {
                wanted.push(name.clone());
            }
        }

        tracing::debug!(%bibcode, "refreshing fields");
        let record = lookup(self.backend.as_ref(), &bibcode, wanted).await?;
        for (name, value) in record {
            if name != KEY_FIELD {
                self.fields.insert(name, value);
            }
        }
        self.references = None;
        self.citations = None;
        Ok(())
    }

    /// First entry of the (list valued) title.
    pub async fn title(&mut self) -> Result<Option<&str>> {
        Ok(first_str(self.get("title").await?))
    }

    pub async fn authors(&mut self) -> Result<Vec<&str>> {
        Ok(str_list(self.get("author").await?))
    }

    pub async fn first_author(&mut self) -> Result<Option<&str>> {
        Ok(first_str(self.get("author").await?))
    }

    /// Publication year; ADS sends it as a string.
    pub async fn year(&mut self) -> Result<Option<u16>> {
        let value = self.get("year").await?;
        Ok(match value {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_u64().and_then(|y| u16::try_from(y).ok()),
            _ => None,
        })
    }

    /// Abstract text, empty when the record has none.
    pub async fn abstract_text(&mut self) -> Result<&str> {
        Ok(self.get("abstract").await?.as_str().unwrap_or(""))
    }

    /// Journal or publication name.
    pub async fn publication(&mut self) -> Result<Option<&str>> {
        Ok(self.get("pub").await?.as_str())
    }

    /// Journal abbreviation, e.g. `ApJ`.
    pub async fn bibstem(&mut self) -> Result<Option<&str>> {
        Ok(first_str(self.get("bibstem").await?))
    }

    /// `"<first author> <year>"`, for short listings.
    pub async fn name(&mut self) -> Result<String> {
        let author = self.first_author().await?.unwrap_or("").to_string();
        let year = self.year().await?.map(|y| y.to_string()).unwrap_or_default();
        Ok(format!("{} {}", author, year).trim().to_string())
    }

    pub fn ads_url(&self) -> Option<String> {
        self.bibcode
            .as_ref()
            .map(|b| format!("https://ui.adsabs.harvard.edu/abs/{}", b))
    }

    /// Default file name for a downloaded PDF.
    pub fn filename(&self) -> Option<String> {
        self.bibcode.as_ref().map(|b| format!("{}.pdf", b))
    }

    pub async fn arxiv_url(&mut self) -> Result<Option<String>> {
        let identifiers = str_list(self.get("identifier").await?);
        Ok(extract_arxiv_id(&identifiers).map(|id| format!("https://arxiv.org/abs/{}", id)))
    }

    pub async fn doi_url(&mut self) -> Result<Option<String>> {
        let identifiers = str_list(self.get("identifier").await?);
        Ok(extract_doi(&identifiers).map(|doi| format!("https://doi.org/{}", doi)))
    }

    /// Papers this article references.
    ///
    /// Built from the cached `reference` list when there is one, otherwise
    /// queried once and memoized for the life of this article.
    pub async fn references(&mut self) -> Result<&Journal> {
        let journal = match self.references.take() {
            Some(journal) => journal,
            None => self.linked(Link::References).await?,
        };
        let journal: &Journal = self.references.insert(journal);
        Ok(journal)
    }

    /// Papers citing this article. Memoized like [`references`](Self::references).
    pub async fn citations(&mut self) -> Result<&Journal> {
        let journal = match self.citations.take() {
            Some(journal) => journal,
            None => self.linked(Link::Citations).await?,
        };
        let journal: &Journal = self.citations.insert(journal);
        Ok(journal)
    }

    pub fn cached_references(&self) -> Option<&Journal> {
        self.references.as_ref()
    }

    pub fn cached_citations(&self) -> Option<&Journal> {
        self.citations.as_ref()
    }

    async fn linked(&self, link: Link) -> Result<Journal> {
        if let Some(Value::Array(keys)) = self.fields.get(link.cached_field()) {
            return Ok(Journal::from_bibcodes(
                Arc::clone(&self.backend),
                keys.iter().filter_map(Value::as_str),
            ));
        }

        let query = link.query(self.require_bibcode()?);
        tracing::debug!(%query, "loading linked records");
        Journal::from_query(Arc::clone(&self.backend), &query, SearchOptions::default()).await
    }

    /// Number of references.
    ///
    /// Answered from the cached `reference` field when present (`null`
    /// counts as zero); otherwise the references are loaded.
    pub async fn reference_count(&mut self) -> Result<usize> {
        let cached = self
            .fields
            .get("reference")
            .map(|v| v.as_array().map_or(0, Vec::len));
        match cached {
            Some(count) => Ok(count),
            None => Ok(self.references().await?.len()),
        }
    }

    /// Number of citations, from `citation_count` or a cached `citation`
    /// list, fetching `citation_count` when neither is known.
    pub async fn citation_count(&mut self) -> Result<usize> {
        if let Some(count) = self.fields.get("citation_count").and_then(Value::as_u64) {
            return Ok(count as usize);
        }
        if let Some(list) = self.fields.get("citation") {
            return Ok(list.as_array().map_or(0, Vec::len));
        }
        let value = self.get("citation_count").await?;
        Ok(value.as_u64().map_or(0, |n| n as usize))
    }

    /// Export proxy for this article.
    pub fn export(&self) -> Result<ExportHandle> {
        Ok(ExportHandle::new(vec![self.require_bibcode()?.to_string()]))
    }

    /// Metrics proxy for this article.
    pub fn metrics(&self) -> Result<MetricsHandle> {
        Ok(MetricsHandle::new(vec![self.require_bibcode()?.to_string()]))
    }

    /// Visualization proxy for this article.
    pub fn visual(&self) -> Result<VisualHandle> {
        Ok(VisualHandle::new(vec![self.require_bibcode()?.to_string()]))
    }

    /// Full-text proxy for this article.
    pub fn pdf(&self) -> Result<PdfHandle> {
        PdfHandle::new(&[self.require_bibcode()?.to_string()])
    }
}

/// Single-result query for one bibcode.
async fn lookup(backend: &dyn SearchBackend, bibcode: &str, fields: Vec<String>) -> Result<Fields> {
    let options = SearchOptions::default().with_fields(fields).with_limit(1);
    let mut pages = Paginator::new(backend, bibcode_query(bibcode), options)?;
    match pages.next().await {
        Some(record) => record,
        None => Err(AdsError::NotFound(format!("No record for bibcode {}", bibcode))),
    }
}

fn first_str(value: &Value) -> Option<&str> {
    match value {
        Value::Array(items) => items.first().and_then(Value::as_str),
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}

fn str_list(value: &Value) -> Vec<&str> {
    match value {
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        Value::String(s) => vec![s.as_str()],
        _ => Vec::new(),
    }
}

impl PartialEq for Article {
    fn eq(&self, other: &Self) -> bool {
        self.bibcode == other.bibcode
    }
}

impl Eq for Article {}

impl Hash for Article {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bibcode.hash(state);
    }
}

impl std::fmt::Display for Article {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.bibcode.as_deref().unwrap_or(""))
    }
}

impl std::fmt::Debug for Article {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Article")
            .field("bibcode", &self.bibcode)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
