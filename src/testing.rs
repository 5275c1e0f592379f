//! In-memory search backend for unit tests.

use crate::backend::{Page, PageRequest, SearchBackend};
use crate::error::{AdsError, Result};
use crate::fields::{Fields, DEFAULT_FIELDS};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Serves a small corpus (or scripted pages) and records every call.
///
/// Queries of the form `bibcode:<key>` match by key, `*:*` matches the whole
/// corpus, and any other query must be registered with [`with_query`].
/// Scripted pages are served first, in order, regardless of the request.
///
/// [`with_query`]: MockBackend::with_query
#[derive(Default)]
pub(crate) struct MockBackend {
    corpus: Vec<Fields>,
    queries: HashMap<String, Vec<String>>,
    script: Mutex<VecDeque<Result<Page>>>,
    requests: Mutex<Vec<PageRequest>>,
    resolves: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, records: Vec<Fields>) -> Self {
        self.corpus.extend(records);
        self
    }

    pub fn with_query(mut self, query: &str, bibcodes: &[&str]) -> Self {
        self.queries.insert(
            query.to_string(),
            bibcodes.iter().map(|b| b.to_string()).collect(),
        );
        self
    }

    pub fn with_script(self, pages: Vec<Result<Page>>) -> Self {
        self.script.lock().unwrap().extend(pages);
        self
    }

    /// Every page request seen so far.
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of network calls of any kind.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len() + self.resolves.lock().unwrap().len()
    }

    fn find(&self, key: &str) -> Option<&Fields> {
        self.corpus
            .iter()
            .find(|r| r.get("bibcode").and_then(Value::as_str) == Some(key))
    }
}

/// Keep only the requested fields the record actually has.
fn project<S: AsRef<str>>(record: &Fields, fields: &[S]) -> Fields {
    fields
        .iter()
        .filter_map(|f| {
            record
                .get(f.as_ref())
                .map(|v| (f.as_ref().to_string(), v.clone()))
        })
        .collect()
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn search_page(&self, request: &PageRequest) -> Result<Page> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(scripted) = self.script.lock().unwrap().pop_front() {
            return scripted;
        }

        let matches: Vec<&Fields> = match request.query.strip_prefix("bibcode:") {
            Some(key) => self.find(key).into_iter().collect(),
            None => match self.queries.get(&request.query) {
                Some(keys) => keys.iter().filter_map(|k| self.find(k)).collect(),
                None if request.query == "*:*" => self.corpus.iter().collect(),
                None => Vec::new(),
            },
        };

        Ok(Page {
            total: Some(matches.len() as u64),
            records: matches
                .into_iter()
                .skip(request.start)
                .take(request.rows)
                .map(|r| project(r, &request.fields))
                .collect(),
        })
    }

    async fn resolve(&self, identifier: &str) -> Result<Fields> {
        self.resolves.lock().unwrap().push(identifier.to_string());

        self.corpus
            .iter()
            .find(|r| {
                r.get("bibcode").and_then(Value::as_str) == Some(identifier)
                    || r.get("identifier")
                        .and_then(Value::as_array)
                        .is_some_and(|ids| ids.iter().any(|id| id.as_str() == Some(identifier)))
            })
            .map(|r| project(r, DEFAULT_FIELDS))
            .ok_or_else(|| AdsError::NotFound(identifier.to_string()))
    }
}

/// Turn a `json!({...})` literal into a field map.
pub(crate) fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// `count` records keyed `K1..Kn`, each with a title and year.
pub(crate) fn numbered_records(count: usize) -> Vec<Fields> {
    (1..=count)
        .map(|i| {
            fields(serde_json::json!({
                "bibcode": format!("K{}", i),
                "title": [format!("Paper {}", i)],
                "year": "2020",
            }))
        })
        .collect()
}

/// A scripted page of `keys` with the given reported total.
pub(crate) fn page(keys: &[&str], total: u64) -> Result<Page> {
    Ok(Page {
        total: Some(total),
        records: keys
            .iter()
            .map(|k| fields(serde_json::json!({ "bibcode": k, "title": [format!("Title {}", k)] })))
            .collect(),
    })
}
