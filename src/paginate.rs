//! Cursor-based pagination over the search endpoint.
//!
//! A [`Paginator`] requests one page at a time and only when the records of
//! the previous page have all been handed out, so abandoning it early never
//! costs another request. Errors surface from [`Paginator::next`] at the
//! point the failing page would have been consumed.
//!
//! ```no_run
//! # async fn example(client: &astroapi::AdsClient) -> astroapi::error::Result<()> {
//! use astroapi::SearchOptions;
//!
//! let options = SearchOptions::default()
//!     .with_fields(["title", "year"])
//!     .with_limit(100);
//! let records = client.query("author:\"^Farmer, R\"", options)?.collect_all().await?;
//! println!("{} records", records.len());
//! # Ok(())
//! # }
//! ```

use crate::backend::{PageRequest, SearchBackend};
use crate::error::{AdsError, Result};
use crate::fields::{self, Fields, KEY_FIELD};
use futures_util::stream::{self, Stream};
use serde_json::Value;
use std::collections::VecDeque;

/// Records requested per page unless overridden.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// How many records of the previous page each follow-up request re-reads.
///
/// ADS has been observed to shift results by one between pages; the overlap
/// re-reads the boundary record and the driver drops it again, so the
/// output never contains it twice.
pub const DEFAULT_PAGE_OVERLAP: usize = 1;

/// What to fetch and how to page through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Fields to request. Empty means [`fields::DEFAULT_FIELDS`].
    pub fields: Vec<String>,
    /// Optional filter query.
    pub fq: Option<String>,
    /// Maximum records to yield. `None` is unbounded.
    pub limit: Option<usize>,
    /// Records per request.
    pub page_size: usize,
    /// Records of the previous page re-read by each follow-up request.
    pub overlap: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            fq: None,
            limit: None,
            page_size: DEFAULT_PAGE_SIZE,
            overlap: DEFAULT_PAGE_OVERLAP,
        }
    }
}

impl SearchOptions {
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fq(mut self, fq: impl Into<String>) -> Self {
        self.fq = Some(fq.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Map the `-1 means unbounded` convention onto [`limit`](Self::limit).
    pub fn with_signed_limit(mut self, limit: i64) -> Self {
        self.limit = usize::try_from(limit).ok();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }
}

/// Lazily pages through the results of one query.
pub struct Paginator<'a> {
    backend: &'a dyn SearchBackend,
    query: String,
    fields: Vec<String>,
    fq: Option<String>,
    limit: Option<usize>,
    page_size: usize,
    overlap: usize,
    offset: usize,
    accepted: usize,
    total: Option<u64>,
    pages: usize,
    buffer: VecDeque<Fields>,
    recent: VecDeque<String>,
    done: bool,
}

impl<'a> Paginator<'a> {
    /// Validate the options and prepare the first request. No request is
    /// sent until [`next`](Self::next) is called.
    pub fn new(
        backend: &'a dyn SearchBackend,
        query: impl Into<String>,
        options: SearchOptions,
    ) -> Result<Self> {
        fields::validate(&options.fields)?;

        let page_size = options.page_size.max(1);
        Ok(Self {
            backend,
            query: query.into(),
            fields: fields::request_fields(&options.fields),
            fq: options.fq.filter(|fq| !fq.is_empty()),
            limit: options.limit,
            page_size,
            overlap: options.overlap.min(page_size - 1),
            offset: 0,
            accepted: 0,
            total: None,
            pages: 0,
            buffer: VecDeque::new(),
            recent: VecDeque::new(),
            done: options.limit == Some(0),
        })
    }

    /// The query being paged through.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Fields every yielded record carries (missing ones are `null`).
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Total reported by the most recent page, if it carried one.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Number of page requests issued so far.
    pub fn pages_requested(&self) -> usize {
        self.pages
    }

    /// Next record, fetching a new page when the current one is used up.
    ///
    /// Returns `None` once the results are exhausted or the limit is hit,
    /// and after the first error.
    pub async fn next(&mut self) -> Option<Result<Fields>> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.fetch_page().await {
                self.done = true;
                return Some(Err(err));
            }
        }
    }

    /// Drain every remaining record, stopping at the first error.
    pub async fn collect_all(mut self) -> Result<Vec<Fields>> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await {
            records.push(record?);
        }
        Ok(records)
    }

    /// Adapt into a [`Stream`]. Dropping the stream stops paging.
    pub fn into_stream(self) -> impl Stream<Item = Result<Fields>> + 'a {
        stream::unfold(self, |mut pages| async move {
            let item = pages.next().await?;
            Some((item, pages))
        })
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let window = self.recent.len();
        let rows = match self.limit {
            Some(limit) => self
                .page_size
                .min(limit.saturating_sub(self.accepted) + window),
            None => self.page_size,
        };
        let request = PageRequest {
            query: self.query.clone(),
            fields: self.fields.clone(),
            fq: self.fq.clone(),
            start: self.offset,
            rows,
        };

        tracing::debug!(query = %self.query, start = self.offset, rows, "requesting page");
        let page = match self.backend.search_page(&request).await {
            Ok(page) => page,
            // Only the first page may report "not found" as an error; later
            // it just means the server ran out before its own total.
            Err(AdsError::NotFound(message)) if self.pages > 0 => {
                tracing::warn!(
                    query = %self.query,
                    start = self.offset,
                    %message,
                    "page reported not found, ending results"
                );
                self.done = true;
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        self.pages += 1;
        self.total = page.total;

        let received = page.records.len();
        let mut fresh = 0;
        for raw in page.records {
            if self.limit.is_some_and(|limit| self.accepted >= limit) {
                break;
            }
            let record = normalize(raw, &self.fields);
            if let Some(key) = record.get(KEY_FIELD).and_then(Value::as_str) {
                if self.recent.iter().any(|seen| seen == key) {
                    continue;
                }
                let key = key.to_string();
                self.remember(key);
            }
            self.buffer.push_back(record);
            self.accepted += 1;
            fresh += 1;
        }

        tracing::debug!(
            query = %self.query,
            received,
            fresh,
            accepted = self.accepted,
            total = ?page.total,
            "page received"
        );

        if received == 0 || fresh == 0 {
            self.done = true;
        } else if page.total.is_some_and(|total| self.accepted as u64 >= total) {
            self.done = true;
        } else if self.limit.is_some_and(|limit| self.accepted >= limit) {
            self.done = true;
        } else {
            self.offset = self.accepted.saturating_sub(self.overlap);
        }
        Ok(())
    }

    fn remember(&mut self, key: String) {
        if self.overlap == 0 {
            return;
        }
        if self.recent.len() == self.overlap {
            self.recent.pop_front();
        }
        self.recent.push_back(key);
    }
}

impl std::fmt::Debug for Paginator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("query", &self.query)
            .field("offset", &self.offset)
            .field("accepted", &self.accepted)
            .field("total", &self.total)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

/// Build a new record holding every requested field, `null` where the
/// server left one out, followed by whatever else it sent.
fn normalize(mut raw: Fields, requested: &[String]) -> Fields {
    let mut record = Fields::new();
    for field in requested {
        let value = raw.remove(field).unwrap_or(Value::Null);
        record.insert(field.clone(), value);
    }
    record.extend(raw);
    record
}
