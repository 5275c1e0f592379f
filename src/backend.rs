//! The remote search capability the lazy object model is built on.
//!
//! [`AdsClient`](crate::AdsClient) implements [`SearchBackend`] over HTTP;
//! tests substitute an in-memory implementation.

use crate::error::Result;
use crate::fields::Fields;
use async_trait::async_trait;
use std::sync::Arc;

/// One page request against the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Query in ADS syntax.
    pub query: String,
    /// Fields to return (`fl`).
    pub fields: Vec<String>,
    /// Optional filter query (`fq`).
    pub fq: Option<String>,
    /// Offset of the first record.
    pub start: usize,
    /// Maximum number of records on this page.
    pub rows: usize,
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Server-reported number of matches. Advisory: occasionally wrong,
    /// and `None` when the response carries no count.
    pub total: Option<u64>,
    /// Raw records, in server order.
    pub records: Vec<Fields>,
}

/// Search and single-record resolution.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Fetch one page of results.
    async fn search_page(&self, request: &PageRequest) -> Result<Page>;

    /// Look up one record by any identifier (bibcode, DOI, arXiv id) and
    /// return its default fields.
    async fn resolve(&self, identifier: &str) -> Result<Fields>;
}

/// A backend shared between articles and journals.
pub type SharedBackend = Arc<dyn SearchBackend>;
