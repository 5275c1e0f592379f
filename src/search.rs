//! Search endpoint: the HTTP implementation of [`SearchBackend`].

use crate::backend::{Page, PageRequest, SearchBackend};
use crate::client::AdsClient;
use crate::error::{AdsError, Result};
use crate::fields::{self, Fields};
use crate::paginate::{Paginator, SearchOptions};
use crate::parse::parse_search_page;
use async_trait::async_trait;

/// Query matching one record by bibcode.
pub fn bibcode_query(bibcode: &str) -> String {
    format!("bibcode:{}", bibcode)
}

/// Query for the papers `bibcode` references.
pub fn references_query(bibcode: &str) -> String {
    format!("references(bibcode:{})", bibcode)
}

/// Query for the papers citing `bibcode`.
pub fn citations_query(bibcode: &str) -> String {
    format!("citations(bibcode:{})", bibcode)
}

/// Query matching any identifier (bibcode, alternate bibcode, DOI, arXiv id).
pub fn identifier_query(identifier: &str) -> String {
    format!("identifier:\"{}\"", identifier)
}

impl AdsClient {
    /// Page lazily through the results of `query`.
    ///
    /// Uses ADS query syntax: `author:"^Einstein" year:1905`, `title:"dark matter"`, etc.
    /// Unknown field names fail here, before anything is sent.
    pub fn query(&self, query: &str, options: SearchOptions) -> Result<Paginator<'_>> {
        Paginator::new(self, query, options)
    }

    /// Fetch a single page of raw results.
    pub async fn search_page(&self, request: &PageRequest) -> Result<Page> {
        let fl = request.fields.join(",");
        let start = request.start.to_string();
        let rows = request.rows.to_string();

        let mut params = vec![
            ("q", request.query.as_str()),
            ("fl", fl.as_str()),
            ("start", start.as_str()),
            ("rows", rows.as_str()),
        ];
        if let Some(fq) = &request.fq {
            params.push(("fq", fq.as_str()));
        }

        let body = self.get("/search/query", &params).await?;
        parse_search_page(&body)
    }
}

#[async_trait]
impl SearchBackend for AdsClient {
    async fn search_page(&self, request: &PageRequest) -> Result<Page> {
        AdsClient::search_page(self, request).await
    }

    async fn resolve(&self, identifier: &str) -> Result<Fields> {
        let request = PageRequest {
            query: identifier_query(identifier),
            fields: fields::request_fields::<&str>(&[]),
            fq: None,
            start: 0,
            rows: 1,
        };
        AdsClient::search_page(self, &request)
            .await?
            .records
            .into_iter()
            .next()
            .ok_or_else(|| AdsError::NotFound(format!("No record for identifier {}", identifier)))
    }
}
