//! ADS API response parsing.

use crate::backend::Page;
use crate::error::{AdsError, Result};
use crate::fields::Fields;
use serde::Deserialize;
use std::collections::BTreeMap;

/// ADS API search response wrapper.
#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<Fields>,
    #[serde(rename = "numFound", default)]
    num_found: Option<u64>,
}

/// ADS export response.
#[derive(Debug, Deserialize)]
struct ExportEnvelope {
    export: String,
}

#[derive(Debug, Deserialize)]
struct ResolverEnvelope {
    links: Option<ResolverLinks>,
}

#[derive(Debug, Deserialize)]
struct ResolverLinks {
    #[serde(default)]
    records: Vec<ResolverRecord>,
}

#[derive(Debug, Deserialize)]
struct ResolverRecord {
    link_type: String,
    url: String,
}

/// Parse an ADS `/search/query` JSON response into a [`Page`].
///
/// Documents are kept as raw field maps; nothing is dropped.
pub fn parse_search_page(json: &str) -> Result<Page> {
    let envelope: SearchEnvelope = serde_json::from_str(json)
        .map_err(|e| AdsError::Parse(format!("Invalid ADS JSON: {}", e)))?;

    Ok(Page {
        total: envelope.response.num_found,
        records: envelope.response.docs,
    })
}

/// Parse an ADS export JSON response.
pub fn parse_export_response(json: &str) -> Result<String> {
    let response: ExportEnvelope = serde_json::from_str(json)
        .map_err(|e| AdsError::Parse(format!("Invalid export response: {}", e)))?;
    Ok(response.export)
}

/// Parse a `/resolver/<bibcode>/esource` response into link type → URL.
pub fn parse_esource_links(json: &str, bibcode: &str) -> Result<BTreeMap<String, String>> {
    let response: ResolverEnvelope = serde_json::from_str(json)
        .map_err(|e| AdsError::Parse(format!("Invalid resolver response: {}", e)))?;

    let links = response
        .links
        .ok_or_else(|| AdsError::NotFound(format!("No pdf links available for {}", bibcode)))?;

    Ok(links
        .records
        .into_iter()
        .map(|record| (record.link_type, record.url))
        .collect())
}

/// Extract an arXiv ID from an ADS identifier array.
pub fn extract_arxiv_id<S: AsRef<str>>(identifiers: &[S]) -> Option<String> {
    identifiers.iter().map(AsRef::as_ref).find_map(|id| {
        if let Some(stripped) = id.strip_prefix("arXiv:") {
            Some(stripped.to_string())
        } else if is_bare_new_arxiv_id(id) {
            Some(id.to_string())
        } else {
            None
        }
    })
}

/// Extract the first DOI from an ADS identifier array.
pub fn extract_doi<S: AsRef<str>>(identifiers: &[S]) -> Option<String> {
    identifiers
        .iter()
        .map(AsRef::as_ref)
        .find(|id| id.starts_with("10.") && id.contains('/') && !id.contains("arXiv"))
        .map(String::from)
}

/// Check if a string is a bare new-format arXiv ID: YYMM.NNNNN(vN).
///
/// Must NOT match DOIs (10.1086/300151) or bibcodes (1999AJ....117.2063K).
fn is_bare_new_arxiv_id(s: &str) -> bool {
    let base = match s.rfind('v') {
        Some(v_pos) if v_pos > 0 && s[v_pos + 1..].chars().all(|c| c.is_ascii_digit()) => {
            &s[..v_pos]
        }
        _ => s,
    };

    match base.split_once('.') {
        Some((prefix, suffix)) => {
            prefix.len() == 4
                && prefix.chars().all(|c| c.is_ascii_digit())
                && (suffix.len() == 4 || suffix.len() == 5)
                && suffix.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}
