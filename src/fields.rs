//! The ADS field vocabulary.
//!
//! Field names are validated locally so a typo fails before any request is
//! sent. The list mirrors the fields the search endpoint returns; extend it
//! here when ADS adds one.

use crate::error::{AdsError, Result};

/// A record's field cache: field name to JSON value (string, list, number or null).
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// The field that identifies a record.
pub const KEY_FIELD: &str = "bibcode";

/// Fields requested when the caller asks for none.
pub const DEFAULT_FIELDS: &[&str] = &["abstract", "author", "bibcode", "pub", "pubdate", "title", "year"];

/// Every field name the search endpoint accepts in `fl`.
pub const KNOWN_FIELDS: &[&str] = &[
    "abstract",
    "ack",
    "aff",
    "aff_id",
    "alternate_bibcode",
    "alternative_title",
    "arxiv_class",
    "author",
    "author_count",
    "author_norm",
    "bibcode",
    "bibgroup",
    "bibstem",
    "body",
    "citation",
    "citation_count",
    "copyright",
    "data",
    "database",
    "date",
    "doctype",
    "doi",
    "eid",
    "entry_date",
    "esources",
    "first_author",
    "grant",
    "id",
    "identifier",
    "inst",
    "isbn",
    "issn",
    "issue",
    "keyword",
    "lang",
    "links_data",
    "nedid",
    "nedtype",
    "orcid_other",
    "orcid_pub",
    "orcid_user",
    "page",
    "page_count",
    "property",
    "pub",
    "pub_raw",
    "pubdate",
    "read_count",
    "reference",
    "simbid",
    "title",
    "vizier",
    "volume",
    "year",
];

/// Whether `field` is in the known vocabulary.
pub fn is_known(field: &str) -> bool {
    KNOWN_FIELDS.contains(&field)
}

/// Fail with [`AdsError::InvalidField`] on the first unknown field.
pub fn validate<S: AsRef<str>>(fields: &[S]) -> Result<()> {
    match fields.iter().find(|f| !is_known(f.as_ref())) {
        Some(bad) => Err(AdsError::InvalidField(bad.as_ref().to_string())),
        None => Ok(()),
    }
}

/// Split a comma separated field list, dropping blanks.
pub fn parse_field_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

/// The `fl` list actually sent: the default set when `requested` is empty,
/// always including the key field, without duplicates and in request order.
pub fn request_fields<S: AsRef<str>>(requested: &[S]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    let base: Vec<&str> = if requested.is_empty() {
        DEFAULT_FIELDS.to_vec()
    } else {
        requested.iter().map(AsRef::as_ref).collect()
    };
    for field in std::iter::once(KEY_FIELD).chain(base) {
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
    }
    fields
}
