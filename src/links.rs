//! Link resolver endpoint.

use crate::client::AdsClient;
use crate::error::{AdsError, Result};
use crate::parse::parse_esource_links;
use std::collections::BTreeMap;

impl AdsClient {
    /// Resolve links for a record.
    ///
    /// `link_type` can be "esource", "data", "citation", "reference",
    /// "coreads", or `None` for all of them.
    pub async fn resolve_links(&self, bibcode: &str, link_type: Option<&str>) -> Result<serde_json::Value> {
        let path = match link_type {
            Some(lt) => format!("/resolver/{}/{}", bibcode, lt),
            None => format!("/resolver/{}", bibcode),
        };

        let response_body = self.get(&path, &[]).await?;
        serde_json::from_str(&response_body)
            .map_err(|e| AdsError::Parse(format!("Invalid links response: {}", e)))
    }

    /// Full-text sources for a record, keyed by resolver link type
    /// (`ESOURCE|PUB_PDF`, `ESOURCE|EPRINT_PDF`, ...).
    pub async fn esource_links(&self, bibcode: &str) -> Result<BTreeMap<String, String>> {
        let path = format!("/resolver/{}/esource", bibcode);
        let response_body = self.get(&path, &[]).await?;
        parse_esource_links(&response_body, bibcode)
    }
}
