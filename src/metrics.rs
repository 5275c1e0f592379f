//! Citation metrics endpoint.

use crate::client::AdsClient;
use crate::error::{AdsError, Result};
use crate::types::{Metrics, MetricsKind};

impl AdsClient {
    /// Citation metrics for a set of records.
    ///
    /// `kinds` selects the sections to compute; empty asks for all of them.
    pub async fn metrics<S: AsRef<str>>(&self, bibcodes: &[S], kinds: &[MetricsKind]) -> Result<Metrics> {
        let bibcodes: Vec<&str> = bibcodes.iter().map(AsRef::as_ref).collect();
        let mut body = serde_json::json!({ "bibcodes": bibcodes });
        if !kinds.is_empty() {
            let types: Vec<&str> = kinds.iter().map(MetricsKind::as_api_str).collect();
            body["types"] = serde_json::json!(types);
        }

        let response_body = self.post_json("/metrics", &body).await?;
        serde_json::from_str(&response_body)
            .map_err(|e| AdsError::Parse(format!("Invalid metrics response: {}", e)))
    }

    /// Per-record metrics breakdown, as returned by `/metrics/detail`.
    pub async fn metrics_detail<S: AsRef<str>>(&self, bibcodes: &[S]) -> Result<serde_json::Value> {
        let bibcodes: Vec<&str> = bibcodes.iter().map(AsRef::as_ref).collect();
        let body = serde_json::json!({ "bibcodes": bibcodes });

        let response_body = self.post_json("/metrics/detail", &body).await?;
        serde_json::from_str(&response_body)
            .map_err(|e| AdsError::Parse(format!("Invalid metrics response: {}", e)))
    }
}
