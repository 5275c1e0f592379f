//! Citation export endpoint.

use crate::client::AdsClient;
use crate::error::{AdsError, Result};
use crate::parse::parse_export_response;
use crate::types::ExportFormat;

impl AdsClient {
    /// Export records in the given citation format.
    pub async fn export<S: AsRef<str>>(&self, bibcodes: &[S], format: ExportFormat) -> Result<String> {
        if bibcodes.is_empty() {
            return Err(AdsError::Precondition("nothing to export".to_string()));
        }
        let bibcodes: Vec<&str> = bibcodes.iter().map(AsRef::as_ref).collect();
        let body = serde_json::json!({ "bibcode": bibcodes });

        let path = format!("/export/{}", format.as_api_str());
        let response_body = self.post_json(&path, &body).await?;
        parse_export_response(&response_body)
    }

    /// Convenience: export as BibTeX.
    pub async fn export_bibtex<S: AsRef<str>>(&self, bibcodes: &[S]) -> Result<String> {
        self.export(bibcodes, ExportFormat::BibTeX).await
    }
}
