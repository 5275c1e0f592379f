//! Proxies bound to the bibcodes of an [`Article`](crate::Article) or
//! [`Journal`](crate::Journal).
//!
//! Handles hold only keys. Each call takes the [`AdsClient`] to send the
//! request through, so a handle can outlive the record it came from.

use crate::client::AdsClient;
use crate::error::{AdsError, Result};
use crate::types::{ExportFormat, Metrics, MetricsKind, PdfSource};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Citation export for a fixed set of bibcodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportHandle {
    bibcodes: Vec<String>,
}

impl ExportHandle {
    pub fn new(bibcodes: Vec<String>) -> Self {
        Self { bibcodes }
    }

    pub fn bibcodes(&self) -> &[String] {
        &self.bibcodes
    }

    pub async fn format(&self, client: &AdsClient, format: ExportFormat) -> Result<String> {
        client.export(self.bibcodes.as_slice(), format).await
    }

    pub async fn bibtex(&self, client: &AdsClient) -> Result<String> {
        self.format(client, ExportFormat::BibTeX).await
    }
}

/// Citation metrics for a fixed set of bibcodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsHandle {
    bibcodes: Vec<String>,
}

impl MetricsHandle {
    pub fn new(bibcodes: Vec<String>) -> Self {
        Self { bibcodes }
    }

    pub fn bibcodes(&self) -> &[String] {
        &self.bibcodes
    }

    /// The requested metric sections; empty means all.
    pub async fn fetch(&self, client: &AdsClient, kinds: &[MetricsKind]) -> Result<Metrics> {
        client.metrics(self.bibcodes.as_slice(), kinds).await
    }

    pub async fn detail(&self, client: &AdsClient) -> Result<Value> {
        client.metrics_detail(self.bibcodes.as_slice()).await
    }
}

/// Network visualizations for a fixed set of bibcodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualHandle {
    bibcodes: Vec<String>,
}

impl VisualHandle {
    pub fn new(bibcodes: Vec<String>) -> Self {
        Self { bibcodes }
    }

    pub fn bibcodes(&self) -> &[String] {
        &self.bibcodes
    }

    pub async fn author_network(&self, client: &AdsClient) -> Result<Value> {
        client.author_network(self.bibcodes.as_slice()).await
    }

    pub async fn paper_network(&self, client: &AdsClient) -> Result<Value> {
        client.paper_network(self.bibcodes.as_slice()).await
    }
}

/// Full-text access for exactly one bibcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHandle {
    bibcode: String,
}

impl PdfHandle {
    /// Fails with [`AdsError::TypeMismatch`] unless given exactly one bibcode.
    pub fn new(bibcodes: &[String]) -> Result<Self> {
        match bibcodes {
            [bibcode] => Ok(Self {
                bibcode: bibcode.clone(),
            }),
            _ => Err(AdsError::TypeMismatch(format!(
                "full text is available for a single record, got {}",
                bibcodes.len()
            ))),
        }
    }

    pub fn bibcode(&self) -> &str {
        &self.bibcode
    }

    /// Default file name for the download.
    pub fn filename(&self) -> String {
        format!("{}.pdf", self.bibcode)
    }

    /// Every full-text link the resolver knows, keyed by link type.
    pub async fn links(&self, client: &AdsClient) -> Result<BTreeMap<String, String>> {
        client.esource_links(&self.bibcode).await
    }

    /// The URL of the PDF from `source`.
    pub async fn url(&self, client: &AdsClient, source: PdfSource) -> Result<String> {
        self.links(client)
            .await?
            .remove(source.link_type())
            .ok_or_else(|| {
                AdsError::NotFound(format!(
                    "No {} pdf available for {}",
                    source.label(),
                    self.bibcode
                ))
            })
    }

    /// Download the PDF from `source`.
    ///
    /// `destination` may be a file path or a directory; by default the file
    /// is written to the working directory as `<bibcode>.pdf`. Returns the
    /// path written.
    pub async fn download(
        &self,
        client: &AdsClient,
        source: PdfSource,
        destination: Option<&Path>,
    ) -> Result<PathBuf> {
        let url = self.url(client, source).await?;
        let bytes = client.get_bytes(&url).await?;
        if looks_like_html(&bytes) {
            return Err(AdsError::Download(format!(
                "{} returned a web page instead of a pdf (captcha or paywall)",
                url
            )));
        }

        let path = match destination {
            Some(dest) if dest.is_dir() => dest.join(self.filename()),
            Some(dest) => dest.to_path_buf(),
            None => PathBuf::from(self.filename()),
        };
        tokio::fs::write(&path, &bytes).await?;
        tracing::info!(bibcode = %self.bibcode, path = %path.display(), bytes = bytes.len(), "pdf saved");
        Ok(path)
    }
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(64)];
    let head = String::from_utf8_lossy(head).trim_start().to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}
