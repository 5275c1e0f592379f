//! Public value types shared by the endpoint wrappers.

use serde::{Deserialize, Serialize};

/// An author name split out of the ADS "Last, First M." format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Raw name as returned by ADS.
    pub name: String,
    /// Family (last) name.
    pub family_name: String,
    /// Given (first) name and initials.
    pub given_name: Option<String>,
}

impl Author {
    /// Parse an author name in ADS format ("Last, First M.").
    pub fn from_ads_format(name: &str) -> Self {
        match name.split_once(',') {
            Some((family, given)) => Author {
                name: name.to_string(),
                family_name: family.trim().to_string(),
                given_name: Some(given.trim().to_string()).filter(|g| !g.is_empty()),
            },
            None => Author {
                name: name.to_string(),
                family_name: name.trim().to_string(),
                given_name: None,
            },
        }
    }

    /// Format as "First M. Last" for display.
    pub fn display_name(&self) -> String {
        match &self.given_name {
            Some(given) => format!("{} {}", given, self.family_name),
            None => self.family_name.clone(),
        }
    }
}

/// Citation export formats supported by ADS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Ads,
    BibTeX,
    BibTeXAbs,
    AasTex,
    Icarus,
    Mnras,
    Soph,
    Ris,
    Endnote,
    Medlars,
    Procite,
    Refworks,
    Ieee,
    Csl,
    DcXml,
    RefXml,
    RefAbsXml,
    VoTable,
    Rss,
    Custom,
}

impl ExportFormat {
    /// Every format, in API order.
    pub const ALL: &'static [ExportFormat] = &[
        Self::Ads,
        Self::BibTeX,
        Self::BibTeXAbs,
        Self::AasTex,
        Self::Icarus,
        Self::Mnras,
        Self::Soph,
        Self::Ris,
        Self::Endnote,
        Self::Medlars,
        Self::Procite,
        Self::Refworks,
        Self::Ieee,
        Self::Csl,
        Self::DcXml,
        Self::RefXml,
        Self::RefAbsXml,
        Self::VoTable,
        Self::Rss,
        Self::Custom,
    ];

    /// ADS API format string (the last path segment of `/export/<format>`).
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Ads => "ads",
            Self::BibTeX => "bibtex",
            Self::BibTeXAbs => "bibtexabs",
            Self::AasTex => "aastex",
            Self::Icarus => "icarus",
            Self::Mnras => "mnras",
            Self::Soph => "soph",
            Self::Ris => "ris",
            Self::Endnote => "endnote",
            Self::Medlars => "medlars",
            Self::Procite => "procite",
            Self::Refworks => "refworks",
            Self::Ieee => "ieee",
            Self::Csl => "csl",
            Self::DcXml => "dcxml",
            Self::RefXml => "refxml",
            Self::RefAbsXml => "refabsxml",
            Self::VoTable => "votable",
            Self::Rss => "rss",
            Self::Custom => "custom",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.as_api_str() == wanted)
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Sections of the `/metrics` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsKind {
    Basic,
    Citations,
    Indicators,
    Histograms,
    Timeseries,
}

impl MetricsKind {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Citations => "citations",
            Self::Indicators => "indicators",
            Self::Histograms => "histograms",
            Self::Timeseries => "timeseries",
        }
    }
}

/// Citation metrics for a set of papers.
///
/// The statistics blocks are kept as raw JSON; their key sets differ between
/// the refereed and total sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(rename = "basic stats", default)]
    pub basic_stats: Option<serde_json::Value>,
    #[serde(rename = "basic stats refereed", default)]
    pub basic_stats_refereed: Option<serde_json::Value>,
    #[serde(rename = "citation stats", default)]
    pub citation_stats: Option<serde_json::Value>,
    #[serde(rename = "citation stats refereed", default)]
    pub citation_stats_refereed: Option<serde_json::Value>,
    #[serde(default)]
    pub indicators: Option<Indicators>,
    #[serde(default)]
    pub histograms: Option<serde_json::Value>,
    #[serde(rename = "time series", default)]
    pub time_series: Option<serde_json::Value>,
    /// Bibcodes ADS skipped.
    #[serde(rename = "skipped bibcodes", default)]
    pub skipped_bibcodes: Vec<String>,
}

/// Bibliometric indicators (h-index, g-index, etc.).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Indicators {
    pub h: Option<u32>,
    pub g: Option<u32>,
    pub i10: Option<u32>,
    pub i100: Option<u32>,
    pub m: Option<f64>,
    pub tori: Option<f64>,
    pub riq: Option<f64>,
    pub read10: Option<f64>,
}

/// Where a full-text PDF comes from, as named by the ADS link resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdfSource {
    ArXiv,
    Publisher,
    Ads,
}

impl PdfSource {
    /// Resolver `link_type` for this source.
    pub fn link_type(&self) -> &'static str {
        match self {
            Self::ArXiv => "ESOURCE|EPRINT_PDF",
            Self::Publisher => "ESOURCE|PUB_PDF",
            Self::Ads => "ESOURCE|ADS_PDF",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ArXiv => "arXiv",
            Self::Publisher => "Publisher",
            Self::Ads => "ADS",
        }
    }
}

/// Quota reported by the `X-RateLimit-*` response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    /// Unix timestamp at which the quota resets.
    pub reset: Option<u64>,
}

/// Metadata of an ADS personal library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub num_documents: u64,
    pub public: bool,
    pub owner: String,
    pub permission: String,
    pub date_created: String,
    pub date_last_modified: String,
}
