//! # astroapi
//!
//! A Rust client for the NASA ADS / SciX bibliographic API.
//!
//! Provides:
//! - **Paginated search**: [`Paginator`] pages lazily through a query without
//!   ever yielding a record twice
//! - **Lazy records**: [`Article`] fetches fields on first access and caches them
//! - **Collections**: [`Journal`] keeps articles in order, keyed by bibcode
//! - **Libraries**: [`Libraries`] and [`Library`] mirror ADS personal libraries
//! - **CLI**: `astroapi` binary for terminal use (feature `cli`)
//!
//! ## Quick Start
//!
//! ```no_run
//! # async fn example() -> astroapi::error::Result<()> {
//! use astroapi::{AdsClient, Article, SearchOptions, SharedBackend};
//! use std::sync::Arc;
//!
//! // Token from SCIX_API_TOKEN / ADS_API_TOKEN or ~/.ads/dev_key
//! let client = Arc::new(AdsClient::from_env()?);
//!
//! let options = SearchOptions::default().with_fields(["title", "year"]).with_limit(20);
//! let records = client.query("author:\"^Einstein\" year:1905", options)?.collect_all().await?;
//! println!("{} records", records.len());
//!
//! let backend: SharedBackend = client.clone();
//! let mut article = Article::new(backend, "2020ApJ...902L..36F");
//! let cites = article.citation_count().await?;
//! println!("{:?} cited {} times", article.title().await?, cites);
//!
//! let bibtex = article.export()?.bibtex(&client).await?;
//! println!("{}", bibtex);
//! # Ok(())
//! # }
//! ```

pub mod article;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod fields;
pub mod handles;
pub mod journal;
pub mod libraries;
pub mod links;
pub mod metrics;
pub mod network;
pub mod paginate;
pub mod parse;
pub mod rate_limit;
pub mod search;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export key types at the crate root.
pub use article::{Article, ArticleSnapshot};
pub use backend::{Page, PageRequest, SearchBackend, SharedBackend};
pub use client::AdsClient;
pub use config::ClientConfig;
pub use error::AdsError;
pub use fields::Fields;
pub use handles::{ExportHandle, MetricsHandle, PdfHandle, VisualHandle};
pub use journal::{Journal, JournalSnapshot};
pub use libraries::{Libraries, Library, LibraryEdit};
pub use paginate::{Paginator, SearchOptions};
pub use types::*;
