//! ADS personal libraries: the `/biblib` endpoints and a keyed object model
//! on top of them.
//!
//! [`Libraries`] maps library names to [`Library`] values; each library keeps
//! its documents as a [`Journal`], so the usual lazy field access works on
//! library members.

use crate::article::Article;
use crate::backend::SharedBackend;
use crate::client::AdsClient;
use crate::error::{AdsError, Result};
use crate::journal::Journal;
use crate::types::LibraryMetadata;
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct LibraryList {
    #[serde(default)]
    libraries: Vec<LibraryMetadata>,
}

#[derive(Debug, Deserialize)]
struct LibraryView {
    #[serde(default)]
    metadata: LibraryMetadata,
    #[serde(default)]
    documents: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

/// Metadata changes for [`AdsClient::edit_library`]. Unset fields are left
/// alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub public: Option<bool>,
}

impl LibraryEdit {
    fn to_json(&self) -> Value {
        let mut body = serde_json::Map::new();
        if let Some(name) = &self.name {
            body.insert("name".to_string(), json!(name));
        }
        if let Some(description) = &self.description {
            body.insert("description".to_string(), json!(description));
        }
        if let Some(public) = self.public {
            body.insert("public".to_string(), json!(public));
        }
        Value::Object(body)
    }

    fn apply(&self, metadata: &mut LibraryMetadata) {
        if let Some(name) = &self.name {
            metadata.name = name.clone();
        }
        if let Some(description) = &self.description {
            metadata.description = description.clone();
        }
        if let Some(public) = self.public {
            metadata.public = public;
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| AdsError::Parse(format!("Invalid {} response: {}", what, e)))
}

impl AdsClient {
    /// List all libraries of the authenticated user.
    pub async fn list_libraries(&self) -> Result<Vec<LibraryMetadata>> {
        let body = self.get("/biblib/libraries", &[]).await?;
        Ok(parse::<LibraryList>(&body, "libraries")?.libraries)
    }

    /// One page of a library's documents, starting at `start`.
    pub async fn library_page(&self, id: &str, start: usize) -> Result<(LibraryMetadata, Vec<String>)> {
        let start = start.to_string();
        let body = self
            .get(&format!("/biblib/libraries/{}", id), &[("start", start.as_str())])
            .await?;
        let view: LibraryView = parse(&body, "library")?;
        let mut metadata = view.metadata;
        metadata.id = id.to_string();
        Ok((metadata, view.documents))
    }

    /// A library's metadata and every bibcode in it, in library order.
    ///
    /// Each page re-reads the last document of the previous one. Paging
    /// stops on an empty page, a page with nothing new, or once the reported
    /// document count is reached.
    pub async fn get_library(&self, id: &str) -> Result<(LibraryMetadata, Vec<String>)> {
        let mut bibcodes = IndexSet::new();
        let mut start = 0;
        loop {
            let (metadata, documents) = self.library_page(id, start).await?;
            let received = documents.len();
            let before = bibcodes.len();
            bibcodes.extend(documents);
            let fresh = bibcodes.len() - before;
            tracing::debug!(library = %id, start, received, fresh, "library page received");

            if received == 0 || fresh == 0 || bibcodes.len() as u64 >= metadata.num_documents {
                return Ok((metadata, bibcodes.into_iter().collect()));
            }
            start = bibcodes.len() - 1;
        }
    }

    /// Create a library, returning its id.
    pub async fn create_library(
        &self,
        name: &str,
        description: &str,
        public: bool,
        bibcodes: &[&str],
    ) -> Result<String> {
        let mut body = json!({
            "name": name,
            "description": description,
            "public": public,
        });
        if !bibcodes.is_empty() {
            body["bibcode"] = json!(bibcodes);
        }

        let response = self.post_json("/biblib/libraries", &body).await?;
        let created: Created = parse(&response, "create library")?;
        tracing::info!(library = %created.id, %name, "created library");
        Ok(created.id)
    }

    /// Change a library's name, description or visibility.
    pub async fn edit_library(&self, id: &str, edit: &LibraryEdit) -> Result<()> {
        self.put_json(&format!("/biblib/documents/{}", id), &edit.to_json())
            .await?;
        Ok(())
    }

    pub async fn delete_library(&self, id: &str) -> Result<()> {
        self.delete(&format!("/biblib/documents/{}", id)).await?;
        tracing::info!(library = %id, "deleted library");
        Ok(())
    }

    /// Add bibcodes to a library, returning how many ADS added.
    pub async fn add_documents(&self, id: &str, bibcodes: &[&str]) -> Result<u64> {
        self.change_documents(id, bibcodes, "add", "number_added").await
    }

    /// Remove bibcodes from a library, returning how many ADS removed.
    pub async fn remove_documents(&self, id: &str, bibcodes: &[&str]) -> Result<u64> {
        self.change_documents(id, bibcodes, "remove", "number_removed")
            .await
    }

    async fn change_documents(
        &self,
        id: &str,
        bibcodes: &[&str],
        action: &str,
        counter: &str,
    ) -> Result<u64> {
        if bibcodes.is_empty() {
            return Ok(0);
        }
        let body = json!({ "bibcode": bibcodes, "action": action });
        let response = self
            .post_json(&format!("/biblib/documents/{}", id), &body)
            .await?;
        let parsed: Value = parse(&response, "library documents")?;
        let changed = parsed[counter].as_u64().unwrap_or(0);
        // ADS skips bibcodes that are already present (or already absent).
        if changed != bibcodes.len() as u64 {
            tracing::warn!(
                library = %id,
                action,
                requested = bibcodes.len(),
                changed,
                "library changed fewer documents than requested"
            );
        }
        Ok(changed)
    }
}

/// One ADS library: its metadata plus its documents as a [`Journal`].
///
/// Documents are only listed by [`Library::update`]; a library obtained from
/// [`Libraries::update`] starts out empty.
#[derive(Clone)]
pub struct Library {
    metadata: LibraryMetadata,
    journal: Journal,
}

impl Library {
    pub fn new(backend: SharedBackend, metadata: LibraryMetadata) -> Self {
        Self {
            metadata,
            journal: Journal::new(backend),
        }
    }

    /// Fetch a library and all of its bibcodes.
    pub async fn fetch(client: &AdsClient, backend: SharedBackend, id: &str) -> Result<Self> {
        let (metadata, bibcodes) = client.get_library(id).await?;
        Ok(Self {
            metadata,
            journal: Journal::from_bibcodes(backend, bibcodes),
        })
    }

    /// Re-read the library's metadata and document list.
    ///
    /// Articles still in the library keep their cached fields.
    pub async fn update(&mut self, client: &AdsClient) -> Result<()> {
        let (metadata, bibcodes) = client.get_library(&self.metadata.id).await?;
        let current: Vec<String> = self.journal.bibcodes().map(String::from).collect();
        let mut previous: HashMap<String, Article> = self
            .journal
            .pop(&current)
            .into_iter()
            .filter_map(|a| Some((a.bibcode()?.to_string(), a)))
            .collect();
        for bibcode in bibcodes {
            match previous.remove(&bibcode) {
                Some(article) => self.journal.add_article(article)?,
                None => self.journal.add_bibcode(bibcode),
            }
        }
        self.metadata = metadata;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn metadata(&self) -> &LibraryMetadata {
        &self.metadata
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn journal_mut(&mut self) -> &mut Journal {
        &mut self.journal
    }

    pub fn get(&self, bibcode: &str) -> Option<&Article> {
        self.journal.get(bibcode)
    }

    pub fn contains(&self, bibcode: &str) -> bool {
        self.journal.contains(bibcode)
    }

    pub fn len(&self) -> usize {
        self.journal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }

    pub fn bibcodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.journal.bibcodes()
    }

    /// Add bibcodes remotely, then locally.
    pub async fn add_bibcodes(&mut self, client: &AdsClient, bibcodes: &[&str]) -> Result<()> {
        client.add_documents(self.id(), bibcodes).await?;
        for bibcode in bibcodes {
            self.journal.add_bibcode(*bibcode);
        }
        self.metadata.num_documents = self.journal.len() as u64;
        Ok(())
    }

    /// Remove bibcodes remotely, then locally, returning the removed articles.
    pub async fn pop(&mut self, client: &AdsClient, bibcodes: &[&str]) -> Result<Vec<Article>> {
        client.remove_documents(self.id(), bibcodes).await?;
        let removed = self.journal.pop(bibcodes);
        self.metadata.num_documents = self.journal.len() as u64;
        Ok(removed)
    }

    /// Apply `edit` remotely and to the local metadata.
    pub async fn edit(&mut self, client: &AdsClient, edit: &LibraryEdit) -> Result<()> {
        client.edit_library(self.id(), edit).await?;
        edit.apply(&mut self.metadata);
        Ok(())
    }
}

impl PartialEq for Library {
    fn eq(&self, other: &Self) -> bool {
        self.metadata.id == other.metadata.id
    }
}

impl Eq for Library {}

impl std::hash::Hash for Library {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.metadata.id.hash(state);
    }
}

impl std::fmt::Display for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.metadata.name)
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("id", &self.metadata.id)
            .field("name", &self.metadata.name)
            .field("documents", &self.journal.len())
            .finish()
    }
}

/// The user's libraries, keyed by name in server order.
pub struct Libraries {
    backend: SharedBackend,
    libraries: IndexMap<String, Library>,
}

impl Libraries {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            libraries: IndexMap::new(),
        }
    }

    /// List the user's libraries.
    pub async fn fetch(client: &AdsClient, backend: SharedBackend) -> Result<Self> {
        let mut libraries = Self::new(backend);
        libraries.update(client).await?;
        Ok(libraries)
    }

    /// Re-list the user's libraries.
    ///
    /// Libraries that still exist keep their loaded documents.
    pub async fn update(&mut self, client: &AdsClient) -> Result<()> {
        let listed = client.list_libraries().await?;
        let mut previous: IndexMap<String, Library> = self
            .libraries
            .drain(..)
            .map(|(_, library)| (library.metadata.id.clone(), library))
            .collect();

        for metadata in listed {
            let library = match previous.shift_remove(&metadata.id) {
                Some(mut library) => {
                    library.metadata = metadata;
                    library
                }
                None => Library::new(Arc::clone(&self.backend), metadata),
            };
            self.libraries.insert(library.name().to_string(), library);
        }
        tracing::debug!(count = self.libraries.len(), "listed libraries");
        Ok(())
    }

    /// Create a library and re-list. Returns the new library.
    pub async fn create(
        &mut self,
        client: &AdsClient,
        name: &str,
        description: &str,
        public: bool,
        bibcodes: &[&str],
    ) -> Result<&mut Library> {
        client
            .create_library(name, description, public, bibcodes)
            .await?;
        self.update(client).await?;
        self.libraries
            .get_mut(name)
            .ok_or_else(|| AdsError::NotFound(format!("library {} missing after creation", name)))
    }

    /// Re-list, then delete the library called `name`, returning its last
    /// local state.
    pub async fn pop(&mut self, client: &AdsClient, name: &str) -> Result<Library> {
        self.update(client).await?;
        let library = self
            .libraries
            .get(name)
            .ok_or_else(|| AdsError::NotFound(format!("library {}", name)))?;
        client.delete_library(library.id()).await?;
        self.libraries
            .shift_remove(name)
            .ok_or_else(|| AdsError::NotFound(format!("library {}", name)))
    }

    pub fn get(&self, name: &str) -> Option<&Library> {
        self.libraries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Library> {
        self.libraries.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.libraries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.libraries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Library> + '_ {
        self.libraries.values()
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

impl std::fmt::Debug for Libraries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.libraries.iter().map(|(name, lib)| (name, lib.id())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::testing::MockBackend;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> AdsClient {
        let config = ClientConfig::new("test-token")
            .with_base_url(server.url())
            .unwrap()
            .with_rate_limit(1000.0);
        AdsClient::from_config(config).unwrap()
    }

    fn backend() -> SharedBackend {
        Arc::new(MockBackend::new())
    }

    const LISTING: &str = r#"{"libraries": [
        {"id": "abc", "name": "Reading", "description": "To read", "num_documents": 2, "public": false, "owner": "me"},
        {"id": "def", "name": "Cited", "num_documents": 0}
    ]}"#;

    #[tokio::test]
    async fn test_list_libraries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/biblib/libraries")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(LISTING)
            .create_async()
            .await;

        let client = client_for(&server);
        let listed = client.list_libraries().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "abc");
        assert_eq!(listed[0].num_documents, 2);
        assert_eq!(listed[1].description, "");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_library_pages_with_overlap() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/biblib/libraries/abc")
            .match_query(Matcher::UrlEncoded("start".into(), "0".into()))
            .with_status(200)
            .with_body(r#"{"metadata": {"name": "Reading", "num_documents": 3}, "documents": ["K1", "K2"]}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/biblib/libraries/abc")
            .match_query(Matcher::UrlEncoded("start".into(), "1".into()))
            .with_status(200)
            .with_body(r#"{"metadata": {"name": "Reading", "num_documents": 3}, "documents": ["K2", "K3"]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let (metadata, bibcodes) = client.get_library("abc").await.unwrap();
        assert_eq!(metadata.id, "abc");
        assert_eq!(metadata.name, "Reading");
        assert_eq!(bibcodes, vec!["K1", "K2", "K3"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_library_stops_on_stale_page() {
        let mut server = mockito::Server::new_async().await;
        // The reported count is too high; the second page repeats the first.
        let mock = server
            .mock("GET", "/biblib/libraries/abc")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"metadata": {"num_documents": 10}, "documents": ["K1"]}"#)
            .expect(2)
            .create_async()
            .await;

        let client = client_for(&server);
        let (_, bibcodes) = client.get_library("abc").await.unwrap();
        assert_eq!(bibcodes, vec!["K1"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_library() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/biblib/libraries")
            .match_body(Matcher::Json(json!({
                "name": "New",
                "description": "d",
                "public": true,
                "bibcode": ["K1"],
            })))
            .with_status(200)
            .with_body(r#"{"id": "xyz", "name": "New"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let id = client.create_library("New", "d", true, &["K1"]).await.unwrap();
        assert_eq!(id, "xyz");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_edit_sends_only_changed_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/biblib/documents/abc")
            .match_body(Matcher::Json(json!({"description": "Now read"})))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = client_for(&server);
        let mut library = Library::new(
            backend(),
            LibraryMetadata {
                id: "abc".into(),
                name: "Reading".into(),
                ..Default::default()
            },
        );
        let edit = LibraryEdit {
            description: Some("Now read".into()),
            ..Default::default()
        };
        library.edit(&client, &edit).await.unwrap();
        assert_eq!(library.metadata().description, "Now read");
        assert_eq!(library.name(), "Reading");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_and_pop_bibcodes() {
        let mut server = mockito::Server::new_async().await;
        let add = server
            .mock("POST", "/biblib/documents/abc")
            .match_body(Matcher::Json(json!({"bibcode": ["K1", "K2"], "action": "add"})))
            .with_status(200)
            .with_body(r#"{"number_added": 2}"#)
            .create_async()
            .await;
        let remove = server
            .mock("POST", "/biblib/documents/abc")
            .match_body(Matcher::Json(json!({"bibcode": ["K1"], "action": "remove"})))
            .with_status(200)
            .with_body(r#"{"number_removed": 1}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let mut library = Library::new(
            backend(),
            LibraryMetadata {
                id: "abc".into(),
                ..Default::default()
            },
        );

        library.add_bibcodes(&client, &["K1", "K2"]).await.unwrap();
        assert_eq!(library.bibcodes().collect::<Vec<_>>(), vec!["K1", "K2"]);
        assert_eq!(library.metadata().num_documents, 2);

        let removed = library.pop(&client, &["K1"]).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].bibcode(), Some("K1"));
        assert!(!library.contains("K1"));
        assert_eq!(library.journal().len(), 1);
        add.assert_async().await;
        remove.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_add_leaves_library_unchanged() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/biblib/documents/abc")
            .with_status(403)
            .with_body(r#"{"error": "no write permission"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let mut library = Library::new(
            backend(),
            LibraryMetadata {
                id: "abc".into(),
                ..Default::default()
            },
        );
        assert!(library.add_bibcodes(&client, &["K1"]).await.is_err());
        assert!(library.is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_cached_articles() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/biblib/libraries/abc")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"metadata": {"name": "Reading", "num_documents": 2}, "documents": ["K2", "K3"]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let backend = backend();
        let mut library = Library::new(
            Arc::clone(&backend),
            LibraryMetadata {
                id: "abc".into(),
                ..Default::default()
            },
        );
        let cached = crate::testing::fields(json!({"bibcode": "K2", "title": ["Cached"]}));
        library.journal_mut().add_data(cached).unwrap();
        library.journal_mut().add_bibcode("K1");

        library.update(&client).await.unwrap();
        assert_eq!(library.bibcodes().collect::<Vec<_>>(), vec!["K2", "K3"]);
        assert_eq!(library.name(), "Reading");
        let k2 = library.get("K2").unwrap();
        assert_eq!(k2.cached("title"), Some(&json!(["Cached"])));
    }

    #[tokio::test]
    async fn test_libraries_keyed_by_name() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/biblib/libraries")
            .with_status(200)
            .with_body(LISTING)
            .create_async()
            .await;

        let client = client_for(&server);
        let libraries = Libraries::fetch(&client, backend()).await.unwrap();
        assert_eq!(libraries.names().collect::<Vec<_>>(), vec!["Reading", "Cited"]);
        assert!(libraries.contains("Cited"));
        let reading = libraries.get("Reading").unwrap();
        assert_eq!(reading.id(), "abc");
        assert_eq!(reading.to_string(), "Reading");
        assert!(reading.is_empty());
    }

    #[tokio::test]
    async fn test_pop_unknown_library() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/biblib/libraries")
            .with_status(200)
            .with_body(LISTING)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        let mut libraries = Libraries::new(backend());
        assert!(matches!(
            libraries.pop(&client, "Missing").await,
            Err(AdsError::NotFound(_))
        ));
        assert_eq!(libraries.len(), 2);
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_pop_deletes_library() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/biblib/libraries")
            .with_status(200)
            .with_body(LISTING)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/biblib/documents/def")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = client_for(&server);
        let mut libraries = Libraries::new(backend());
        let removed = libraries.pop(&client, "Cited").await.unwrap();
        assert_eq!(removed.id(), "def");
        assert_eq!(libraries.names().collect::<Vec<_>>(), vec!["Reading"]);
        delete.assert_async().await;
    }
}
