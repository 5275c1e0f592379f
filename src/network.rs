//! Visualization endpoints: author and paper networks, word clouds.

use crate::client::AdsClient;
use crate::error::{AdsError, Result};
use serde_json::Value;

fn parse_vis(body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| AdsError::Parse(format!("Invalid network response: {}", e)))
}

impl AdsClient {
    /// Author collaboration network for a set of records.
    pub async fn author_network<S: AsRef<str>>(&self, bibcodes: &[S]) -> Result<Value> {
        let bibcodes: Vec<&str> = bibcodes.iter().map(AsRef::as_ref).collect();
        let body = serde_json::json!({ "bibcodes": bibcodes });
        parse_vis(&self.post_json("/vis/author-network", &body).await?)
    }

    /// Citation/reference clusters for a set of records.
    pub async fn paper_network<S: AsRef<str>>(&self, bibcodes: &[S]) -> Result<Value> {
        let bibcodes: Vec<&str> = bibcodes.iter().map(AsRef::as_ref).collect();
        let body = serde_json::json!({ "bibcodes": bibcodes });
        parse_vis(&self.post_json("/vis/paper-network", &body).await?)
    }

    /// Word frequencies over the abstracts of the first `rows` results of `query`.
    pub async fn word_cloud(&self, query: &str, rows: usize) -> Result<Value> {
        let body = serde_json::json!({
            "q": [query],
            "rows": [rows],
            "sort": ["date desc, bibcode desc"],
        });
        parse_vis(&self.post_json("/vis/word-cloud", &body).await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::AdsClient;
    use crate::config::ClientConfig;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_word_cloud_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/vis/word-cloud")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "q": ["title:supernova"],
                "rows": [20],
            })))
            .with_status(200)
            .with_body(r#"{"supernova": {"record_count": [12]}}"#)
            .create_async()
            .await;

        let config = ClientConfig::new("t")
            .with_base_url(server.url())
            .unwrap()
            .with_rate_limit(1000.0);
        let client = AdsClient::from_config(config).unwrap();

        let cloud = client.word_cloud("title:supernova", 20).await.unwrap();
        assert!(cloud.get("supernova").is_some());
        mock.assert_async().await;
    }
}
