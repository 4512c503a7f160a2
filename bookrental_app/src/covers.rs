use anyhow::Context;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::Deserialize;

pub const DEFAULT_SEARCH_URL: &str = "https://openlibrary.org";
pub const DEFAULT_IMAGES_URL: &str = "https://covers.openlibrary.org";

/// Looks up a cover image URL for a book title via the public
/// book-metadata search service.
pub struct CoverLookupClient {
    search_url: String,
    images_url: String,
    client: ClientWithMiddleware,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    cover_i: Option<u64>,
}

impl CoverLookupClient {
    pub fn new(search_url: &str, images_url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            search_url: search_url.trim_end_matches('/').to_string(),
            images_url: images_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Calls GET /search.json?title={title} and builds the image URL from
    /// the first hit carrying a cover id. No hit is not an error.
    pub async fn cover_url(&self, title: &str) -> anyhow::Result<Option<String>> {
        let response = self
            .client
            .get(format!("{}/search.json", self.search_url))
            .query(&[("title", title)])
            .send()
            .await
            .context("Failed to query cover search")?;

        if !response.status().is_success() {
            anyhow::bail!("Cover search failed with status {}", response.status());
        }

        let search: SearchResponse = response
            .json()
            .await
            .context("Failed to parse cover search response")?;
        Ok(self.image_url_from(&search))
    }

    fn image_url_from(&self, search: &SearchResponse) -> Option<String> {
        search
            .docs
            .first()
            .and_then(|doc| doc.cover_i)
            .map(|cover_id| format!("{}/b/id/{}-L.jpg", self.images_url, cover_id))
    }
}

#[cfg(test)]
mod cover_tests {
    use super::{CoverLookupClient, SearchResponse};

    #[test]
    fn test_image_url_from_first_hit() {
        let client = CoverLookupClient::new("https://openlibrary.org/", "https://covers.example")
            .expect("Failed to build client");

        let search: SearchResponse = serde_json::from_str(
            r#"{"numFound": 2, "docs": [{"cover_i": 12345, "title": "Dune"}, {"cover_i": 99}]}"#,
        )
        .unwrap();
        assert_eq!(
            client.image_url_from(&search),
            Some("https://covers.example/b/id/12345-L.jpg".to_string())
        );

        // first doc has no cover id: no fallback to later docs, like the
        // original client
        let search: SearchResponse =
            serde_json::from_str(r#"{"docs": [{"title": "Dune"}, {"cover_i": 99}]}"#).unwrap();
        assert_eq!(client.image_url_from(&search), None);

        let search: SearchResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(client.image_url_from(&search), None);
    }
}
