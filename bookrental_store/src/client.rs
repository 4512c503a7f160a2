use anyhow::Context;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde_json::Value;

use crate::document_store::{DocumentStore, DocumentStoreError};

/// HTTP client for a remote document store (json-server compatible).
///
/// Implements [`DocumentStore`] so application code is wired identically
/// against a remote store or the in-memory one.
pub struct DocumentStoreClient {
    url: String,
    client: ClientWithMiddleware,
}

impl DocumentStoreClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl From<reqwest_middleware::Error> for DocumentStoreError {
    fn from(err: reqwest_middleware::Error) -> Self {
        DocumentStoreError::Request(err.to_string())
    }
}

impl From<reqwest::Error> for DocumentStoreError {
    fn from(err: reqwest::Error) -> Self {
        DocumentStoreError::Request(err.to_string())
    }
}

async fn unexpected_status(response: reqwest::Response) -> DocumentStoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    DocumentStoreError::UnexpectedStatus(status, body)
}

#[async_trait::async_trait]
impl DocumentStore for DocumentStoreClient {
    /// Calls GET /{collection} with the filters as query string
    async fn list(
        &self,
        collection: &str,
        filters: &[(String, String)],
    ) -> Result<Vec<Value>, DocumentStoreError> {
        let response = self
            .client
            .get(format!("{}/{}", self.url, collection))
            .query(filters)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(unexpected_status(response).await)
        }
    }

    /// Calls GET /{collection}/{id}, treating 404 as absence
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, DocumentStoreError> {
        let response = self
            .client
            .get(format!("{}/{}/{}", self.url, collection, id))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            Err(unexpected_status(response).await)
        }
    }

    /// Calls POST /{collection} and returns the stored document
    async fn create(
        &self,
        collection: &str,
        document: Value,
    ) -> Result<Value, DocumentStoreError> {
        let response = self
            .client
            .post(format!("{}/{}", self.url, collection))
            .json(&document)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(unexpected_status(response).await)
        }
    }

    /// Calls PATCH /{collection}/{id}, treating 404 as absence
    async fn patch(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Option<Value>, DocumentStoreError> {
        let response = self
            .client
            .patch(format!("{}/{}/{}", self.url, collection, id))
            .json(&patch)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            Err(unexpected_status(response).await)
        }
    }

    /// Calls DELETE /{collection}/{id}, returns false on 404
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DocumentStoreError> {
        let response = self
            .client
            .delete(format!("{}/{}/{}", self.url, collection, id))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else if response.status().is_success() {
            Ok(true)
        } else {
            Err(unexpected_status(response).await)
        }
    }
}
