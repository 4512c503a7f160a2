#[cfg(any(feature = "server", test))]
pub use in_memory_document_store::InMemoryDocumentStore;

use serde_json::Value;

#[cfg(any(feature = "server", test))]
mod in_memory_document_store;

#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("Failed to deserialize document: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected status code {0}: {1}")]
    UnexpectedStatus(u16, String),

    #[error("Other error {0}")]
    Other(String),
}

/// A schemaless JSON document store, json-server style.
///
/// Collections are named sets of documents keyed by a string `id` field.
/// There is no schema, no uniqueness and no referential integrity; callers
/// that need relational behaviour orchestrate it themselves with multiple
/// calls.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Lists documents of a collection, keeping only those where every
    /// filter key equals the given value. An unknown collection is empty.
    async fn list(
        &self,
        collection: &str,
        filters: &[(String, String)],
    ) -> Result<Vec<Value>, DocumentStoreError>;

    /// Fetches a single document, `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, DocumentStoreError>;

    /// Stores a new document and returns it as stored. A document without
    /// an `id` field gets a generated one.
    async fn create(&self, collection: &str, document: Value)
        -> Result<Value, DocumentStoreError>;

    /// Merge-patches a document (RFC 7386: `null` removes the key) and
    /// returns the updated document, `None` when absent.
    async fn patch(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Option<Value>, DocumentStoreError>;

    /// Deletes a document, returns false when it was not there.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DocumentStoreError>;
}
