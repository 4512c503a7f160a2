use std::collections::HashMap;

use serde_json::{json, Value};

use crate::document_store::{DocumentStore, DocumentStoreError};

/// In-memory implementation of the document store, used by the dev/test
/// server binary and by in-process tests.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: parking_lot::RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store from a json-server style database object:
    /// a map of collection name to a list of documents.
    pub fn with_collections(seed: Value) -> anyhow::Result<Self> {
        let store = Self::default();
        let seed: HashMap<String, Vec<Value>> = serde_json::from_value(seed)?;
        {
            let mut collections = store.collections.write();
            for (name, documents) in seed {
                let collection = collections.entry(name).or_default();
                for document in documents {
                    let id = document_id(&document)
                        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                    collection.insert(id, document);
                }
            }
        }
        Ok(store)
    }
}

fn document_id(document: &Value) -> Option<String> {
    match document.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

/// Query-string comparison: every value arrives as a string, so fields are
/// compared through their string rendering.
fn field_matches(document: &Value, key: &str, expected: &str) -> bool {
    match document.get(key) {
        Some(Value::String(value)) => value == expected,
        Some(other) => other.to_string() == expected,
        None => false,
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list(
        &self,
        collection: &str,
        filters: &[(String, String)],
    ) -> Result<Vec<Value>, DocumentStoreError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|documents| {
                documents
                    .values()
                    .filter(|document| {
                        filters
                            .iter()
                            .all(|(key, expected)| field_matches(document, key, expected))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, DocumentStoreError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn create(
        &self,
        collection: &str,
        mut document: Value,
    ) -> Result<Value, DocumentStoreError> {
        if !document.is_object() {
            return Err(DocumentStoreError::Other(
                "Document must be a JSON object".to_string(),
            ));
        }
        let id = match document_id(&document) {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                document["id"] = json!(id);
                id
            }
        };
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id, document.clone());
        Ok(document)
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Option<Value>, DocumentStoreError> {
        let mut collections = self.collections.write();
        let Some(document) = collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
        else {
            return Ok(None);
        };
        json_patch::merge(document, &patch);
        // The id is immutable under patch, as in json-server.
        document["id"] = json!(id);
        Ok(Some(document.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DocumentStoreError> {
        Ok(self
            .collections
            .write()
            .get_mut(collection)
            .and_then(|documents| documents.remove(id))
            .is_some())
    }
}
