#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Document store abstraction.
//!
//! Persistence is delegated to an external document database reached over
//! HTTP. Handlers depend on the [`DocumentStore`] trait only; the concrete
//! backend is chosen at startup. [`FirestoreStore`] talks to the Firestore
//! REST API and [`MemoryStore`] backs tests and local development without
//! credentials.
//!
//! Documents are untyped JSON plus an ID. Callers decode them into their
//! own record types with [`Document::decode`], so a malformed document
//! fails at the call site that cares about its shape, not inside the
//! store.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Error from a document store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document with the given ID exists in the collection.
    #[error("document {collection}/{id} not found")]
    NotFound {
        /// Collection that was queried.
        collection: String,
        /// Document ID that was requested.
        id: String,
    },
    /// The HTTP request to the backend failed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The backend responded with a non-success status.
    #[error("store backend returned {status}: {message}")]
    Backend {
        /// HTTP status code from the backend.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },
    /// A document could not be encoded or decoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// A document held a shape the store cannot represent.
    #[error("unsupported document shape: {0}")]
    UnsupportedShape(String),
}

impl StoreError {
    /// Whether this error means the requested document does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A stored document: its ID plus its JSON fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document ID within its collection.
    pub id: String,
    /// Document fields as a JSON object.
    pub data: Value,
}

impl Document {
    /// Decodes the document fields into a typed record, injecting the
    /// document ID under `"id"` when the fields don't carry one.
    ///
    /// # Errors
    ///
    /// Returns an error if the fields don't match the target type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut data = self.data.clone();
        if let Some(map) = data.as_object_mut() {
            map.entry("id").or_insert_with(|| Value::from(self.id.clone()));
        }
        Ok(serde_json::from_value(data)?)
    }
}

/// Backend-agnostic document CRUD over named collections.
///
/// Filtering, ordering, and aggregation happen in the application after
/// fetching a snapshot; the store only moves documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches one document by ID, or `None` if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Fetches every document in a collection.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Creates a document with a backend-assigned ID.
    async fn insert(&self, collection: &str, data: Value) -> Result<Document, StoreError>;

    /// Creates or fully replaces the document with the given ID.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<Document, StoreError>;

    /// Merges the given top-level fields into an existing document and
    /// returns the updated document.
    ///
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Value)
    -> Result<Document, StoreError>;

    /// Deletes a document. Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        id: String,
        name: String,
    }

    #[test]
    fn decode_injects_document_id() {
        let doc = Document {
            id: "abc".to_string(),
            data: serde_json::json!({ "name": "pothole" }),
        };
        let named: Named = doc.decode().unwrap();
        assert_eq!(named.id, "abc");
        assert_eq!(named.name, "pothole");
    }

    #[test]
    fn decode_keeps_existing_id_field() {
        let doc = Document {
            id: "abc".to_string(),
            data: serde_json::json!({ "id": "stored", "name": "pothole" }),
        };
        let named: Named = doc.decode().unwrap();
        assert_eq!(named.id, "stored");
    }

    #[test]
    fn decode_reports_shape_mismatch() {
        let doc = Document {
            id: "abc".to_string(),
            data: serde_json::json!({ "name": 7 }),
        };
        assert!(doc.decode::<Named>().is_err());
    }
}
