//! Main document store interface.
//!
//! - [`DocumentStore`] - Store bound to a concrete backend type
//! - [`DynDocumentStore`] - Store over a boxed backend, for runtime backend selection
//!
//! Both expose the same operations; [`IntoDynDocumentStore`] converts the former into the
//! latter.
//!
//! # Example
//!
//! ```ignore
//! use revlayer::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//! let rev = store.put("d1", json!({"a": 1}), None).await?;
//! let current = store.get("d1").await?;
//! assert_eq!(current.id(), &rev);
//! ```

use serde_json::Value;

use crate::{
    backend::{DynStoreBackend, IndexInfo, StoreBackend},
    cursor::ResultCursor,
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    query::FindRequest,
    revision::{Fields, Revision, RevisionId},
    typed::TypedDocuments,
};

/// Accepts a JSON value as a field map, rejecting anything but an object.
pub fn into_fields(value: impl Into<Value>) -> DocumentStoreResult<Fields> {
    match value.into() {
        Value::Object(fields) => Ok(fields),
        other => Err(DocumentStoreError::Validation(format!(
            "Document body must be a JSON object, got {other}"
        ))),
    }
}

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a typed view for the specified document type.
    pub fn typed<'a, D: Document>(&'a self) -> TypedDocuments<'a, B, D> {
        TypedDocuments::new(&self.backend)
    }

    /// Writes a new revision of a document.
    ///
    /// # Arguments
    ///
    /// * `id` - The document ID
    /// * `body` - The document fields; must be a JSON object
    /// * `expected` - The current winning revision, or `None` for a new document
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Conflict`] on a stale `expected` revision and
    /// [`DocumentStoreError::Validation`] on a malformed body or ID.
    pub async fn put(
        &self,
        id: &str,
        body: impl Into<Value>,
        expected: Option<&RevisionId>,
    ) -> DocumentStoreResult<RevisionId> {
        self.backend
            .put(id, into_fields(body)?, expected)
            .await
    }

    /// Creates a document under a generated ID, returning the ID and first revision.
    pub async fn post(&self, body: impl Into<Value>) -> DocumentStoreResult<(String, RevisionId)> {
        self.backend.post(into_fields(body)?).await
    }

    /// Reads the winning revision of a document.
    pub async fn get(&self, id: &str) -> DocumentStoreResult<Revision> {
        self.backend.get(id).await
    }

    /// Reads a specific revision of a document.
    pub async fn get_revision(&self, id: &str, rev: &RevisionId) -> DocumentStoreResult<Revision> {
        self.backend.get_revision(id, rev).await
    }

    /// Deletes a document by appending a tombstone to `expected`.
    pub async fn delete(&self, id: &str, expected: &RevisionId) -> DocumentStoreResult<RevisionId> {
        self.backend.delete(id, expected).await
    }

    /// Imports an already-built revision into a document's lineage.
    pub async fn insert_revision(&self, id: &str, revision: Revision) -> DocumentStoreResult<()> {
        self.backend
            .insert_revision(id, revision)
            .await
    }

    /// Lists the revisions that lost to the current winner.
    pub async fn conflicts(&self, id: &str) -> DocumentStoreResult<Vec<RevisionId>> {
        self.backend.conflicts(id).await
    }

    /// Lists every document ID in lexicographic order.
    pub async fn all_ids(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.all_ids().await
    }

    /// Runs a Find query.
    pub async fn find(&self, request: FindRequest) -> DocumentStoreResult<ResultCursor> {
        self.backend.find(request).await
    }

    /// Parses a JSON Find request and runs it.
    pub async fn find_json(&self, request: &Value) -> DocumentStoreResult<ResultCursor> {
        self.backend
            .find(FindRequest::from_json(request)?)
            .await
    }

    /// Creates a secondary index. Index support depends on the backend.
    pub async fn create_index(
        &self,
        design_doc: &str,
        name: &str,
        definition: Value,
    ) -> DocumentStoreResult<()> {
        self.backend
            .create_index(design_doc, name, definition)
            .await
    }

    /// Lists secondary indexes.
    pub async fn get_indexes(&self) -> DocumentStoreResult<Vec<IndexInfo>> {
        self.backend.get_indexes().await
    }

    /// Deletes a secondary index.
    pub async fn delete_index(&self, design_doc: &str, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .delete_index(design_doc, name)
            .await
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;

        Ok(())
    }
}

/// A document store over a boxed backend.
#[derive(Debug)]
pub struct DynDocumentStore {
    backend: Box<dyn DynStoreBackend>,
}

impl DynDocumentStore {
    /// Creates a new dynamic document store with the given backend trait object.
    pub fn new(backend: Box<dyn DynStoreBackend>) -> Self {
        Self { backend }
    }

    /// Returns the backend as `B` if that is its concrete type.
    pub fn downcast_backend<B: StoreBackend + 'static>(&self) -> Option<&B> {
        self.backend.as_any().downcast_ref::<B>()
    }

    /// Converts back into a statically typed store if the backend is a `B`.
    pub fn into_static<B: StoreBackend + 'static>(self) -> Option<DocumentStore<B>> {
        self.backend
            .into_any()
            .downcast::<B>()
            .ok()
            .map(|b| DocumentStore::new(*b))
    }

    pub async fn put(
        &self,
        id: &str,
        body: impl Into<Value>,
        expected: Option<&RevisionId>,
    ) -> DocumentStoreResult<RevisionId> {
        self.backend
            .put(id, into_fields(body)?, expected)
            .await
    }

    pub async fn post(&self, body: impl Into<Value>) -> DocumentStoreResult<(String, RevisionId)> {
        self.backend.post(into_fields(body)?).await
    }

    pub async fn get(&self, id: &str) -> DocumentStoreResult<Revision> {
        self.backend.get(id).await
    }

    pub async fn get_revision(&self, id: &str, rev: &RevisionId) -> DocumentStoreResult<Revision> {
        self.backend.get_revision(id, rev).await
    }

    pub async fn delete(&self, id: &str, expected: &RevisionId) -> DocumentStoreResult<RevisionId> {
        self.backend.delete(id, expected).await
    }

    pub async fn insert_revision(&self, id: &str, revision: Revision) -> DocumentStoreResult<()> {
        self.backend
            .insert_revision(id, revision)
            .await
    }

    pub async fn conflicts(&self, id: &str) -> DocumentStoreResult<Vec<RevisionId>> {
        self.backend.conflicts(id).await
    }

    pub async fn all_ids(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.all_ids().await
    }

    pub async fn find(&self, request: FindRequest) -> DocumentStoreResult<ResultCursor> {
        self.backend.find(request).await
    }

    pub async fn find_json(&self, request: &Value) -> DocumentStoreResult<ResultCursor> {
        self.backend
            .find(FindRequest::from_json(request)?)
            .await
    }

    pub async fn create_index(
        &self,
        design_doc: &str,
        name: &str,
        definition: Value,
    ) -> DocumentStoreResult<()> {
        self.backend
            .create_index(design_doc, name, definition)
            .await
    }

    pub async fn get_indexes(&self) -> DocumentStoreResult<Vec<IndexInfo>> {
        self.backend.get_indexes().await
    }

    pub async fn delete_index(&self, design_doc: &str, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .delete_index(design_doc, name)
            .await
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown_boxed().await
    }
}

/// Conversion trait for converting a document store into a dynamic owned store.
pub trait IntoDynDocumentStore {
    /// Converts this store into a dynamic owned store.
    fn into_dyn(self) -> DynDocumentStore;
}

impl<B: StoreBackend + 'static> IntoDynDocumentStore for DocumentStore<B> {
    fn into_dyn(self) -> DynDocumentStore {
        DynDocumentStore::new(Box::new(self.backend))
    }
}

impl IntoDynDocumentStore for DynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore {
        self
    }
}
