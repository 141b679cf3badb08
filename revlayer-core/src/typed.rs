//! Typed access to a document store.
//!
//! [`TypedDocuments`] wraps a backend and converts between a [`Document`] type and the
//! store's field maps on every call.
//!
//! # Example
//!
//! ```ignore
//! let users = store.typed::<User>();
//! let rev = users.put(&alice, None).await?;
//! let (stored, current) = users.get("alice").await?;
//! ```

use std::marker::PhantomData;

use crate::{
    backend::StoreBackend,
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    query::FindRequest,
    revision::RevisionId,
};

/// A typed view over a store backend.
#[derive(Debug)]
pub struct TypedDocuments<'a, B: StoreBackend, D: Document> {
    backend: &'a B,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> TypedDocuments<'a, B, D> {
    pub(crate) fn new(backend: &'a B) -> Self {
        Self { backend, _marker: PhantomData }
    }

    /// Writes `document` under its own ID.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Conflict`] if `expected` is not the current winner.
    pub async fn put(&self, document: &D, expected: Option<&RevisionId>) -> DocumentStoreResult<RevisionId> {
        self.backend
            .put(document.id(), document.to_fields()?, expected)
            .await
    }

    /// Reads the current state of a document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if the document does not exist or its
    /// winning revision is a tombstone.
    pub async fn get(&self, id: &str) -> DocumentStoreResult<(D, RevisionId)> {
        let revision = self.backend.get(id).await?;

        if revision.is_deleted() {
            return Err(DocumentStoreError::DocumentNotFound(id.to_string()));
        }

        let rev = revision.id().clone();
        Ok((D::from_fields(revision.into_fields())?, rev))
    }

    /// Deletes a document.
    pub async fn delete(&self, id: &str, expected: &RevisionId) -> DocumentStoreResult<RevisionId> {
        self.backend.delete(id, expected).await
    }

    /// Runs a Find query and deserializes every row.
    ///
    /// Projections that drop required fields make deserialization fail.
    pub async fn find(&self, request: FindRequest) -> DocumentStoreResult<Vec<(D, RevisionId)>> {
        self.backend
            .find(request)
            .await?
            .map(|row| -> DocumentStoreResult<(D, RevisionId)> {
                Ok((D::from_fields(row.fields)?, row.rev))
            })
            .collect()
    }
}
