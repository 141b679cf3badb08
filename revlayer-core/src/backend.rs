//! Storage backend abstraction for the document store.
//!
//! This module defines the traits that abstract over storage implementations.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: A trait for dynamic dispatch over backend implementations
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Consistency
//!
//! Backends guarantee per-document atomicity only. Writes to one document are serialized
//! and checked against its current winning revision; reads of one document never observe
//! a half-applied write. A Find scan visits documents one at a time and may observe some
//! documents before and others after a concurrent write. There is no global snapshot.
//!
//! # Examples
//!
//! ```ignore
//! use revlayer::backend::StoreBackend;
//! use serde_json::json;
//!
//! let rev = backend.put("d1", fields(json!({"x": 1})), None).await?;
//! let rev = backend.put("d1", fields(json!({"x": 2})), Some(&rev)).await?;
//! let current = backend.get("d1").await?;
//! assert_eq!(current.id(), &rev);
//! ```

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::{any::Any, fmt::Debug};

use crate::{
    cursor::ResultCursor,
    error::DocumentStoreResult,
    query::FindRequest,
    revision::{Fields, Revision, RevisionId},
};

/// Description of a secondary index as reported by [`StoreBackend::get_indexes`].
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct IndexInfo {
    pub design_doc: String,
    pub name: String,
    pub definition: Value,
}

/// Abstract interface for multi-version document storage backends.
///
/// # Error Handling
///
/// - [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound) /
///   [`RevisionNotFound`](crate::error::DocumentStoreError::RevisionNotFound) when the
///   addressed document or revision never existed.
/// - [`Conflict`](crate::error::DocumentStoreError::Conflict) when a write names a revision
///   that is not the current winner.
/// - [`Validation`](crate::error::DocumentStoreError::Validation) for malformed input. No
///   state is changed when validation fails.
/// - [`Unsupported`](crate::error::DocumentStoreError::Unsupported) for capability gaps.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Writes a new revision of `id`.
    ///
    /// `expected` must name the current winning revision. For a document that does not exist
    /// yet it must be `None`.
    async fn put(
        &self,
        id: &str,
        fields: Fields,
        expected: Option<&RevisionId>,
    ) -> DocumentStoreResult<RevisionId>;

    /// Creates a document under a newly generated ID.
    async fn post(&self, fields: Fields) -> DocumentStoreResult<(String, RevisionId)>;

    /// Returns the winning revision of `id`, which may be a tombstone.
    async fn get(&self, id: &str) -> DocumentStoreResult<Revision>;

    /// Returns one specific revision of `id`.
    async fn get_revision(&self, id: &str, rev: &RevisionId) -> DocumentStoreResult<Revision>;

    /// Appends a tombstone on top of `expected`, which must be the current winner.
    async fn delete(&self, id: &str, expected: &RevisionId) -> DocumentStoreResult<RevisionId>;

    /// Imports an already-built revision as-is, without the winner check.
    ///
    /// The revision's parent must already be part of the document's lineage, unless the
    /// revision is a root. Importing sibling revisions is how conflicting branches arise.
    async fn insert_revision(&self, id: &str, revision: Revision) -> DocumentStoreResult<()>;

    /// Returns the non-deleted leaves that lost to the winner.
    async fn conflicts(&self, id: &str) -> DocumentStoreResult<Vec<RevisionId>>;

    /// Returns every document ID, including tombstoned ones, in lexicographic order.
    async fn all_ids(&self) -> DocumentStoreResult<Vec<String>>;

    /// Runs a Find query.
    async fn find(&self, request: FindRequest) -> DocumentStoreResult<ResultCursor>;

    /// Creates a secondary index.
    async fn create_index(
        &self,
        design_doc: &str,
        name: &str,
        definition: Value,
    ) -> DocumentStoreResult<()>;

    /// Lists secondary indexes.
    async fn get_indexes(&self) -> DocumentStoreResult<Vec<IndexInfo>>;

    /// Deletes a secondary index.
    async fn delete_index(&self, design_doc: &str, name: &str) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn put(
        &self,
        id: &str,
        fields: Fields,
        expected: Option<&RevisionId>,
    ) -> DocumentStoreResult<RevisionId>;
    async fn post(&self, fields: Fields) -> DocumentStoreResult<(String, RevisionId)>;
    async fn get(&self, id: &str) -> DocumentStoreResult<Revision>;
    async fn get_revision(&self, id: &str, rev: &RevisionId) -> DocumentStoreResult<Revision>;
    async fn delete(&self, id: &str, expected: &RevisionId) -> DocumentStoreResult<RevisionId>;
    async fn insert_revision(&self, id: &str, revision: Revision) -> DocumentStoreResult<()>;
    async fn conflicts(&self, id: &str) -> DocumentStoreResult<Vec<RevisionId>>;
    async fn all_ids(&self) -> DocumentStoreResult<Vec<String>>;
    async fn find(&self, request: FindRequest) -> DocumentStoreResult<ResultCursor>;
    async fn create_index(
        &self,
        design_doc: &str,
        name: &str,
        definition: Value,
    ) -> DocumentStoreResult<()>;
    async fn get_indexes(&self) -> DocumentStoreResult<Vec<IndexInfo>>;
    async fn delete_index(&self, design_doc: &str, name: &str) -> DocumentStoreResult<()>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[async_trait]
impl<B: StoreBackend + Send + Sync + 'static> DynStoreBackend for B {
    async fn put(
        &self,
        id: &str,
        fields: Fields,
        expected: Option<&RevisionId>,
    ) -> DocumentStoreResult<RevisionId> {
        StoreBackend::put(self, id, fields, expected).await
    }

    async fn post(&self, fields: Fields) -> DocumentStoreResult<(String, RevisionId)> {
        StoreBackend::post(self, fields).await
    }

    async fn get(&self, id: &str) -> DocumentStoreResult<Revision> {
        StoreBackend::get(self, id).await
    }

    async fn get_revision(&self, id: &str, rev: &RevisionId) -> DocumentStoreResult<Revision> {
        StoreBackend::get_revision(self, id, rev).await
    }

    async fn delete(&self, id: &str, expected: &RevisionId) -> DocumentStoreResult<RevisionId> {
        StoreBackend::delete(self, id, expected).await
    }

    async fn insert_revision(&self, id: &str, revision: Revision) -> DocumentStoreResult<()> {
        StoreBackend::insert_revision(self, id, revision).await
    }

    async fn conflicts(&self, id: &str) -> DocumentStoreResult<Vec<RevisionId>> {
        StoreBackend::conflicts(self, id).await
    }

    async fn all_ids(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::all_ids(self).await
    }

    async fn find(&self, request: FindRequest) -> DocumentStoreResult<ResultCursor> {
        StoreBackend::find(self, request).await
    }

    async fn create_index(
        &self,
        design_doc: &str,
        name: &str,
        definition: Value,
    ) -> DocumentStoreResult<()> {
        StoreBackend::create_index(self, design_doc, name, definition).await
    }

    async fn get_indexes(&self) -> DocumentStoreResult<Vec<IndexInfo>> {
        StoreBackend::get_indexes(self).await
    }

    async fn delete_index(&self, design_doc: &str, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::delete_index(self, design_doc, name).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
