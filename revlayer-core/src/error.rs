//! Error types and result types for document store operations.
//!
//! This module provides the error taxonomy shared by every store operation.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.
//!
//! Errors fall into two groups:
//!
//! - **Recoverable**: [`DocumentStoreError::DocumentNotFound`], [`DocumentStoreError::RevisionNotFound`]
//!   and [`DocumentStoreError::Conflict`]. Callers retry with a fresh revision or treat the
//!   document as absent.
//! - **Permanent**: everything else, including [`DocumentStoreError::Unsupported`] which marks
//!   a documented capability gap (index management).

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between documents and field maps.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store or collaborator initialization.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// No document with the given ID exists.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),
    /// The document exists but the given revision never existed for it.
    /// The first argument is the document ID, the second is the revision ID.
    #[error("Revision {1} not found for document {0}")]
    RevisionNotFound(String, String),
    /// A write targeted a revision that is not the document's current winning leaf.
    #[error("Document update conflict: {0}")]
    Conflict(String),
    /// A selector, request or document failed structural validation.
    #[error("Validation error: {0}")]
    Validation(String),
    /// The operation is a deliberate capability gap of this store.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns `true` for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::DocumentNotFound(_) | DocumentStoreError::RevisionNotFound(_, _)
        )
    }

    /// Returns `true` if the error is a stale-revision conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DocumentStoreError::Conflict(_))
    }

    /// Returns `true` if the caller can recover, either by retrying with a fresh
    /// revision or by treating the document as absent.
    pub fn is_recoverable(&self) -> bool {
        self.is_not_found() || self.is_conflict()
    }

    /// Maps the error onto the HTTP status code a server tier should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            DocumentStoreError::DocumentNotFound(_) | DocumentStoreError::RevisionNotFound(_, _) => 404,
            DocumentStoreError::Conflict(_) => 409,
            DocumentStoreError::Validation(_) | DocumentStoreError::Serialization(_) => 400,
            DocumentStoreError::Unsupported(_) => 501,
            DocumentStoreError::Initialization(_) | DocumentStoreError::Backend(_) => 500,
        }
    }
}

/// A specialized `Result` type for document store operations.
///
/// This type alias is used throughout the crate to indicate operations that may fail
/// with a [`DocumentStoreError`].
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
