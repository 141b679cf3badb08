//! Convenient re-exports of commonly used types from revlayer.
//!
//! ```ignore
//! use revlayer::prelude::*;
//! ```
//!
//! This provides access to:
//! - The document store front ends and backend traits
//! - Revisions and revision identifiers
//! - Selector construction and Find requests
//! - Result cursors and error types

pub use revlayer_core::{
    auth::AuthHandler,
    backend::{DynStoreBackend, IndexInfo, StoreBackend, StoreBackendBuilder},
    cursor::{CursorState, ResultCursor, Row},
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{FindRequest, FindRequestBuilder, IndexSpec, Sort, SortDirection},
    revision::{Fields, Revision, RevisionId, RevisionTree, resolve_winner},
    selector::{FieldOp, FieldPath, Filter, Selector, SelectorVisitor, ValueType},
    store::{DocumentStore, DynDocumentStore, IntoDynDocumentStore},
    typed::TypedDocuments,
};
