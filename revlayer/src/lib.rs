//! Main revlayer crate providing a unified interface for the multi-version document store.
//!
//! This crate is the primary entry point for users of revlayer. It re-exports the core
//! types and functionality from the sub-crates and provides access to the in-memory backend.
//!
//! # Features
//!
//! - **Multi-version documents** - Every write appends a revision; the current state is the
//!   deterministically chosen winning leaf
//! - **Optimistic concurrency** - Writes name the revision they replace and fail with a
//!   conflict when it is stale
//! - **Mango selectors** - Declarative JSON queries with sorting, pagination and projection
//! - **Typed documents** - Define your data structures with Serde and store them as field maps
//!
//! # Quick Start
//!
//! ```ignore
//! use revlayer::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await.unwrap());
//!
//!     let r1 = store.put("alice", json!({"name": "Alice", "age": 35}), None).await.unwrap();
//!
//!     // A write without the current revision is rejected.
//!     assert!(store.put("alice", json!({"age": 36}), None).await.unwrap_err().is_conflict());
//!     store.put("alice", json!({"name": "Alice", "age": 36}), Some(&r1)).await.unwrap();
//!
//!     let cursor = store
//!         .find(
//!             FindRequest::builder(Filter::gt("age", 30))
//!                 .sort("name", SortDirection::Asc)
//!                 .limit(10)
//!                 .build(),
//!         )
//!         .await
//!         .unwrap();
//!
//!     println!("{} matching documents", cursor.total_rows());
//!
//!     store.shutdown().await.unwrap();
//! }
//! ```
//!
//! # Typed Documents
//!
//! ```ignore
//! use revlayer::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(skip)]
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! impl Document for User {
//!     fn id(&self) -> &str { &self.id }
//! }
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let users = store.typed::<User>();
//! let rev = users.put(&User { id: "u1".into(), name: "Alice".into() }, None).await?;
//! let (user, current) = users.get("u1").await?;
//! ```
//!
//! # Dynamic Dispatch
//!
//! A typed `DocumentStore` can be converted into a dynamically dispatched store with
//! `into_dyn`, for scenarios where the backend is chosen at runtime.
//!
//! ```ignore
//! use revlayer::{prelude::*, memory::InMemoryStore};
//!
//! let dyn_store = DocumentStore::new(InMemoryStore::new()).into_dyn();
//! dyn_store.put("d1", serde_json::json!({"x": 1}), None).await?;
//!
//! // The concrete backend is still reachable.
//! assert!(dyn_store.downcast_backend::<InMemoryStore>().is_some());
//! dyn_store.shutdown().await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage

pub mod prelude;

pub use revlayer_core::{auth, backend, cursor, document, error, query, relay, revision, selector, store, typed};

// Re-export serde_json for building document bodies and selectors
pub use serde_json;

/// In-memory storage backend implementations.
pub mod memory {
    pub use revlayer_memory::{InMemoryAuthHandler, InMemoryStore, InMemoryStoreBuilder};
}
