//! In-memory multi-version document store backend for revlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! Every document keeps its full revision history; the current state of a document is the
//! deterministically chosen winning leaf of that history.
//!
//! # Features
//!
//! - **Per-document exclusivity** - Writes to one document are serialized behind its own
//!   async-aware RwLock and checked against the current winner
//! - **Revision history** - Old revisions stay readable and imported branches surface as conflicts
//! - **Mango selectors** - Find evaluates selectors, sorts, paginates and projects by full scan
//! - **Auth reference handler** - A static credential table implementing `AuthHandler`
//!
//! # Quick Start
//!
//! ```ignore
//! use revlayer::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!
//!     let rev = store.put("alice", json!({"age": 35}), None).await?;
//!     store.put("alice", json!({"age": 36}), Some(&rev)).await?;
//!
//!     let cursor = store
//!         .find_json(&json!({"selector": {"age": {"$gt": 30}}}))
//!         .await?;
//!     for row in cursor {
//!         println!("{} {}", row.id, row.rev);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
mod evaluator;
mod find;
pub mod store;

pub use auth::InMemoryAuthHandler;
pub use store::{InMemoryStore, InMemoryStoreBuilder};
