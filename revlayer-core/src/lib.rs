//! Core types and traits for an in-memory, multi-version JSON document store.
//!
//! This crate is the core of the revlayer project and provides:
//!
//! - **Revisions** ([`revision`]) - Revision identities, the per-document revision arena and
//!   deterministic winner resolution
//! - **Selectors** ([`selector`]) - Mango-style selector parsing and the selector tree
//! - **Find requests** ([`query`]) - Pagination, sorting, projection and index hints
//! - **Result cursors** ([`cursor`]) - Single-pass cursors over Find results
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Document store** ([`store`]) - Main interface for working with a backend
//! - **Typed documents** ([`document`], [`typed`]) - Serde types stored as field maps
//! - **Error handling** ([`error`]) - Error taxonomy and result types
//! - **Collaborators** ([`auth`], [`relay`]) - Contracts for the server tier around the store
//!
//! # Example
//!
//! ```ignore
//! use revlayer::prelude::*;
//! use serde_json::json;
//!
//! let rev = store.put("d1", json!({"age": 35}), None).await?;
//! let cursor = store
//!     .find_json(&json!({"selector": {"age": {"$gt": 30}}}))
//!     .await?;
//! assert_eq!(cursor.total_rows(), 1);
//! ```

pub mod auth;
pub mod backend;
pub mod cursor;
pub mod document;
pub mod error;
pub mod query;
pub mod relay;
pub mod revision;
pub mod selector;
pub mod store;
pub mod typed;
