//! Credential validation contract for a server tier in front of the store.
//!
//! The store never authenticates anything itself. A server validates requests through an
//! [`AuthHandler`] before forwarding them to the store.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::DocumentStoreResult;

/// Validates user credentials and reports user roles.
#[async_trait]
pub trait AuthHandler: Send + Sync + Debug {
    /// Returns `true` if the credentials are valid, `false` otherwise.
    async fn validate(&self, username: &str, password: &str) -> DocumentStoreResult<bool>;

    /// Returns the roles to which the user belongs.
    async fn roles(&self, username: &str) -> DocumentStoreResult<Vec<String>>;
}
