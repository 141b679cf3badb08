//! Static credential table implementing [`AuthHandler`].

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use revlayer_core::{
    auth::AuthHandler,
    error::{DocumentStoreError, DocumentStoreResult},
};

#[derive(Debug, Clone)]
struct Account {
    /// Argon2id hash in PHC string format.
    password_hash: String,
    roles: Vec<String>,
}

/// An [`AuthHandler`] over a fixed set of users.
///
/// Passwords are never kept in the clear; each account stores a salted Argon2id hash.
/// Unknown users fail validation and have no roles.
///
/// # Example
///
/// ```ignore
/// use revlayer_memory::InMemoryAuthHandler;
///
/// let auth = InMemoryAuthHandler::new()
///     .with_user("admin", "s3cret", ["_admin"])?;
/// assert!(auth.validate("admin", "s3cret").await?);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthHandler {
    accounts: HashMap<String, Account>,
    params: Params,
}

impl InMemoryAuthHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Argon2 cost parameters used for users added afterwards.
    ///
    /// Existing hashes keep the parameters they were created with.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Adds or replaces a user.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] if the password cannot be hashed.
    pub fn with_user<I, R>(mut self, username: &str, password: &str, roles: I) -> DocumentStoreResult<Self>
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let password_hash = self.hash_password(password)?;

        self.accounts.insert(
            username.to_string(),
            Account {
                password_hash,
                roles: roles.into_iter().map(Into::into).collect(),
            },
        );
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn hash_password(&self, password: &str) -> DocumentStoreResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DocumentStoreError::Initialization(format!("password hashing failed: {e}")))
    }
}

#[async_trait]
impl AuthHandler for InMemoryAuthHandler {
    async fn validate(&self, username: &str, password: &str) -> DocumentStoreResult<bool> {
        let Some(account) = self.accounts.get(username) else {
            debug!(username, "rejected credentials for unknown user");
            return Ok(false);
        };

        let parsed = PasswordHash::new(&account.password_hash)
            .map_err(|e| DocumentStoreError::Backend(format!("stored password hash is invalid: {e}")))?;

        // Verification reads the cost parameters from the PHC string and compares in
        // constant time.
        let valid = Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();

        if !valid {
            debug!(username, "rejected credentials");
        }

        Ok(valid)
    }

    async fn roles(&self, username: &str) -> DocumentStoreResult<Vec<String>> {
        Ok(self
            .accounts
            .get(username)
            .map(|account| account.roles.clone())
            .unwrap_or_default())
    }
}
