//! URL handling for an HTTP relay in front of a backend document server.
//!
//! A relay forwards request and response bytes unmodified. Only two things are rewritten:
//! the request URL, which is mapped onto the backend's base URL, and the `Location`
//! response header, whose path is grafted back onto the client's original URL.
//!
//! ```ignore
//! let relay = Relay::new("http://db.internal:5984/couch/")?;
//! let request: Url = "https://bob:pw@api.example.com/users/alice?rev=1-abc".parse()?;
//!
//! assert_eq!(
//!     relay.backend_url(&request)?,
//!     "http://bob:pw@db.internal:5984/couch/users/alice?rev=1-abc",
//! );
//! assert_eq!(
//!     Relay::rewrite_location(&request, "http://db.internal:5984/users/bob")?,
//!     "https://api.example.com/users/bob?rev=1-abc",
//! );
//! ```

use tracing::trace;
use url::Url;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Methods a strict relay forwards; anything else is rejected up front.
pub const SUPPORTED_METHODS: [&str; 6] = ["GET", "HEAD", "POST", "PUT", "DELETE", "COPY"];

/// Maps client request URLs onto a backend server.
#[derive(Debug, Clone)]
pub struct Relay {
    base: Url,
    // Base path without its trailing slash.
    path: String,
    strict_methods: bool,
}

impl Relay {
    /// Creates a relay forwarding to `server_url`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] if the URL is empty, does not parse,
    /// has no host or carries credentials.
    pub fn new(server_url: &str) -> DocumentStoreResult<Self> {
        if server_url.is_empty() {
            return Err(DocumentStoreError::Initialization("no URL specified".to_string()));
        }

        let base = Url::parse(server_url)
            .map_err(|e| DocumentStoreError::Initialization(format!("invalid relay URL: {e}")))?;

        // Credentials are forwarded from each request, which needs a non-file host.
        if base.host_str().is_none_or(str::is_empty) || base.scheme() == "file" {
            return Err(DocumentStoreError::Initialization(format!(
                "relay URL must name a host: {server_url}"
            )));
        }

        if !base.username().is_empty() || base.password().is_some() {
            return Err(DocumentStoreError::Initialization(
                "relay URL must not contain auth credentials".to_string(),
            ));
        }

        let path = base.path().trim_end_matches('/').to_string();

        Ok(Self { base, path, strict_methods: false })
    }

    /// Rejects non-standard methods instead of forwarding them.
    pub fn with_strict_methods(mut self, strict: bool) -> Self {
        self.strict_methods = strict;
        self
    }

    /// Returns `true` if requests with `method` should be forwarded.
    pub fn method_allowed(&self, method: &str) -> bool {
        !self.strict_methods || SUPPORTED_METHODS.contains(&method)
    }

    /// Maps a client request URL onto the backend: backend scheme and host, the request's
    /// credentials, the backend's base path followed by the request path, and the request's
    /// query string.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Validation`] if the request credentials cannot be set
    /// on the backend URL.
    pub fn backend_url(&self, request: &Url) -> DocumentStoreResult<String> {
        let mut mapped = self.base.clone();
        mapped.set_path(&format!("{}/{}", self.path, request.path().trim_start_matches('/')));
        mapped.set_query(request.query());
        mapped.set_fragment(None);
        set_credentials(&mut mapped, request.username(), request.password())?;

        trace!(request = %request.path(), backend = %mapped.path(), "mapped relay request");
        Ok(mapped.to_string())
    }

    /// Rewrites a backend `Location` header so it points back through the relay.
    ///
    /// Only the path is taken from `location`; scheme, host and query string come from the
    /// client's original request. Relative locations are resolved against the request.
    /// Request credentials are never echoed back to the client.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Validation`] if `location` cannot be parsed.
    pub fn rewrite_location(request: &Url, location: &str) -> DocumentStoreResult<String> {
        let located = Url::options()
            .base_url(Some(request))
            .parse(location)
            .map_err(|e| DocumentStoreError::Validation(format!("invalid Location header: {e}")))?;

        let mut rewritten = request.clone();
        rewritten.set_path(located.path());
        rewritten.set_fragment(None);
        // URLs without a host cannot hold credentials.
        if rewritten.has_host() {
            set_credentials(&mut rewritten, "", None)?;
        }

        trace!(location, rewritten = %rewritten, "rewrote Location header");
        Ok(rewritten.to_string())
    }
}

fn set_credentials(url: &mut Url, username: &str, password: Option<&str>) -> DocumentStoreResult<()> {
    let invalid = |url: &Url| DocumentStoreError::Validation(format!("{} URL cannot carry credentials", url.scheme()));

    url.set_username(username).map_err(|()| invalid(url))?;
    url.set_password(password).map_err(|()| invalid(url))
}
