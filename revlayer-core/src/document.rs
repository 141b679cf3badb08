//! Traits for mapping typed documents onto field maps.
//!
//! The store itself only deals in [`Fields`]. Any serde type that knows its own ID can be
//! stored through [`TypedDocuments`](crate::typed::TypedDocuments) by implementing
//! [`Document`]; [`DocumentExt`] provides the conversions.

use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    revision::Fields,
};

/// Core trait that all typed documents must implement.
///
/// # Example
///
/// ```ignore
/// use revlayer::document::Document;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     pub id: String,
///     pub name: String,
///     pub age: u32,
/// }
///
/// impl Document for User {
///     fn id(&self) -> &str {
///         &self.id
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns the identifier this document is stored under.
    fn id(&self) -> &str;
}

/// Extension trait providing field map conversions for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a field map.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the document does not serialize to a
    /// JSON object.
    fn to_fields(&self) -> DocumentStoreResult<Fields>;

    /// Creates a document from a field map.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_fields(fields: Fields) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_fields(&self) -> DocumentStoreResult<Fields> {
        match to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(DocumentStoreError::Validation(format!(
                "Document must serialize to a JSON object, got {other}"
            ))),
        }
    }

    fn from_fields(fields: Fields) -> DocumentStoreResult<Self> {
        Ok(from_value(Value::Object(fields))?)
    }
}
