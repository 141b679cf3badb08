//! Find requests: selector, pagination, sorting, projection and index hints.
//!
//! A [`FindRequest`] is either parsed from a JSON request body with
//! [`FindRequest::from_json`] or built with the fluent [`FindRequestBuilder`]:
//!
//! ```ignore
//! use revlayer::{query::{FindRequest, SortDirection}, selector::Filter};
//!
//! let request = FindRequest::builder(Filter::gt("age", 30))
//!     .sort("age", SortDirection::Desc)
//!     .skip(10)
//!     .limit(10)
//!     .fields(["name", "age"])
//!     .build();
//! ```
//!
//! The JSON form follows Mango conventions:
//!
//! ```json
//! {
//!   "selector": { "age": { "$gt": 30 } },
//!   "limit": 10,
//!   "skip": 10,
//!   "sort": [{ "age": "desc" }, "name"],
//!   "fields": ["name", "age"],
//!   "use_index": ["_design/people", "by-age"]
//! }
//! ```

use serde_json::{Map, Value};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    selector::{FieldPath, Selector},
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (missing values first).
    #[default]
    Asc,
    /// Descending order (missing values last).
    Desc,
}

/// Sort specification for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field path to sort by.
    pub field: FieldPath,
    /// The sort direction.
    pub direction: SortDirection,
}

/// An index hint: a design document, optionally narrowed to one named index.
///
/// Hints are validated but have no effect, since the engine always scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub design_doc: String,
    pub index: Option<String>,
}

impl IndexSpec {
    /// Parses an index hint given either as `"ddoc"` or as `["ddoc"]` / `["ddoc", "index"]`.
    pub fn from_json(value: &Value) -> DocumentStoreResult<Self> {
        let invalid = || DocumentStoreError::Validation("invalid index specification".to_string());

        match value {
            Value::String(design_doc) => Ok(IndexSpec { design_doc: design_doc.clone(), index: None }),
            Value::Array(items) if matches!(items.len(), 1 | 2) => {
                let mut names = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid));
                let design_doc = names.next().ok_or_else(invalid)??;
                let index = names.next().transpose()?;

                Ok(IndexSpec { design_doc, index })
            }
            _ => Err(invalid()),
        }
    }
}

/// A structured Find request.
#[derive(Debug, Clone)]
pub struct FindRequest {
    /// The selector every returned document must match.
    pub selector: Selector,
    /// Maximum number of rows to return; `None` is unbounded.
    pub limit: Option<usize>,
    /// Number of matches to skip before returning rows.
    pub skip: usize,
    /// Sort keys, most significant first. Empty keeps document ID order.
    pub sort: Vec<Sort>,
    /// Projection of returned fields; `None` returns every field.
    pub fields: Option<Vec<FieldPath>>,
    /// Index hint. Accepted and validated, never used.
    pub use_index: Option<IndexSpec>,
    /// Whether documents whose winning revision is a tombstone are scanned too.
    pub include_deleted: bool,
}

impl FindRequest {
    /// Creates a request for `selector` with no pagination, sorting or projection.
    pub fn new(selector: Selector) -> Self {
        FindRequest {
            selector,
            limit: None,
            skip: 0,
            sort: Vec::new(),
            fields: None,
            use_index: None,
            include_deleted: false,
        }
    }

    /// Creates a new request builder for fluent construction.
    pub fn builder(selector: Selector) -> FindRequestBuilder {
        FindRequestBuilder::new(selector)
    }

    /// Parses and validates a JSON request body.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Validation`] if the body is not an object, the selector
    /// is missing or malformed, or any optional key has the wrong shape.
    pub fn from_json(value: &Value) -> DocumentStoreResult<Self> {
        let Value::Object(body) = value else {
            return Err(DocumentStoreError::Validation("Find request must be a JSON object".to_string()));
        };

        let selector = match body.get("selector") {
            Some(selector) if !selector.is_null() => Selector::parse(selector)?,
            _ => return Err(DocumentStoreError::Validation("Missing required key: selector".to_string())),
        };

        let mut request = FindRequest::new(selector);
        request.limit = optional_count(body, "limit")?;
        request.skip = optional_count(body, "skip")?.unwrap_or(0);

        if let Some(sort) = body.get("sort") {
            request.sort = parse_sort(sort)?;
        }

        if let Some(fields) = body.get("fields") {
            request.fields = Some(parse_fields(fields)?);
        }

        if let Some(use_index) = body.get("use_index") {
            request.use_index = Some(IndexSpec::from_json(use_index)?);
        }

        if let Some(include_deleted) = body.get("include_deleted") {
            request.include_deleted = include_deleted
                .as_bool()
                .ok_or_else(|| DocumentStoreError::Validation("include_deleted must be a boolean".to_string()))?;
        }

        Ok(request)
    }
}

impl TryFrom<&Value> for FindRequest {
    type Error = DocumentStoreError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        FindRequest::from_json(value)
    }
}

fn optional_count(body: &Map<String, Value>, key: &str) -> DocumentStoreResult<Option<usize>> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| DocumentStoreError::Validation(format!("{key} must be a non-negative integer"))),
    }
}

fn parse_sort(value: &Value) -> DocumentStoreResult<Vec<Sort>> {
    let invalid = |detail: &str| DocumentStoreError::Validation(format!("Invalid sort: {detail}"));

    let Value::Array(items) = value else {
        return Err(invalid("expected an array"));
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(field) => Ok(Sort {
                field: FieldPath::parse(field)?,
                direction: SortDirection::Asc,
            }),
            Value::Object(spec) if spec.len() == 1 => {
                let Some((field, direction)) = spec.iter().next() else {
                    return Err(invalid("empty sort object"));
                };
                let direction = match direction.as_str() {
                    Some("asc") => SortDirection::Asc,
                    Some("desc") => SortDirection::Desc,
                    _ => return Err(invalid("direction must be \"asc\" or \"desc\"")),
                };

                Ok(Sort { field: FieldPath::parse(field)?, direction })
            }
            _ => Err(invalid("entries must be field names or {field: direction} objects")),
        })
        .collect()
}

fn parse_fields(value: &Value) -> DocumentStoreResult<Vec<FieldPath>> {
    let invalid = || DocumentStoreError::Validation("fields must be an array of strings".to_string());

    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|item| FieldPath::parse(item.as_str().ok_or_else(invalid)?))
        .collect()
}

/// Builder for [`FindRequest`].
#[derive(Debug, Clone)]
pub struct FindRequestBuilder {
    request: FindRequest,
}

impl FindRequestBuilder {
    /// Creates a new builder for the given selector.
    pub fn new(selector: Selector) -> Self {
        FindRequestBuilder { request: FindRequest::new(selector) }
    }

    /// Sets the maximum number of rows to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.request.limit = Some(limit);
        self
    }

    /// Sets the number of matches to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.request.skip = skip;
        self
    }

    /// Appends a sort key. Keys added first are most significant.
    pub fn sort(mut self, field: impl Into<FieldPath>, direction: SortDirection) -> Self {
        self.request.sort.push(Sort { field: field.into(), direction });
        self
    }

    /// Restricts returned rows to the given field paths.
    pub fn fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldPath>,
    {
        self.request.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the index hint.
    pub fn use_index(mut self, design_doc: impl Into<String>, index: Option<String>) -> Self {
        self.request.use_index = Some(IndexSpec { design_doc: design_doc.into(), index });
        self
    }

    /// Includes documents whose winning revision is a tombstone.
    pub fn include_deleted(mut self, include: bool) -> Self {
        self.request.include_deleted = include;
        self
    }

    /// Builds and returns the final request.
    pub fn build(self) -> FindRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validation_message(value: Value) -> String {
        match FindRequest::from_json(&value) {
            Err(DocumentStoreError::Validation(message)) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_full_request() {
        let request = FindRequest::from_json(&json!({
            "selector": {"age": {"$gt": 30}},
            "limit": 5,
            "skip": 2,
            "sort": [{"age": "desc"}, "name"],
            "fields": ["name", "address.city"],
            "use_index": ["_design/people", "by-age"],
            "include_deleted": true
        }))
        .unwrap();

        assert_eq!(request.limit, Some(5));
        assert_eq!(request.skip, 2);
        assert_eq!(request.sort.len(), 2);
        assert_eq!(request.sort[0].direction, SortDirection::Desc);
        assert_eq!(request.sort[1].field.to_string(), "name");
        assert_eq!(request.fields.as_ref().map(Vec::len), Some(2));
        assert_eq!(
            request.use_index,
            Some(IndexSpec { design_doc: "_design/people".into(), index: Some("by-age".into()) })
        );
        assert!(request.include_deleted);
    }

    #[test]
    fn test_defaults() {
        let request = FindRequest::from_json(&json!({"selector": {}})).unwrap();

        assert_eq!(request.limit, None);
        assert_eq!(request.skip, 0);
        assert!(request.sort.is_empty());
        assert!(request.fields.is_none());
        assert!(!request.include_deleted);
    }

    #[test]
    fn test_missing_selector() {
        assert_eq!(validation_message(json!({"limit": 1})), "Missing required key: selector");
        assert_eq!(validation_message(json!({"selector": null})), "Missing required key: selector");
    }

    #[test]
    fn test_malformed_selector_aborts() {
        validation_message(json!({"selector": {"a": {"$in": 3}}}));
    }

    #[test]
    fn test_use_index_shapes() {
        assert_eq!(
            IndexSpec::from_json(&json!("_design/x")).unwrap(),
            IndexSpec { design_doc: "_design/x".into(), index: None }
        );
        assert_eq!(
            IndexSpec::from_json(&json!(["_design/x"])).unwrap(),
            IndexSpec { design_doc: "_design/x".into(), index: None }
        );

        for bad in [json!([]), json!(["a", "b", "c"]), json!([1]), json!(5), json!({"ddoc": "x"})] {
            assert_eq!(
                IndexSpec::from_json(&bad),
                Err(DocumentStoreError::Validation("invalid index specification".into()))
            );
        }
    }

    #[test]
    fn test_rejects_bad_shapes() {
        validation_message(json!("selector"));
        validation_message(json!({"selector": {}, "limit": -1}));
        validation_message(json!({"selector": {}, "skip": "1"}));
        validation_message(json!({"selector": {}, "sort": "age"}));
        validation_message(json!({"selector": {}, "sort": [{"age": "up"}]}));
        validation_message(json!({"selector": {}, "sort": [{"a": "asc", "b": "asc"}]}));
        validation_message(json!({"selector": {}, "fields": "name"}));
        validation_message(json!({"selector": {}, "fields": [1]}));
        validation_message(json!({"selector": {}, "include_deleted": "yes"}));
    }

    #[test]
    fn test_builder() {
        let request = FindRequest::builder(Selector::all())
            .limit(1)
            .skip(1)
            .sort("age", SortDirection::Asc)
            .fields(["name"])
            .use_index("_design/x", None)
            .include_deleted(true)
            .build();

        assert_eq!(request.limit, Some(1));
        assert_eq!(request.skip, 1);
        assert_eq!(request.sort.len(), 1);
        assert!(request.use_index.is_some());
        assert!(request.include_deleted);
    }
}
