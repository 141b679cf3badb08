//! Mango-style selector parsing and the selector tree.
//!
//! A selector is a recursive boolean expression evaluated against a document's fields.
//! Selectors are usually parsed from JSON with [`Selector::parse`]:
//!
//! ```ignore
//! use revlayer::selector::Selector;
//! use serde_json::json;
//!
//! let selector = Selector::parse(&json!({
//!     "age": { "$gt": 30 },
//!     "$or": [{ "role": "admin" }, { "tags": { "$all": ["ops"] } }]
//! }))?;
//! ```
//!
//! or built programmatically with [`Filter`]:
//!
//! ```ignore
//! use revlayer::selector::Filter;
//!
//! let selector = Filter::gt("age", 30).and(Filter::exists("email"));
//! ```
//!
//! Parsing is strict. Unknown operators, operands of the wrong shape and combinators whose
//! value is not a list all fail with [`DocumentStoreError::Validation`]. A selector that
//! parses is guaranteed to evaluate without error.
//!
//! Evaluation is left to backends, which walk the tree through [`SelectorVisitor`].

use regex::Regex;
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A dotted path addressing a value inside a document.
///
/// Segments are separated by `.`; a literal dot is written `\.`. When a segment meets a
/// list, a numeric segment indexes into it. The empty path addresses the value under
/// evaluation itself and only occurs inside `$elemMatch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parses a dotted path, rejecting empty paths and empty segments.
    pub fn parse(path: &str) -> DocumentStoreResult<Self> {
        let parsed = Self::from(path);

        if parsed.segments.is_empty() || parsed.segments.iter().any(String::is_empty) {
            return Err(DocumentStoreError::Validation(format!("Invalid field path: {path:?}")));
        }

        Ok(parsed)
    }

    /// The empty path, addressing the value under evaluation.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns a new path with `other`'s segments appended to this one.
    pub fn join(&self, other: &FieldPath) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        FieldPath { segments }
    }

    /// Resolves this path inside a document's field map.
    ///
    /// The root path never resolves against a field map.
    pub fn resolve<'a>(&self, fields: &'a Map<String, Value>) -> Option<&'a Value> {
        let (first, rest) = self.segments.split_first()?;
        descend(fields.get(first)?, rest)
    }

    /// Resolves this path inside an arbitrary value.
    pub fn resolve_in<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        descend(value, &self.segments)
    }
}

fn descend<'a>(mut current: &'a Value, segments: &[String]) -> Option<&'a Value> {
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        if path.is_empty() {
            return FieldPath::root();
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = path.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&'.') => {
                    current.push('.');
                    chars.next();
                }
                '.' => segments.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        segments.push(current);

        FieldPath { segments }
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        FieldPath::from(path.as_str())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .segments
            .iter()
            .map(|s| s.replace('.', "\\."))
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&rendered)
    }
}

/// The kinds a field value can have, as named by `$type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl ValueType {
    /// Returns the kind of a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Boolean,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

impl FromStr for ValueType {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(ValueType::Null),
            "boolean" => Ok(ValueType::Boolean),
            "number" => Ok(ValueType::Number),
            "string" => Ok(ValueType::String),
            "array" => Ok(ValueType::Array),
            "object" => Ok(ValueType::Object),
            other => Err(DocumentStoreError::Validation(format!("Unknown $type: {other}"))),
        }
    }
}

/// Field condition operators.
#[derive(Debug, Clone)]
pub enum FieldOp {
    /// Deep equality (`$eq`, or a bare field-value pair).
    Eq(Value),
    /// Present and not deep-equal (`$ne`).
    Ne(Value),
    /// Greater than (`$gt`).
    Gt(Value),
    /// Greater than or equal to (`$gte`).
    Gte(Value),
    /// Less than (`$lt`).
    Lt(Value),
    /// Less than or equal to (`$lte`).
    Lte(Value),
    /// Deep-equal to one of the values (`$in`).
    In(Vec<Value>),
    /// Present and deep-equal to none of the values (`$nin`).
    Nin(Vec<Value>),
    /// Presence check (`$exists`).
    Exists(bool),
    /// Kind check (`$type`).
    Type(ValueType),
    /// String pattern match (`$regex`).
    Regex(Regex),
    /// List containing every one of the values (`$all`).
    All(Vec<Value>),
    /// List with at least one element matching the nested selector (`$elemMatch`).
    ElemMatch(Box<Selector>),
    /// List of exactly this length (`$size`).
    Size(usize),
    /// Integer with the given remainder for the given divisor (`$mod`).
    Mod(i64, i64),
}

/// A parsed selector tree.
#[derive(Debug, Clone)]
pub enum Selector {
    /// Every child must match. An empty list matches everything.
    And(Vec<Selector>),
    /// At least one child must match. An empty list matches nothing.
    Or(Vec<Selector>),
    /// Inverts the child.
    Not(Box<Selector>),
    /// No child may match.
    Nor(Vec<Selector>),
    /// A condition on the value at `path`.
    Field {
        /// The addressed field.
        path: FieldPath,
        /// The condition applied to it.
        op: FieldOp,
    },
}

impl Selector {
    /// Parses a JSON selector expression.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Validation`] on unknown operators, operands of the
    /// wrong shape, malformed combinators or invalid field paths.
    pub fn parse(value: &Value) -> DocumentStoreResult<Selector> {
        parse_selector(value, false)
    }

    /// A selector that matches every document.
    pub fn all() -> Selector {
        Selector::And(Vec::new())
    }

    /// Creates a field condition.
    pub fn field(path: impl Into<FieldPath>, op: FieldOp) -> Self {
        Selector::Field { path: path.into(), op }
    }

    /// Combines this selector with another using logical AND.
    pub fn and(self, other: Selector) -> Self {
        match self {
            Selector::And(mut list) => {
                list.push(other);
                Selector::And(list)
            }
            _ => Selector::And(vec![self, other]),
        }
    }

    /// Combines this selector with another using logical OR.
    pub fn or(self, other: Selector) -> Self {
        match self {
            Selector::Or(mut list) => {
                list.push(other);
                Selector::Or(list)
            }
            _ => Selector::Or(vec![self, other]),
        }
    }

    /// Negates this selector.
    pub fn not(self) -> Self {
        Selector::Not(Box::new(self))
    }
}

impl TryFrom<&Value> for Selector {
    type Error = DocumentStoreError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Selector::parse(value)
    }
}

impl TryFrom<Value> for Selector {
    type Error = DocumentStoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Selector::parse(&value)
    }
}

fn invalid(message: impl Into<String>) -> DocumentStoreError {
    DocumentStoreError::Validation(message.into())
}

fn conjunction(mut clauses: Vec<Selector>) -> Selector {
    if clauses.len() == 1 {
        if let Some(only) = clauses.pop() {
            return only;
        }
    }

    Selector::And(clauses)
}

// `element` is set inside `$elemMatch`, where operators may address the element itself.
fn parse_selector(value: &Value, element: bool) -> DocumentStoreResult<Selector> {
    let Value::Object(map) = value else {
        return Err(invalid("Selector must be a JSON object"));
    };

    let clauses = map
        .iter()
        .map(|(key, operand)| parse_clause(key, operand, element))
        .collect::<DocumentStoreResult<Vec<_>>>()?;

    Ok(conjunction(clauses))
}

fn parse_selector_list(op: &str, value: &Value, element: bool) -> DocumentStoreResult<Vec<Selector>> {
    let Value::Array(items) = value else {
        return Err(invalid(format!("{op} requires an array of selectors")));
    };

    items
        .iter()
        .map(|item| parse_selector(item, element))
        .collect()
}

fn parse_clause(key: &str, operand: &Value, element: bool) -> DocumentStoreResult<Selector> {
    match key {
        "$and" => Ok(Selector::And(parse_selector_list(key, operand, element)?)),
        "$or" => Ok(Selector::Or(parse_selector_list(key, operand, element)?)),
        "$nor" => Ok(Selector::Nor(parse_selector_list(key, operand, element)?)),
        "$not" => {
            if !operand.is_object() {
                return Err(invalid("$not requires a selector object"));
            }
            Ok(parse_selector(operand, element)?.not())
        }
        op if op.starts_with('$') => {
            if !element {
                if is_field_operator(op) {
                    return Err(invalid(format!("Operator {op} must be applied to a field")));
                }
                return Err(invalid(format!("Unknown operator: {op}")));
            }
            parse_operator(&FieldPath::root(), op, operand, element)
        }
        field => parse_condition(FieldPath::parse(field)?, operand, element),
    }
}

fn is_field_operator(op: &str) -> bool {
    matches!(
        op,
        "$eq" | "$ne" | "$gt" | "$gte" | "$lt" | "$lte" | "$in" | "$nin" | "$exists" | "$type"
            | "$regex" | "$all" | "$elemMatch" | "$size" | "$mod"
    )
}

fn parse_condition(path: FieldPath, value: &Value, element: bool) -> DocumentStoreResult<Selector> {
    let map = match value {
        Value::Object(map) if !map.is_empty() => map,
        _ => return Ok(Selector::field(path, FieldOp::Eq(value.clone()))),
    };

    let operators = map.keys().filter(|k| k.starts_with('$')).count();

    if operators == 0 {
        // Nested object without operators: `{"a": {"b": 1}}` means `{"a.b": 1}`.
        let clauses = map
            .iter()
            .map(|(key, inner)| parse_condition(path.join(&FieldPath::parse(key)?), inner, element))
            .collect::<DocumentStoreResult<Vec<_>>>()?;
        return Ok(conjunction(clauses));
    }

    if operators != map.len() {
        return Err(invalid(format!("Cannot mix operators and fields under {path}")));
    }

    let clauses = map
        .iter()
        .map(|(op, operand)| parse_operator(&path, op, operand, element))
        .collect::<DocumentStoreResult<Vec<_>>>()?;

    Ok(conjunction(clauses))
}

fn parse_condition_list(path: &FieldPath, op: &str, value: &Value, element: bool) -> DocumentStoreResult<Vec<Selector>> {
    let Value::Array(items) = value else {
        return Err(invalid(format!("{op} requires an array of conditions")));
    };

    items
        .iter()
        .map(|item| parse_condition(path.clone(), item, element))
        .collect()
}

fn array_operand(op: &str, value: &Value) -> DocumentStoreResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(invalid(format!("{op} requires an array operand"))),
    }
}

fn parse_operator(path: &FieldPath, op: &str, operand: &Value, element: bool) -> DocumentStoreResult<Selector> {
    let field_op = match op {
        "$and" => return Ok(Selector::And(parse_condition_list(path, op, operand, element)?)),
        "$or" => return Ok(Selector::Or(parse_condition_list(path, op, operand, element)?)),
        "$nor" => return Ok(Selector::Nor(parse_condition_list(path, op, operand, element)?)),
        "$not" => return Ok(parse_condition(path.clone(), operand, element)?.not()),
        "$eq" => FieldOp::Eq(operand.clone()),
        "$ne" => FieldOp::Ne(operand.clone()),
        "$gt" => FieldOp::Gt(operand.clone()),
        "$gte" => FieldOp::Gte(operand.clone()),
        "$lt" => FieldOp::Lt(operand.clone()),
        "$lte" => FieldOp::Lte(operand.clone()),
        "$in" => FieldOp::In(array_operand(op, operand)?),
        "$nin" => FieldOp::Nin(array_operand(op, operand)?),
        "$all" => FieldOp::All(array_operand(op, operand)?),
        "$exists" => match operand {
            Value::Bool(flag) => FieldOp::Exists(*flag),
            _ => return Err(invalid("$exists requires a boolean operand")),
        },
        "$type" => match operand {
            Value::String(name) => FieldOp::Type(name.parse()?),
            _ => return Err(invalid("$type requires a string operand")),
        },
        "$regex" => match operand {
            Value::String(pattern) => FieldOp::Regex(
                Regex::new(pattern).map_err(|e| invalid(format!("Invalid $regex {pattern:?}: {e}")))?,
            ),
            _ => return Err(invalid("$regex requires a string operand")),
        },
        "$elemMatch" => {
            if !operand.is_object() {
                return Err(invalid("$elemMatch requires a selector object"));
            }
            FieldOp::ElemMatch(Box::new(parse_selector(operand, true)?))
        }
        "$size" => match operand.as_u64() {
            Some(size) => FieldOp::Size(size as usize),
            None => return Err(invalid("$size requires a non-negative integer operand")),
        },
        "$mod" => match operand.as_array().map(Vec::as_slice) {
            Some([divisor, remainder]) => match (divisor.as_i64(), remainder.as_i64()) {
                (Some(0), _) => return Err(invalid("$mod divisor must not be zero")),
                (Some(divisor), Some(remainder)) => FieldOp::Mod(divisor, remainder),
                _ => return Err(invalid("$mod requires integer operands")),
            },
            _ => return Err(invalid("$mod requires [divisor, remainder]")),
        },
        other => return Err(invalid(format!("Unknown operator: {other}"))),
    };

    Ok(Selector::field(path.clone(), field_op))
}

/// Helper struct for constructing selectors in code.
///
/// All methods accept field paths as `Into<FieldPath>` (dotted strings) and operands as
/// `Into<Value>`.
///
/// # Example
///
/// ```ignore
/// use revlayer::selector::Filter;
///
/// let selector = Filter::eq("name", "Alice")
///     .and(Filter::gt("age", 18));
/// ```
pub struct Filter;

impl Filter {
    /// Matches documents where the field deep-equals the value.
    pub fn eq(path: impl Into<FieldPath>, value: impl Into<Value>) -> Selector {
        Selector::field(path, FieldOp::Eq(value.into()))
    }

    /// Matches documents where the field is present and differs from the value.
    pub fn ne(path: impl Into<FieldPath>, value: impl Into<Value>) -> Selector {
        Selector::field(path, FieldOp::Ne(value.into()))
    }

    pub fn gt(path: impl Into<FieldPath>, value: impl Into<Value>) -> Selector {
        Selector::field(path, FieldOp::Gt(value.into()))
    }

    pub fn gte(path: impl Into<FieldPath>, value: impl Into<Value>) -> Selector {
        Selector::field(path, FieldOp::Gte(value.into()))
    }

    pub fn lt(path: impl Into<FieldPath>, value: impl Into<Value>) -> Selector {
        Selector::field(path, FieldOp::Lt(value.into()))
    }

    pub fn lte(path: impl Into<FieldPath>, value: impl Into<Value>) -> Selector {
        Selector::field(path, FieldOp::Lte(value.into()))
    }

    /// Matches documents where the field equals one of the values.
    pub fn is_in(path: impl Into<FieldPath>, values: impl IntoIterator<Item = impl Into<Value>>) -> Selector {
        Selector::field(path, FieldOp::In(values.into_iter().map(Into::into).collect()))
    }

    /// Matches documents where the field is present and equals none of the values.
    pub fn not_in(path: impl Into<FieldPath>, values: impl IntoIterator<Item = impl Into<Value>>) -> Selector {
        Selector::field(path, FieldOp::Nin(values.into_iter().map(Into::into).collect()))
    }

    /// Matches documents where the field is a list containing every value.
    pub fn all(path: impl Into<FieldPath>, values: impl IntoIterator<Item = impl Into<Value>>) -> Selector {
        Selector::field(path, FieldOp::All(values.into_iter().map(Into::into).collect()))
    }

    pub fn exists(path: impl Into<FieldPath>) -> Selector {
        Selector::field(path, FieldOp::Exists(true))
    }

    pub fn not_exists(path: impl Into<FieldPath>) -> Selector {
        Selector::field(path, FieldOp::Exists(false))
    }

    pub fn type_of(path: impl Into<FieldPath>, kind: ValueType) -> Selector {
        Selector::field(path, FieldOp::Type(kind))
    }

    /// Matches documents where the string field matches the pattern.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the pattern does not compile.
    pub fn regex(path: impl Into<FieldPath>, pattern: &str) -> DocumentStoreResult<Selector> {
        let regex = Regex::new(pattern)
            .map_err(|e| invalid(format!("Invalid $regex {pattern:?}: {e}")))?;
        Ok(Selector::field(path, FieldOp::Regex(regex)))
    }

    /// Matches documents where some element of the list field matches `selector`.
    pub fn elem_match(path: impl Into<FieldPath>, selector: Selector) -> Selector {
        Selector::field(path, FieldOp::ElemMatch(Box::new(selector)))
    }

    pub fn size(path: impl Into<FieldPath>, size: usize) -> Selector {
        Selector::field(path, FieldOp::Size(size))
    }

    pub fn and(selectors: impl IntoIterator<Item = Selector>) -> Selector {
        Selector::And(selectors.into_iter().collect())
    }

    pub fn or(selectors: impl IntoIterator<Item = Selector>) -> Selector {
        Selector::Or(selectors.into_iter().collect())
    }

    pub fn nor(selectors: impl IntoIterator<Item = Selector>) -> Selector {
        Selector::Nor(selectors.into_iter().collect())
    }
}

/// Walks a selector tree, one method per node kind.
///
/// Backends implement this to evaluate or translate selectors.
pub trait SelectorVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, selectors: &[Selector]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, selectors: &[Selector]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, selector: &Selector) -> Result<Self::Output, Self::Error>;
    fn visit_nor(&mut self, selectors: &[Selector]) -> Result<Self::Output, Self::Error>;
    fn visit_field(&mut self, path: &FieldPath, op: &FieldOp) -> Result<Self::Output, Self::Error>;

    fn visit_selector(&mut self, selector: &Selector) -> Result<Self::Output, Self::Error> {
        match selector {
            Selector::And(selectors) => self.visit_and(selectors),
            Selector::Or(selectors) => self.visit_or(selectors),
            Selector::Not(selector) => self.visit_not(selector),
            Selector::Nor(selectors) => self.visit_nor(selectors),
            Selector::Field { path, op } => self.visit_field(path, op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_err(value: Value) -> String {
        match Selector::parse(&value) {
            Err(DocumentStoreError::Validation(message)) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_value_is_implicit_eq() {
        let selector = Selector::parse(&json!({"name": "Alice"})).unwrap();

        match selector {
            Selector::Field { path, op: FieldOp::Eq(value) } => {
                assert_eq!(path.to_string(), "name");
                assert_eq!(value, json!("Alice"));
            }
            other => panic!("unexpected selector {other:?}"),
        }
    }

    #[test]
    fn test_multiple_fields_become_and() {
        let selector = Selector::parse(&json!({"a": 1, "b": {"$gt": 2, "$lt": 5}})).unwrap();

        match selector {
            Selector::And(clauses) => {
                assert_eq!(clauses.len(), 2);
                assert!(matches!(&clauses[1], Selector::And(inner) if inner.len() == 2));
            }
            other => panic!("unexpected selector {other:?}"),
        }
    }

    #[test]
    fn test_empty_selector_matches_all() {
        assert!(matches!(Selector::parse(&json!({})).unwrap(), Selector::And(c) if c.is_empty()));
    }

    #[test]
    fn test_nested_object_becomes_dotted_path() {
        match Selector::parse(&json!({"address": {"city": "Oslo"}})).unwrap() {
            Selector::Field { path, .. } => assert_eq!(path.segments(), ["address", "city"]),
            other => panic!("unexpected selector {other:?}"),
        }
    }

    #[test]
    fn test_field_level_combinators() {
        match Selector::parse(&json!({"age": {"$or": [{"$lt": 10}, {"$gt": 60}]}})).unwrap() {
            Selector::Or(children) => assert_eq!(children.len(), 2),
            other => panic!("unexpected selector {other:?}"),
        }

        assert!(matches!(
            Selector::parse(&json!({"age": {"$not": {"$gt": 5}}})).unwrap(),
            Selector::Not(_)
        ));
    }

    #[test]
    fn test_rejects_unknown_operator() {
        assert!(parse_err(json!({"age": {"$between": [1, 2]}})).contains("$between"));
        assert!(parse_err(json!({"$xor": []})).contains("$xor"));
    }

    #[test]
    fn test_rejects_bad_operands() {
        parse_err(json!({"age": {"$in": 5}}));
        parse_err(json!({"age": {"$nin": "x"}}));
        parse_err(json!({"age": {"$exists": "yes"}}));
        parse_err(json!({"age": {"$type": "date"}}));
        parse_err(json!({"name": {"$regex": "("}}));
        parse_err(json!({"tags": {"$elemMatch": 3}}));
        parse_err(json!({"tags": {"$size": -1}}));
        parse_err(json!({"n": {"$mod": [0, 1]}}));
        parse_err(json!({"n": {"$mod": [2]}}));
    }

    #[test]
    fn test_rejects_malformed_combinators() {
        parse_err(json!({"$and": {"a": 1}}));
        parse_err(json!({"$or": "a"}));
        parse_err(json!({"$nor": [1, 2]}));
        parse_err(json!({"$not": [{"a": 1}]}));
        parse_err(json!([{"a": 1}]));
    }

    #[test]
    fn test_rejects_mixed_operator_and_field_keys() {
        parse_err(json!({"a": {"$gt": 1, "b": 2}}));
    }

    #[test]
    fn test_rejects_operator_without_field() {
        assert!(parse_err(json!({"$gt": 1})).contains("must be applied to a field"));
    }

    #[test]
    fn test_elem_match_allows_root_operators() {
        match Selector::parse(&json!({"scores": {"$elemMatch": {"$gte": 80}}})).unwrap() {
            Selector::Field { op: FieldOp::ElemMatch(inner), .. } => match *inner {
                Selector::Field { path, op: FieldOp::Gte(_) } => assert!(path.is_root()),
                other => panic!("unexpected inner selector {other:?}"),
            },
            other => panic!("unexpected selector {other:?}"),
        }
    }

    #[test]
    fn test_field_path_escapes() {
        let path = FieldPath::parse("a\\.b.c").unwrap();
        assert_eq!(path.segments(), ["a.b", "c"]);
        assert_eq!(path.to_string(), "a\\.b.c");

        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("a..b").is_err());
    }

    #[test]
    fn test_field_path_resolution() {
        let fields = json!({"a": {"b": [10, {"c": true}]}});
        let fields = fields.as_object().unwrap();

        assert_eq!(FieldPath::from("a.b.0").resolve(fields), Some(&json!(10)));
        assert_eq!(FieldPath::from("a.b.1.c").resolve(fields), Some(&json!(true)));
        assert_eq!(FieldPath::from("a.b.5").resolve(fields), None);
        assert_eq!(FieldPath::from("a.x").resolve(fields), None);
        assert_eq!(FieldPath::root().resolve(fields), None);
    }

    #[test]
    fn test_filter_builders() {
        let selector = Filter::gt("age", 30).and(Filter::exists("email")).and(Filter::is_in("role", ["a", "b"]));
        assert!(matches!(selector, Selector::And(c) if c.len() == 3));

        assert!(Filter::regex("name", "^A").is_ok());
        assert!(Filter::regex("name", "(").is_err());
    }
}
