//! Selector evaluation for in-memory document filtering.
//!
//! This module provides the evaluation engine for selectors and the type-aware
//! comparison rules shared by the ordering operators and by Find sorting.

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

use revlayer_core::{
    error::DocumentStoreError,
    revision::Fields,
    selector::{FieldOp, FieldPath, Selector, SelectorVisitor, ValueType},
};

/// Comparable view of a JSON value.
///
/// Integers compare exactly; a comparison involving a float goes through `f64`, so `1` and
/// `1.0` compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(&'a Number),
    String(&'a str),
    Array(&'a [Value]),
    Map(&'a Map<String, Value>),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => Comparable::Number(value),
            Value::String(value) => Comparable::String(value),
            Value::Array(items) => Comparable::Array(items),
            Value::Object(map) => Comparable::Map(map),
        }
    }
}

impl<'a> Comparable<'a> {
    // Collation rank: null < booleans < numbers < strings < arrays < objects.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Map(_) => 5,
        }
    }

    /// Total collation order used for sorting.
    pub(crate) fn collate(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => {
                compare_numbers(a, b).unwrap_or_else(|| as_float(a).total_cmp(&as_float(b)))
            }
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| Comparable::from(x).collate(&Comparable::from(y)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Map(a), Comparable::Map(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((ka, va), (kb, vb))| {
                    ka.cmp(kb)
                        .then_with(|| Comparable::from(va).collate(&Comparable::from(vb)))
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => compare_numbers(a, b) == Some(Ordering::Equal),
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(x, y)| Comparable::from(x) == Comparable::from(y))
            }
            (Comparable::Map(a), Comparable::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, x)| {
                        b.get(key)
                            .is_some_and(|y| Comparable::from(x) == Comparable::from(y))
                    })
            }
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    /// Ordering-operator comparison: only number-number and string-string are comparable.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Number(a), Comparable::Number(b)) => compare_numbers(a, b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

fn as_integer(number: &Number) -> Option<i128> {
    number
        .as_i64()
        .map(i128::from)
        .or_else(|| number.as_u64().map(i128::from))
}

fn as_float(number: &Number) -> f64 {
    // Without arbitrary precision every JSON number has an f64 view.
    number.as_f64().unwrap_or(f64::NAN)
}

/// Exact when both sides are integers, `f64` otherwise.
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (as_integer(a), as_integer(b)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => as_float(a).partial_cmp(&as_float(b)),
    }
}

/// Sort comparison for a possibly missing value. Missing sorts before any present value.
pub(crate) fn collate_optional(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => Comparable::from(a).collate(&Comparable::from(b)),
    }
}

fn deep_eq(a: &Value, b: &Value) -> bool {
    Comparable::from(a) == Comparable::from(b)
}

// The value a selector is evaluated against: a document's fields, or an element inside
// `$elemMatch`.
#[derive(Debug, Clone, Copy)]
enum Scope<'a> {
    Document(&'a Fields),
    Element(&'a Value),
}

/// Evaluates selectors against one document.
pub(crate) struct DocumentEvaluator<'a> {
    scope: Scope<'a>,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(fields: &'a Fields) -> Self {
        Self { scope: Scope::Document(fields) }
    }

    fn for_element(element: &'a Value) -> Self {
        Self { scope: Scope::Element(element) }
    }

    /// Returns `true` if the document matches `selector`.
    pub fn matches(&mut self, selector: &Selector) -> bool {
        // Evaluation of a parsed selector has no failure path.
        self.visit_selector(selector).unwrap_or(false)
    }

    fn resolve(&self, path: &FieldPath) -> Option<&'a Value> {
        match self.scope {
            Scope::Document(fields) => path.resolve(fields),
            Scope::Element(value) => path.resolve_in(value),
        }
    }
}

impl<'a> SelectorVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, selectors: &[Selector]) -> Result<Self::Output, Self::Error> {
        for selector in selectors {
            if !self.visit_selector(selector)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, selectors: &[Selector]) -> Result<Self::Output, Self::Error> {
        for selector in selectors {
            if self.visit_selector(selector)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, selector: &Selector) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_selector(selector)?)
    }

    fn visit_nor(&mut self, selectors: &[Selector]) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_or(selectors)?)
    }

    fn visit_field(&mut self, path: &FieldPath, op: &FieldOp) -> Result<Self::Output, Self::Error> {
        let field_value = match (self.resolve(path), op) {
            (None, FieldOp::Exists(should_exist)) => return Ok(!should_exist),
            (None, _) => return Ok(false),
            (Some(field_value), _) => field_value,
        };

        let comparable = Comparable::from(field_value);

        Ok(match op {
            FieldOp::Exists(should_exist) => *should_exist,
            FieldOp::Eq(value) => comparable == Comparable::from(value),
            FieldOp::Ne(value) => comparable != Comparable::from(value),
            FieldOp::Gt(value) => comparable.partial_cmp(&Comparable::from(value)) == Some(Ordering::Greater),
            FieldOp::Gte(value) => matches!(
                comparable.partial_cmp(&Comparable::from(value)),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FieldOp::Lt(value) => comparable.partial_cmp(&Comparable::from(value)) == Some(Ordering::Less),
            FieldOp::Lte(value) => matches!(
                comparable.partial_cmp(&Comparable::from(value)),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FieldOp::In(values) => values.iter().any(|value| deep_eq(field_value, value)),
            FieldOp::Nin(values) => !values.iter().any(|value| deep_eq(field_value, value)),
            FieldOp::Type(kind) => ValueType::of(field_value) == *kind,
            FieldOp::Regex(regex) => match comparable {
                Comparable::String(text) => regex.is_match(text),
                _ => false,
            },
            FieldOp::All(values) => match comparable {
                Comparable::Array(items) => values
                    .iter()
                    .all(|value| items.iter().any(|item| deep_eq(item, value))),
                _ => false,
            },
            FieldOp::ElemMatch(selector) => match comparable {
                Comparable::Array(items) => items
                    .iter()
                    .any(|item| DocumentEvaluator::for_element(item).matches(selector)),
                _ => false,
            },
            FieldOp::Size(size) => match comparable {
                Comparable::Array(items) => items.len() == *size,
                _ => false,
            },
            FieldOp::Mod(divisor, remainder) => field_value
                .as_i64()
                .and_then(|n| n.checked_rem(*divisor))
                .is_some_and(|rem| rem == *remainder),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matches(selector: Value, document: Value) -> bool {
        let selector = Selector::parse(&selector).unwrap();
        let fields = document.as_object().unwrap().clone();
        DocumentEvaluator::new(&fields).matches(&selector)
    }

    #[test]
    fn test_implicit_equality() {
        assert!(matches(json!({"a": 1}), json!({"a": 1})));
        assert!(matches(json!({"a": 1}), json!({"a": 1.0})));
        assert!(matches(json!({"a": [1, {"b": 2}]}), json!({"a": [1, {"b": 2}]})));
        assert!(!matches(json!({"a": 1}), json!({"a": "1"})));
        assert!(!matches(json!({"a": null}), json!({})));
        assert!(matches(json!({"a": null}), json!({"a": null})));
    }

    #[test]
    fn test_exists_ignores_value() {
        assert!(matches(json!({"a": {"$exists": true}}), json!({"a": null})));
        assert!(!matches(json!({"a": {"$exists": true}}), json!({"b": 1})));
        assert!(matches(json!({"a": {"$exists": false}}), json!({"b": 1})));
        assert!(!matches(json!({"a": {"$exists": false}}), json!({"a": false})));
    }

    #[test]
    fn test_ordering_operators_require_same_kind() {
        assert!(matches(json!({"age": {"$gt": 30}}), json!({"age": 35})));
        assert!(!matches(json!({"age": {"$gt": 30}}), json!({"age": 30})));
        assert!(matches(json!({"age": {"$gte": 30}}), json!({"age": 30})));
        assert!(matches(json!({"age": {"$lt": 30.5}}), json!({"age": 30})));
        assert!(matches(json!({"age": {"$lte": 30}}), json!({"age": 30.0})));
        assert!(matches(json!({"name": {"$gt": "a"}}), json!({"name": "b"})));

        assert!(!matches(json!({"age": {"$gt": 30}}), json!({"age": "40"})));
        assert!(!matches(json!({"age": {"$lt": 30}}), json!({"age": null})));
        assert!(!matches(json!({"age": {"$lt": 30}}), json!({})));
        assert!(!matches(json!({"flag": {"$gt": false}}), json!({"flag": true})));
    }

    #[test]
    fn test_membership() {
        assert!(matches(json!({"role": {"$in": ["a", "b"]}}), json!({"role": "b"})));
        assert!(!matches(json!({"role": {"$in": ["a", "b"]}}), json!({"role": "c"})));
        assert!(!matches(json!({"role": {"$in": [null]}}), json!({})));
        assert!(matches(json!({"role": {"$nin": ["a"]}}), json!({"role": "c"})));
        assert!(!matches(json!({"role": {"$nin": ["a"]}}), json!({})));
        assert!(!matches(json!({"role": {"$ne": "a"}}), json!({})));
        assert!(matches(json!({"role": {"$ne": "a"}}), json!({"role": "b"})));
    }

    #[test]
    fn test_combinators() {
        assert!(matches(json!({"$and": []}), json!({"a": 1})));
        assert!(!matches(json!({"$or": []}), json!({"a": 1})));
        assert!(matches(json!({"$nor": []}), json!({"a": 1})));
        assert!(matches(json!({"$not": {"a": 2}}), json!({"a": 1})));
        assert!(matches(json!({"$not": {"a": 2}}), json!({})));
        assert!(matches(json!({"$or": [{"a": 2}, {"b": 3}]}), json!({"b": 3})));
        assert!(!matches(json!({"$nor": [{"a": 2}, {"b": 3}]}), json!({"b": 3})));
        assert!(matches(json!({"age": {"$or": [{"$lt": 10}, {"$gt": 60}]}}), json!({"age": 70})));
        assert!(!matches(json!({"age": {"$not": {"$gt": 5}}}), json!({"age": 7})));
    }

    #[test]
    fn test_nested_paths() {
        let doc = json!({"address": {"city": "Oslo", "zip": "0150"}, "tags": ["x", "y"]});

        assert!(matches(json!({"address.city": "Oslo"}), doc.clone()));
        assert!(matches(json!({"address": {"city": "Oslo"}}), doc.clone()));
        assert!(matches(json!({"tags.1": "y"}), doc.clone()));
        assert!(!matches(json!({"address.country": {"$exists": true}}), doc));
    }

    #[test]
    fn test_array_operators() {
        let doc = json!({"tags": ["red", "blue"], "scores": [55, 90], "people": [{"name": "a", "age": 3}]});

        assert!(matches(json!({"tags": {"$all": ["blue", "red"]}}), doc.clone()));
        assert!(!matches(json!({"tags": {"$all": ["blue", "green"]}}), doc.clone()));
        assert!(matches(json!({"scores": {"$elemMatch": {"$gte": 80}}}), doc.clone()));
        assert!(!matches(json!({"scores": {"$elemMatch": {"$gte": 95}}}), doc.clone()));
        assert!(matches(json!({"people": {"$elemMatch": {"name": "a", "age": {"$lt": 5}}}}), doc.clone()));
        assert!(!matches(json!({"tags": {"$elemMatch": {"$eq": "x"}}}), doc.clone()));
        assert!(!matches(json!({"tags.0": {"$elemMatch": {"$eq": "red"}}}), doc.clone()));
        assert!(matches(json!({"tags": {"$size": 2}}), doc.clone()));
        assert!(!matches(json!({"tags": {"$size": 3}}), doc));
    }

    #[test]
    fn test_type_regex_and_mod() {
        let doc = json!({"name": "Alice", "n": 10, "f": 2.5, "ok": true, "list": [], "obj": {}, "nil": null});

        assert!(matches(json!({"name": {"$type": "string"}}), doc.clone()));
        assert!(matches(json!({"ok": {"$type": "boolean"}}), doc.clone()));
        assert!(matches(json!({"n": {"$type": "number"}}), doc.clone()));
        assert!(matches(json!({"f": {"$type": "number"}}), doc.clone()));
        assert!(!matches(json!({"ok": {"$type": "number"}}), doc.clone()));
        assert!(!matches(json!({"n": {"$type": "boolean"}}), doc.clone()));
        assert!(matches(json!({"list": {"$type": "array"}}), doc.clone()));
        assert!(matches(json!({"obj": {"$type": "object"}}), doc.clone()));
        assert!(matches(json!({"nil": {"$type": "null"}}), doc.clone()));
        assert!(!matches(json!({"n": {"$type": "string"}}), doc.clone()));

        assert!(matches(json!({"name": {"$regex": "^Al"}}), doc.clone()));
        assert!(!matches(json!({"name": {"$regex": "^al"}}), doc.clone()));
        assert!(!matches(json!({"n": {"$regex": "1"}}), doc.clone()));

        assert!(matches(json!({"n": {"$mod": [3, 1]}}), doc.clone()));
        assert!(!matches(json!({"n": {"$mod": [3, 0]}}), doc.clone()));
        assert!(!matches(json!({"f": {"$mod": [2, 0]}}), doc));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        // 2^53 and 2^53 + 1 share one f64 representation.
        let doc = json!({"n": 9007199254740993u64, "big": u64::MAX, "neg": i64::MIN});

        assert!(matches(json!({"n": 9007199254740993u64}), doc.clone()));
        assert!(!matches(json!({"n": 9007199254740992u64}), doc.clone()));
        assert!(matches(json!({"n": {"$gt": 9007199254740992u64}}), doc.clone()));
        assert!(!matches(json!({"n": {"$lte": 9007199254740992u64}}), doc.clone()));
        assert!(!matches(json!({"n": {"$in": [9007199254740992u64]}}), doc.clone()));
        assert!(matches(json!({"n": {"$nin": [9007199254740992u64]}}), doc.clone()));
        assert!(matches(json!({"big": {"$gt": i64::MAX}}), doc.clone()));
        assert!(matches(json!({"neg": {"$lt": u64::MAX}}), doc.clone()));

        let list = json!({"ids": [9007199254740993u64]});
        assert!(!matches(json!({"ids": {"$all": [9007199254740992u64]}}), list));

        assert_eq!(
            collate_optional(Some(&json!(9007199254740992u64)), Some(&json!(9007199254740993u64))),
            Ordering::Less
        );
    }

    #[test]
    fn test_integers_and_floats_still_compare_by_value() {
        assert!(matches(json!({"n": 1}), json!({"n": 1.0})));
        assert!(matches(json!({"n": {"$gt": 1}}), json!({"n": 1.5})));
        assert!(matches(json!({"n": {"$lt": 2.5}}), json!({"n": -3})));
        assert_eq!(collate_optional(Some(&json!(2)), Some(&json!(2.0))), Ordering::Equal);
    }

    #[test]
    fn test_collation_order() {
        let values = [
            json!(null),
            json!(false),
            json!(true),
            json!(-1),
            json!(2.5),
            json!("a"),
            json!("b"),
            json!([1]),
            json!([1, 2]),
            json!({"a": 1}),
        ];

        for pair in values.windows(2) {
            assert_eq!(
                collate_optional(Some(&pair[0]), Some(&pair[1])),
                Ordering::Less,
                "{} should sort before {}",
                pair[0],
                pair[1]
            );
        }
        assert_eq!(collate_optional(None, Some(&json!(null))), Ordering::Less);
        assert_eq!(collate_optional(None, None), Ordering::Equal);
    }
}
