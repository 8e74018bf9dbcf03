//! Declarative metadata filtering for queries.
//!
//! A filter is a tree of `and`/`or` groups whose leaves compare a single
//! metadata field against a JSON value, plus optional top-level temporal
//! and document-id constraints. All present constraints are conjoined.
//!
//! Evaluation never errors: an absent field fails its predicate (for the
//! negative operators too — undefined is not "not equal"), and a type
//! mismatch (ordering against a string, substring against a number)
//! evaluates to `false`.
//!
//! # Wire form
//!
//! ```json
//! {
//!   "metadata": {
//!     "operator": "and",
//!     "filters": [
//!       {"field": "category", "operator": "eq", "value": "technology"},
//!       {"operator": "or", "filters": [
//!         {"field": "price", "operator": "lt", "value": 100.0},
//!         {"field": "on_sale", "operator": "eq", "value": true}
//!       ]}
//!     ]
//!   },
//!   "created_after": 1700000000000,
//!   "document_ids": ["..."]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chunk::Chunk;
use crate::types::{DocumentId, Timestamp};

/// Comparison operator applied to a single metadata field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Equal (structural JSON equality; numbers compare numerically).
    Eq,
    /// Not equal. Fails on an absent field.
    Ne,
    /// Greater than (numbers only).
    Gt,
    /// Greater than or equal (numbers only).
    Gte,
    /// Less than (numbers only).
    Lt,
    /// Less than or equal (numbers only).
    Lte,
    /// Field value is a member of the given array.
    In,
    /// Field value is absent from the given array. Fails on an absent field.
    NotIn,
    /// String field contains the given substring.
    Contains,
    /// String field does not contain the given substring.
    NotContains,
    /// String field starts with the given prefix.
    StartsWith,
    /// String field ends with the given suffix.
    EndsWith,
}

/// Logical connective for a filter group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    /// All children must pass. An `and` of zero children is true.
    And,
    /// At least one child must pass. An `or` of zero children is false.
    Or,
}

/// A single field comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Metadata key to look up on the chunk.
    pub field: String,
    /// Comparison operator. The wire form also accepts the short key
    /// `op`.
    #[serde(alias = "op")]
    pub operator: FilterOperator,
    /// Comparison operand.
    pub value: Value,
}

impl MetadataFilter {
    /// Convenience constructor.
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Returns true if the chunk's metadata passes this comparison.
    pub fn matches(&self, chunk: &Chunk) -> bool {
        let Some(actual) = chunk.metadata.get(&self.field) else {
            // Absent field fails every operator, negative ones included.
            return false;
        };

        match self.operator {
            FilterOperator::Eq => value_eq(actual, &self.value),
            FilterOperator::Ne => !value_eq(actual, &self.value),
            FilterOperator::Gt => compare_numbers(actual, &self.value, |a, b| a > b),
            FilterOperator::Gte => compare_numbers(actual, &self.value, |a, b| a >= b),
            FilterOperator::Lt => compare_numbers(actual, &self.value, |a, b| a < b),
            FilterOperator::Lte => compare_numbers(actual, &self.value, |a, b| a <= b),
            FilterOperator::In => value_in_list(actual, &self.value),
            FilterOperator::NotIn => match self.value.as_array() {
                Some(list) => !list.iter().any(|candidate| value_eq(actual, candidate)),
                None => false,
            },
            FilterOperator::Contains => compare_strings(actual, &self.value, |a, b| a.contains(b)),
            FilterOperator::NotContains => match (actual.as_str(), self.value.as_str()) {
                (Some(haystack), Some(needle)) => !haystack.contains(needle),
                _ => false,
            },
            FilterOperator::StartsWith => compare_strings(actual, &self.value, |a, b| a.starts_with(b)),
            FilterOperator::EndsWith => compare_strings(actual, &self.value, |a, b| a.ends_with(b)),
        }
    }
}

/// A node in the filter tree: either a nested group or a leaf comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    /// Nested `and`/`or` group.
    Group(FilterGroup),
    /// Leaf field comparison.
    Condition(MetadataFilter),
}

impl FilterNode {
    fn matches(&self, chunk: &Chunk) -> bool {
        match self {
            FilterNode::Group(group) => group.matches(chunk),
            FilterNode::Condition(filter) => filter.matches(chunk),
        }
    }
}

/// A group of filter nodes combined with a logical operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    /// How the children combine.
    pub operator: LogicalOperator,
    /// Child nodes; nesting is unrestricted.
    pub filters: Vec<FilterNode>,
}

impl FilterGroup {
    /// Creates a group from parts.
    pub fn new(operator: LogicalOperator, filters: Vec<FilterNode>) -> Self {
        Self { operator, filters }
    }

    /// Returns true if the chunk passes this group.
    pub fn matches(&self, chunk: &Chunk) -> bool {
        match self.operator {
            LogicalOperator::And => self.filters.iter().all(|node| node.matches(chunk)),
            LogicalOperator::Or => self.filters.iter().any(|node| node.matches(chunk)),
        }
    }
}

/// Complete declarative filter for a query: a metadata tree plus optional
/// temporal and document-id constraints, all conjoined.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Root metadata filter group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FilterGroup>,

    /// Only chunks created at or after this instant (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_after: Option<Timestamp>,

    /// Only chunks created at or before this instant (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_before: Option<Timestamp>,

    /// Only chunks whose owning document is in this set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<DocumentId>>,
}

impl SearchFilters {
    /// Returns true if the chunk passes every present constraint.
    /// An empty `SearchFilters` passes everything.
    pub fn matches(&self, chunk: &Chunk) -> bool {
        if let Some(ref group) = self.metadata {
            if !group.matches(chunk) {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if chunk.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if chunk.created_at > before {
                return false;
            }
        }
        if let Some(ref ids) = self.document_ids {
            if !ids.contains(&chunk.document_id) {
                return false;
            }
        }
        true
    }

    /// Returns true when no constraint is present.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_none()
            && self.created_after.is_none()
            && self.created_before.is_none()
            && self.document_ids.is_none()
    }
}

/// JSON equality with numeric coercion: `5` equals `5.0`.
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare_numbers(actual: &Value, expected: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn compare_strings(actual: &Value, expected: &Value, cmp: impl Fn(&str, &str) -> bool) -> bool {
    match (actual.as_str(), expected.as_str()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn value_in_list(actual: &Value, list: &Value) -> bool {
    match list.as_array() {
        Some(candidates) => candidates.iter().any(|candidate| value_eq(actual, candidate)),
        None => false,
    }
}
