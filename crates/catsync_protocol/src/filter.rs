//! Boolean filter expressions for remote product sets.
//!
//! The remote service evaluates these expressions against each catalog item
//! to populate a product set automatically. The JSON shape is
//! `{"and": [{"<field>": {"<operator>": "<value>"}}]}`.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Comparison operators understood by the remote filter language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Case-insensitive substring match.
    ContainsIgnoreCase,
    /// Negated case-insensitive substring match.
    NotContainsIgnoreCase,
    /// Exact match.
    Eq,
    /// Negated exact match.
    Neq,
}

impl Comparison {
    /// Returns the operator name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::ContainsIgnoreCase => "i_contains",
            Comparison::NotContainsIgnoreCase => "i_not_contains",
            Comparison::Eq => "eq",
            Comparison::Neq => "neq",
        }
    }
}

/// A boolean expression tree over catalog item fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    /// All sub-expressions must match.
    And(Vec<FilterExpr>),
    /// Any sub-expression must match.
    Or(Vec<FilterExpr>),
    /// A single field comparison.
    Condition {
        /// Catalog item field, e.g. `product_type`.
        field: String,
        /// Comparison operator.
        comparison: Comparison,
        /// Right-hand operand.
        value: String,
    },
}

impl FilterExpr {
    /// Creates a single field comparison.
    pub fn condition(
        field: impl Into<String>,
        comparison: Comparison,
        value: impl Into<String>,
    ) -> Self {
        FilterExpr::Condition {
            field: field.into(),
            comparison,
            value: value.into(),
        }
    }

    /// Matches items whose product type contains `name`, ignoring case.
    ///
    /// This is the membership rule used for category product sets.
    pub fn product_type_contains(name: impl Into<String>) -> Self {
        FilterExpr::And(vec![FilterExpr::condition(
            "product_type",
            Comparison::ContainsIgnoreCase,
            name,
        )])
    }

    /// Converts the expression to its JSON tree.
    pub fn to_value(&self) -> Value {
        match self {
            FilterExpr::And(children) => Self::group("and", children),
            FilterExpr::Or(children) => Self::group("or", children),
            FilterExpr::Condition {
                field,
                comparison,
                value,
            } => {
                let mut op = Map::new();
                op.insert(comparison.as_str().to_string(), Value::String(value.clone()));
                let mut cond = Map::new();
                cond.insert(field.clone(), Value::Object(op));
                Value::Object(cond)
            }
        }
    }

    /// Encodes the expression as a compact JSON string.
    ///
    /// The remote payload carries the filter as a string, not a nested object.
    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }

    fn group(key: &str, children: &[FilterExpr]) -> Value {
        let mut map = Map::new();
        map.insert(
            key.to_string(),
            Value::Array(children.iter().map(FilterExpr::to_value).collect()),
        );
        Value::Object(map)
    }
}

impl Serialize for FilterExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
