use crate::ast::{ComparisonOp, ConditionValue, LogicalOp, Operator, Scalar};
use crate::ident::ColumnKey;
use serde::{Deserialize, Serialize};

/// A leaf predicate comparing a column against client-supplied values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub column_key: ColumnKey,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConditionValue>,
}

impl Condition {
    pub fn new(column_key: ColumnKey, operator: Operator, value: impl Into<ConditionValue>) -> Self {
        Self {
            column_key,
            operator,
            value: Some(value.into()),
        }
    }

    pub fn eq(column_key: ColumnKey, value: impl Into<ConditionValue>) -> Self {
        Self::new(column_key, Operator::Eq, value)
    }

    pub fn is_null(column_key: ColumnKey) -> Self {
        Self {
            column_key,
            operator: Operator::IsNull,
            value: None,
        }
    }

    pub fn is_not_null(column_key: ColumnKey) -> Self {
        Self {
            column_key,
            operator: Operator::IsNotNull,
            value: None,
        }
    }

    pub fn in_list(column_key: ColumnKey, values: Vec<Scalar>) -> Self {
        Self::new(column_key, Operator::In, ConditionValue::List(values))
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.column_key, self.operator)?;
        match &self.value {
            Some(ConditionValue::Scalar(v)) => write!(f, " {}", v),
            Some(ConditionValue::List(vs)) => write!(f, " [{} values]", vs.len()),
            None => Ok(()),
        }
    }
}

/// Structural comparison between two qualified columns, only valid inside ON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinColumnCondition {
    pub column_a: ColumnKey,
    pub operator: ComparisonOp,
    pub column_b: ColumnKey,
}

impl JoinColumnCondition {
    pub fn eq(column_a: ColumnKey, column_b: ColumnKey) -> Self {
        Self {
            column_a,
            operator: ComparisonOp::Eq,
            column_b,
        }
    }
}

/// AND/OR group over a non-empty list of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionGroup<N> {
    pub logical_operator: LogicalOp,
    pub conditions: Vec<N>,
}

/// A WHERE tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Leaf(Condition),
    Group(ConditionGroup<Filter>),
}

impl Filter {
    pub fn and(conditions: Vec<Filter>) -> Self {
        Filter::Group(ConditionGroup {
            logical_operator: LogicalOp::And,
            conditions,
        })
    }

    pub fn or(conditions: Vec<Filter>) -> Self {
        Filter::Group(ConditionGroup {
            logical_operator: LogicalOp::Or,
            conditions,
        })
    }
}

impl From<Condition> for Filter {
    fn from(c: Condition) -> Self {
        Filter::Leaf(c)
    }
}

/// An ON tree: column-to-column comparisons mixed with value conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OnFilter {
    Columns(JoinColumnCondition),
    Leaf(Condition),
    Group(ConditionGroup<OnFilter>),
}

impl OnFilter {
    pub fn and(conditions: Vec<OnFilter>) -> Self {
        OnFilter::Group(ConditionGroup {
            logical_operator: LogicalOp::And,
            conditions,
        })
    }
}

impl From<JoinColumnCondition> for OnFilter {
    fn from(c: JoinColumnCondition) -> Self {
        OnFilter::Columns(c)
    }
}

impl From<Condition> for OnFilter {
    fn from(c: Condition) -> Self {
        OnFilter::Leaf(c)
    }
}
