use crate::ast::{JoinType, OnFilter};
use crate::ident::Alias;
use serde::{Deserialize, Serialize};

/// The primary table of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromClause {
    pub table: String,
    pub alias: Alias,
}

impl FromClause {
    pub fn new(table: impl Into<String>, alias: Alias) -> Self {
        Self {
            table: table.into(),
            alias,
        }
    }
}

/// A join definition.
///
/// `alias` is optional on the wire only so that a missing alias can be
/// reported as a security violation instead of a generic parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinClause {
    #[serde(default)]
    pub join_type: JoinType,
    pub table: String,
    #[serde(default)]
    pub alias: Option<Alias>,
    pub on: OnFilter,
}

impl JoinClause {
    pub fn new(join_type: JoinType, table: impl Into<String>, alias: Alias, on: impl Into<OnFilter>) -> Self {
        Self {
            join_type,
            table: table.into(),
            alias: Some(alias),
            on: on.into(),
        }
    }
}
