//! Registry checks for a query topology and its column references.
//!
//! Resolution never touches parameter state: a payload either comes out
//! fully checked (with every column key qualified) or not at all.

use crate::ast::*;
use crate::error::{QueryError, QueryResult, SecurityViolation};
use crate::ident::{Alias, ColumnKey};
use crate::registry::{Registry, TableEntry};

/// Deepest group nesting accepted in a WHERE or ON tree.
pub const MAX_FILTER_DEPTH: usize = 32;

/// The registry entries taking part in a query, FROM first, then joins in
/// declaration order.
#[derive(Debug, Clone)]
pub struct Scope<'r> {
    entries: Vec<&'r TableEntry>,
}

impl<'r> Scope<'r> {
    pub fn from_entry(&self) -> &'r TableEntry {
        self.entries[0]
    }

    pub fn entries(&self) -> &[&'r TableEntry] {
        &self.entries
    }

    fn find(&self, alias: &str) -> Option<&'r TableEntry> {
        self.entries.iter().copied().find(|e| e.alias().as_str() == alias)
    }

    /// The first `n` entries; what an ON clause at position `n - 1` can see.
    fn visible(&self, n: usize) -> Scope<'r> {
        Scope {
            entries: self.entries[..n].to_vec(),
        }
    }

    /// Check a column key against the whitelist and qualify it.
    ///
    /// Unqualified keys belong to the FROM alias.
    pub fn resolve_column(&self, key: &ColumnKey) -> QueryResult<ColumnKey> {
        let entry = match key.alias() {
            Some(alias) => self.find(alias).ok_or_else(|| SecurityViolation::AliasNotInQuery {
                alias: alias.to_string(),
            })?,
            None => self.from_entry(),
        };
        if !entry.allows(key.column()) {
            return Err(SecurityViolation::ColumnNotAllowed {
                alias: entry.alias().to_string(),
                column: key.column().to_string(),
            }
            .into());
        }
        if key.is_qualified() {
            Ok(key.clone())
        } else {
            ColumnKey::qualified(entry.alias(), key.column())
        }
    }
}

/// A join whose alias and table passed the registry.
#[derive(Debug, Clone)]
pub struct ResolvedJoin<'r> {
    pub join_type: JoinType,
    pub entry: &'r TableEntry,
    pub on: OnFilter,
}

#[derive(Debug, Clone)]
pub struct Topology<'r> {
    pub scope: Scope<'r>,
    pub joins: Vec<ResolvedJoin<'r>>,
}

fn check_alias<'r>(registry: &'r Registry, alias: &Alias, table: &str) -> QueryResult<&'r TableEntry> {
    let entry = registry
        .lookup(alias)
        .ok_or_else(|| SecurityViolation::UnregisteredAlias {
            alias: alias.to_string(),
        })?;
    if entry.table_name() != table {
        return Err(SecurityViolation::AliasTableMismatch {
            alias: alias.to_string(),
            registered: entry.table_name().to_string(),
            requested: table.to_string(),
        }
        .into());
    }
    Ok(entry)
}

/// Validate FROM and every JOIN against the registry, then resolve the ON
/// clauses. ON columns may only reference the FROM alias, earlier joins and
/// the join itself.
pub fn check_topology<'r>(
    registry: &'r Registry,
    from: &FromClause,
    joins: &[JoinClause],
) -> QueryResult<Topology<'r>> {
    let mut scope = Scope {
        entries: Vec::with_capacity(joins.len() + 1),
    };
    scope.entries.push(check_alias(registry, &from.alias, &from.table)?);

    for join in joins {
        let alias = join.alias.as_ref().ok_or_else(|| SecurityViolation::JoinMissingAlias {
            table: join.table.clone(),
        })?;
        let entry = check_alias(registry, alias, &join.table)?;
        if scope.find(alias.as_str()).is_some() {
            return Err(QueryError::invalid(format!("alias '{}' is used more than once", alias)));
        }
        scope.entries.push(entry);
    }

    let mut resolved = Vec::with_capacity(joins.len());
    for (i, join) in joins.iter().enumerate() {
        let visible = scope.visible(i + 2);
        resolved.push(ResolvedJoin {
            join_type: join.join_type,
            entry: scope.entries[i + 1],
            on: join.on.resolve(&visible, 0)?,
        });
    }

    Ok(Topology {
        scope,
        joins: resolved,
    })
}

/// Registry check plus normalization of a condition tree.
pub trait Resolve: Sized {
    fn resolve(&self, scope: &Scope<'_>, depth: usize) -> QueryResult<Self>;
}

impl Resolve for Condition {
    fn resolve(&self, scope: &Scope<'_>, _depth: usize) -> QueryResult<Self> {
        let column_key = scope.resolve_column(&self.column_key)?;
        let op = self.operator;

        let value = match &self.value {
            _ if op.is_null_check() => None,
            Some(ConditionValue::List(values)) if op.is_list() => Some(ConditionValue::List(values.clone())),
            Some(ConditionValue::Scalar(value)) if !op.is_list() => Some(ConditionValue::Scalar(value.clone())),
            Some(ConditionValue::Scalar(_)) => {
                return Err(QueryError::invalid(format!(
                    "operator {} on '{}' expects a list of values",
                    op, self.column_key
                )));
            }
            Some(ConditionValue::List(_)) => {
                return Err(QueryError::invalid(format!(
                    "operator {} on '{}' expects a single value",
                    op, self.column_key
                )));
            }
            None => {
                return Err(QueryError::invalid(format!(
                    "operator {} on '{}' requires a value",
                    op, self.column_key
                )));
            }
        };

        Ok(Condition {
            column_key,
            operator: op,
            value,
        })
    }
}

impl Resolve for JoinColumnCondition {
    fn resolve(&self, scope: &Scope<'_>, _depth: usize) -> QueryResult<Self> {
        for key in [&self.column_a, &self.column_b] {
            if !key.is_qualified() {
                return Err(QueryError::invalid(format!(
                    "join column '{}' must be qualified with an alias",
                    key
                )));
            }
        }
        Ok(JoinColumnCondition {
            column_a: scope.resolve_column(&self.column_a)?,
            operator: self.operator,
            column_b: scope.resolve_column(&self.column_b)?,
        })
    }
}

impl<N: Resolve> Resolve for ConditionGroup<N> {
    fn resolve(&self, scope: &Scope<'_>, depth: usize) -> QueryResult<Self> {
        if depth >= MAX_FILTER_DEPTH {
            return Err(QueryError::invalid(format!(
                "condition groups nest deeper than {}",
                MAX_FILTER_DEPTH
            )));
        }
        if self.conditions.is_empty() {
            return Err(QueryError::invalid("condition group must not be empty"));
        }
        let conditions = self
            .conditions
            .iter()
            .map(|c| c.resolve(scope, depth + 1))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(ConditionGroup {
            logical_operator: self.logical_operator,
            conditions,
        })
    }
}

impl Resolve for Filter {
    fn resolve(&self, scope: &Scope<'_>, depth: usize) -> QueryResult<Self> {
        Ok(match self {
            Filter::Leaf(c) => Filter::Leaf(c.resolve(scope, depth)?),
            Filter::Group(g) => Filter::Group(g.resolve(scope, depth)?),
        })
    }
}

impl Resolve for OnFilter {
    fn resolve(&self, scope: &Scope<'_>, depth: usize) -> QueryResult<Self> {
        Ok(match self {
            OnFilter::Columns(c) => OnFilter::Columns(c.resolve(scope, depth)?),
            OnFilter::Leaf(c) => OnFilter::Leaf(c.resolve(scope, depth)?),
            OnFilter::Group(g) => OnFilter::Group(g.resolve(scope, depth)?),
        })
    }
}
