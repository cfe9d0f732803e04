//! Query compiler.
//!
//! Turns a [`QueryPayload`] into parameterized SQL after checking every
//! alias, table and column it mentions against the [`Registry`].
//!
//! ```rust
//! use bizq::prelude::*;
//!
//! let registry = Registry::builder()
//!     .register("w", "wholesalers", &["id", "name", "status"])
//!     .build()
//!     .unwrap();
//!
//! let payload = QueryPayload::from_json(r#"{
//!     "select": ["w.id", "w.name"],
//!     "from": { "table": "wholesalers", "alias": "w" },
//!     "where": { "columnKey": "w.status", "operator": "=", "value": "active" },
//!     "limit": 10
//! }"#).unwrap();
//!
//! let compiled = bizq::compile(&payload, &registry, None, None).unwrap();
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT w.id, w.name FROM wholesalers w WHERE w.status = @p0 \
//!      ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
//! );
//! ```

pub mod resolve;

#[cfg(test)]
mod tests;

use std::borrow::Cow;

use serde::Serialize;

use crate::ast::{FromClause, JoinClause, QueryPayload, SortDescriptor};
use crate::error::{ErrorKind, QueryError, QueryResult};
use crate::ident::ColumnKey;
use crate::registry::{Registry, TableEntry};
use crate::transpiler::{
    render_join, render_order_by, render_select, render_table, render_where, Dialect, ParamContext,
    Parameters,
};
use resolve::{check_topology, Resolve};

/// Alias of the single column produced by [`QueryCompiler::compile_count`].
pub const COUNT_COLUMN: &str = "total_count";

/// Audit information about a compiled statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetadata {
    pub selected_columns: Vec<String>,
    pub has_joins: bool,
    pub has_where: bool,
    pub parameter_count: usize,
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_query: Option<String>,
    pub dialect: Dialect,
}

/// SQL text, its bind parameters and audit metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub parameters: Parameters,
    pub metadata: QueryMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Rows,
    Count,
}

/// Compiles payloads against one registry.
#[derive(Debug, Clone)]
pub struct QueryCompiler<'r> {
    registry: &'r Registry,
    dialect: Dialect,
    max_limit: Option<u64>,
}

impl<'r> QueryCompiler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            dialect: Dialect::default(),
            max_limit: None,
        }
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Clamp page sizes to at most `max` rows.
    pub fn max_limit(mut self, max: u64) -> Self {
        self.max_limit = (max > 0).then_some(max);
        self
    }

    /// Compile a row query.
    ///
    /// FROM source precedence: `named_query`, then `fixed_from`, then
    /// `payload.from`.
    pub fn compile(
        &self,
        payload: &QueryPayload,
        named_query: Option<&str>,
        fixed_from: Option<&FromClause>,
    ) -> QueryResult<CompiledQuery> {
        self.build(payload, named_query, fixed_from, Shape::Rows)
            .inspect_err(|e| audit_rejection(e, named_query))
    }

    /// Compile `SELECT COUNT(*)` over the same FROM/JOIN/WHERE, without
    /// ordering or pagination.
    pub fn compile_count(
        &self,
        payload: &QueryPayload,
        named_query: Option<&str>,
        fixed_from: Option<&FromClause>,
    ) -> QueryResult<CompiledQuery> {
        self.build(payload, named_query, fixed_from, Shape::Count)
            .inspect_err(|e| audit_rejection(e, named_query))
    }

    fn resolve_source<'a>(
        &'a self,
        payload: &'a QueryPayload,
        named_query: Option<&str>,
        fixed_from: Option<&'a FromClause>,
    ) -> QueryResult<(&'a FromClause, Cow<'a, [JoinClause]>)> {
        if let Some(key) = named_query {
            let query = self
                .registry
                .named_query(key)
                .ok_or_else(|| QueryError::configuration(format!("unknown named query '{}'", key)))?;
            if payload.joins.is_empty() {
                return Ok((&query.from, Cow::Borrowed(query.joins.as_slice())));
            }
            let mut joins = query.joins.clone();
            joins.extend(payload.joins.iter().cloned());
            return Ok((&query.from, Cow::Owned(joins)));
        }

        let from = fixed_from
            .or(payload.from.as_ref())
            .ok_or_else(|| QueryError::configuration("no FROM source: named query, fixed FROM and payload FROM are all absent"))?;
        Ok((from, Cow::Borrowed(payload.joins.as_slice())))
    }

    fn page(&self, payload: &QueryPayload) -> Option<(u64, u64)> {
        let limit = u64::try_from(payload.limit?).ok().filter(|l| *l > 0)?;
        let limit = match self.max_limit {
            Some(max) => limit.min(max),
            None => limit,
        };
        let offset = payload.offset.map_or(0, |o| u64::try_from(o).unwrap_or(0));
        Some((limit, offset))
    }

    fn build(
        &self,
        payload: &QueryPayload,
        named_query: Option<&str>,
        fixed_from: Option<&FromClause>,
        shape: Shape,
    ) -> QueryResult<CompiledQuery> {
        let (from, joins) = self.resolve_source(payload, named_query, fixed_from)?;
        let topology = check_topology(self.registry, from, &joins)?;
        let scope = &topology.scope;
        let from_entry = scope.from_entry();

        let select = if payload.select.is_empty() {
            default_select(from_entry)?
        } else {
            payload
                .select
                .iter()
                .map(|c| scope.resolve_column(c))
                .collect::<QueryResult<Vec<_>>>()?
        };
        let filter = payload.filter.as_ref().map(|f| f.resolve(scope, 0)).transpose()?;
        let order_by = payload
            .order_by
            .iter()
            .map(|s| {
                Ok(SortDescriptor {
                    column_key: scope.resolve_column(&s.column_key)?,
                    direction: s.direction,
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        // Everything is checked; only now does parameter state exist.
        let mut ctx = ParamContext::new(self.dialect.generator());
        let mut clauses: Vec<String> = Vec::new();

        match shape {
            Shape::Rows => clauses.push(format!("SELECT {}", render_select(&select, ctx.generator()))),
            Shape::Count => clauses.push(format!("SELECT COUNT(*) AS {}", COUNT_COLUMN)),
        }
        clauses.push(format!(
            "FROM {}",
            render_table(from_entry.table_name(), from_entry.alias(), ctx.generator())
        ));
        for join in &topology.joins {
            clauses.push(render_join(
                join.join_type,
                join.entry.table_name(),
                join.entry.alias(),
                &join.on,
                &mut ctx,
            ));
        }
        if let Some(filter) = &filter {
            clauses.push(format!("WHERE {}", render_where(filter, &mut ctx)));
        }
        if shape == Shape::Rows {
            if !order_by.is_empty() {
                clauses.push(format!("ORDER BY {}", render_order_by(&order_by, ctx.generator())));
            }
            if let Some((limit, offset)) = self.page(payload) {
                if order_by.is_empty() && ctx.generator().requires_order_for_pagination() {
                    clauses.push("ORDER BY (SELECT NULL)".to_string());
                }
                clauses.push(ctx.generator().pagination(limit, offset));
            }
        }

        let max_parameters = ctx.generator().max_parameters();
        if ctx.index > max_parameters {
            return Err(QueryError::invalid(format!(
                "query binds {} parameters, {} allows at most {}",
                ctx.index, self.dialect, max_parameters
            )));
        }

        let sql = normalize_whitespace(&clauses.join(" "));
        let parameters = ctx.into_parameters();
        let selected_columns = match shape {
            Shape::Rows => select.iter().map(|c| c.to_string()).collect(),
            Shape::Count => vec![COUNT_COLUMN.to_string()],
        };

        Ok(CompiledQuery {
            sql,
            metadata: QueryMetadata {
                selected_columns,
                has_joins: !topology.joins.is_empty(),
                has_where: filter.is_some(),
                parameter_count: parameters.len(),
                table_name: from_entry.table_name().to_string(),
                named_query: named_query.map(str::to_string),
                dialect: self.dialect,
            },
            parameters,
        })
    }
}

/// Compile with the default dialect.
pub fn compile(
    payload: &QueryPayload,
    registry: &Registry,
    named_query: Option<&str>,
    fixed_from: Option<&FromClause>,
) -> QueryResult<CompiledQuery> {
    QueryCompiler::new(registry).compile(payload, named_query, fixed_from)
}

/// Empty select lists expand to every whitelisted column of the FROM alias.
fn default_select(entry: &TableEntry) -> QueryResult<Vec<ColumnKey>> {
    if entry.is_wildcard() {
        return Err(QueryError::invalid(format!(
            "alias '{}' allows every column; an explicit select list is required",
            entry.alias()
        )));
    }
    entry
        .allowed_columns()
        .map(|c| ColumnKey::qualified(entry.alias(), c))
        .collect()
}

fn normalize_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn audit_rejection(error: &QueryError, named_query: Option<&str>) {
    match error.kind() {
        ErrorKind::Security => tracing::warn!(error = %error, named_query, "rejected query"),
        ErrorKind::Configuration => tracing::error!(error = %error, named_query, "query compile misconfigured"),
        _ => tracing::debug!(error = %error, named_query, "invalid query payload"),
    }
}
