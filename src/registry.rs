//! Security registry.
//!
//! The server-owned whitelist every compiled query is checked against:
//! alias → real table → allowed columns, plus the pre-vetted join
//! topologies ("named queries") a client may select by key.
//!
//! Built once at startup and read-only afterwards; share it behind an `Arc`.

use crate::ast::{FromClause, JoinClause};
use crate::compiler::resolve::check_topology;
use crate::error::{QueryError, QueryResult};
use crate::ident::{validate_table_name, Alias};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

/// Column entry that allows every column of the table.
pub const WILDCARD_COLUMN: &str = "*";

/// A registered alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    alias: Alias,
    table_name: String,
    allowed_columns: BTreeSet<String>,
}

impl TableEntry {
    pub fn alias(&self) -> &Alias {
        &self.alias
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Allowed columns in sorted order, `*` included if present.
    pub fn allowed_columns(&self) -> impl Iterator<Item = &str> {
        self.allowed_columns.iter().map(|c| c.as_str())
    }

    pub fn is_wildcard(&self) -> bool {
        self.allowed_columns.contains(WILDCARD_COLUMN)
    }

    pub fn allows(&self, column: &str) -> bool {
        self.is_wildcard() || self.allowed_columns.contains(column)
    }
}

/// A pre-vetted FROM + JOIN topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedQuery {
    pub from: FromClause,
    #[serde(default)]
    pub joins: Vec<JoinClause>,
}

/// Immutable alias/table/column whitelist.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tables: HashMap<Alias, TableEntry>,
    named_queries: HashMap<String, NamedQuery>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn lookup(&self, alias: &Alias) -> Option<&TableEntry> {
        self.tables.get(alias)
    }

    pub fn named_query(&self, key: &str) -> Option<&NamedQuery> {
        self.named_queries.get(key)
    }

    /// Registered entries, sorted by alias.
    pub fn tables(&self) -> Vec<&TableEntry> {
        let mut entries: Vec<&TableEntry> = self.tables.values().collect();
        entries.sort_by(|a, b| a.alias.cmp(&b.alias));
        entries
    }

    /// Named queries, sorted by key.
    pub fn named_queries(&self) -> Vec<(&str, &NamedQuery)> {
        let mut queries: Vec<(&str, &NamedQuery)> =
            self.named_queries.iter().map(|(k, q)| (k.as_str(), q)).collect();
        queries.sort_by(|a, b| a.0.cmp(b.0));
        queries
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Parse a registry from TOML.
    ///
    /// ```toml
    /// [tables.w]
    /// table = "wholesalers"
    /// columns = ["id", "name", "status"]
    ///
    /// [named_queries.category_offerings]
    /// from = { table = "categories", alias = "c" }
    ///
    /// [[named_queries.category_offerings.joins]]
    /// joinType = "INNER"
    /// table = "offerings"
    /// alias = "o"
    /// on = { columnA = "o.category_id", operator = "=", columnB = "c.id" }
    /// ```
    pub fn from_toml_str(content: &str) -> QueryResult<Self> {
        let config: RegistryConfig = toml::from_str(content)
            .map_err(|e| QueryError::Config(format!("Failed to parse registry: {}", e)))?;

        let mut builder = Registry::builder();
        for (alias, def) in &config.tables {
            let columns: Vec<&str> = def.columns.iter().map(|c| c.as_str()).collect();
            builder = builder.register(alias, &def.table, &columns);
        }
        for (key, query) in config.named_queries {
            builder = builder.named_query(key, query);
        }
        builder.build()
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| QueryError::Config(format!("Failed to read registry {}: {}", path.display(), e)))?;
        let registry = Self::from_toml_str(&content)?;
        tracing::info!(
            "Loaded {} tables and {} named queries from {}",
            registry.tables.len(),
            registry.named_queries.len(),
            path.display()
        );
        Ok(registry)
    }
}

/// On-disk registry layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub tables: BTreeMap<String, TableDef>,
    #[serde(default)]
    pub named_queries: BTreeMap<String, NamedQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    pub table: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Builder for [`Registry`]. Errors are collected and reported by `build`.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
    error: Option<QueryError>,
}

impl RegistryBuilder {
    /// Register `alias` as `table` with the given column whitelist.
    pub fn register(mut self, alias: &str, table: &str, columns: &[&str]) -> Self {
        if self.error.is_some() {
            return self;
        }
        if let Err(e) = self.try_register(alias, table, columns) {
            self.error = Some(e);
        }
        self
    }

    fn try_register(&mut self, alias: &str, table: &str, columns: &[&str]) -> QueryResult<()> {
        let alias = Alias::parse(alias).map_err(|e| QueryError::configuration(e.to_string()))?;
        validate_table_name(table).map_err(|e| QueryError::configuration(e.to_string()))?;

        let mut allowed = BTreeSet::new();
        for column in columns {
            if *column != WILDCARD_COLUMN {
                Alias::parse(column).map_err(|_| {
                    QueryError::configuration(format!("invalid column '{}' for alias '{}'", column, alias))
                })?;
            }
            allowed.insert(column.to_string());
        }

        if self.registry.tables.contains_key(&alias) {
            return Err(QueryError::configuration(format!("alias '{}' registered twice", alias)));
        }
        tracing::debug!("Registered alias '{}' -> {} ({} columns)", alias, table, allowed.len());
        self.registry.tables.insert(
            alias.clone(),
            TableEntry {
                alias,
                table_name: table.to_string(),
                allowed_columns: allowed,
            },
        );
        Ok(())
    }

    pub fn named_query(mut self, key: impl Into<String>, query: NamedQuery) -> Self {
        let key = key.into();
        if self.error.is_none() && self.registry.named_queries.contains_key(&key) {
            self.error = Some(QueryError::configuration(format!("named query '{}' registered twice", key)));
        }
        self.registry.named_queries.insert(key, query);
        self
    }

    /// Finish the registry, checking every named query against the tables.
    pub fn build(self) -> QueryResult<Registry> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let registry = self.registry;
        for (key, query) in &registry.named_queries {
            check_topology(&registry, &query.from, &query.joins)
                .map_err(|e| QueryError::configuration(format!("named query '{}': {}", key, e)))?;
        }
        Ok(registry)
    }
}
