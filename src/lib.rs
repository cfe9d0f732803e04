//! # bizq
//!
//! Secure dynamic query compiler for business-data browsers.
//!
//! A client describes what it wants to see as a JSON [`QueryPayload`]
//! (columns, a FROM alias, joins, a condition tree, sorting and paging).
//! bizq checks every alias, table and column against a server-owned
//! [`Registry`] and turns the payload into parameterized SQL. Client values
//! only ever travel as bind parameters.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use bizq::prelude::*;
//!
//! let registry = Registry::load_from_file("registry.toml")?;
//! let payload = QueryPayload::from_json(body)?;
//!
//! let compiled = QueryCompiler::new(&registry)
//!     .dialect(Dialect::Postgres)
//!     .compile(&payload, None, None)?;
//!
//! let db = QueryDb::connect("postgres://localhost/catalog").await?;
//! let rows = db.execute(&compiled).await?;
//! ```
//!
//! ## Operators
//!
//! | Operator      | Value          | SQL                         |
//! |---------------|----------------|-----------------------------|
//! | `=` `!=` `<` `<=` `>` `>=` `LIKE` | scalar | `col op @p0`  |
//! | `IN` `NOT IN` | list           | `col IN (@p0, @p1)`, `1=0` when empty |
//! | `IS NULL` `IS NOT NULL` | none | `col IS NULL`               |

pub mod ast;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod ident;
pub mod registry;
pub mod transpiler;

pub use ast::QueryPayload;
pub use compiler::{compile, CompiledQuery, QueryCompiler, QueryMetadata};
pub use registry::Registry;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::compiler::{compile, CompiledQuery, QueryCompiler, QueryMetadata};
    pub use crate::config::{AppConfig, DatabaseConfig};
    pub use crate::engine::{QueryDb, QueryRow};
    pub use crate::error::*;
    pub use crate::ident::{Alias, ColumnKey};
    pub use crate::registry::{NamedQuery, Registry, TableEntry};
    pub use crate::transpiler::{Dialect, Parameters};
}
