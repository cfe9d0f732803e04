//! SQL transpiler: clause builders and dialect generators.
//!
//! Every client value leaves this module as a bind parameter; the only text
//! spliced into SQL is identifiers that passed [`crate::ident`] and the
//! registry (quoted when they are reserved words), keywords, and integer
//! pagination bounds.

pub mod clauses;
pub mod conditions;
pub mod dialect;
pub mod params;
pub mod sql;
pub mod traits;

pub use clauses::{render_join, render_order_by, render_select, render_table};
pub use conditions::{render_on, render_where, ConditionToSql, FALSE_PREDICATE};
pub use dialect::Dialect;
pub use params::{BoundParam, ParamContext, Parameters};
pub use traits::{is_reserved, SqlGenerator, RESERVED_WORDS};
