//! SELECT / FROM / JOIN / ORDER BY fragments.

use crate::ast::{JoinType, OnFilter, SortDescriptor};
use crate::ident::{Alias, ColumnKey};
use crate::transpiler::conditions::render_on;
use crate::transpiler::params::ParamContext;
use crate::transpiler::traits::SqlGenerator;

pub fn render_select(columns: &[ColumnKey], generator: &dyn SqlGenerator) -> String {
    columns
        .iter()
        .map(|c| generator.escape_identifier(c.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `<table> <alias>`
pub fn render_table(table: &str, alias: &Alias, generator: &dyn SqlGenerator) -> String {
    format!(
        "{} {}",
        generator.escape_identifier(table),
        generator.escape_identifier(alias.as_str())
    )
}

/// `<JOIN TYPE> <table> <alias> ON <on>`
pub fn render_join(join_type: JoinType, table: &str, alias: &Alias, on: &OnFilter, ctx: &mut ParamContext) -> String {
    let target = render_table(table, alias, ctx.generator());
    format!("{} {} ON {}", join_type.sql_keyword(), target, render_on(on, ctx))
}

/// Comma-separated sort list, without the `ORDER BY` keyword.
pub fn render_order_by(order_by: &[SortDescriptor], generator: &dyn SqlGenerator) -> String {
    order_by
        .iter()
        .map(|s| {
            format!(
                "{} {}",
                generator.escape_identifier(s.column_key.as_str()),
                s.direction.sql_keyword()
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
