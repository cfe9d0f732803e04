//! WHERE / ON fragment rendering.
//!
//! Rendering assumes the tree already went through
//! [`crate::compiler`] validation. Shapes that validation rejects still fail
//! closed here and render as the always-false predicate.

use crate::ast::*;
use crate::transpiler::params::ParamContext;

/// Always-false predicate, used for empty IN lists.
pub const FALSE_PREDICATE: &str = "1=0";

pub trait ConditionToSql {
    /// Render this node, binding every value through `ctx`.
    fn to_sql(&self, ctx: &mut ParamContext) -> String;
}

impl ConditionToSql for Condition {
    fn to_sql(&self, ctx: &mut ParamContext) -> String {
        let col = ctx.generator().escape_identifier(self.column_key.as_str());
        let op = self.operator.sql_symbol();

        if self.operator.is_null_check() {
            return format!("{} {}", col, op);
        }

        if self.operator.is_list() {
            let values: &[Scalar] = match &self.value {
                Some(ConditionValue::List(values)) => values,
                Some(ConditionValue::Scalar(value)) => std::slice::from_ref(value),
                None => &[],
            };
            if values.is_empty() {
                return FALSE_PREDICATE.to_string();
            }
            let placeholders: Vec<String> = values.iter().map(|v| ctx.add_param(v.clone())).collect();
            return format!("{} {} ({})", col, op, placeholders.join(", "));
        }

        match &self.value {
            Some(ConditionValue::Scalar(value)) => {
                format!("{} {} {}", col, op, ctx.add_param(value.clone()))
            }
            _ => FALSE_PREDICATE.to_string(),
        }
    }
}

impl ConditionToSql for JoinColumnCondition {
    fn to_sql(&self, ctx: &mut ParamContext) -> String {
        let generator = ctx.generator();
        format!(
            "{} {} {}",
            generator.escape_identifier(self.column_a.as_str()),
            self.operator.sql_symbol(),
            generator.escape_identifier(self.column_b.as_str())
        )
    }
}

impl<N: ConditionToSql> ConditionToSql for ConditionGroup<N> {
    fn to_sql(&self, ctx: &mut ParamContext) -> String {
        if self.conditions.is_empty() {
            return FALSE_PREDICATE.to_string();
        }
        let joiner = format!(" {} ", self.logical_operator.sql_symbol());
        let parts: Vec<String> = self.conditions.iter().map(|c| c.to_sql(ctx)).collect();
        format!("({})", parts.join(&joiner))
    }
}

impl ConditionToSql for Filter {
    fn to_sql(&self, ctx: &mut ParamContext) -> String {
        match self {
            Filter::Leaf(c) => c.to_sql(ctx),
            Filter::Group(g) => g.to_sql(ctx),
        }
    }
}

impl ConditionToSql for OnFilter {
    fn to_sql(&self, ctx: &mut ParamContext) -> String {
        match self {
            OnFilter::Columns(c) => c.to_sql(ctx),
            OnFilter::Leaf(c) => c.to_sql(ctx),
            OnFilter::Group(g) => g.to_sql(ctx),
        }
    }
}

/// Render a WHERE tree.
pub fn render_where(filter: &Filter, ctx: &mut ParamContext) -> String {
    filter.to_sql(ctx)
}

/// Render an ON tree.
pub fn render_on(on: &OnFilter, ctx: &mut ParamContext) -> String {
    on.to_sql(ctx)
}
