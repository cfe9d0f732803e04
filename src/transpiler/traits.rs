//! Dialect-specific SQL generation.

/// SQL reserved words that must be quoted when used as identifiers.
///
/// Identifiers reaching the generator already passed [`crate::ident`], so a
/// reserved word is the only reason an identifier needs quoting.
pub const RESERVED_WORDS: &[&str] = &[
    "all", "alter", "and", "as", "asc", "between", "by", "case", "check", "column", "constraint",
    "create", "cross", "default", "delete", "desc", "distinct", "drop", "else", "end", "except",
    "exists", "false", "fetch", "foreign", "from", "full", "grant", "group", "having", "in",
    "index", "inner", "insert", "intersect", "into", "is", "join", "key", "left", "like", "limit",
    "not", "null", "offset", "on", "or", "order", "outer", "primary", "references", "right",
    "rows", "select", "set", "table", "then", "to", "top", "true", "union", "unique", "update",
    "user", "using", "values", "view", "when", "where", "with",
];

pub fn is_reserved(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    RESERVED_WORDS.contains(&lower.as_str())
}

/// Trait for dialect-specific SQL generation.
pub trait SqlGenerator {
    /// Quote a single identifier part unconditionally.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quote the parts of `name` (`a` or `a.b`) that are reserved words.
    fn escape_identifier(&self, name: &str) -> String {
        name.split('.')
            .map(|part| {
                if is_reserved(part) {
                    self.quote_identifier(part)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Placeholder for the parameter named `p{index}` (0-based).
    fn placeholder(&self, index: usize) -> String;

    /// Pagination clause. Only called with a positive `limit`.
    fn pagination(&self, limit: u64, offset: u64) -> String;

    /// Whether OFFSET/FETCH is only legal after an ORDER BY.
    fn requires_order_for_pagination(&self) -> bool {
        false
    }

    /// Upper bound on bind parameters in one statement.
    fn max_parameters(&self) -> usize;
}
