//! Validated identifiers.
//!
//! Aliases and column keys travel from the client to the generated SQL as
//! bare identifiers, so they are parsed with a closed grammar before anything
//! else looks at them:
//!
//! ```text
//! identifier := [A-Za-z_][A-Za-z0-9_]*
//! column_key := identifier ( "." identifier )?
//! table_name := identifier ( "." identifier )?     (schema-qualified, server side only)
//! ```

use nom::{
    bytes::complete::take_while,
    character::complete::{char, satisfy},
    combinator::{all_consuming, opt, recognize},
    sequence::{pair, preceded},
    IResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{QueryError, QueryResult};

/// Longest identifier part accepted (SQL Server's sysname limit).
pub const MAX_IDENT_LEN: usize = 128;

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn dotted(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    pair(identifier, opt(preceded(char('.'), identifier)))(input)
}

fn check_len(part: &str, whole: &str) -> QueryResult<()> {
    if part.len() > MAX_IDENT_LEN {
        return Err(QueryError::invalid(format!(
            "identifier '{}' exceeds {} characters",
            whole, MAX_IDENT_LEN
        )));
    }
    Ok(())
}

/// Returns the byte offset of the dot, if any.
fn parse_dotted(input: &str, what: &str) -> QueryResult<Option<usize>> {
    match all_consuming(dotted)(input) {
        Ok((_, (first, second))) => {
            check_len(first, input)?;
            if let Some(second) = second {
                check_len(second, input)?;
            }
            Ok(second.map(|_| first.len()))
        }
        Err(_) => Err(QueryError::invalid(format!("invalid {}: '{}'", what, input))),
    }
}

/// Validate a server-side table name (`table` or `schema.table`).
pub fn validate_table_name(name: &str) -> QueryResult<()> {
    parse_dotted(name, "table name").map(|_| ())
}

/// A table alias such as `w`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Alias(String);

impl Alias {
    pub fn parse(input: &str) -> QueryResult<Self> {
        match all_consuming(identifier)(input) {
            Ok((_, ident)) => {
                check_len(ident, input)?;
                Ok(Self(ident.to_string()))
            }
            Err(_) => Err(QueryError::invalid(format!("invalid alias: '{}'", input))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Alias {
    type Error = QueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Alias {
    type Error = QueryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Alias> for String {
    fn from(alias: Alias) -> Self {
        alias.0
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A column reference, either `column` or `alias.column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnKey {
    raw: String,
    dot: Option<usize>,
}

impl ColumnKey {
    pub fn parse(input: &str) -> QueryResult<Self> {
        let dot = parse_dotted(input, "column key")?;
        Ok(Self {
            raw: input.to_string(),
            dot,
        })
    }

    /// Build `alias.column` from parts that are already valid.
    pub fn qualified(alias: &Alias, column: &str) -> QueryResult<Self> {
        Self::parse(&format!("{}.{}", alias, column))
    }

    /// The alias part, if the key is qualified.
    pub fn alias(&self) -> Option<&str> {
        self.dot.map(|i| &self.raw[..i])
    }

    /// The bare column name.
    pub fn column(&self) -> &str {
        match self.dot {
            Some(i) => &self.raw[i + 1..],
            None => &self.raw,
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.dot.is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl TryFrom<String> for ColumnKey {
    type Error = QueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for ColumnKey {
    type Error = QueryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ColumnKey> for String {
    fn from(key: ColumnKey) -> Self {
        key.raw
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias() {
        assert_eq!(Alias::parse("w").unwrap().as_str(), "w");
        assert_eq!(Alias::parse("_tmp1").unwrap().as_str(), "_tmp1");
        assert!(Alias::parse("").is_err());
        assert!(Alias::parse("1w").is_err());
        assert!(Alias::parse("w.x").is_err());
        assert!(Alias::parse("w;").is_err());
    }

    #[test]
    fn test_column_key_parts() {
        let key = ColumnKey::parse("w.status").unwrap();
        assert_eq!(key.alias(), Some("w"));
        assert_eq!(key.column(), "status");
        assert!(key.is_qualified());

        let bare = ColumnKey::parse("status").unwrap();
        assert_eq!(bare.alias(), None);
        assert_eq!(bare.column(), "status");
    }

    #[test]
    fn test_column_key_rejects_injection() {
        for bad in [
            "w.status; DROP TABLE users",
            "w.status--",
            "w.'x'",
            "a.b.c",
            "w. status",
            "w.",
            ".status",
            "COUNT(*)",
            "*",
        ] {
            assert!(ColumnKey::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_length_limit() {
        let long = "a".repeat(MAX_IDENT_LEN + 1);
        assert!(ColumnKey::parse(&long).is_err());
        assert!(Alias::parse(&"a".repeat(MAX_IDENT_LEN)).is_ok());
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let key: ColumnKey = serde_json::from_str("\"o.id\"").unwrap();
        assert_eq!(key.as_str(), "o.id");
        assert!(serde_json::from_str::<ColumnKey>("\"o.id OR 1=1\"").is_err());
    }

    #[test]
    fn test_table_name() {
        assert!(validate_table_name("wholesalers").is_ok());
        assert!(validate_table_name("dbo.wholesalers").is_ok());
        assert!(validate_table_name("wholesalers w").is_err());
    }
}
