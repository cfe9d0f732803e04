//! Error types for bizq.

use thiserror::Error;

/// A rejected request that tried to reach outside the registry.
///
/// These are never corrected silently: the compiler logs them for audit
/// and refuses to produce SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityViolation {
    /// The alias has no registry entry.
    #[error("alias '{alias}' is not registered")]
    UnregisteredAlias { alias: String },

    /// The alias is registered, but for a different table.
    #[error("alias '{alias}' is registered for table '{registered}', not '{requested}'")]
    AliasTableMismatch {
        alias: String,
        registered: String,
        requested: String,
    },

    /// Every joined table must carry an alias.
    #[error("join on table '{table}' is missing an alias")]
    JoinMissingAlias { table: String },

    /// The column is not whitelisted for the alias.
    #[error("column '{column}' is not allowed for alias '{alias}'")]
    ColumnNotAllowed { alias: String, column: String },

    /// A column key names an alias that takes no part in the query.
    #[error("alias '{alias}' is not part of this query")]
    AliasNotInQuery { alias: String },
}

/// The main error type for bizq operations.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No usable FROM source, unknown named query or a broken registry.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Alias/table/column outside the registry.
    #[error("Security violation: {0}")]
    Security(#[from] SecurityViolation),

    /// Structurally invalid payload (bad identifier, missing value, empty group).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store rejected the statement or timed out.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Failed to load a configuration or registry file.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON payload error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server or caller bug, never client-recoverable.
    Configuration,
    /// Rejected request, logged for audit.
    Security,
    /// Malformed client payload.
    Invalid,
    /// The store failed.
    Execution,
}

impl QueryError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::Config(_) | Self::Io(_) => ErrorKind::Configuration,
            Self::Security(_) => ErrorKind::Security,
            Self::InvalidQuery(_) | Self::Json(_) => ErrorKind::Invalid,
            Self::Connection(_) | Self::Execution(_) => ErrorKind::Execution,
        }
    }

    /// HTTP status code a calling layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Configuration(_) | Self::Config(_) | Self::Io(_) => 500,
            Self::Security(_) => 403,
            Self::InvalidQuery(_) | Self::Json(_) => 400,
            Self::Connection(_) => 503,
            Self::Execution(_) => 502,
        }
    }
}

/// Result type alias for bizq operations.
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_display() {
        let err = QueryError::from(SecurityViolation::AliasTableMismatch {
            alias: "w".to_string(),
            registered: "wholesalers".to_string(),
            requested: "users".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Security violation: alias 'w' is registered for table 'wholesalers', not 'users'"
        );
        assert_eq!(err.kind(), ErrorKind::Security);
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(QueryError::configuration("x").kind(), ErrorKind::Configuration);
        assert_eq!(QueryError::invalid("x").status_code(), 400);
        assert_eq!(QueryError::Execution("x".into()).kind(), ErrorKind::Execution);
    }
}
