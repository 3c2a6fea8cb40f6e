//! Error types for sqlhydra

use thiserror::Error;

/// Result type alias for sqlhydra operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Coarse error classification.
///
/// Every [`OrmError`] belongs to exactly one kind, so callers can branch on the
/// category without matching each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unsupported dialect or invalid connection settings. Fatal.
    Configuration,
    /// The caller built something that cannot be compiled or executed.
    Usage,
    /// Registry lookups and transaction state violations.
    Connection,
    /// The database handle reported a failure.
    Execution,
}

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Dialect tag outside of sqlite/mysql/pgsql/mssql
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// Invalid connection configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Statement has no target table
    #[error("Missing table name")]
    MissingTable,

    /// Model schema has no `#[orm(id)]` field
    #[error("No primary key found for '{0}'")]
    MissingPrimaryKey(String),

    /// An AND/OR combinator was compiled without children
    #[error("Empty condition set")]
    EmptyCondition,

    /// Column list and values (or model schema) disagree
    #[error("Column mismatch: {0}")]
    ColumnMismatch(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Registry has no connection with that name
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    /// `begin` while a transaction is already active
    #[error("Already in a transaction")]
    AlreadyInTransaction,

    /// `commit`/`rollback` without an active transaction
    #[error("Not in a transaction")]
    NotInTransaction,

    /// Generic handle failure
    #[error("Execution error: {0}")]
    Execution(String),

    /// PostgreSQL driver error
    #[cfg(feature = "postgres")]
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// SQLite driver error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The transaction body failed and the compensating rollback failed too.
    #[error("{source} (rollback failed: {rollback})")]
    RollbackFailed {
        source: Box<OrmError>,
        rollback: Box<OrmError>,
    },
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a column mismatch error
    pub fn column_mismatch(message: impl Into<String>) -> Self {
        Self::ColumnMismatch(message.into())
    }

    /// Create a generic execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Attach a failed rollback to the error that triggered it.
    pub fn with_rollback_failure(self, rollback: OrmError) -> Self {
        Self::RollbackFailed {
            source: Box::new(self),
            rollback: Box::new(rollback),
        }
    }

    /// Classify this error.
    ///
    /// A [`OrmError::RollbackFailed`] reports the kind of the original failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedDialect(_) | Self::Config(_) => ErrorKind::Configuration,
            Self::MissingTable
            | Self::MissingPrimaryKey(_)
            | Self::EmptyCondition
            | Self::ColumnMismatch(_)
            | Self::Validation(_) => ErrorKind::Usage,
            Self::ConnectionNotFound(_) | Self::AlreadyInTransaction | Self::NotInTransaction => {
                ErrorKind::Connection
            }
            Self::RollbackFailed { source, .. } => source.kind(),
            _ => ErrorKind::Execution,
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            OrmError::UnsupportedDialect("oracle".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(OrmError::MissingTable.kind(), ErrorKind::Usage);
        assert_eq!(OrmError::EmptyCondition.kind(), ErrorKind::Usage);
        assert_eq!(OrmError::AlreadyInTransaction.kind(), ErrorKind::Connection);
        assert_eq!(
            OrmError::ConnectionNotFound("x".into()).kind(),
            ErrorKind::Connection
        );
        assert_eq!(OrmError::execution("boom").kind(), ErrorKind::Execution);
    }

    #[test]
    fn rollback_failure_keeps_original_kind() {
        let err = OrmError::validation("bad input")
            .with_rollback_failure(OrmError::execution("connection reset"));
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(
            err.to_string(),
            "Validation error: bad input (rollback failed: Execution error: connection reset)"
        );
    }
}
