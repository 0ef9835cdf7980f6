//! Error types for tee

use thiserror::Error;

/// Result type alias for tee operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Boxed driver error carried through [`OrmError::Database`] unmodified.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Zero rows where exactly one was expected
    #[error("Not found: {0}")]
    NotFound(String),

    /// More than one row where exactly one was expected
    #[error("Multiple records found: expected 1 row, got {0}")]
    MultipleRecords(usize),

    /// Supplied data contains no column known to the model
    #[error("No valid field found")]
    NoValidFields,

    /// UPDATE/DELETE attempted without any WHERE condition
    #[error("{0} operation requires at least one condition to prevent full table mutation")]
    UnscopedMutation(&'static str),

    /// Configuration misuse of a reserved database name
    #[error("Database name \"{0}\" is reserved for the default database")]
    ReservedName(String),

    /// No database registered under the given name
    #[error("Unknown database: {0}")]
    UnknownDatabase(String),

    /// Statement text and bound arguments disagree
    #[error("Statement has {expected} placeholders but {got} arguments")]
    PlaceholderMismatch { expected: usize, got: usize },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Context operation used outside of an execution unit
    #[error("No execution unit is active on this task")]
    NoExecutionUnit,

    /// A transaction block failed and the rollback failed as well
    #[error("{source} (rollback failed: {rollback})")]
    Rollback {
        #[source]
        source: Box<OrmError>,
        rollback: Box<OrmError>,
    },

    /// Configuration file error
    #[error("Config error: {0}")]
    Config(String),

    /// Driver-surfaced error (connectivity, SQL), passed through unmodified
    #[error("Database error: {0}")]
    Database(#[source] DriverError),
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

    /// Wrap a driver error without altering it
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Database(Box::new(err))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is an unscoped UPDATE/DELETE error
    pub fn is_unscoped_mutation(&self) -> bool {
        matches!(self, Self::UnscopedMutation(_))
    }

    /// The error that triggered a rollback, or `self` for every other variant.
    pub fn original(&self) -> &OrmError {
        match self {
            Self::Rollback { source, .. } => source.original(),
            other => other,
        }
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for OrmError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Database(Box::new(err))
    }
}

impl From<toml::de::Error> for OrmError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
