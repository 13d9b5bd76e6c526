use scylla::transport::errors::{DbError, NewSessionError, QueryError};
use thiserror::Error;

/// Closed classification of driver failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverErrorKind {
    /// Network-level failure: unreachable host, broken connection, connect timeout.
    Connection,
    /// Credentials rejected by the cluster.
    Authentication,
    /// Cluster reachable but unable to serve (overloaded, bootstrapping, not enough replicas).
    Unavailable,
    /// Server-side read/write timeout.
    Timeout,
    /// Statement or configuration rejected as invalid.
    Invalid,
    /// The session handle was already shut down.
    Closed,
    Other,
}

impl DriverErrorKind {
    /// Whether a new connection attempt may succeed after this failure.
    pub fn is_retryable(self) -> bool {
        matches!(self, DriverErrorKind::Connection)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DriverErrorKind::Connection => "connection",
            DriverErrorKind::Authentication => "authentication",
            DriverErrorKind::Unavailable => "unavailable",
            DriverErrorKind::Timeout => "timeout",
            DriverErrorKind::Invalid => "invalid",
            DriverErrorKind::Closed => "closed",
            DriverErrorKind::Other => "other",
        }
    }
}

/// A classified failure reported by the database driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

fn classify_db_error(err: &DbError) -> DriverErrorKind {
    match err {
        DbError::AuthenticationError | DbError::Unauthorized => DriverErrorKind::Authentication,
        DbError::Unavailable { .. } | DbError::Overloaded | DbError::IsBootstrapping => {
            DriverErrorKind::Unavailable
        }
        DbError::ReadTimeout { .. } | DbError::WriteTimeout { .. } => DriverErrorKind::Timeout,
        DbError::SyntaxError | DbError::Invalid | DbError::ConfigError => DriverErrorKind::Invalid,
        _ => DriverErrorKind::Other,
    }
}

impl From<NewSessionError> for DriverError {
    fn from(err: NewSessionError) -> Self {
        let kind = match &err {
            NewSessionError::DbError(db_error, _) => classify_db_error(db_error),
            NewSessionError::EmptyKnownNodesList | NewSessionError::BadQuery(_) => {
                DriverErrorKind::Invalid
            }
            // Every remaining session error is raised while reaching the nodes.
            _ => DriverErrorKind::Connection,
        };
        DriverError::new(kind, err.to_string())
    }
}

impl From<QueryError> for DriverError {
    fn from(err: QueryError) -> Self {
        let kind = match &err {
            QueryError::DbError(db_error, _) => classify_db_error(db_error),
            QueryError::BadQuery(_) => DriverErrorKind::Invalid,
            _ => DriverErrorKind::Connection,
        };
        DriverError::new(kind, err.to_string())
    }
}

/// Errors surfaced to the host tool.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Connection error: {message}")]
    ConnectionError {
        message: String,
        #[source]
        source: DriverError,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Runtime error: {0}")]
    RuntimeError(#[source] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AdapterError {
    pub fn runtime(message: impl Into<String>) -> Self {
        AdapterError::RuntimeError(anyhow::anyhow!(message.into()))
    }

    /// Runtime-kind errors already carry a meaningful signal and are never re-wrapped.
    pub fn is_runtime(&self) -> bool {
        !matches!(self, AdapterError::InternalError(_))
    }
}

impl From<config::ConfigError> for AdapterError {
    fn from(err: config::ConfigError) -> Self {
        AdapterError::ConfigError(err.to_string())
    }
}

impl From<serde_yaml::Error> for AdapterError {
    fn from(err: serde_yaml::Error) -> Self {
        AdapterError::ConfigError(err.to_string())
    }
}

/// Failure raised inside a statement executed under the exception boundary.
#[derive(Error, Debug)]
pub enum StatementError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
