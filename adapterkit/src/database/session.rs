use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Credentials;
use crate::errors::DriverError;
use crate::types::{IndexRow, QueryOutcome};

/// Everything the driver needs to establish a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub contact_point: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub keyspace: String,
    pub connect_timeout: Duration,
    pub application_name: Option<String>,
}

impl ConnectParams {
    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self {
            contact_point: credentials.host.clone(),
            port: credentials.port,
            username: credentials.user.clone(),
            password: credentials.password.clone(),
            keyspace: credentials.keyspace.clone(),
            connect_timeout: credentials.connect_timeout(),
            application_name: credentials.application_name.clone(),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.contact_point, self.port)
    }
}

/// An established driver session.
#[async_trait]
pub trait DriverSession: Send + Sync {
    async fn execute(&self, cql: &str) -> Result<QueryOutcome, DriverError>;

    /// Rows of `system_schema.indexes` for one table or view.
    async fn index_rows(&self, keyspace: &str, table: &str) -> Result<Vec<IndexRow>, DriverError>;

    /// Transaction markers; Scylla has no multi-statement transactions.
    async fn commit(&self) -> Result<(), DriverError>;
    async fn rollback(&self) -> Result<(), DriverError>;

    /// Tear the session down immediately. Later calls fail with `DriverErrorKind::Closed`.
    async fn shutdown(&self);
}

/// Builds driver sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn connect(&self, params: &ConnectParams) -> Result<Arc<dyn DriverSession>, DriverError>;
}
