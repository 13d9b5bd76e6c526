use async_trait::async_trait;
use scylla::transport::SelfIdentity;
use scylla::{Session, SessionBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::session::{ConnectParams, DriverSession, SessionFactory};
use crate::errors::{DriverError, DriverErrorKind};
use crate::types::{IndexRow, QueryOutcome};

const INDEX_ROWS_QUERY: &str = "SELECT index_name, kind, options FROM system_schema.indexes \
     WHERE keyspace_name = ? AND table_name = ?";

/// Session factory backed by the `scylla` crate. Works against Cassandra 4.x as well.
#[derive(Debug, Default, Clone)]
pub struct ScyllaSessionFactory;

#[async_trait]
impl SessionFactory for ScyllaSessionFactory {
    async fn connect(&self, params: &ConnectParams) -> Result<Arc<dyn DriverSession>, DriverError> {
        info!(
            "Connecting to ScyllaDB node {} as {} (application: {})",
            params.address(),
            params.username,
            params.application_name.as_deref().unwrap_or("-")
        );

        let session = session_builder(params)
            .build().await.map_err(|e| {
            error!("Failed to connect to ScyllaDB at {}: {}", params.address(), e);
            DriverError::from(e)
        })?;

        info!("Successfully connected to ScyllaDB keyspace: {}", params.keyspace);
        Ok(Arc::new(ScyllaSession::new(session)))
    }
}

/// Builder for `params`; the application name travels in the STARTUP frame.
fn session_builder(params: &ConnectParams) -> SessionBuilder {
    let mut builder = SessionBuilder::new()
        .known_node(params.address())
        .user(&params.username, &params.password)
        .connection_timeout(params.connect_timeout);

    if let Some(application_name) = &params.application_name {
        builder = builder
            .custom_identity(SelfIdentity::new().with_application_name(application_name.clone()));
    }

    if !params.keyspace.is_empty() {
        builder = builder.use_keyspace(&params.keyspace, false);
    }

    builder
}

/// Driver session wrapper; `shutdown` drops the underlying `scylla::Session`.
pub struct ScyllaSession {
    session: RwLock<Option<Arc<Session>>>,
}

impl ScyllaSession {
    pub fn new(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(Arc::new(session))),
        }
    }

    async fn session(&self) -> Result<Arc<Session>, DriverError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| DriverError::new(DriverErrorKind::Closed, "session has been shut down"))
    }
}

#[async_trait]
impl DriverSession for ScyllaSession {
    async fn execute(&self, cql: &str) -> Result<QueryOutcome, DriverError> {
        let session = self.session().await?;
        let result = session.query_unpaged(cql, ()).await?;
        let row_count = result.rows_num().ok().map(|n| n as u64);

        Ok(QueryOutcome {
            status_message: status_line(cql, row_count),
            row_count,
        })
    }

    async fn index_rows(&self, keyspace: &str, table: &str) -> Result<Vec<IndexRow>, DriverError> {
        let session = self.session().await?;
        let result = session
            .query_unpaged(INDEX_ROWS_QUERY, (keyspace, table))
            .await?;

        let rows = result
            .rows_typed::<(String, String, HashMap<String, String>)>()
            .map_err(|e| DriverError::new(DriverErrorKind::Other, e.to_string()))?;

        rows.map(|row| {
            row.map(|(index_name, kind, options)| IndexRow {
                index_name,
                kind,
                options,
            })
            .map_err(|e| DriverError::new(DriverErrorKind::Other, e.to_string()))
        })
        .collect()
    }

    async fn commit(&self) -> Result<(), DriverError> {
        self.session().await?;
        debug!("COMMIT is a no-op on ScyllaDB");
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        self.session().await?;
        debug!("ROLLBACK is a no-op on ScyllaDB");
        Ok(())
    }

    async fn shutdown(&self) {
        if self.session.write().await.take().is_some() {
            info!("ScyllaDB session shut down");
        }
    }
}

/// Postgres-style status line: leading keyword, plus the row count for row-returning statements.
fn status_line(cql: &str, row_count: Option<u64>) -> Option<String> {
    let keyword = cql.split_whitespace().next()?.to_uppercase();
    Some(match row_count {
        Some(rows) => format!("{} {}", keyword, rows),
        None => keyword,
    })
}
