// adapterkit/src/database/manager.rs
//
// ScyllaConnectionManager - connection lifecycle for the adapter
// Opens with bounded retry, translates driver failures at the statement
// boundary, and keeps transaction bookkeeping for the host tool.
//

use prometheus::IntGauge;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::connection::{Connection, ConnectionState};
use super::retry::{Backoff, RetryPolicy};
use super::scylla::ScyllaSessionFactory;
use super::session::{ConnectParams, SessionFactory};
use crate::errors::{AdapterError, DriverError, StatementError};
use crate::metrics::{self, ACTIVE_CONNECTIONS};
use crate::telemetry::{AdapterEvent, EventRecord, TelemetrySink, TracingTelemetry};
use crate::types::{type_codes, AdapterResponse, QueryOutcome, RelationResults};

pub struct ScyllaConnectionManager {
    factory: Arc<dyn SessionFactory>,
    telemetry: Arc<dyn TelemetrySink>,
    backoff: Backoff,
    active_connections: IntGauge,
}

impl Default for ScyllaConnectionManager {
    fn default() -> Self {
        Self::new(Arc::new(ScyllaSessionFactory))
    }
}

impl ScyllaConnectionManager {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            telemetry: Arc::new(TracingTelemetry),
            backoff: Backoff::Quadratic,
            active_connections: ACTIVE_CONNECTIONS.clone(),
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Replace the wait applied between connection attempts.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Count open connections on `gauge` instead of the global `ACTIVE_CONNECTIONS`.
    /// A connection leaves the gauge on `cancel` or when it is dropped.
    pub fn with_active_connections_gauge(mut self, gauge: IntGauge) -> Self {
        self.active_connections = gauge;
        self
    }

    fn fire(&self, event: AdapterEvent) {
        self.telemetry.fire(EventRecord::now(event));
    }

    /// Open `connection`, retrying transient failures up to `credentials.retries` attempts.
    pub async fn open<'c>(
        &self,
        connection: &'c mut Connection,
    ) -> Result<&'c mut Connection, AdapterError> {
        if connection.state == ConnectionState::Open {
            debug!("Connection is already open, skipping open.");
            return Ok(connection);
        }

        let credentials = connection.credentials().clone();
        credentials.validate()?;
        let params = ConnectParams::from_credentials(&credentials);
        let policy = RetryPolicy::new(credentials.retries, self.backoff.clone());
        let factory = self.factory.clone();
        let start = Instant::now();

        debug!(
            "Opening connection \"{}\" ({} attempt(s) allowed)",
            connection.name(),
            policy.max_attempts()
        );

        let outcome = policy
            .execute(
                |attempt| {
                    let factory = factory.clone();
                    let params = params.clone();
                    async move {
                        if attempt > 1 {
                            debug!("Connection attempt {} to {}", attempt, params.address());
                        }
                        factory.connect(&params).await
                    }
                },
                |err: &DriverError| err.is_retryable(),
            )
            .await;

        let elapsed = start.elapsed().as_secs_f64();
        match outcome.result {
            Ok(handle) => {
                metrics::record_operation("open", true, elapsed);
                connection.attach(handle, self.active_connections.clone());
                self.fire(AdapterEvent::ConnectionOpened {
                    conn_name: connection.name().to_string(),
                    attempts: outcome.attempts,
                });
                Ok(connection)
            }
            Err(err) => {
                metrics::record_operation("open", false, elapsed);
                connection.release();
                warn!(
                    "Failed to open connection \"{}\" after {} attempt(s): {}",
                    connection.name(),
                    outcome.attempts,
                    err
                );
                Err(AdapterError::ConnectionError {
                    message: err.message.trim().to_string(),
                    source: err,
                })
            }
        }
    }

    /// Run `statement` inside the exception boundary for `sql`.
    ///
    /// Any failure rolls back an open transaction first; a failing rollback is
    /// logged and never replaces the original error.
    pub async fn exception_handler<T, Fut>(
        &self,
        connection: &mut Connection,
        sql: &str,
        statement: Fut,
    ) -> Result<T, AdapterError>
    where
        Fut: Future<Output = Result<T, StatementError>>,
    {
        let err = match statement.await {
            Ok(value) => return Ok(value),
            Err(StatementError::Other(other)) => Self::typed_cause(other),
            Err(err) => err,
        };

        match err {
            StatementError::Driver(driver_error) => {
                debug!("Scylla error ({}): {}", driver_error.kind.as_str(), driver_error);
                self.rollback_quietly(connection).await;
                Err(AdapterError::DatabaseError(
                    driver_error.to_string().trim().to_string(),
                ))
            }
            StatementError::Adapter(adapter_error) if adapter_error.is_runtime() => {
                debug!("Error running SQL: {}", sql);
                debug!("Rolling back transaction.");
                self.rollback_quietly(connection).await;
                Err(adapter_error)
            }
            StatementError::Adapter(adapter_error) => {
                debug!("Error running SQL: {}", sql);
                debug!("Rolling back transaction.");
                self.rollback_quietly(connection).await;
                Err(AdapterError::RuntimeError(anyhow::Error::new(adapter_error)))
            }
            StatementError::Other(other) => {
                debug!("Error running SQL: {}", sql);
                debug!("Rolling back transaction.");
                self.rollback_quietly(connection).await;
                Err(AdapterError::RuntimeError(other))
            }
        }
    }

    /// Recover a driver or adapter error carried inside an `anyhow` chain,
    /// e.g. after `.context(..)?` in a statement.
    fn typed_cause(other: anyhow::Error) -> StatementError {
        let other = match other.downcast::<DriverError>() {
            Ok(driver_error) => return StatementError::Driver(driver_error),
            Err(other) => other,
        };
        match other.downcast::<AdapterError>() {
            Ok(adapter_error) => StatementError::Adapter(adapter_error),
            Err(other) => StatementError::Other(other),
        }
    }

    async fn rollback_quietly(&self, connection: &mut Connection) {
        if let Err(err) = self.rollback_if_open(connection).await {
            warn!("Failed to release connection \"{}\": {}", connection.name(), err);
        }
    }

    /// Roll back when a transaction is open; the flag is cleared even if the marker fails.
    pub async fn rollback_if_open(&self, connection: &mut Connection) -> Result<(), AdapterError> {
        if !connection.transaction_open {
            return Ok(());
        }

        connection.transaction_open = false;
        let handle = connection.handle()?;
        handle
            .rollback()
            .await
            .map_err(|e| AdapterError::DatabaseError(e.to_string().trim().to_string()))?;

        self.fire(AdapterEvent::Rollback {
            conn_name: connection.name().to_string(),
            node_info: connection.node_info().cloned(),
        });
        Ok(())
    }

    pub fn begin<'c>(
        &self,
        connection: &'c mut Connection,
    ) -> Result<&'c mut Connection, AdapterError> {
        if connection.transaction_open {
            return Err(AdapterError::InternalError(format!(
                "Tried to begin a new transaction on connection \"{}\", but it already had one open!",
                connection.name()
            )));
        }

        connection.transaction_open = true;
        Ok(connection)
    }

    pub async fn commit<'c>(
        &self,
        connection: &'c mut Connection,
    ) -> Result<&'c mut Connection, AdapterError> {
        if !connection.transaction_open {
            return Err(AdapterError::InternalError(format!(
                "Tried to commit transaction on connection \"{}\", but it does not have one open!",
                connection.name()
            )));
        }

        self.fire(AdapterEvent::SqlCommit {
            conn_name: connection.name().to_string(),
            node_info: connection.node_info().cloned(),
        });
        self.add_commit_query(connection).await?;

        connection.transaction_open = false;
        Ok(connection)
    }

    async fn add_commit_query(&self, connection: &mut Connection) -> Result<(), AdapterError> {
        debug!("On {}: COMMIT", connection.name());
        let handle = connection.handle()?;
        self.exception_handler(connection, "COMMIT", async move {
            handle.commit().await?;
            Ok::<_, StatementError>(())
        })
        .await
    }

    /// Shut the session down immediately; in-flight statements are not drained.
    pub async fn cancel(&self, connection: &mut Connection) {
        if let Some(handle) = connection.release() {
            handle.shutdown().await;
        }
        self.fire(AdapterEvent::ConnectionCancelled {
            conn_name: connection.name().to_string(),
        });
    }

    /// Execute one statement on an open connection.
    pub async fn execute(
        &self,
        connection: &mut Connection,
        sql: &str,
    ) -> Result<AdapterResponse, AdapterError> {
        debug!("On {}: {}", connection.name(), sql);
        let handle = connection.handle()?;
        let start = Instant::now();

        let owned_sql = sql.to_string();
        let result = self
            .exception_handler(connection, sql, async move {
                Ok::<_, StatementError>(handle.execute(&owned_sql).await?)
            })
            .await;

        metrics::record_operation("execute", result.is_ok(), start.elapsed().as_secs_f64());
        let outcome = result?;
        let response = Self::get_response(&outcome);
        debug!("SQL status: {} in {:.3}s", response.code, start.elapsed().as_secs_f64());
        Ok(response)
    }

    /// Load the live index metadata of `keyspace.relation`.
    pub async fn get_relation_results(
        &self,
        connection: &mut Connection,
        keyspace: &str,
        relation: &str,
    ) -> Result<RelationResults, AdapterError> {
        let handle = connection.handle()?;
        let sql = format!(
            "SELECT index_name, kind, options FROM system_schema.indexes \
             WHERE keyspace_name = '{}' AND table_name = '{}'",
            keyspace, relation
        );
        let (ks, table) = (keyspace.to_string(), relation.to_string());

        let indexes = self
            .exception_handler(connection, &sql, async move {
                Ok::<_, StatementError>(handle.index_rows(&ks, &table).await?)
            })
            .await?;

        info!("Found {} index(es) on {}.{}", indexes.len(), keyspace, relation);
        Ok(RelationResults { indexes })
    }

    pub fn get_response(outcome: &QueryOutcome) -> AdapterResponse {
        let message = outcome.status_message.clone().unwrap_or_default();
        let code = message
            .split_whitespace()
            .filter(|part| !part.chars().all(|c| c.is_ascii_digit()))
            .collect::<Vec<_>>()
            .join(" ");

        AdapterResponse {
            message,
            code,
            rows_affected: outcome.row_count,
        }
    }

    pub fn data_type_code_to_name(type_code: u16) -> String {
        match type_code {
            type_codes::BLOB => "BLOB".to_string(),
            type_codes::TEXT => "TEXT".to_string(),
            type_codes::VARCHAR => "VARCHAR".to_string(),
            other => format!("unknown type_code {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::database::mock::{MockFactory, RecordingTelemetry};
    use crate::errors::DriverErrorKind;
    use crate::types::NodeInfo;
    use anyhow::Context;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;
    use std::time::Duration;

    fn credentials(retries: u32) -> Credentials {
        Credentials::new("127.0.0.1", 9042, "scylla", "scylla", "analytics")
            .unwrap()
            .with_retries(retries)
    }

    fn refused() -> DriverError {
        DriverError::new(DriverErrorKind::Connection, "Connection refused (os error 111)")
    }

    fn build_manager(factory: Arc<MockFactory>) -> (ScyllaConnectionManager, Arc<RecordingTelemetry>) {
        let telemetry = Arc::new(RecordingTelemetry::default());
        let manager = ScyllaConnectionManager::new(factory)
            .with_telemetry(telemetry.clone())
            .with_backoff(Backoff::Fixed(Duration::ZERO));
        (manager, telemetry)
    }

    async fn open_connection(manager: &ScyllaConnectionManager) -> Connection {
        let mut connection = Connection::new("model.analytics.orders", credentials(1));
        manager.open(&mut connection).await.unwrap();
        connection
    }

    #[tokio::test]
    async fn test_open_sets_state_and_params() {
        let factory = Arc::new(MockFactory::default());
        let (manager, telemetry) = build_manager(factory.clone());

        let connection = open_connection(&manager).await;

        assert!(connection.is_open());
        assert_eq!(factory.attempts(), 1);
        let params = factory.last_params.lock().unwrap().clone().unwrap();
        assert_eq!(params.address(), "127.0.0.1:9042");
        assert_eq!(params.keyspace, "analytics");
        assert_eq!(params.application_name.as_deref(), Some("dbt"));
        assert!(matches!(
            telemetry.events().as_slice(),
            [AdapterEvent::ConnectionOpened { attempts: 1, .. }]
        ));
    }

    #[tokio::test]
    async fn test_open_is_noop_when_already_open() {
        let factory = Arc::new(MockFactory::default());
        let (manager, _) = build_manager(factory.clone());

        let mut connection = open_connection(&manager).await;
        manager.open(&mut connection).await.unwrap();

        assert_eq!(factory.attempts(), 1);
    }

    #[tokio::test]
    async fn test_retryable_failure_makes_exactly_retries_attempts() {
        for retries in 1..=4 {
            let factory = Arc::new(MockFactory::always_failing(refused()));
            let (manager, _) = build_manager(factory.clone());
            let mut connection = Connection::new("conn", credentials(retries));

            let err = manager.open(&mut connection).await.unwrap_err();

            assert!(matches!(err, AdapterError::ConnectionError { .. }));
            assert_eq!(factory.attempts(), retries);
            assert_eq!(connection.state(), ConnectionState::Closed);
        }
    }

    #[tokio::test]
    async fn test_non_retryable_failure_makes_one_attempt_without_wait() {
        let factory = Arc::new(MockFactory::always_failing(DriverError::new(
            DriverErrorKind::Authentication,
            "Bad credentials",
        )));
        let waits = Arc::new(Mutex::new(0u32));
        let counted = waits.clone();
        let manager = ScyllaConnectionManager::new(factory.clone()).with_backoff(Backoff::custom(
            move |_| {
                *counted.lock().unwrap() += 1;
                Duration::ZERO
            },
        ));
        let mut connection = Connection::new("conn", credentials(5));

        let err = manager.open(&mut connection).await.unwrap_err();

        match err {
            AdapterError::ConnectionError { source, .. } => {
                assert_eq!(source.kind, DriverErrorKind::Authentication)
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(factory.attempts(), 1);
        assert_eq!(*waits.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let factory = Arc::new(MockFactory::failing_with(vec![refused(), refused()]));
        let (manager, telemetry) = build_manager(factory.clone());
        let mut connection = Connection::new("conn", credentials(3));

        manager.open(&mut connection).await.unwrap();

        assert!(connection.is_open());
        assert_eq!(factory.attempts(), 3);
        assert!(matches!(
            telemetry.events().as_slice(),
            [AdapterEvent::ConnectionOpened { attempts: 3, .. }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_backoff_is_quadratic() {
        let factory = Arc::new(MockFactory::always_failing(refused()));
        let manager = ScyllaConnectionManager::new(factory.clone());
        let mut connection = Connection::new("conn", credentials(4));
        let start = tokio::time::Instant::now();

        assert!(manager.open(&mut connection).await.is_err());

        // 1 + 4 + 9 seconds between four attempts.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(14) && elapsed < Duration::from_secs(15));
        assert_eq!(factory.attempts(), 4);
    }

    #[tokio::test]
    async fn test_begin_twice_is_internal_error() {
        let (manager, _) = build_manager(Arc::new(MockFactory::default()));
        let mut connection = open_connection(&manager).await;

        manager.begin(&mut connection).unwrap();
        let err = manager.begin(&mut connection).unwrap_err();

        assert!(matches!(err, AdapterError::InternalError(_)));
        assert!(connection.transaction_open());
    }

    #[tokio::test]
    async fn test_commit_without_begin_is_internal_error() {
        let (manager, _) = build_manager(Arc::new(MockFactory::default()));
        let mut connection = open_connection(&manager).await;

        let err = manager.commit(&mut connection).await.unwrap_err();
        assert!(matches!(err, AdapterError::InternalError(_)));
    }

    #[tokio::test]
    async fn test_commit_fires_event_and_clears_flag() {
        let factory = Arc::new(MockFactory::default());
        let (manager, telemetry) = build_manager(factory.clone());
        let mut connection = open_connection(&manager).await;
        let node = NodeInfo {
            unique_id: "model.analytics.orders".to_string(),
            node_name: "orders".to_string(),
            materialized: Some("materialized_view".to_string()),
        };
        connection.set_node_info(Some(node.clone()));

        manager.begin(&mut connection).unwrap();
        manager.commit(&mut connection).await.unwrap();

        assert!(!connection.transaction_open());
        assert_eq!(factory.session.commits.load(Ordering::SeqCst), 1);
        assert!(telemetry.events().contains(&AdapterEvent::SqlCommit {
            conn_name: "model.analytics.orders".to_string(),
            node_info: Some(node),
        }));

        // A fresh transaction can start after the commit.
        manager.begin(&mut connection).unwrap();
    }

    #[tokio::test]
    async fn test_driver_error_becomes_database_error_after_rollback() {
        let factory = Arc::new(MockFactory::default());
        let (manager, _) = build_manager(factory.clone());
        let mut connection = open_connection(&manager).await;
        factory.session.push_outcome(Err(DriverError::new(
            DriverErrorKind::Invalid,
            "  line 1:7 no viable alternative at input 'FORM'\n",
        )));

        manager.begin(&mut connection).unwrap();
        let err = manager
            .execute(&mut connection, "SELECT * FORM ks.t")
            .await
            .unwrap_err();

        match err {
            AdapterError::DatabaseError(message) => {
                assert_eq!(message, "line 1:7 no viable alternative at input 'FORM'")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!connection.transaction_open());
        assert_eq!(factory.session.rollbacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_rollback_does_not_mask_original_error() {
        let factory = Arc::new(MockFactory::default());
        let (manager, _) = build_manager(factory.clone());
        let mut connection = open_connection(&manager).await;
        factory.session.fail_rollback.store(true, Ordering::SeqCst);
        factory
            .session
            .push_outcome(Err(DriverError::new(DriverErrorKind::Timeout, "Write timeout")));

        manager.begin(&mut connection).unwrap();
        let err = manager.execute(&mut connection, "INSERT INTO ks.t (k) VALUES (1)").await;

        assert!(matches!(err, Err(AdapterError::DatabaseError(ref m)) if m == "Write timeout"));
        assert!(!connection.transaction_open());
    }

    #[tokio::test]
    async fn test_runtime_adapter_error_is_not_rewrapped() {
        let (manager, _) = build_manager(Arc::new(MockFactory::default()));
        let mut connection = open_connection(&manager).await;

        let err = manager
            .exception_handler(&mut connection, "select 1", async {
                Err::<(), _>(StatementError::Adapter(AdapterError::DatabaseError(
                    "already translated".to_string(),
                )))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::DatabaseError(ref m) if m == "already translated"));
    }

    #[tokio::test]
    async fn test_unexpected_error_is_wrapped_as_runtime() {
        let factory = Arc::new(MockFactory::default());
        let (manager, _) = build_manager(factory.clone());
        let mut connection = open_connection(&manager).await;
        manager.begin(&mut connection).unwrap();

        let err = manager
            .exception_handler(&mut connection, "select 1", async {
                Err::<(), _>(StatementError::Other(anyhow::anyhow!("agate table overflow")))
            })
            .await
            .unwrap_err();

        match err {
            AdapterError::RuntimeError(cause) => {
                assert_eq!(cause.to_string(), "agate table overflow")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(factory.session.rollbacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_context_wrapped_errors_keep_their_translation() {
        let factory = Arc::new(MockFactory::default());
        let (manager, _) = build_manager(factory.clone());
        let mut connection = open_connection(&manager).await;

        manager.begin(&mut connection).unwrap();
        let err = manager
            .exception_handler(&mut connection, "select 1", async {
                Err::<(), _>(AdapterError::DatabaseError("already translated".to_string()))
                    .context("loading rows")?;
                Ok::<_, StatementError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::DatabaseError(ref m) if m == "already translated"));
        assert_eq!(factory.session.rollbacks.load(Ordering::SeqCst), 1);

        let err = manager
            .exception_handler(&mut connection, "selec 1", async {
                Err::<(), _>(DriverError::new(DriverErrorKind::Invalid, " bad syntax "))
                    .context("running model")?;
                Ok::<_, StatementError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::DatabaseError(ref m) if m == "bad syntax"));
    }

    #[tokio::test]
    async fn test_internal_error_inside_statement_is_wrapped() {
        let (manager, _) = build_manager(Arc::new(MockFactory::default()));
        let mut connection = open_connection(&manager).await;

        let err = manager
            .exception_handler(&mut connection, "select 1", async {
                Err::<(), _>(StatementError::Adapter(AdapterError::InternalError(
                    "bad state".to_string(),
                )))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::RuntimeError(_)));
    }

    #[tokio::test]
    async fn test_execute_returns_response() {
        let factory = Arc::new(MockFactory::default());
        let (manager, _) = build_manager(factory.clone());
        let mut connection = open_connection(&manager).await;
        factory.session.push_outcome(Ok(QueryOutcome {
            status_message: Some("SELECT 1".to_string()),
            row_count: Some(1),
        }));

        let response = manager
            .execute(&mut connection, "SELECT now() FROM system.local")
            .await
            .unwrap();

        assert_eq!(response.code, "SELECT");
        assert_eq!(response.rows_affected, Some(1));
        assert_eq!(
            *factory.session.statements.lock().unwrap(),
            vec!["SELECT now() FROM system.local".to_string()]
        );
    }

    #[tokio::test]
    async fn test_execute_on_closed_connection_fails() {
        let (manager, _) = build_manager(Arc::new(MockFactory::default()));
        let mut connection = Connection::new("conn", credentials(1));

        let err = manager.execute(&mut connection, "SELECT 1").await.unwrap_err();
        assert!(matches!(err, AdapterError::InternalError(_)));
    }

    #[tokio::test]
    async fn test_cancel_shuts_down_session() {
        let factory = Arc::new(MockFactory::default());
        let (manager, telemetry) = build_manager(factory.clone());
        let mut connection = open_connection(&manager).await;

        manager.cancel(&mut connection).await;

        assert!(factory.session.shut_down.load(Ordering::SeqCst));
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert!(telemetry
            .events()
            .iter()
            .any(|e| matches!(e, AdapterEvent::ConnectionCancelled { .. })));
    }

    #[tokio::test]
    async fn test_active_connections_gauge_follows_lifecycle() {
        let gauge = IntGauge::new("test_active_connections", "open test connections").unwrap();
        let factory = Arc::new(MockFactory::default());
        let manager = ScyllaConnectionManager::new(factory)
            .with_backoff(Backoff::Fixed(Duration::ZERO))
            .with_active_connections_gauge(gauge.clone());

        let mut cancelled = open_connection(&manager).await;
        let dropped = open_connection(&manager).await;
        assert_eq!(gauge.get(), 2);

        manager.cancel(&mut cancelled).await;
        assert_eq!(gauge.get(), 1);

        drop(dropped);
        assert_eq!(gauge.get(), 0);

        // Cancelled connections are not counted again on drop.
        drop(cancelled);
        assert_eq!(gauge.get(), 0);
    }

    #[tokio::test]
    async fn test_rollback_event_only_after_marker_is_sent() {
        let factory = Arc::new(MockFactory::default());
        let (manager, telemetry) = build_manager(factory.clone());
        let mut connection = open_connection(&manager).await;
        let is_rollback = |e: &AdapterEvent| matches!(e, AdapterEvent::Rollback { .. });

        manager.begin(&mut connection).unwrap();
        manager.rollback_if_open(&mut connection).await.unwrap();
        assert_eq!(telemetry.events().iter().filter(|e| is_rollback(*e)).count(), 1);

        // Marker fails: no event.
        factory.session.fail_rollback.store(true, Ordering::SeqCst);
        manager.begin(&mut connection).unwrap();
        assert!(manager.rollback_if_open(&mut connection).await.is_err());
        assert_eq!(telemetry.events().iter().filter(|e| is_rollback(*e)).count(), 1);

        // Closed connection: nothing is sent, no event.
        let mut closed = Connection::new("closed", credentials(1));
        manager.begin(&mut closed).unwrap();
        assert!(manager.rollback_if_open(&mut closed).await.is_err());
        assert_eq!(telemetry.events().iter().filter(|e| is_rollback(*e)).count(), 1);
    }

    #[tokio::test]
    async fn test_get_relation_results_reads_index_rows() {
        let factory = Arc::new(MockFactory::default());
        let (manager, _) = build_manager(factory.clone());
        let mut connection = open_connection(&manager).await;
        factory.session.index_rows.lock().unwrap().push(crate::types::IndexRow {
            index_name: "orders_by_status_status_idx".to_string(),
            kind: "COMPOSITES".to_string(),
            options: [("target".to_string(), "status".to_string())].into(),
        });

        let results = manager
            .get_relation_results(&mut connection, "analytics", "orders_by_status")
            .await
            .unwrap();

        assert_eq!(results.indexes.len(), 1);
        assert_eq!(results.indexes[0].target(), Some("status"));
    }

    #[test]
    fn test_get_response_strips_numeric_tokens() {
        let outcome = QueryOutcome {
            status_message: Some("INSERT 0 12".to_string()),
            row_count: Some(12),
        };
        let response = ScyllaConnectionManager::get_response(&outcome);
        assert_eq!(response.message, "INSERT 0 12");
        assert_eq!(response.code, "INSERT");
        assert_eq!(response.rows_affected, Some(12));
    }

    #[test]
    fn test_get_response_digits_only() {
        let outcome = QueryOutcome {
            status_message: Some("42".to_string()),
            row_count: Some(42),
        };
        let response = ScyllaConnectionManager::get_response(&outcome);
        assert_eq!(response.code, "");
        assert_eq!(response.rows_affected, Some(42));
    }

    #[test]
    fn test_get_response_without_status() {
        let response = ScyllaConnectionManager::get_response(&QueryOutcome::default());
        assert_eq!(response.message, "");
        assert_eq!(response.code, "");
        assert_eq!(response.rows_affected, None);
    }

    #[test]
    fn test_data_type_code_to_name() {
        assert_eq!(ScyllaConnectionManager::data_type_code_to_name(type_codes::BLOB), "BLOB");
        assert_eq!(ScyllaConnectionManager::data_type_code_to_name(type_codes::TEXT), "TEXT");
        assert_eq!(
            ScyllaConnectionManager::data_type_code_to_name(type_codes::VARCHAR),
            "VARCHAR"
        );
        assert_eq!(
            ScyllaConnectionManager::data_type_code_to_name(0x0030),
            "unknown type_code 48"
        );
    }
}
