// Scripted in-memory driver used by the unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::session::{ConnectParams, DriverSession, SessionFactory};
use crate::errors::{DriverError, DriverErrorKind};
use crate::telemetry::{AdapterEvent, EventRecord, TelemetrySink};
use crate::types::{IndexRow, QueryOutcome};

#[derive(Default)]
pub struct MockSession {
    pub statements: Mutex<Vec<String>>,
    pub outcomes: Mutex<VecDeque<Result<QueryOutcome, DriverError>>>,
    pub index_rows: Mutex<Vec<IndexRow>>,
    pub fail_rollback: AtomicBool,
    pub commits: AtomicU32,
    pub rollbacks: AtomicU32,
    pub shut_down: AtomicBool,
}

impl MockSession {
    fn check_open(&self) -> Result<(), DriverError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(DriverError::new(DriverErrorKind::Closed, "session has been shut down"));
        }
        Ok(())
    }

    pub fn push_outcome(&self, outcome: Result<QueryOutcome, DriverError>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }
}

#[async_trait]
impl DriverSession for MockSession {
    async fn execute(&self, cql: &str) -> Result<QueryOutcome, DriverError> {
        self.check_open()?;
        self.statements.lock().unwrap().push(cql.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryOutcome::default()))
    }

    async fn index_rows(&self, _keyspace: &str, _table: &str) -> Result<Vec<IndexRow>, DriverError> {
        self.check_open()?;
        Ok(self.index_rows.lock().unwrap().clone())
    }

    async fn commit(&self) -> Result<(), DriverError> {
        self.check_open()?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        self.check_open()?;
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        if self.fail_rollback.load(Ordering::SeqCst) {
            return Err(DriverError::new(DriverErrorKind::Connection, "connection reset during rollback"));
        }
        Ok(())
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

/// Factory failing with the scripted errors first, then handing out `session`.
#[derive(Default)]
pub struct MockFactory {
    pub session: Arc<MockSession>,
    pub failures: Mutex<VecDeque<DriverError>>,
    pub always_fail: Mutex<Option<DriverError>>,
    pub attempts: AtomicU32,
    pub last_params: Mutex<Option<ConnectParams>>,
}

impl MockFactory {
    pub fn failing_with(failures: Vec<DriverError>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            ..Default::default()
        }
    }

    pub fn always_failing(error: DriverError) -> Self {
        Self {
            always_fail: Mutex::new(Some(error)),
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    async fn connect(&self, params: &ConnectParams) -> Result<Arc<dyn DriverSession>, DriverError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params.clone());

        if let Some(error) = self.always_fail.lock().unwrap().clone() {
            return Err(error);
        }
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.session.clone())
    }
}

#[derive(Default)]
pub struct RecordingTelemetry {
    pub events: Mutex<Vec<AdapterEvent>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<AdapterEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn fire(&self, record: EventRecord) {
        self.events.lock().unwrap().push(record.event);
    }
}
