//! ScyllaDB adapter core for a SQL transformation tool.
//!
//! [`database::ScyllaConnectionManager`] owns the connection lifecycle
//! (open with bounded retry, statement exception boundary, transaction
//! bookkeeping, cancel). [`relation`] diffs the index set of a materialized
//! view against its declared model.

pub mod column;
pub mod config;
pub mod database;
pub mod errors;
pub mod metrics;
pub mod relation;
pub mod telemetry;
pub mod types;

pub use self::config::{AdapterConfig, Credentials};
pub use database::{Connection, ScyllaConnectionManager};
pub use errors::{AdapterError, DriverError, DriverErrorKind, StatementError};
pub use relation::ScyllaRelation;
