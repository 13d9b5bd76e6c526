pub mod connection;
pub mod manager;
pub mod retry;
pub mod scylla;
pub mod session;

#[cfg(test)]
pub(crate) mod mock;

pub use self::connection::{Connection, ConnectionState};
pub use self::manager::ScyllaConnectionManager;
pub use self::retry::{Backoff, RetryPolicy};
pub use self::scylla::{ScyllaSession, ScyllaSessionFactory};
pub use self::session::{ConnectParams, DriverSession, SessionFactory};
