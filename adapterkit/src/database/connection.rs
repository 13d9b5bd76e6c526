use prometheus::IntGauge;
use std::fmt;
use std::sync::Arc;

use super::session::DriverSession;
use crate::config::Credentials;
use crate::errors::AdapterError;
use crate::types::NodeInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
}

/// A logical connection owned by one caller. Not synchronized internally.
pub struct Connection {
    name: String,
    credentials: Credentials,
    pub(crate) state: ConnectionState,
    pub(crate) transaction_open: bool,
    pub(crate) handle: Option<Arc<dyn DriverSession>>,
    /// Gauge counting this connection while the handle is held.
    gauge: Option<IntGauge>,
    node_info: Option<NodeInfo>,
}

impl Connection {
    pub fn new(name: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            name: name.into(),
            credentials,
            state: ConnectionState::Closed,
            transaction_open: false,
            handle: None,
            gauge: None,
            node_info: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn transaction_open(&self) -> bool {
        self.transaction_open
    }

    pub fn node_info(&self) -> Option<&NodeInfo> {
        self.node_info.as_ref()
    }

    /// Attach the model node currently executing on this connection.
    pub fn set_node_info(&mut self, node_info: Option<NodeInfo>) {
        self.node_info = node_info;
    }

    pub(crate) fn attach(&mut self, handle: Arc<dyn DriverSession>, gauge: IntGauge) {
        gauge.inc();
        self.handle = Some(handle);
        self.gauge = Some(gauge);
        self.state = ConnectionState::Open;
    }

    /// Detach the session handle and mark the connection closed.
    pub(crate) fn release(&mut self) -> Option<Arc<dyn DriverSession>> {
        if let Some(gauge) = self.gauge.take() {
            gauge.dec();
        }
        self.state = ConnectionState::Closed;
        self.transaction_open = false;
        self.handle.take()
    }

    /// The open driver session, or an internal error when the connection is closed.
    pub fn handle(&self) -> Result<Arc<dyn DriverSession>, AdapterError> {
        match (&self.state, &self.handle) {
            (ConnectionState::Open, Some(handle)) => Ok(handle.clone()),
            _ => Err(AdapterError::InternalError(format!(
                "Connection \"{}\" is not open",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("host", &self.credentials.host)
            .field("keyspace", &self.credentials.keyspace)
            .field("state", &self.state)
            .field("transaction_open", &self.transaction_open)
            .field("node_info", &self.node_info)
            .finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.release();
    }
}
