// adapterkit/src/telemetry.rs
//
// Fire-and-forget adapter events. Sinks are infallible by signature, so a
// broken sink can never fail the operation that emitted the event.
//

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::types::NodeInfo;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AdapterEvent {
    ConnectionOpened {
        conn_name: String,
        attempts: u32,
    },
    SqlCommit {
        conn_name: String,
        node_info: Option<NodeInfo>,
    },
    Rollback {
        conn_name: String,
        node_info: Option<NodeInfo>,
    },
    ConnectionCancelled {
        conn_name: String,
    },
}

/// Timestamped envelope handed to sinks.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AdapterEvent,
}

impl EventRecord {
    pub fn now(event: AdapterEvent) -> Self {
        Self {
            ts: Utc::now(),
            event,
        }
    }
}

pub trait TelemetrySink: Send + Sync {
    fn fire(&self, record: EventRecord);
}

/// Default sink: structured `tracing` events.
#[derive(Debug, Default, Clone)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn fire(&self, record: EventRecord) {
        match &record.event {
            AdapterEvent::ConnectionOpened { conn_name, attempts } => {
                info!(conn_name = %conn_name, attempts, "Connection opened");
            }
            AdapterEvent::SqlCommit { conn_name, node_info } => {
                debug!(
                    conn_name = %conn_name,
                    node = node_info.as_ref().map(|n| n.unique_id.as_str()).unwrap_or(""),
                    "On {}: COMMIT",
                    conn_name
                );
            }
            AdapterEvent::Rollback { conn_name, node_info } => {
                debug!(
                    conn_name = %conn_name,
                    node = node_info.as_ref().map(|n| n.unique_id.as_str()).unwrap_or(""),
                    "On {}: ROLLBACK",
                    conn_name
                );
            }
            AdapterEvent::ConnectionCancelled { conn_name } => {
                info!(conn_name = %conn_name, "Connection cancelled");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_record_serialization() {
        let record = EventRecord::now(AdapterEvent::SqlCommit {
            conn_name: "model.jaffle.orders".to_string(),
            node_info: None,
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"], "sql_commit");
        assert_eq!(json["conn_name"], "model.jaffle.orders");
        assert!(json.get("ts").is_some());
    }
}
