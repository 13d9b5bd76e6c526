use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw result of one statement, as reported by the driver session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    /// Status line such as `"SELECT 3"`; absent for statements without one.
    pub status_message: Option<String>,
    pub row_count: Option<u64>,
}

/// Structured response handed back to the host tool after each statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterResponse {
    pub message: String,
    pub code: String,
    pub rows_affected: Option<u64>,
}

/// The model node currently executing, attached to telemetry events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub unique_id: String,
    pub node_name: String,
    #[serde(default)]
    pub materialized: Option<String>,
}

/// One row of `system_schema.indexes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRow {
    pub index_name: String,
    pub kind: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl IndexRow {
    pub fn target(&self) -> Option<&str> {
        self.options.get("target").map(String::as_str)
    }
}

/// Live metadata describing an existing relation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationResults {
    #[serde(default)]
    pub indexes: Vec<IndexRow>,
}

/// CQL native protocol type codes.
pub mod type_codes {
    pub const CUSTOM: u16 = 0x0000;
    pub const ASCII: u16 = 0x0001;
    pub const BIGINT: u16 = 0x0002;
    pub const BLOB: u16 = 0x0003;
    pub const BOOLEAN: u16 = 0x0004;
    pub const COUNTER: u16 = 0x0005;
    pub const DECIMAL: u16 = 0x0006;
    pub const DOUBLE: u16 = 0x0007;
    pub const FLOAT: u16 = 0x0008;
    pub const INT: u16 = 0x0009;
    pub const TEXT: u16 = 0x000A;
    pub const TIMESTAMP: u16 = 0x000B;
    pub const UUID: u16 = 0x000C;
    pub const VARCHAR: u16 = 0x000D;
}
