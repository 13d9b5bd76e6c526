use serde::{Deserialize, Serialize};

use crate::errors::AdapterError;
use crate::types::IndexRow;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum IndexKind {
    Global,
    /// Local secondary index, co-located with the partition it indexes.
    Local { partition_key: Vec<String> },
}

/// Which part of a column the index covers. Plain columns and bare collection
/// columns both index their values.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum IndexTargetType {
    #[default]
    Values,
    Keys,
    Entries,
    Full,
}

impl IndexTargetType {
    fn from_function(function: &str) -> Option<Self> {
        match function.to_lowercase().as_str() {
            "values" => Some(Self::Values),
            "keys" => Some(Self::Keys),
            "entries" => Some(Self::Entries),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// Split an index target such as `keys(attrs)` or `"OrderId"` into the column
/// name and target type. Double-quoted identifiers are unquoted.
pub fn parse_target(target: &str) -> (String, IndexTargetType) {
    let target = target.trim();
    if !target.starts_with('"') {
        if let Some((function, rest)) = target.split_once('(') {
            if let (Some(target_type), Some(inner)) = (
                IndexTargetType::from_function(function.trim()),
                rest.strip_suffix(')'),
            ) {
                return (unquote(inner.trim()), target_type);
            }
        }
    }
    (unquote(target), IndexTargetType::Values)
}

fn unquote(identifier: &str) -> String {
    match identifier
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(quoted) => quoted.replace("\"\"", "\""),
        None => identifier.to_string(),
    }
}

/// Immutable description of one secondary index. Equality covers every field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexConfig {
    name: String,
    column: String,
    #[serde(default)]
    target_type: IndexTargetType,
    kind: IndexKind,
}

#[derive(Debug, Deserialize)]
struct LocalTarget {
    pk: Vec<String>,
    ck: Vec<String>,
}

impl IndexConfig {
    /// `target` is a column name or a target expression such as `keys(attrs)`.
    pub fn global(name: impl Into<String>, target: impl AsRef<str>) -> Self {
        let (column, target_type) = parse_target(target.as_ref());
        Self {
            name: name.into(),
            column,
            target_type,
            kind: IndexKind::Global,
        }
    }

    pub fn local(
        name: impl Into<String>,
        target: impl AsRef<str>,
        partition_key: Vec<String>,
    ) -> Self {
        let (column, target_type) = parse_target(target.as_ref());
        Self {
            name: name.into(),
            column,
            target_type,
            kind: IndexKind::Local {
                partition_key: partition_key.iter().map(|key| unquote(key.trim())).collect(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn target_type(&self) -> IndexTargetType {
        self.target_type
    }

    pub fn kind(&self) -> &IndexKind {
        &self.kind
    }

    /// Name the server assigns when `CREATE INDEX` is given none.
    pub fn default_name(relation: &str, column: &str) -> String {
        format!("{}_{}_idx", relation, column)
    }

    /// Rebuild the config from a `system_schema.indexes` row.
    ///
    /// Global targets are a column name, possibly quoted or wrapped in
    /// `values`/`keys`/`entries`/`full`; local targets are stored as
    /// `{"pk":[...],"ck":[...]}`.
    pub fn from_index_row(row: &IndexRow) -> Result<Self, AdapterError> {
        let target = row.target().ok_or_else(|| {
            AdapterError::runtime(format!("Index '{}' has no target option", row.index_name))
        })?;

        if !target.trim_start().starts_with('{') {
            return Ok(Self::global(&row.index_name, target));
        }

        let local: LocalTarget = serde_json::from_str(target).map_err(|e| {
            AdapterError::runtime(format!(
                "Index '{}' has an unreadable target {}: {}",
                row.index_name, target, e
            ))
        })?;
        let column = local.ck.into_iter().next().ok_or_else(|| {
            AdapterError::runtime(format!("Local index '{}' has no indexed column", row.index_name))
        })?;

        Ok(Self::local(&row.index_name, column, local.pk))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationConfigChangeAction {
    Drop,
    Create,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IndexConfigChange {
    pub action: RelationConfigChangeAction,
    pub context: IndexConfig,
}

impl IndexConfigChange {
    pub fn new(action: RelationConfigChangeAction, context: IndexConfig) -> Self {
        Self { action, context }
    }

    /// Index changes are applied in place; the view never has to be rebuilt.
    pub fn requires_full_refresh(&self) -> bool {
        false
    }
}
