pub mod index;
pub mod materialized_view;

pub use index::{
    parse_target, IndexConfig, IndexConfigChange, IndexKind, IndexTargetType,
    RelationConfigChangeAction,
};
pub use materialized_view::{
    compute_change_collection, diff_indexes, IndexDeclaration, MaterializedViewConfig,
    MaterializedViewConfigChangeCollection, MaterializedViewModel,
};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::AdapterError;
use crate::types::RelationResults;

/// Longest table or view name Scylla accepts.
pub const MAX_CHARACTERS_IN_IDENTIFIER: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Table,
    View,
    MaterializedView,
    Cte,
    External,
}

/// A table, view or materialized view in a keyspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScyllaRelation {
    keyspace: String,
    identifier: Option<String>,
    relation_type: Option<RelationType>,
}

impl ScyllaRelation {
    /// Relations without a type (test and synthetic relations) skip the length check.
    pub fn new(
        keyspace: impl Into<String>,
        identifier: Option<String>,
        relation_type: Option<RelationType>,
    ) -> Result<Self, AdapterError> {
        if let (Some(identifier), Some(_)) = (&identifier, relation_type) {
            if identifier.chars().count() > MAX_CHARACTERS_IN_IDENTIFIER {
                return Err(AdapterError::runtime(format!(
                    "Relation name '{}' is longer than {} characters",
                    identifier, MAX_CHARACTERS_IN_IDENTIFIER
                )));
            }
        }

        Ok(Self {
            keyspace: keyspace.into(),
            identifier,
            relation_type,
        })
    }

    pub fn materialized_view(
        keyspace: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Result<Self, AdapterError> {
        Self::new(
            keyspace,
            Some(identifier.into()),
            Some(RelationType::MaterializedView),
        )
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn relation_type(&self) -> Option<RelationType> {
        self.relation_type
    }

    pub fn relation_max_name_length(&self) -> usize {
        MAX_CHARACTERS_IN_IDENTIFIER
    }

    pub fn is_renameable(&self) -> bool {
        matches!(
            self.relation_type,
            Some(RelationType::View | RelationType::Table | RelationType::MaterializedView)
        )
    }

    pub fn is_replaceable(&self) -> bool {
        matches!(
            self.relation_type,
            Some(RelationType::View | RelationType::Table)
        )
    }

    /// Index changes needed to bring this view in line with `model`, or `None`.
    pub fn get_materialized_view_config_change_collection(
        &self,
        relation_results: &RelationResults,
        model: &MaterializedViewModel,
    ) -> Result<Option<MaterializedViewConfigChangeCollection>, AdapterError> {
        let existing = MaterializedViewConfig::from_relation_results(relation_results)?;
        let new = MaterializedViewConfig::from_model_node(model);
        Ok(compute_change_collection(&existing, &new))
    }
}

impl fmt::Display for ScyllaRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(identifier) => write!(f, "{}.{}", self.keyspace, identifier),
            None => f.write_str(&self.keyspace),
        }
    }
}
