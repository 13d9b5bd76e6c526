use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use super::index::{parse_target, IndexConfig, IndexConfigChange, RelationConfigChangeAction};
use crate::errors::AdapterError;
use crate::types::RelationResults;

/// One index as declared on a materialized view model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDeclaration {
    #[serde(default)]
    pub name: Option<String>,
    pub column: String,
    /// Present for local indexes.
    #[serde(default)]
    pub partition_key: Option<Vec<String>>,
}

/// Declared configuration of a materialized view model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedViewModel {
    pub name: String,
    pub keyspace: String,
    #[serde(default)]
    pub indexes: Vec<IndexDeclaration>,
}

impl MaterializedViewModel {
    pub fn from_yaml(contents: &str) -> Result<Self, AdapterError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AdapterError::ConfigError(format!("Failed to read model {}: {}", path.display(), e))
        })?;
        let model = Self::from_yaml(&contents)?;
        info!(
            "Loaded materialized view model {}.{} with {} index(es)",
            model.keyspace,
            model.name,
            model.indexes.len()
        );
        Ok(model)
    }
}

/// Snapshot of a materialized view's structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializedViewConfig {
    pub indexes: HashSet<IndexConfig>,
}

impl MaterializedViewConfig {
    pub fn new(indexes: impl IntoIterator<Item = IndexConfig>) -> Self {
        Self {
            indexes: indexes.into_iter().collect(),
        }
    }

    /// Snapshot observed in the live cluster.
    pub fn from_relation_results(results: &RelationResults) -> Result<Self, AdapterError> {
        let indexes = results
            .indexes
            .iter()
            .map(IndexConfig::from_index_row)
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self { indexes })
    }

    /// Snapshot declared by the model.
    pub fn from_model_node(model: &MaterializedViewModel) -> Self {
        let indexes = model
            .indexes
            .iter()
            .map(|decl| {
                let name = decl.name.clone().unwrap_or_else(|| {
                    IndexConfig::default_name(&model.name, &parse_target(&decl.column).0)
                });
                match &decl.partition_key {
                    Some(partition_key) => {
                        IndexConfig::local(name, &decl.column, partition_key.clone())
                    }
                    None => IndexConfig::global(name, &decl.column),
                }
            })
            .collect();
        Self { indexes }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializedViewConfigChangeCollection {
    pub indexes: HashSet<IndexConfigChange>,
}

impl MaterializedViewConfigChangeCollection {
    pub fn has_changes(&self) -> bool {
        !self.indexes.is_empty()
    }

    pub fn requires_full_refresh(&self) -> bool {
        self.indexes.iter().any(IndexConfigChange::requires_full_refresh)
    }

    /// Changes with drops first, then by index name.
    pub fn ordered(&self) -> Vec<&IndexConfigChange> {
        let mut changes: Vec<_> = self.indexes.iter().collect();
        changes.sort_by(|a, b| {
            a.action
                .cmp(&b.action)
                .then_with(|| a.context.name().cmp(b.context.name()))
        });
        changes
    }
}

/// Drops for indexes only in `existing`, creates for indexes only in `new`.
pub fn diff_indexes(
    existing: &HashSet<IndexConfig>,
    new: &HashSet<IndexConfig>,
) -> HashSet<IndexConfigChange> {
    let drops = existing
        .difference(new)
        .map(|index| IndexConfigChange::new(RelationConfigChangeAction::Drop, index.clone()));
    let creates = new
        .difference(existing)
        .map(|index| IndexConfigChange::new(RelationConfigChangeAction::Create, index.clone()));
    drops.chain(creates).collect()
}

/// `None` when the snapshots need no migration.
pub fn compute_change_collection(
    existing: &MaterializedViewConfig,
    new: &MaterializedViewConfig,
) -> Option<MaterializedViewConfigChangeCollection> {
    let collection = MaterializedViewConfigChangeCollection {
        indexes: diff_indexes(&existing.indexes, &new.indexes),
    };

    if collection.has_changes() {
        debug!("{} index change(s) detected", collection.indexes.len());
        Some(collection)
    } else {
        None
    }
}
