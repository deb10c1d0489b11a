use serde::{Deserialize, Serialize};
use crate::models::{Label, LabelPayload, Storage, StorageConfig};

/// Project model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub owner_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub organization_id: Option<i64>,
    pub source_storage_id: Option<i64>,
    pub target_storage_id: Option<i64>,
    pub created_ts: i64,
    pub updated_ts: i64,
}

/// Project creation payload. Owner and organization come from the request context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub source_storage: Option<StorageConfig>,
    #[serde(default)]
    pub target_storage: Option<StorageConfig>,
    #[serde(default)]
    pub labels: Vec<LabelPayload>,
}

impl NewProject {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// Project changes. Labels with an id are upserted, labels without one are added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub labels: Vec<LabelPayload>,
}

/// Project with storages and labels resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub source_storage: Option<Storage>,
    pub target_storage: Option<Storage>,
    pub labels: Vec<Label>,
}
