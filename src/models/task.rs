use serde::{Deserialize, Serialize};
use crate::models::{LabelPayload, Storage, StorageConfig};

/// Dataset split a task's audio belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Subset {
    #[default]
    Train,
    Test,
    Validation,
}

impl Subset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subset::Train => "Train",
            Subset::Test => "Test",
            Subset::Validation => "Validation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "train" => Some(Subset::Train),
            "test" => Some(Subset::Test),
            "validation" => Some(Subset::Validation),
            _ => None,
        }
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub project_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub subset: Subset,
    pub source_storage_id: Option<i64>,
    pub target_storage_id: Option<i64>,
    pub organization_id: Option<i64>,
    pub created_ts: i64,
    pub updated_ts: i64,
}

/// Task creation payload
///
/// Exactly one of `project_id` or a non-empty `label_set` must be given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub subset: Option<Subset>,
    #[serde(default)]
    pub source_storage: Option<StorageConfig>,
    #[serde(default)]
    pub target_storage: Option<StorageConfig>,
    #[serde(default)]
    pub label_set: Vec<LabelPayload>,
}

impl NewTask {
    pub fn in_project(name: &str, project_id: i64) -> Self {
        Self {
            name: name.to_string(),
            project_id: Some(project_id),
            ..Self::default()
        }
    }

    pub fn with_labels(name: &str, label_set: Vec<LabelPayload>) -> Self {
        Self {
            name: name.to_string(),
            label_set,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub subset: Option<Subset>,
    /// Only valid for tasks that own their labels
    #[serde(default)]
    pub labels: Vec<LabelPayload>,
}

/// Job counters shown with every task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub count: i64,
    pub completed: i64,
    pub validation: i64,
}

/// Task with storages and job counters resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub source_storage: Option<Storage>,
    pub target_storage: Option<Storage>,
    pub jobs: JobCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_conversion() {
        assert_eq!(Subset::default(), Subset::Train);
        assert_eq!(Subset::from_str("train"), Some(Subset::Train));
        assert_eq!(Subset::from_str("Validation"), Some(Subset::Validation));
        assert_eq!(Subset::from_str("dev"), None);
        assert_eq!(Subset::Test.as_str(), "Test");
    }

    #[test]
    fn test_new_task_payload_accepts_label_set() {
        let payload: NewTask = serde_json::from_str(
            r#"{"name": "clip-01", "label_set": [{"name": "speaker"}]}"#,
        ).unwrap();
        assert_eq!(payload.label_set.len(), 1);
        assert!(payload.project_id.is_none());
    }
}
