use serde::Serialize;

/// Uploaded audio file attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskData {
    pub id: i64,
    pub task_id: i64,
    pub filename: String,
    /// Size in KiB, rounded down
    pub size_kib: i64,
    pub path: String,
    pub created_ts: i64,
    pub updated_ts: i64,
}
