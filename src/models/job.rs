use serde::{Deserialize, Serialize};

/// Coarse workflow phase of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    #[default]
    Annotation,
    Validation,
    Acceptance,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Annotation => "annotation",
            JobStage::Validation => "validation",
            JobStage::Acceptance => "acceptance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "annotation" => Some(JobStage::Annotation),
            "validation" => Some(JobStage::Validation),
            "acceptance" => Some(JobStage::Acceptance),
            _ => None,
        }
    }
}

/// Progress within the current stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobState {
    #[default]
    #[serde(rename = "new")]
    New,
    #[serde(rename = "in progress", alias = "in_progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "rejected")]
    Rejected,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::New => "new",
            JobState::InProgress => "in progress",
            JobState::Completed => "completed",
            JobState::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new" => Some(JobState::New),
            "in progress" | "in_progress" | "in-progress" => Some(JobState::InProgress),
            "completed" => Some(JobState::Completed),
            "rejected" => Some(JobState::Rejected),
            _ => None,
        }
    }
}

/// Legacy single-field status, kept for older clients
///
/// Never stored; always computed from stage and state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Annotation,
    Validation,
    Completed,
}

impl JobStatus {
    pub fn derive(stage: JobStage, state: JobState) -> Self {
        match (stage, state) {
            (JobStage::Annotation, _) => JobStatus::Annotation,
            (JobStage::Validation, _) => JobStatus::Validation,
            (JobStage::Acceptance, JobState::Completed) => JobStatus::Completed,
            (JobStage::Acceptance, _) => JobStatus::Validation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Annotation => "annotation",
            JobStatus::Validation => "validation",
            JobStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    #[default]
    Annotation,
    GroundTruth,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Annotation => "annotation",
            JobType::GroundTruth => "ground_truth",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "annotation" => Some(JobType::Annotation),
            "ground_truth" | "ground-truth" => Some(JobType::GroundTruth),
            _ => None,
        }
    }

    /// Only ground-truth jobs may be removed; annotation jobs live as long as their task
    pub fn is_deletable(&self) -> bool {
        matches!(self, JobType::GroundTruth)
    }
}

/// Job model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: i64,
    pub task_id: i64,
    pub assignee_id: Option<i64>,
    pub guide_id: Option<i64>,
    pub stage: JobStage,
    pub state: JobState,
    pub job_type: JobType,
    pub created_ts: i64,
    pub updated_ts: i64,
}

impl Job {
    pub fn status(&self) -> JobStatus {
        JobStatus::derive(self.stage, self.state)
    }

    /// Apply a client update in place
    ///
    /// Moving to a different stage restarts progress: state goes back to
    /// `new` unless the same update sets a state explicitly.
    pub fn apply(&mut self, update: &JobUpdate) {
        if let Some(stage) = update.stage {
            if stage != self.stage {
                self.stage = stage;
                if update.state.is_none() {
                    self.state = JobState::New;
                }
            }
        }
        if let Some(state) = update.state {
            self.state = state;
        }
        if let Some(assignee_id) = update.assignee_id {
            self.assignee_id = Some(assignee_id);
        }
        if let Some(guide_id) = update.guide_id {
            self.guide_id = Some(guide_id);
        }
    }
}

/// Client-supplied job changes. Status is not settable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUpdate {
    #[serde(default)]
    pub stage: Option<JobStage>,
    #[serde(default)]
    pub state: Option<JobState>,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub guide_id: Option<i64>,
}

/// An explicitly created job (the default job is created with its task)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    pub task_id: i64,
    #[serde(default, rename = "type")]
    pub job_type: JobType,
    #[serde(default)]
    pub assignee_id: Option<i64>,
}

/// Job as exposed to clients, with its derived fields filled in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    pub id: i64,
    pub task_id: i64,
    pub assignee_id: Option<i64>,
    pub guide_id: Option<i64>,
    pub stage: JobStage,
    pub state: JobState,
    pub status: JobStatus,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub organization_id: Option<i64>,
    pub created_ts: i64,
    pub updated_ts: i64,
}

impl JobView {
    pub fn new(job: &Job, organization_id: Option<i64>) -> Self {
        Self {
            id: job.id,
            task_id: job.task_id,
            assignee_id: job.assignee_id,
            guide_id: job.guide_id,
            stage: job.stage,
            state: job.state,
            status: job.status(),
            job_type: job.job_type,
            organization_id,
            created_ts: job.created_ts,
            updated_ts: job.updated_ts,
        }
    }
}
