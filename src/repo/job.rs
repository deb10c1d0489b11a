use rusqlite::{Connection, OptionalExtension, Row};
use crate::auth::RequestContext;
use crate::error::DomainError;
use crate::models::{Job, JobStage, JobState, JobType, JobUpdate, NewJob, Task};
use crate::repo::TaskRepo;
use anyhow::{Context, Result};

const JOB_COLUMNS: &str =
    "j.id, j.task_id, j.assignee_id, j.guide_id, j.stage, j.state, j.job_type, j.created_ts, j.updated_ts";

/// Job repository
///
/// Jobs carry the annotation workflow for a task. `stage` and `state` are
/// stored; the legacy status is computed on read (see [`Job::status`]).
pub struct JobRepo;

impl JobRepo {
    /// Create an explicit job (ground truth or an extra annotation pass)
    ///
    /// The requesting user guides the job.
    pub fn create(conn: &Connection, ctx: &RequestContext, new_job: &NewJob) -> Result<Job> {
        let tx = conn.unchecked_transaction()?;
        let task = TaskRepo::get_by_id(&tx, new_job.task_id)?
            .ok_or_else(|| DomainError::not_found("Task", new_job.task_id))?;
        if !ctx.in_scope(task.organization_id) {
            return Err(DomainError::not_found("Task", task.id).into());
        }

        let job = Self::insert(&tx, task.id, new_job.job_type, new_job.assignee_id, Some(ctx.user_id))?;
        tx.commit()?;
        log::info!("Created {} job {} for task {}", job.job_type.as_str(), job.id, task.id);
        Ok(job)
    }

    /// The job every task starts with (caller holds the transaction)
    pub(crate) fn create_default(conn: &Connection, task: &Task) -> Result<Job> {
        Self::insert(conn, task.id, JobType::Annotation, task.assignee_id, task.owner_id)
    }

    fn insert(
        conn: &Connection,
        task_id: i64,
        job_type: JobType,
        assignee_id: Option<i64>,
        guide_id: Option<i64>,
    ) -> Result<Job> {
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO jobs (task_id, assignee_id, guide_id, stage, state, job_type, created_ts, updated_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                task_id,
                assignee_id,
                guide_id,
                JobStage::Annotation.as_str(),
                JobState::New.as_str(),
                job_type.as_str(),
                now,
                now
            ],
        )
        .with_context(|| format!("Failed to create job for task {}", task_id))?;

        Ok(Job {
            id: conn.last_insert_rowid(),
            task_id,
            assignee_id,
            guide_id,
            stage: JobStage::Annotation,
            state: JobState::New,
            job_type,
            created_ts: now,
            updated_ts: now,
        })
    }

    /// Get job by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Job>> {
        let sql = format!("SELECT {} FROM jobs j WHERE j.id = ?1", JOB_COLUMNS);
        let job = conn.query_row(&sql, [id], job_from_row).optional()?;
        Ok(job)
    }

    /// Jobs of a task in creation order
    pub fn list_by_task(conn: &Connection, task_id: i64) -> Result<Vec<Job>> {
        let sql = format!(
            "SELECT {} FROM jobs j WHERE j.task_id = ?1 ORDER BY j.created_ts, j.id",
            JOB_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([task_id], job_from_row)?;

        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(row?);
        }
        Ok(jobs)
    }

    /// Jobs visible to the requesting user
    ///
    /// Scoped to the current organization through the task. Non-admins only
    /// see jobs they guide or are assigned to. `search` matches task names,
    /// case-insensitively.
    pub fn list_for_user(conn: &Connection, ctx: &RequestContext, search: Option<&str>) -> Result<Vec<Job>> {
        let mut sql = format!(
            "SELECT {} FROM jobs j JOIN tasks t ON t.id = j.task_id
             WHERE t.organization_id IS ?1",
            JOB_COLUMNS
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(ctx.organization_id)];

        if !ctx.is_admin {
            sql.push_str(" AND (j.guide_id = ?2 OR j.assignee_id = ?2)");
            params.push(Box::new(ctx.user_id));
        }
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            sql.push_str(&format!(" AND LOWER(t.name) LIKE ?{}", params.len() + 1));
            params.push(Box::new(format!("%{}%", search.to_lowercase())));
        }
        sql.push_str(" ORDER BY j.created_ts, j.id");

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), job_from_row)?;

        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(row?);
        }
        Ok(jobs)
    }

    /// Apply a workflow update
    ///
    /// A stage change without an explicit state restarts the job at `new`.
    pub fn update(conn: &Connection, id: i64, update: &JobUpdate) -> Result<Job> {
        let tx = conn.unchecked_transaction()?;
        let mut job = Self::get_by_id(&tx, id)?
            .ok_or_else(|| DomainError::not_found("Job", id))?;
        let before = (job.stage, job.state);

        job.apply(update);
        job.updated_ts = chrono::Utc::now().timestamp();

        tx.execute(
            "UPDATE jobs SET stage = ?1, state = ?2, assignee_id = ?3, guide_id = ?4, updated_ts = ?5
             WHERE id = ?6",
            rusqlite::params![
                job.stage.as_str(),
                job.state.as_str(),
                job.assignee_id,
                job.guide_id,
                job.updated_ts,
                job.id
            ],
        )
        .with_context(|| format!("Failed to update job {}", id))?;
        tx.commit()?;

        if before != (job.stage, job.state) {
            log::info!(
                "Job {}: {}/{} -> {}/{} (status {})",
                job.id,
                before.0.as_str(),
                before.1.as_str(),
                job.stage.as_str(),
                job.state.as_str(),
                job.status().as_str()
            );
        }
        Ok(job)
    }

    /// Delete a job. Only ground-truth jobs can be deleted.
    pub fn delete(conn: &Connection, id: i64) -> Result<Job> {
        let tx = conn.unchecked_transaction()?;
        let job = Self::get_by_id(&tx, id)?
            .ok_or_else(|| DomainError::not_found("Job", id))?;
        if !job.job_type.is_deletable() {
            return Err(DomainError::validation(
                "type",
                format!("Job {} cannot be deleted: only ground truth jobs can be deleted", id),
            )
            .into());
        }

        tx.execute("DELETE FROM jobs WHERE id = ?1", [id])
            .with_context(|| format!("Failed to delete job {}", id))?;
        tx.commit()?;
        log::info!("Deleted ground truth job {} of task {}", job.id, job.task_id);
        Ok(job)
    }

    /// Organization a job belongs to, through its task
    pub fn organization_id(conn: &Connection, job: &Job) -> Result<Option<i64>> {
        let organization_id = conn
            .query_row(
                "SELECT organization_id FROM tasks WHERE id = ?1",
                [job.task_id],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();
        Ok(organization_id)
    }
}

fn job_from_row(row: &Row) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        task_id: row.get(1)?,
        assignee_id: row.get(2)?,
        guide_id: row.get(3)?,
        stage: JobStage::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
        state: JobState::from_str(&row.get::<_, String>(5)?).unwrap_or_default(),
        job_type: JobType::from_str(&row.get::<_, String>(6)?).unwrap_or_default(),
        created_ts: row.get(7)?,
        updated_ts: row.get(8)?,
    })
}
