use rusqlite::{Connection, OptionalExtension, Row};
use crate::auth::RequestContext;
use crate::error::{validate_max_len, validate_non_empty, DomainError};
use crate::models::{JobCounts, LabelOwner, NewTask, Subset, Task, TaskUpdate, TaskView};
use crate::repo::{JobRepo, LabelRepo, ProjectRepo, StorageRepo};
use anyhow::{Context, Result};

const TASK_NAME_MAX: usize = 256;

const TASK_COLUMNS: &str = "id, name, project_id, owner_id, assignee_id, subset, source_storage_id,
    target_storage_id, organization_id, created_ts, updated_ts";

/// Task repository for database operations
///
/// A task either belongs to a project and shares its labels, or stands
/// alone with a label set of its own. Creating a task also creates its
/// storages and the default annotation job.
pub struct TaskRepo;

impl TaskRepo {
    /// Create a task, its storages, its own labels and the default job
    pub fn create(conn: &Connection, ctx: &RequestContext, new_task: &NewTask) -> Result<Task> {
        validate_task_name(&new_task.name)?;

        let tx = conn.unchecked_transaction()?;

        let project = match (new_task.project_id, new_task.label_set.is_empty()) {
            (None, true) => {
                return Err(DomainError::validation(
                    "label_set",
                    "Label set or project_id must be present",
                )
                .into());
            }
            (Some(_), false) => {
                return Err(DomainError::validation(
                    "label_set",
                    "Project must have only one of Label set or project_id.",
                )
                .into());
            }
            (Some(project_id), true) => {
                let project = ProjectRepo::get_by_id(&tx, project_id)?
                    .ok_or_else(|| DomainError::not_found("Project", project_id))?;
                if project.organization_id != ctx.organization_id {
                    return Err(DomainError::validation(
                        "project_id",
                        format!("Project {} belongs to a different organization", project_id),
                    )
                    .into());
                }
                Some(project)
            }
            (None, false) => None,
        };

        let source = StorageRepo::resolve(
            &tx,
            new_task.source_storage.as_ref(),
            project.as_ref().and_then(|p| p.source_storage_id),
        )?;
        let target = StorageRepo::resolve(
            &tx,
            new_task.target_storage.as_ref(),
            project.as_ref().and_then(|p| p.target_storage_id),
        )?;

        let now = chrono::Utc::now().timestamp();
        let task = Task {
            id: 0,
            name: new_task.name.trim().to_string(),
            project_id: project.as_ref().map(|p| p.id),
            owner_id: Some(ctx.user_id),
            assignee_id: new_task.assignee_id,
            subset: new_task.subset.unwrap_or_default(),
            source_storage_id: Some(source.id),
            target_storage_id: Some(target.id),
            organization_id: ctx.organization_id,
            created_ts: now,
            updated_ts: now,
        };

        tx.execute(
            "INSERT INTO tasks (name, project_id, owner_id, assignee_id, subset, source_storage_id,
                    target_storage_id, organization_id, created_ts, updated_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                task.name,
                task.project_id,
                task.owner_id,
                task.assignee_id,
                task.subset.as_str(),
                task.source_storage_id,
                task.target_storage_id,
                task.organization_id,
                now,
                now
            ],
        )
        .with_context(|| format!("Failed to create task: {}", task.name))?;
        let task = Task {
            id: tx.last_insert_rowid(),
            ..task
        };

        for payload in &new_task.label_set {
            LabelRepo::insert(&tx, LabelOwner::Task(task.id), payload)?;
        }
        let job = JobRepo::create_default(&tx, &task)?;

        tx.commit()?;
        log::info!(
            "Created task {} ('{}') with default job {}",
            task.id,
            task.name,
            job.id
        );
        Ok(task)
    }

    /// Get task by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
        let task = conn.query_row(&sql, [id], task_from_row).optional()?;
        Ok(task)
    }

    /// Task with storages and job counters resolved
    pub fn view(conn: &Connection, id: i64) -> Result<Option<TaskView>> {
        match Self::get_by_id(conn, id)? {
            Some(task) => Ok(Some(Self::to_view(conn, task)?)),
            None => Ok(None),
        }
    }

    fn to_view(conn: &Connection, task: Task) -> Result<TaskView> {
        Ok(TaskView {
            source_storage: StorageRepo::get_optional(conn, task.source_storage_id)?,
            target_storage: StorageRepo::get_optional(conn, task.target_storage_id)?,
            jobs: Self::job_counts(conn, task.id)?,
            task,
        })
    }

    /// Tasks visible to the requesting user, in creation order
    ///
    /// Non-admins see tasks they own or are assigned to. `search` matches
    /// the task name case-insensitively.
    pub fn list(conn: &Connection, ctx: &RequestContext, search: Option<&str>) -> Result<Vec<TaskView>> {
        let mut sql = format!("SELECT {} FROM tasks WHERE organization_id IS ?1", TASK_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(ctx.organization_id)];

        if !ctx.is_admin {
            sql.push_str(" AND (owner_id = ?2 OR assignee_id = ?2)");
            params.push(Box::new(ctx.user_id));
        }
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            sql.push_str(&format!(" AND LOWER(name) LIKE ?{}", params.len() + 1));
            params.push(Box::new(format!("%{}%", search.to_lowercase())));
        }
        sql.push_str(" ORDER BY created_ts, id");

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), task_from_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(Self::to_view(conn, row?)?);
        }
        Ok(tasks)
    }

    /// Tasks of a project in creation order
    pub fn list_by_project(conn: &Connection, project_id: i64) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE project_id = ?1 ORDER BY created_ts, id",
            TASK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([project_id], task_from_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Count a task's jobs: all, completed (by state), in validation (by stage)
    pub fn job_counts(conn: &Connection, task_id: i64) -> Result<JobCounts> {
        let counts = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN state = 'completed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN stage = 'validation' THEN 1 ELSE 0 END), 0)
             FROM jobs WHERE task_id = ?1",
            [task_id],
            |row| {
                Ok(JobCounts {
                    count: row.get(0)?,
                    completed: row.get(1)?,
                    validation: row.get(2)?,
                })
            },
        )?;
        Ok(counts)
    }

    /// Update task fields and, for tasks owning their labels, merge labels
    ///
    /// The project of a task cannot be changed.
    pub fn update(conn: &Connection, id: i64, update: &TaskUpdate) -> Result<Task> {
        let tx = conn.unchecked_transaction()?;
        let mut task = Self::get_by_id(&tx, id)?
            .ok_or_else(|| DomainError::not_found("Task", id))?;

        if let Some(name) = &update.name {
            validate_task_name(name)?;
            task.name = name.trim().to_string();
        }
        if let Some(assignee_id) = update.assignee_id {
            task.assignee_id = Some(assignee_id);
        }
        if let Some(subset) = update.subset {
            task.subset = subset;
        }
        task.updated_ts = chrono::Utc::now().timestamp();

        tx.execute(
            "UPDATE tasks SET name = ?1, assignee_id = ?2, subset = ?3, updated_ts = ?4 WHERE id = ?5",
            rusqlite::params![task.name, task.assignee_id, task.subset.as_str(), task.updated_ts, task.id],
        )
        .with_context(|| format!("Failed to update task {}", id))?;

        if !update.labels.is_empty() {
            if let Some(project_id) = task.project_id {
                return Err(DomainError::validation(
                    "labels",
                    format!("Task {} uses the labels of project {}", id, project_id),
                )
                .into());
            }
            LabelRepo::merge_into_owner(&tx, LabelOwner::Task(id), &update.labels)?;
        }

        tx.commit()?;
        log::info!("Updated task {}", id);
        Self::get_by_id(conn, id)?.ok_or_else(|| DomainError::not_found("Task", id).into())
    }

    /// Delete a task with its jobs, labels, data records and storages
    pub fn delete(conn: &Connection, id: i64) -> Result<Task> {
        let tx = conn.unchecked_transaction()?;
        let task = Self::get_by_id(&tx, id)?
            .ok_or_else(|| DomainError::not_found("Task", id))?;

        tx.execute("DELETE FROM tasks WHERE id = ?1", [id])
            .with_context(|| format!("Failed to delete task {}", id))?;
        StorageRepo::delete_many(&tx, &[task.source_storage_id, task.target_storage_id])?;

        tx.commit()?;
        log::info!("Deleted task {} ('{}')", task.id, task.name);
        Ok(task)
    }
}

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        project_id: row.get(2)?,
        owner_id: row.get(3)?,
        assignee_id: row.get(4)?,
        subset: Subset::from_str(&row.get::<_, String>(5)?).unwrap_or_default(),
        source_storage_id: row.get(6)?,
        target_storage_id: row.get(7)?,
        organization_id: row.get(8)?,
        created_ts: row.get(9)?,
        updated_ts: row.get(10)?,
    })
}

fn validate_task_name(name: &str) -> Result<(), DomainError> {
    validate_non_empty(name, "name")?;
    validate_max_len(name.trim(), TASK_NAME_MAX, "name")
}
