use rusqlite::{Connection, OptionalExtension, Row};
use crate::auth::RequestContext;
use crate::error::{validate_max_len, validate_non_empty, DomainError};
use crate::models::{LabelOwner, NewProject, Project, ProjectUpdate, ProjectView};
use crate::repo::{LabelRepo, StorageRepo, TaskRepo};
use anyhow::{Context, Result};

const PROJECT_NAME_MAX: usize = 256;

const PROJECT_COLUMNS: &str = "id, name, owner_id, assignee_id, organization_id, source_storage_id,
    target_storage_id, created_ts, updated_ts";

/// Project repository for database operations
///
/// A project groups tasks that share one label set and default storages.
///
/// # Example
///
/// ```no_run
/// use audino::auth::RequestContext;
/// use audino::db::DbConnection;
/// use audino::models::{LabelPayload, NewProject};
/// use audino::repo::ProjectRepo;
///
/// let conn = DbConnection::connect().unwrap();
/// let ctx = RequestContext::new(1).in_organization(2);
/// let project = ProjectRepo::create(&conn, &ctx, &NewProject {
///     labels: vec![LabelPayload::named("speaker")],
///     ..NewProject::named("interviews")
/// }).unwrap();
/// ```
pub struct ProjectRepo;

impl ProjectRepo {
    /// Create a project with its storages and labels
    ///
    /// Owner and organization come from the request context.
    pub fn create(conn: &Connection, ctx: &RequestContext, new_project: &NewProject) -> Result<Project> {
        validate_project_name(&new_project.name)?;

        let tx = conn.unchecked_transaction()?;
        let source = StorageRepo::resolve(&tx, new_project.source_storage.as_ref(), None)?;
        let target = StorageRepo::resolve(&tx, new_project.target_storage.as_ref(), None)?;
        let now = chrono::Utc::now().timestamp();
        let name = new_project.name.trim().to_string();

        tx.execute(
            "INSERT INTO projects (name, owner_id, assignee_id, organization_id, source_storage_id,
                    target_storage_id, created_ts, updated_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                name,
                ctx.user_id,
                new_project.assignee_id,
                ctx.organization_id,
                source.id,
                target.id,
                now,
                now
            ],
        )
        .with_context(|| format!("Failed to create project: {}", name))?;
        let id = tx.last_insert_rowid();

        for payload in &new_project.labels {
            LabelRepo::insert(&tx, LabelOwner::Project(id), payload)?;
        }

        tx.commit()?;
        log::info!("Created project {} ('{}') with {} label(s)", id, name, new_project.labels.len());

        Ok(Project {
            id,
            name,
            owner_id: Some(ctx.user_id),
            assignee_id: new_project.assignee_id,
            organization_id: ctx.organization_id,
            source_storage_id: Some(source.id),
            target_storage_id: Some(target.id),
            created_ts: now,
            updated_ts: now,
        })
    }

    /// Get project by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Project>> {
        let sql = format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS);
        let project = conn.query_row(&sql, [id], project_from_row).optional()?;
        Ok(project)
    }

    /// Project with storages and labels resolved
    pub fn view(conn: &Connection, id: i64) -> Result<Option<ProjectView>> {
        let project = match Self::get_by_id(conn, id)? {
            Some(project) => project,
            None => return Ok(None),
        };
        Ok(Some(ProjectView {
            source_storage: StorageRepo::get_optional(conn, project.source_storage_id)?,
            target_storage: StorageRepo::get_optional(conn, project.target_storage_id)?,
            labels: LabelRepo::list_by_owner(conn, LabelOwner::Project(project.id))?,
            project,
        }))
    }

    /// Projects visible to the requesting user, newest first
    pub fn list(conn: &Connection, ctx: &RequestContext, search: Option<&str>) -> Result<Vec<Project>> {
        let mut sql = format!("SELECT {} FROM projects WHERE organization_id IS ?1", PROJECT_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(ctx.organization_id)];

        if !ctx.is_admin {
            sql.push_str(" AND (owner_id = ?2 OR assignee_id = ?2)");
            params.push(Box::new(ctx.user_id));
        }
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            sql.push_str(&format!(" AND LOWER(name) LIKE ?{}", params.len() + 1));
            params.push(Box::new(format!("%{}%", search.to_lowercase())));
        }
        sql.push_str(" ORDER BY id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), project_from_row)?;

        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok(projects)
    }

    /// Update project fields and merge label payloads
    pub fn update(conn: &Connection, id: i64, update: &ProjectUpdate) -> Result<Project> {
        let tx = conn.unchecked_transaction()?;
        let mut project = Self::get_by_id(&tx, id)?
            .ok_or_else(|| DomainError::not_found("Project", id))?;

        if let Some(name) = &update.name {
            validate_project_name(name)?;
            project.name = name.trim().to_string();
        }
        if let Some(assignee_id) = update.assignee_id {
            project.assignee_id = Some(assignee_id);
        }
        project.updated_ts = chrono::Utc::now().timestamp();

        tx.execute(
            "UPDATE projects SET name = ?1, assignee_id = ?2, updated_ts = ?3 WHERE id = ?4",
            rusqlite::params![project.name, project.assignee_id, project.updated_ts, project.id],
        )
        .with_context(|| format!("Failed to update project {}", id))?;

        LabelRepo::merge_into_owner(&tx, LabelOwner::Project(id), &update.labels)?;

        tx.commit()?;
        log::info!("Updated project {}", id);
        Self::get_by_id(conn, id)?.ok_or_else(|| DomainError::not_found("Project", id).into())
    }

    /// Delete a project with its tasks, labels, jobs, annotations and storages
    pub fn delete(conn: &Connection, id: i64) -> Result<Project> {
        let tx = conn.unchecked_transaction()?;
        let project = Self::get_by_id(&tx, id)?
            .ok_or_else(|| DomainError::not_found("Project", id))?;

        let mut storages = vec![project.source_storage_id, project.target_storage_id];
        for task in TaskRepo::list_by_project(&tx, id)? {
            storages.push(task.source_storage_id);
            storages.push(task.target_storage_id);
        }

        tx.execute("DELETE FROM projects WHERE id = ?1", [id])
            .with_context(|| format!("Failed to delete project {}", id))?;
        StorageRepo::delete_many(&tx, &storages)?;

        tx.commit()?;
        log::info!("Deleted project {} ('{}')", project.id, project.name);
        Ok(project)
    }
}

fn project_from_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        assignee_id: row.get(3)?,
        organization_id: row.get(4)?,
        source_storage_id: row.get(5)?,
        target_storage_id: row.get(6)?,
        created_ts: row.get(7)?,
        updated_ts: row.get(8)?,
    })
}

fn validate_project_name(name: &str) -> Result<(), DomainError> {
    validate_non_empty(name, "name")?;
    validate_max_len(name.trim(), PROJECT_NAME_MAX, "name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::models::{AttributePayload, LabelPayload, NewTask};
    use crate::repo::JobRepo;

    #[test]
    fn test_create_project_with_labels() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let ctx = RequestContext::new(3).in_organization(8);
        let project = ProjectRepo::create(&conn, &ctx, &NewProject {
            assignee_id: Some(4),
            labels: vec![
                LabelPayload::named("speaker")
                    .with_attributes(vec![AttributePayload::named("gender", &["male", "female"])]),
                LabelPayload::named("noise"),
            ],
            ..NewProject::named(" interviews ")
        }).unwrap();

        assert_eq!(project.name, "interviews");
        assert_eq!(project.owner_id, Some(3));
        assert_eq!(project.organization_id, Some(8));

        let view = ProjectRepo::view(&conn, project.id).unwrap().unwrap();
        assert_eq!(view.labels.len(), 2);
        // Newest first
        assert_eq!(view.labels[0].name, "noise");
        assert!(view.source_storage.is_some());
        assert!(view.target_storage.is_some());
    }

    #[test]
    fn test_create_rejects_empty_name() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let err = ProjectRepo::create(&conn, &RequestContext::new(1), &NewProject::named("  ")).unwrap_err();
        assert_eq!(DomainError::classify(&err).unwrap().field(), Some("name"));
    }

    #[test]
    fn test_update_merges_labels() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let ctx = RequestContext::new(1);
        let project = ProjectRepo::create(&conn, &ctx, &NewProject {
            labels: vec![LabelPayload::named("speaker")],
            ..NewProject::named("calls")
        }).unwrap();
        let speaker = LabelRepo::resolve_for_project(&conn, project.id).unwrap().remove(0);

        ProjectRepo::update(&conn, project.id, &ProjectUpdate {
            assignee_id: Some(9),
            labels: vec![
                LabelPayload { id: Some(speaker.id), ..LabelPayload::named("caller") },
                LabelPayload::named("hold music"),
            ],
            ..ProjectUpdate::default()
        }).unwrap();

        let labels = LabelRepo::resolve_for_project(&conn, project.id).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.iter().find(|l| l.id == speaker.id).unwrap().name, "caller");
        assert_eq!(ProjectRepo::get_by_id(&conn, project.id).unwrap().unwrap().assignee_id, Some(9));
    }

    #[test]
    fn test_update_rejects_foreign_label() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let ctx = RequestContext::new(1);
        let first = ProjectRepo::create(&conn, &ctx, &NewProject {
            labels: vec![LabelPayload::named("speaker")],
            ..NewProject::named("first")
        }).unwrap();
        let second = ProjectRepo::create(&conn, &ctx, &NewProject::named("second")).unwrap();
        let foreign = LabelRepo::resolve_for_project(&conn, first.id).unwrap().remove(0);

        let err = ProjectRepo::update(&conn, second.id, &ProjectUpdate {
            labels: vec![LabelPayload { id: Some(foreign.id), ..LabelPayload::named("stolen") }],
            ..ProjectUpdate::default()
        }).unwrap_err();
        assert!(DomainError::classify(&err).unwrap().is_validation());
        assert_eq!(LabelRepo::get_by_id(&conn, foreign.id).unwrap().unwrap().name, "speaker");
    }

    #[test]
    fn test_list_scoping() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let org = RequestContext::new(1).in_organization(2);
        ProjectRepo::create(&conn, &org, &NewProject::named("Alpha")).unwrap();
        ProjectRepo::create(&conn, &org, &NewProject { assignee_id: Some(5), ..NewProject::named("Beta") }).unwrap();
        ProjectRepo::create(&conn, &RequestContext::new(1), &NewProject::named("Personal")).unwrap();

        let listed = ProjectRepo::list(&conn, &org, None).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Beta");
        assert_eq!(ProjectRepo::list(&conn, &org, Some("alp")).unwrap().len(), 1);
        assert_eq!(ProjectRepo::list(&conn, &RequestContext::new(5).in_organization(2), None).unwrap().len(), 1);
        assert_eq!(ProjectRepo::list(&conn, &RequestContext::new(1), None).unwrap()[0].name, "Personal");
    }

    #[test]
    fn test_delete_cascades_to_tasks_and_jobs() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let ctx = RequestContext::new(1);
        let project = ProjectRepo::create(&conn, &ctx, &NewProject {
            labels: vec![LabelPayload::named("speaker")],
            ..NewProject::named("calls")
        }).unwrap();
        let task = TaskRepo::create(&conn, &ctx, &NewTask::in_project("call-1", project.id)).unwrap();

        ProjectRepo::delete(&conn, project.id).unwrap();
        assert!(ProjectRepo::get_by_id(&conn, project.id).unwrap().is_none());
        assert!(TaskRepo::get_by_id(&conn, task.id).unwrap().is_none());
        assert!(JobRepo::list_by_task(&conn, task.id).unwrap().is_empty());
        let leftovers: i64 = conn
            .query_row("SELECT (SELECT COUNT(*) FROM labels) + (SELECT COUNT(*) FROM storages)", [], |row| row.get(0))
            .unwrap();
        assert_eq!(leftovers, 0);
    }
}
