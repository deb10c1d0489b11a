//! Label taxonomy change propagation
//!
//! Jobs cache nothing about labels, but clients poll `updated_ts` to learn
//! that the label set they annotate against has changed. Whenever a label
//! is created, changed or removed, the owner and everything below it that
//! is older than the change gets its timestamp bumped.

use rusqlite::Connection;
use crate::error::DomainError;
use crate::models::LabelOwner;
use anyhow::Result;

/// Emitted after any label mutation on `owner`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelTaxonomyChanged {
    pub owner: LabelOwner,
}

/// What a propagation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchSummary {
    pub timestamp: i64,
    pub tasks: usize,
    pub jobs: usize,
}

/// Bump the owner and its stale descendants (caller holds the transaction)
pub fn propagate(conn: &Connection, event: &LabelTaxonomyChanged) -> Result<TouchSummary> {
    let now = chrono::Utc::now().timestamp();

    let summary = match event.owner {
        LabelOwner::Project(project_id) => {
            let touched = conn.execute(
                "UPDATE projects SET updated_ts = ?1 WHERE id = ?2",
                [now, project_id],
            )?;
            if touched == 0 {
                return Err(DomainError::not_found("Project", project_id).into());
            }
            let tasks = conn.execute(
                "UPDATE tasks SET updated_ts = ?1 WHERE project_id = ?2 AND updated_ts < ?1",
                [now, project_id],
            )?;
            let jobs = conn.execute(
                "UPDATE jobs SET updated_ts = ?1
                 WHERE updated_ts < ?1
                   AND task_id IN (SELECT id FROM tasks WHERE project_id = ?2)",
                [now, project_id],
            )?;
            TouchSummary { timestamp: now, tasks, jobs }
        }
        LabelOwner::Task(task_id) => {
            let touched = conn.execute(
                "UPDATE tasks SET updated_ts = ?1 WHERE id = ?2",
                [now, task_id],
            )?;
            if touched == 0 {
                return Err(DomainError::not_found("Task", task_id).into());
            }
            let jobs = conn.execute(
                "UPDATE jobs SET updated_ts = ?1 WHERE task_id = ?2 AND updated_ts < ?1",
                [now, task_id],
            )?;
            TouchSummary { timestamp: now, tasks: 1, jobs }
        }
    };

    log::debug!(
        "Label taxonomy of {} {} changed: touched {} task(s), {} job(s)",
        event.owner.entity(),
        event.owner.id(),
        summary.tasks,
        summary.jobs
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RequestContext;
    use crate::db::DbConnection;
    use crate::models::{LabelPayload, NewProject, NewTask};
    use crate::repo::{JobRepo, LabelRepo, ProjectRepo, TaskRepo};

    fn age_everything(conn: &Connection) {
        conn.execute_batch(
            "UPDATE projects SET updated_ts = 100;
             UPDATE tasks SET updated_ts = 100;
             UPDATE jobs SET updated_ts = 100;",
        )
        .unwrap();
    }

    #[test]
    fn test_project_change_reaches_jobs() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let ctx = RequestContext::new(1);
        let project = ProjectRepo::create(&conn, &ctx, &NewProject::named("calls")).unwrap();
        let task = TaskRepo::create(&conn, &ctx, &NewTask::in_project("call-1", project.id)).unwrap();
        age_everything(&conn);

        let summary = propagate(&conn, &LabelTaxonomyChanged { owner: LabelOwner::Project(project.id) }).unwrap();
        assert_eq!(summary.tasks, 1);
        assert_eq!(summary.jobs, 1);

        let project = ProjectRepo::get_by_id(&conn, project.id).unwrap().unwrap();
        assert_eq!(project.updated_ts, summary.timestamp);
        let jobs = JobRepo::list_by_task(&conn, task.id).unwrap();
        assert!(jobs.iter().all(|j| j.updated_ts == summary.timestamp));
    }

    #[test]
    fn test_newer_jobs_are_left_alone() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let ctx = RequestContext::new(1);
        let task = TaskRepo::create(&conn, &ctx, &NewTask::with_labels("solo", vec![LabelPayload::named("music")])).unwrap();
        let future = chrono::Utc::now().timestamp() + 3600;
        conn.execute("UPDATE jobs SET updated_ts = ?1", [future]).unwrap();

        let summary = propagate(&conn, &LabelTaxonomyChanged { owner: LabelOwner::Task(task.id) }).unwrap();
        assert_eq!(summary.jobs, 0);
        let job = &JobRepo::list_by_task(&conn, task.id).unwrap()[0];
        assert_eq!(job.updated_ts, future);
    }

    #[test]
    fn test_label_delete_bumps_owner_and_jobs() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let ctx = RequestContext::new(1);
        let task = TaskRepo::create(&conn, &ctx, &NewTask::with_labels("solo", vec![LabelPayload::named("music")])).unwrap();
        let label_id = LabelRepo::list_by_owner(&conn, LabelOwner::Task(task.id)).unwrap()[0].id;
        age_everything(&conn);

        LabelRepo::delete(&conn, label_id).unwrap();

        let task = TaskRepo::get_by_id(&conn, task.id).unwrap().unwrap();
        assert!(task.updated_ts > 100);
        let job = &JobRepo::list_by_task(&conn, task.id).unwrap()[0];
        assert!(job.updated_ts > 100);
    }

    #[test]
    fn test_label_create_bumps_owner_and_jobs() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let ctx = RequestContext::new(1);
        let project = ProjectRepo::create(&conn, &ctx, &NewProject::named("calls")).unwrap();
        let task = TaskRepo::create(&conn, &ctx, &NewTask::in_project("call-1", project.id)).unwrap();
        age_everything(&conn);

        LabelRepo::create(&conn, LabelOwner::Project(project.id), &LabelPayload::named("bird")).unwrap();

        let project = ProjectRepo::get_by_id(&conn, project.id).unwrap().unwrap();
        assert!(project.updated_ts > 100);
        let job = &JobRepo::list_by_task(&conn, task.id).unwrap()[0];
        assert!(job.updated_ts > 100);
    }

    #[test]
    fn test_missing_owner() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let err = propagate(&conn, &LabelTaxonomyChanged { owner: LabelOwner::Task(9) }).unwrap_err();
        assert!(DomainError::classify(&err).unwrap().is_not_found());
    }
}
