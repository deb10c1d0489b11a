// Workflow tests: the repository layer driven the way a client session would

use audino::auth::{Action, PermissionGate, RequestContext, Resource, RolePolicy};
use audino::db::DbConnection;
use audino::models::*;
use audino::repo::*;
use rusqlite::Connection;

fn setup() -> Connection {
    DbConnection::connect_in_memory().unwrap()
}

fn project_with_labels(conn: &Connection, ctx: &RequestContext, name: &str, labels: &[&str]) -> Project {
    ProjectRepo::create(conn, ctx, &NewProject {
        labels: labels.iter().map(|l| LabelPayload::named(l)).collect(),
        ..NewProject::named(name)
    })
    .unwrap()
}

#[test]
fn test_annotation_session() {
    let conn = setup();
    let owner = RequestContext::new(1);
    let project = project_with_labels(&conn, &owner, "Birds", &["song"]);
    let song = LabelRepo::list_by_owner(&conn, LabelOwner::Project(project.id)).unwrap()[0].clone();
    let song = LabelRepo::update(&conn, song.id, &LabelPayload {
        attributes: Some(vec![AttributePayload::named("species", &["robin", "wren"])]),
        ..LabelPayload::default()
    })
    .unwrap();
    let species = song.attributes[0].id;

    let task = TaskRepo::create(&conn, &owner, &NewTask {
        assignee_id: Some(2),
        ..NewTask::in_project("Morning chorus", project.id)
    })
    .unwrap();
    let job = JobRepo::list_by_task(&conn, task.id).unwrap()[0].clone();
    assert_eq!(job.assignee_id, Some(2));
    assert_eq!(job.guide_id, Some(1));
    assert_eq!(job.job_type, JobType::Annotation);

    // The assignee works the job
    let annotator = RequestContext::new(2);
    RolePolicy
        .check(&annotator, &Resource::job(&job, &task), Action::Update)
        .unwrap();
    let job = JobRepo::update(&conn, job.id, &JobUpdate {
        state: Some(JobState::InProgress),
        ..JobUpdate::default()
    })
    .unwrap();
    assert_eq!(job.status(), JobStatus::Annotation);

    let annotation = AnnotationRepo::create(&conn, job.id, &AnnotationPayload {
        start: Some("1.25".to_string()),
        end: Some("3.50".to_string()),
        labels: vec![AnnotationLabelPayload::new(song.id).with_attribute(species, &["wren"])],
        ..AnnotationPayload::default()
    })
    .unwrap();
    assert_eq!(annotation.labels[0].name, "song");
    assert_eq!(annotation.labels[0].attributes[0].name, "species");
    assert_eq!(annotation.labels[0].attributes[0].values, vec!["wren".to_string()]);

    // Hand over to validation, then accept
    let job = JobRepo::update(&conn, job.id, &JobUpdate {
        stage: Some(JobStage::Validation),
        ..JobUpdate::default()
    })
    .unwrap();
    assert_eq!(job.state, JobState::New);
    assert_eq!(job.status(), JobStatus::Validation);

    let job = JobRepo::update(&conn, job.id, &JobUpdate {
        stage: Some(JobStage::Acceptance),
        state: Some(JobState::Completed),
        ..JobUpdate::default()
    })
    .unwrap();
    assert_eq!(job.status(), JobStatus::Completed);

    let counts = TaskRepo::job_counts(&conn, task.id).unwrap();
    assert_eq!(counts.count, 1);
    assert_eq!(counts.completed, 1);
}

#[test]
fn test_label_delete_keeps_annotation_snapshot() {
    let conn = setup();
    let ctx = RequestContext::new(1);
    let task = TaskRepo::create(&conn, &ctx, &NewTask::with_labels(
        "Street",
        vec![LabelPayload::named("car"), LabelPayload::named("horn")],
    ))
    .unwrap();
    let job = JobRepo::list_by_task(&conn, task.id).unwrap()[0].clone();
    let car = LabelRepo::list_by_owner(&conn, LabelOwner::Task(task.id))
        .unwrap()
        .into_iter()
        .find(|l| l.name == "car")
        .unwrap();

    let annotation = AnnotationRepo::create(&conn, job.id, &AnnotationPayload {
        labels: vec![AnnotationLabelPayload::new(car.id)],
        ..AnnotationPayload::default()
    })
    .unwrap();

    LabelRepo::delete(&conn, car.id).unwrap();

    let stored = AnnotationRepo::get_by_id(&conn, annotation.id).unwrap().unwrap();
    assert_eq!(stored.labels.len(), 1);
    assert_eq!(stored.labels[0].name, "car");
    assert_eq!(stored.labels[0].label_id, None);

    let remaining = LabelRepo::resolve_for_job(&conn, job.id).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "horn");
}

#[test]
fn test_project_task_cannot_take_own_labels() {
    let conn = setup();
    let ctx = RequestContext::new(1);
    let project = project_with_labels(&conn, &ctx, "Birds", &["song"]);
    let task = TaskRepo::create(&conn, &ctx, &NewTask::in_project("Dawn", project.id)).unwrap();

    let err = TaskRepo::update(&conn, task.id, &TaskUpdate {
        labels: vec![LabelPayload::named("call")],
        ..TaskUpdate::default()
    })
    .unwrap_err();
    assert!(audino::error::DomainError::classify(&err).unwrap().is_validation());
    assert!(LabelRepo::list_by_owner(&conn, LabelOwner::Task(task.id)).unwrap().is_empty());
}

#[test]
fn test_task_inherits_project_storage() {
    let conn = setup();
    let ctx = RequestContext::new(1);
    let project = ProjectRepo::create(&conn, &ctx, &NewProject {
        source_storage: Some(StorageConfig { location: StorageLocation::Cloud, cloud_storage_id: 9 }),
        labels: vec![LabelPayload::named("song")],
        ..NewProject::named("Birds")
    })
    .unwrap();

    let task = TaskRepo::create(&conn, &ctx, &NewTask::in_project("Dawn", project.id)).unwrap();
    let view = TaskRepo::view(&conn, task.id).unwrap().unwrap();
    let source = view.source_storage.unwrap();
    assert_eq!(source.location, StorageLocation::Cloud);
    assert_eq!(source.cloud_storage_id, 9);
    // A copy, not the project's own row
    assert_ne!(Some(source.id), project.source_storage_id);
}

#[test]
fn test_listing_respects_organization_scope() {
    let conn = setup();
    let personal = RequestContext::new(1);
    let in_org = RequestContext::new(1).in_organization(4);

    TaskRepo::create(&conn, &personal, &NewTask::with_labels("Home", vec![LabelPayload::named("a")])).unwrap();
    TaskRepo::create(&conn, &in_org, &NewTask::with_labels("Work", vec![LabelPayload::named("b")])).unwrap();

    let names = |ctx: &RequestContext| -> Vec<String> {
        TaskRepo::list(&conn, ctx, None)
            .unwrap()
            .into_iter()
            .map(|view| view.task.name)
            .collect()
    };
    assert_eq!(names(&personal), vec!["Home".to_string()]);
    assert_eq!(names(&in_org), vec!["Work".to_string()]);

    let jobs = JobRepo::list_for_user(&conn, &in_org, Some("WOR")).unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(JobRepo::list_for_user(&conn, &in_org, Some("home")).unwrap().is_empty());
}

#[test]
fn test_task_in_project_of_other_organization_rejected() {
    let conn = setup();
    let org_ctx = RequestContext::new(1).in_organization(4);
    let project = project_with_labels(&conn, &org_ctx, "Org project", &["x"]);

    let err = TaskRepo::create(&conn, &RequestContext::new(1), &NewTask::in_project("Stray", project.id))
        .unwrap_err();
    let domain = audino::error::DomainError::classify(&err).unwrap();
    assert!(domain.is_validation());
    assert!(TaskRepo::list_by_project(&conn, project.id).unwrap().is_empty());
}

#[test]
fn test_project_without_labels_is_enough_for_a_task() {
    let conn = setup();
    let ctx = RequestContext::new(1);
    let project = ProjectRepo::create(&conn, &ctx, &NewProject::named("Empty")).unwrap();

    let task = TaskRepo::create(&conn, &ctx, &NewTask::in_project("Clip", project.id)).unwrap();
    assert_eq!(task.project_id, Some(project.id));
    assert!(LabelRepo::resolve_for_task(&conn, task.id).unwrap().is_empty());
    assert_eq!(JobRepo::list_by_task(&conn, task.id).unwrap().len(), 1);
}
