use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::PathBuf;
use crate::auth::{Action, PermissionGate, RequestContext, Resource, RolePolicy};
use crate::cli::error::{parse_payload, validate_id};
use crate::cli::output::*;
use crate::config::Config;
use crate::db::DbConnection;
use crate::error::DomainError;
use crate::files::FileStore;
use crate::models::{
    Annotation, AnnotationPayload, Job, JobStage, JobState, JobType, JobUpdate, JobView, Label,
    LabelOwner, LabelPayload, NewJob, NewProject, NewTask, Project, ProjectUpdate, StorageConfig,
    Subset, Task, TaskUpdate,
};
use crate::repo::{AnnotationRepo, DataRepo, JobRepo, LabelRepo, ProjectRepo, TaskRepo};
use anyhow::{Context, Result};

#[derive(Parser)]
#[command(name = "audino")]
#[command(about = "Audino - projects, tasks, annotation jobs and label taxonomies for audio annotation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Act as this user (overrides user.id from ~/.audino/rc)
    #[arg(long, global = true)]
    pub user: Option<i64>,
    /// Work inside this organization (overrides organization.id)
    #[arg(long, global = true)]
    pub org: Option<i64>,
    /// Work in the personal workspace, ignoring organization.id
    #[arg(long, global = true, conflicts_with = "org")]
    pub personal: bool,
    /// Act with administrator rights
    #[arg(long, global = true)]
    pub admin: bool,
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Project management commands
    Projects {
        #[command(subcommand)]
        subcommand: ProjectCommands,
    },
    /// Task management commands
    Tasks {
        #[command(subcommand)]
        subcommand: TaskCommands,
    },
    /// Label and attribute commands
    Labels {
        #[command(subcommand)]
        subcommand: LabelCommands,
    },
    /// Annotation job workflow commands
    Jobs {
        #[command(subcommand)]
        subcommand: JobCommands,
    },
    /// Annotation commands
    Annotations {
        #[command(subcommand)]
        subcommand: AnnotationCommands,
    },
    /// Task audio data commands
    Data {
        #[command(subcommand)]
        subcommand: DataCommands,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a new project
    Add {
        name: String,
        /// User the project is assigned to
        #[arg(long)]
        assignee: Option<i64>,
        /// Source storage: local, cloud or cloud:<id>
        #[arg(long, value_parser = StorageConfig::parse)]
        source_storage: Option<StorageConfig>,
        /// Target storage: local, cloud or cloud:<id>
        #[arg(long, value_parser = StorageConfig::parse)]
        target_storage: Option<StorageConfig>,
        /// Label name, JSON label payload, or @file (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,
    },
    /// List projects
    List {
        /// Case-insensitive name filter
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a project with its labels
    Show { id: i64 },
    /// Update a project and merge labels
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        assignee: Option<i64>,
        /// Label payload; with an "id" it updates that label (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,
    },
    /// Delete a project with its tasks
    Delete { id: i64 },
    /// List the labels of a project
    Labels { id: i64 },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a task in a project or with its own labels
    Add {
        name: String,
        /// Project the task belongs to
        #[arg(long)]
        project: Option<i64>,
        #[arg(long)]
        assignee: Option<i64>,
        /// Train, Test or Validation
        #[arg(long, value_parser = parse_subset)]
        subset: Option<Subset>,
        #[arg(long, value_parser = StorageConfig::parse)]
        source_storage: Option<StorageConfig>,
        #[arg(long, value_parser = StorageConfig::parse)]
        target_storage: Option<StorageConfig>,
        /// Label name, JSON label payload, or @file (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,
    },
    /// List tasks with job counters
    List {
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a task
    Show { id: i64 },
    /// Update a task
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        assignee: Option<i64>,
        #[arg(long, value_parser = parse_subset)]
        subset: Option<Subset>,
        /// Label payload for tasks owning their labels (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,
    },
    /// Delete a task with its jobs, labels and data
    Delete { id: i64 },
    /// List the labels a task's jobs annotate with
    Labels { id: i64 },
}

#[derive(Subcommand)]
pub enum LabelCommands {
    /// Show a label with its attributes
    Show { id: i64 },
    /// Update a label from a JSON payload (inline or @file)
    Update { id: i64, payload: String },
    /// Delete a label
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum JobCommands {
    /// Create an extra job for a task
    Add {
        task_id: i64,
        /// annotation or ground_truth
        #[arg(long = "type", value_parser = parse_job_type, default_value = "ground_truth")]
        job_type: JobType,
        #[arg(long)]
        assignee: Option<i64>,
    },
    /// List jobs you guide or are assigned to
    List {
        /// Case-insensitive task name filter
        #[arg(long)]
        search: Option<String>,
        /// Only jobs of this task
        #[arg(long)]
        task: Option<i64>,
    },
    /// Show a job
    Show { id: i64 },
    /// Move a job through its workflow
    Update {
        id: i64,
        /// annotation, validation or acceptance
        #[arg(long, value_parser = parse_stage)]
        stage: Option<JobStage>,
        /// new, "in progress", completed or rejected
        #[arg(long, value_parser = parse_state)]
        state: Option<JobState>,
        #[arg(long)]
        assignee: Option<i64>,
        #[arg(long)]
        guide: Option<i64>,
    },
    /// Delete a ground truth job
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum AnnotationCommands {
    /// Annotate a job from a JSON payload (inline or @file)
    Add { job_id: i64, payload: String },
    /// List the annotations of a job
    List { job_id: i64 },
    /// Show an annotation
    Show { id: i64 },
    /// Replace an annotation from a JSON payload
    Update { id: i64, payload: String },
    /// Delete an annotation
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum DataCommands {
    /// Attach an audio file to a task
    Add { task_id: i64, file: PathBuf },
    /// Show the data attached to a task
    Show { task_id: i64 },
    /// Remove all data attached to a task
    Delete { task_id: i64 },
}

fn parse_subset(s: &str) -> Result<Subset, String> {
    Subset::from_str(s).ok_or_else(|| format!("Invalid subset: '{}'. Expected Train, Test or Validation.", s))
}

fn parse_job_type(s: &str) -> Result<JobType, String> {
    JobType::from_str(s).ok_or_else(|| format!("Invalid job type: '{}'. Expected annotation or ground_truth.", s))
}

fn parse_stage(s: &str) -> Result<JobStage, String> {
    JobStage::from_str(&s.to_lowercase())
        .ok_or_else(|| format!("Invalid stage: '{}'. Expected annotation, validation or acceptance.", s))
}

fn parse_state(s: &str) -> Result<JobState, String> {
    JobState::from_str(&s.to_lowercase())
        .ok_or_else(|| format!("Invalid state: '{}'. Expected new, in progress, completed or rejected.", s))
}

/// A `--label` value: a bare name, inline JSON, or `@file`
fn parse_label_arg(raw: &str) -> Result<LabelPayload> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('@') {
        parse_payload(trimmed, "label")
    } else {
        Ok(LabelPayload::named(raw))
    }
}

fn parse_label_args(raw: &[String]) -> Result<Vec<LabelPayload>> {
    raw.iter().map(|r| parse_label_arg(r)).collect()
}

pub fn run() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|e| e.exit());
    handle_command(cli)
}

pub fn handle_command(cli: Cli) -> Result<()> {
    let session = Session::open(&cli)?;
    match cli.command {
        Commands::Projects { subcommand } => handle_projects(&session, subcommand),
        Commands::Tasks { subcommand } => handle_tasks(&session, subcommand),
        Commands::Labels { subcommand } => handle_labels(&session, subcommand),
        Commands::Jobs { subcommand } => handle_jobs(&session, subcommand),
        Commands::Annotations { subcommand } => handle_annotations(&session, subcommand),
        Commands::Data { subcommand } => handle_data(&session, subcommand),
    }
}

/// Everything a command needs: the database, who is asking, and the gate
struct Session {
    conn: Connection,
    ctx: RequestContext,
    gate: RolePolicy,
    store: FileStore,
    json: bool,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let config = Config::load()?;
        let ctx = request_context(cli, &config)?;
        let conn = DbConnection::connect_at(&config.database_path())
            .context("Failed to connect to database")?;
        log::debug!("Acting as user {} in organization {:?}", ctx.user_id, ctx.organization_id);
        Ok(Self {
            conn,
            ctx,
            gate: RolePolicy,
            store: FileStore::new(config.storage_path()),
            json: cli.json,
        })
    }

    fn project(&self, id: i64, action: Action) -> Result<Project> {
        validate_id(id, "project")?;
        let project = ProjectRepo::get_by_id(&self.conn, id)?
            .ok_or_else(|| DomainError::not_found("Project", id))?;
        self.gate.check(&self.ctx, &Resource::project(&project), action)?;
        Ok(project)
    }

    fn task(&self, id: i64, action: Action) -> Result<Task> {
        validate_id(id, "task")?;
        let task = TaskRepo::get_by_id(&self.conn, id)?
            .ok_or_else(|| DomainError::not_found("Task", id))?;
        self.gate.check(&self.ctx, &Resource::task(&task), action)?;
        Ok(task)
    }

    fn job(&self, id: i64, action: Action) -> Result<(Job, Task)> {
        validate_id(id, "job")?;
        let job = JobRepo::get_by_id(&self.conn, id)?
            .ok_or_else(|| DomainError::not_found("Job", id))?;
        let task = TaskRepo::get_by_id(&self.conn, job.task_id)?
            .ok_or_else(|| DomainError::not_found("Task", job.task_id))?;
        self.gate.check(&self.ctx, &Resource::job(&job, &task), action)?;
        Ok((job, task))
    }

    /// Labels are governed by their owner
    fn label(&self, id: i64, action: Action) -> Result<Label> {
        validate_id(id, "label")?;
        let label = LabelRepo::get_by_id(&self.conn, id)?
            .ok_or_else(|| DomainError::not_found("Label", id))?;
        match label.owner {
            LabelOwner::Project(project_id) => {
                self.project(project_id, action)?;
            }
            LabelOwner::Task(task_id) => {
                self.task(task_id, action)?;
            }
        }
        Ok(label)
    }

    /// Annotations are governed by their job
    fn annotation(&self, id: i64, action: Action) -> Result<Annotation> {
        validate_id(id, "annotation")?;
        let annotation = AnnotationRepo::get_by_id(&self.conn, id)?
            .ok_or_else(|| DomainError::not_found("Annotation", id))?;
        self.job(annotation.job_id, action)?;
        Ok(annotation)
    }

    fn width(&self) -> usize {
        get_terminal_width()
    }
}

fn request_context(cli: &Cli, config: &Config) -> Result<RequestContext> {
    let user_id = cli.user.or(config.user_id).ok_or_else(|| {
        DomainError::validation("user", "No user given. Pass --user <id> or set user.id in ~/.audino/rc")
    })?;
    let mut ctx = RequestContext::new(validate_id(user_id, "user")?);
    let organization_id = if cli.personal {
        None
    } else {
        cli.org.or(config.organization_id)
    };
    if let Some(organization_id) = organization_id {
        ctx = ctx.in_organization(validate_id(organization_id, "organization")?);
    }
    if cli.admin || config.is_admin {
        ctx = ctx.as_admin();
    }
    Ok(ctx)
}

fn handle_projects(s: &Session, cmd: ProjectCommands) -> Result<()> {
    match cmd {
        ProjectCommands::Add { name, assignee, source_storage, target_storage, labels } => {
            let payload = NewProject {
                name,
                assignee_id: assignee,
                source_storage,
                target_storage,
                labels: parse_label_args(&labels)?,
            };
            let project = ProjectRepo::create(&s.conn, &s.ctx, &payload)?;
            if s.json {
                if let Some(view) = ProjectRepo::view(&s.conn, project.id)? {
                    print_json(&view)?;
                }
            } else {
                println!("Created project {}: {}", project.id, project.name);
            }
            Ok(())
        }
        ProjectCommands::List { search } => {
            let projects = ProjectRepo::list(&s.conn, &s.ctx, search.as_deref())
                .context("Failed to list projects")?;
            if s.json {
                print_json(&projects)
            } else {
                print!("{}", format_project_table(&projects, s.width()));
                Ok(())
            }
        }
        ProjectCommands::Show { id } => {
            s.project(id, Action::View)?;
            let view = ProjectRepo::view(&s.conn, id)?
                .ok_or_else(|| DomainError::not_found("Project", id))?;
            if s.json {
                print_json(&view)
            } else {
                print!("{}", format_project_summary(&view));
                Ok(())
            }
        }
        ProjectCommands::Update { id, name, assignee, labels } => {
            s.project(id, Action::Update)?;
            let update = ProjectUpdate {
                name,
                assignee_id: assignee,
                labels: parse_label_args(&labels)?,
            };
            let project = ProjectRepo::update(&s.conn, id, &update)?;
            if s.json {
                print_json(&project)
            } else {
                println!("Updated project {}: {}", project.id, project.name);
                Ok(())
            }
        }
        ProjectCommands::Delete { id } => {
            s.project(id, Action::Delete)?;
            let mut records = Vec::new();
            for task in TaskRepo::list_by_project(&s.conn, id)? {
                records.extend(DataRepo::list_by_task(&s.conn, task.id)?);
            }
            let project = ProjectRepo::delete(&s.conn, id)?;
            DataRepo::remove_files(&s.store, &records)?;
            if s.json {
                print_json(&project)
            } else {
                println!("Deleted project {}: {}", project.id, project.name);
                Ok(())
            }
        }
        ProjectCommands::Labels { id } => {
            s.project(id, Action::View)?;
            let labels = LabelRepo::resolve_for_project(&s.conn, id)?;
            if s.json {
                print_json(&labels)
            } else {
                print!("{}", format_label_list(&labels));
                Ok(())
            }
        }
    }
}

fn handle_tasks(s: &Session, cmd: TaskCommands) -> Result<()> {
    match cmd {
        TaskCommands::Add { name, project, assignee, subset, source_storage, target_storage, labels } => {
            let payload = NewTask {
                name,
                project_id: project,
                assignee_id: assignee,
                subset,
                source_storage,
                target_storage,
                label_set: parse_label_args(&labels)?,
            };
            let task = TaskRepo::create(&s.conn, &s.ctx, &payload)?;
            if s.json {
                if let Some(view) = TaskRepo::view(&s.conn, task.id)? {
                    print_json(&view)?;
                }
            } else {
                println!("Created task {}: {}", task.id, task.name);
            }
            Ok(())
        }
        TaskCommands::List { search } => {
            let tasks = TaskRepo::list(&s.conn, &s.ctx, search.as_deref())
                .context("Failed to list tasks")?;
            if s.json {
                print_json(&tasks)
            } else {
                print!("{}", format_task_table(&tasks, s.width()));
                Ok(())
            }
        }
        TaskCommands::Show { id } => {
            s.task(id, Action::View)?;
            let view = TaskRepo::view(&s.conn, id)?
                .ok_or_else(|| DomainError::not_found("Task", id))?;
            if s.json {
                print_json(&view)
            } else {
                let labels = LabelRepo::resolve_for_task(&s.conn, id)?;
                print!("{}", format_task_summary(&view, &labels));
                Ok(())
            }
        }
        TaskCommands::Update { id, name, assignee, subset, labels } => {
            s.task(id, Action::Update)?;
            let update = TaskUpdate {
                name,
                assignee_id: assignee,
                subset,
                labels: parse_label_args(&labels)?,
            };
            let task = TaskRepo::update(&s.conn, id, &update)?;
            if s.json {
                print_json(&task)
            } else {
                println!("Updated task {}: {}", task.id, task.name);
                Ok(())
            }
        }
        TaskCommands::Delete { id } => {
            s.task(id, Action::Delete)?;
            let records = DataRepo::list_by_task(&s.conn, id)?;
            let task = TaskRepo::delete(&s.conn, id)?;
            DataRepo::remove_files(&s.store, &records)?;
            if s.json {
                print_json(&task)
            } else {
                println!("Deleted task {}: {}", task.id, task.name);
                Ok(())
            }
        }
        TaskCommands::Labels { id } => {
            s.task(id, Action::View)?;
            let labels = LabelRepo::resolve_for_task(&s.conn, id)?;
            if s.json {
                print_json(&labels)
            } else {
                print!("{}", format_label_list(&labels));
                Ok(())
            }
        }
    }
}

fn handle_labels(s: &Session, cmd: LabelCommands) -> Result<()> {
    match cmd {
        LabelCommands::Show { id } => {
            let label = s.label(id, Action::View)?;
            if s.json {
                print_json(&label)
            } else {
                print!("{}", format_label_list(std::slice::from_ref(&label)));
                Ok(())
            }
        }
        LabelCommands::Update { id, payload } => {
            s.label(id, Action::Update)?;
            let payload: LabelPayload = parse_payload(&payload, "label")?;
            let label = LabelRepo::update(&s.conn, id, &payload)?;
            if s.json {
                print_json(&label)
            } else {
                println!("Updated label {}: {} ({} attribute(s))", label.id, label.name, label.attributes.len());
                Ok(())
            }
        }
        LabelCommands::Delete { id } => {
            s.label(id, Action::Update)?;
            let label = LabelRepo::delete(&s.conn, id)?;
            if s.json {
                print_json(&label)
            } else {
                println!("Deleted label {}: {}", label.id, label.name);
                Ok(())
            }
        }
    }
}

fn handle_jobs(s: &Session, cmd: JobCommands) -> Result<()> {
    match cmd {
        JobCommands::Add { task_id, job_type, assignee } => {
            let task = s.task(task_id, Action::Update)?;
            let job = JobRepo::create(&s.conn, &s.ctx, &NewJob {
                task_id,
                job_type,
                assignee_id: assignee,
            })?;
            if s.json {
                print_json(&JobView::new(&job, task.organization_id))
            } else {
                println!("Created {} job {} for task {}", job.job_type.as_str(), job.id, task.id);
                Ok(())
            }
        }
        JobCommands::List { search, task } => {
            let jobs = match task {
                Some(task_id) => {
                    s.task(task_id, Action::View)?;
                    JobRepo::list_by_task(&s.conn, task_id)?
                }
                None => JobRepo::list_for_user(&s.conn, &s.ctx, search.as_deref())
                    .context("Failed to list jobs")?,
            };
            if s.json {
                let views = jobs
                    .iter()
                    .map(|job| Ok(JobView::new(job, JobRepo::organization_id(&s.conn, job)?)))
                    .collect::<Result<Vec<_>>>()?;
                print_json(&views)
            } else {
                print!("{}", format_job_table(&jobs));
                Ok(())
            }
        }
        JobCommands::Show { id } => {
            let (job, task) = s.job(id, Action::View)?;
            let view = JobView::new(&job, task.organization_id);
            if s.json {
                print_json(&view)
            } else {
                print!("{}", format_job_summary(&view));
                Ok(())
            }
        }
        JobCommands::Update { id, stage, state, assignee, guide } => {
            let (_, task) = s.job(id, Action::Update)?;
            let job = JobRepo::update(&s.conn, id, &JobUpdate {
                stage,
                state,
                assignee_id: assignee,
                guide_id: guide,
            })?;
            if s.json {
                print_json(&JobView::new(&job, task.organization_id))
            } else {
                println!(
                    "Job {}: stage {}, state {}, status {}",
                    job.id,
                    job.stage.as_str(),
                    job.state.as_str(),
                    job.status().as_str()
                );
                Ok(())
            }
        }
        JobCommands::Delete { id } => {
            let (_, task) = s.job(id, Action::Delete)?;
            let job = JobRepo::delete(&s.conn, id)?;
            if s.json {
                print_json(&JobView::new(&job, task.organization_id))
            } else {
                println!("Deleted job {}", job.id);
                Ok(())
            }
        }
    }
}

fn handle_annotations(s: &Session, cmd: AnnotationCommands) -> Result<()> {
    match cmd {
        AnnotationCommands::Add { job_id, payload } => {
            s.job(job_id, Action::Update)?;
            let payload: AnnotationPayload = parse_payload(&payload, "annotation")?;
            let annotation = AnnotationRepo::create(&s.conn, job_id, &payload)?;
            if s.json {
                print_json(&annotation)
            } else {
                println!("Created annotation {} on job {}", annotation.id, job_id);
                Ok(())
            }
        }
        AnnotationCommands::List { job_id } => {
            s.job(job_id, Action::View)?;
            let annotations = AnnotationRepo::list_by_job(&s.conn, job_id)?;
            if s.json {
                print_json(&annotations)
            } else {
                print!("{}", format_annotation_table(&annotations, s.width()));
                Ok(())
            }
        }
        AnnotationCommands::Show { id } => {
            let annotation = s.annotation(id, Action::View)?;
            if s.json {
                print_json(&annotation)
            } else {
                print!("{}", format_annotation_summary(&annotation));
                Ok(())
            }
        }
        AnnotationCommands::Update { id, payload } => {
            s.annotation(id, Action::Update)?;
            let payload: AnnotationPayload = parse_payload(&payload, "annotation")?;
            let annotation = AnnotationRepo::update(&s.conn, id, &payload)?;
            if s.json {
                print_json(&annotation)
            } else {
                println!("Updated annotation {} ({} label(s))", annotation.id, annotation.labels.len());
                Ok(())
            }
        }
        AnnotationCommands::Delete { id } => {
            s.annotation(id, Action::Update)?;
            let annotation = AnnotationRepo::delete(&s.conn, id)?;
            if s.json {
                print_json(&annotation)
            } else {
                println!("Annotation with {} deleted successfully", annotation.id);
                Ok(())
            }
        }
    }
}

fn handle_data(s: &Session, cmd: DataCommands) -> Result<()> {
    match cmd {
        DataCommands::Add { task_id, file } => {
            s.task(task_id, Action::Update)?;
            let data = DataRepo::add(&s.conn, &s.store, task_id, &file)?;
            if s.json {
                print_json(&data)
            } else {
                print!("{}", format_data_summary(&data));
                Ok(())
            }
        }
        DataCommands::Show { task_id } => {
            s.task(task_id, Action::View)?;
            let data = DataRepo::get_first(&s.conn, task_id)?;
            match (data, s.json) {
                (Some(data), true) => print_json(&data),
                (None, true) => print_json(&serde_json::Value::Null),
                (Some(data), false) => {
                    print!("{}", format_data_summary(&data));
                    Ok(())
                }
                (None, false) => {
                    println!("No data attached to task {}.", task_id);
                    Ok(())
                }
            }
        }
        DataCommands::Delete { task_id } => {
            s.task(task_id, Action::Update)?;
            let data = DataRepo::delete_all(&s.conn, &s.store, task_id)?;
            if s.json {
                print_json(&data)
            } else {
                println!("Removed data from task {}", task_id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["audino", "jobs", "list", "--user", "3", "--org", "2", "--json"]).unwrap();
        assert_eq!(cli.user, Some(3));
        assert_eq!(cli.org, Some(2));
        assert!(cli.json);
    }

    #[test]
    fn test_job_update_parses_state_with_space() {
        let cli = Cli::try_parse_from(["audino", "jobs", "update", "4", "--state", "in progress"]).unwrap();
        match cli.command {
            Commands::Jobs { subcommand: JobCommands::Update { state, .. } } => {
                assert_eq!(state, Some(JobState::InProgress));
            }
            _ => panic!("expected jobs update"),
        }
    }

    #[test]
    fn test_label_args() {
        let labels = parse_label_args(&[
            "speaker".to_string(),
            r#"{"name": "noise", "attributes": [{"name": "level", "values": ["low", "high"]}]}"#.to_string(),
        ])
        .unwrap();
        assert_eq!(labels[0], LabelPayload::named("speaker"));
        assert_eq!(labels[1].attributes.as_ref().unwrap()[0].values, Some(vec!["low".to_string(), "high".to_string()]));
    }

    #[test]
    fn test_request_context_precedence() {
        let config = Config {
            user_id: Some(1),
            organization_id: Some(7),
            ..Config::default()
        };
        let cli = Cli::try_parse_from(["audino", "--user", "5", "projects", "list"]).unwrap();
        let ctx = request_context(&cli, &config).unwrap();
        assert_eq!(ctx.user_id, 5);
        assert_eq!(ctx.organization_id, Some(7));
        assert!(!ctx.is_admin);

        let cli = Cli::try_parse_from(["audino", "--personal", "projects", "list"]).unwrap();
        let ctx = request_context(&cli, &config).unwrap();
        assert_eq!(ctx.user_id, 1);
        assert_eq!(ctx.organization_id, None);
    }

    #[test]
    fn test_missing_user_is_user_error() {
        let cli = Cli::try_parse_from(["audino", "projects", "list"]).unwrap();
        let err = request_context(&cli, &Config::default()).unwrap_err();
        assert_eq!(DomainError::classify(&err).unwrap().field(), Some("user"));
    }
}
