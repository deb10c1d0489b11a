// Human-readable output for the command line

use anyhow::Result;
use chrono::{Local, TimeZone};
use serde::Serialize;
use crate::models::{Annotation, Job, JobView, Label, Project, ProjectView, TaskData, TaskView};

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate, with fallback to the COLUMNS environment
/// variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

/// Pretty-print any view as JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format timestamp for display
pub fn format_timestamp(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

fn fmt_id(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Cut `text` to `width` characters, marking the cut with `…`
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Width left for the free-text column once fixed columns are laid out
fn name_width(fixed: usize, terminal_width: usize) -> usize {
    terminal_width.saturating_sub(fixed).clamp(12, 60)
}

pub fn format_project_table(projects: &[Project], terminal_width: usize) -> String {
    if projects.is_empty() {
        return "No projects found.\n".to_string();
    }
    let width = name_width(6 + 9 + 9 + 6 + 20, terminal_width);
    let mut out = format!(
        "{:<6} {:<width$} {:<8} {:<8} {:<19}\n",
        "ID", "Name", "Owner", "Assignee", "Updated",
        width = width
    );
    out.push_str(&"-".repeat(6 + width + 9 + 9 + 20 + 1));
    out.push('\n');
    for project in projects {
        out.push_str(&format!(
            "{:<6} {:<width$} {:<8} {:<8} {:<19}\n",
            project.id,
            truncate(&project.name, width),
            fmt_id(project.owner_id),
            fmt_id(project.assignee_id),
            format_timestamp(project.updated_ts),
            width = width
        ));
    }
    out
}

pub fn format_project_summary(view: &ProjectView) -> String {
    let project = &view.project;
    let header = format!("Project {}: {}", project.id, project.name);
    let mut out = format!("{}\n{}\n\n", header, "=".repeat(header.chars().count().max(40)));
    out.push_str(&format!("Owner:        {}\n", fmt_id(project.owner_id)));
    out.push_str(&format!("Assignee:     {}\n", fmt_id(project.assignee_id)));
    out.push_str(&format!("Organization: {}\n", fmt_id(project.organization_id)));
    if let Some(storage) = &view.source_storage {
        out.push_str(&format!("Source:       {} ({})\n", storage.location.as_str(), storage.cloud_storage_id));
    }
    if let Some(storage) = &view.target_storage {
        out.push_str(&format!("Target:       {} ({})\n", storage.location.as_str(), storage.cloud_storage_id));
    }
    out.push_str(&format!("Created:      {}\n", format_timestamp(project.created_ts)));
    out.push_str(&format!("Updated:      {}\n\n", format_timestamp(project.updated_ts)));
    out.push_str(&format_label_list(&view.labels));
    out
}

pub fn format_task_table(tasks: &[TaskView], terminal_width: usize) -> String {
    if tasks.is_empty() {
        return "No tasks found.\n".to_string();
    }
    let width = name_width(6 + 8 + 11 + 9 + 15, terminal_width);
    let mut out = format!(
        "{:<6} {:<width$} {:<7} {:<10} {:<8} {:<14}\n",
        "ID", "Name", "Project", "Subset", "Assignee", "Jobs (done/val)",
        width = width
    );
    out.push_str(&"-".repeat(6 + width + 8 + 11 + 9 + 15 + 1));
    out.push('\n');
    for view in tasks {
        let task = &view.task;
        out.push_str(&format!(
            "{:<6} {:<width$} {:<7} {:<10} {:<8} {}\n",
            task.id,
            truncate(&task.name, width),
            fmt_id(task.project_id),
            task.subset.as_str(),
            fmt_id(task.assignee_id),
            format!("{} ({}/{})", view.jobs.count, view.jobs.completed, view.jobs.validation),
            width = width
        ));
    }
    out
}

pub fn format_task_summary(view: &TaskView, labels: &[Label]) -> String {
    let task = &view.task;
    let header = format!("Task {}: {}", task.id, task.name);
    let mut out = format!("{}\n{}\n\n", header, "=".repeat(header.chars().count().max(40)));
    out.push_str(&format!("Project:      {}\n", fmt_id(task.project_id)));
    out.push_str(&format!("Subset:       {}\n", task.subset.as_str()));
    out.push_str(&format!("Owner:        {}\n", fmt_id(task.owner_id)));
    out.push_str(&format!("Assignee:     {}\n", fmt_id(task.assignee_id)));
    out.push_str(&format!("Organization: {}\n", fmt_id(task.organization_id)));
    if let Some(storage) = &view.source_storage {
        out.push_str(&format!("Source:       {} ({})\n", storage.location.as_str(), storage.cloud_storage_id));
    }
    if let Some(storage) = &view.target_storage {
        out.push_str(&format!("Target:       {} ({})\n", storage.location.as_str(), storage.cloud_storage_id));
    }
    out.push_str(&format!(
        "Jobs:         {} total, {} completed, {} in validation\n",
        view.jobs.count, view.jobs.completed, view.jobs.validation
    ));
    out.push_str(&format!("Created:      {}\n", format_timestamp(task.created_ts)));
    out.push_str(&format!("Updated:      {}\n\n", format_timestamp(task.updated_ts)));
    out.push_str(&format_label_list(labels));
    out
}

/// Labels with their attributes as an indented list
pub fn format_label_list(labels: &[Label]) -> String {
    if labels.is_empty() {
        return "Labels: (none)\n".to_string();
    }
    let mut out = String::from("Labels:\n");
    for label in labels {
        out.push_str(&format!("  [{}] {}\n", label.id, label.name));
        for attribute in &label.attributes {
            let default = attribute
                .default_value
                .as_deref()
                .map(|d| format!(" default={}", d))
                .unwrap_or_default();
            out.push_str(&format!(
                "      [{}] {} ({}{}): {}{}\n",
                attribute.id,
                attribute.name,
                attribute.input_type.as_str(),
                if attribute.mutable { ", mutable" } else { "" },
                attribute.values.join(", "),
                default
            ));
        }
    }
    out
}

pub fn format_job_table(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return "No jobs found.\n".to_string();
    }
    let mut out = format!(
        "{:<6} {:<6} {:<12} {:<12} {:<12} {:<13} {:<8} {:<8}\n",
        "ID", "Task", "Stage", "State", "Status", "Type", "Assignee", "Guide"
    );
    out.push_str(&"-".repeat(84));
    out.push('\n');
    for job in jobs {
        out.push_str(&format!(
            "{:<6} {:<6} {:<12} {:<12} {:<12} {:<13} {:<8} {:<8}\n",
            job.id,
            job.task_id,
            job.stage.as_str(),
            job.state.as_str(),
            job.status().as_str(),
            job.job_type.as_str(),
            fmt_id(job.assignee_id),
            fmt_id(job.guide_id)
        ));
    }
    out
}

pub fn format_job_summary(job: &JobView) -> String {
    let header = format!("Job {} (task {})", job.id, job.task_id);
    let mut out = format!("{}\n{}\n\n", header, "=".repeat(header.chars().count().max(40)));
    out.push_str(&format!("Stage:        {}\n", job.stage.as_str()));
    out.push_str(&format!("State:        {}\n", job.state.as_str()));
    out.push_str(&format!("Status:       {}\n", job.status.as_str()));
    out.push_str(&format!("Type:         {}\n", job.job_type.as_str()));
    out.push_str(&format!("Assignee:     {}\n", fmt_id(job.assignee_id)));
    out.push_str(&format!("Guide:        {}\n", fmt_id(job.guide_id)));
    out.push_str(&format!("Organization: {}\n", fmt_id(job.organization_id)));
    out.push_str(&format!("Created:      {}\n", format_timestamp(job.created_ts)));
    out.push_str(&format!("Updated:      {}\n", format_timestamp(job.updated_ts)));
    out
}

pub fn format_annotation_table(annotations: &[Annotation], terminal_width: usize) -> String {
    if annotations.is_empty() {
        return "No annotations found.\n".to_string();
    }
    let width = name_width(6 + 10 + 10 + 30, terminal_width);
    let mut out = format!(
        "{:<6} {:<9} {:<9} {:<width$} {}\n",
        "ID", "Start", "End", "Name", "Labels",
        width = width
    );
    out.push_str(&"-".repeat(6 + 10 + 10 + width + 30));
    out.push('\n');
    for annotation in annotations {
        let labels: Vec<&str> = annotation.labels.iter().map(|l| l.name.as_str()).collect();
        out.push_str(&format!(
            "{:<6} {:<9} {:<9} {:<width$} {}\n",
            annotation.id,
            annotation.start.as_deref().unwrap_or("-"),
            annotation.end.as_deref().unwrap_or("-"),
            truncate(annotation.name.as_deref().unwrap_or(""), width),
            labels.join(", "),
            width = width
        ));
    }
    out
}

pub fn format_annotation_summary(annotation: &Annotation) -> String {
    let header = format!("Annotation {} (job {})", annotation.id, annotation.job_id);
    let mut out = format!("{}\n{}\n\n", header, "=".repeat(header.chars().count().max(40)));
    out.push_str(&format!(
        "Segment:       {} .. {}\n",
        annotation.start.as_deref().unwrap_or("-"),
        annotation.end.as_deref().unwrap_or("-")
    ));
    if let Some(name) = &annotation.name {
        out.push_str(&format!("Name:          {}\n", name));
    }
    if let Some(color) = &annotation.color {
        out.push_str(&format!("Color:         {}\n", color));
    }
    if let Some(transcription) = &annotation.transcription {
        out.push_str(&format!("Transcription: {}\n", transcription));
    }
    out.push_str("Labels:\n");
    if annotation.labels.is_empty() {
        out.push_str("  (none)\n");
    }
    for data in &annotation.labels {
        let source = match data.label_id {
            Some(id) => format!("label {}", id),
            None => "label deleted".to_string(),
        };
        out.push_str(&format!("  {} ({})\n", data.name, source));
        for attribute in &data.attributes {
            out.push_str(&format!("      {}: {}\n", attribute.name, attribute.values.join(", ")));
        }
    }
    out
}

pub fn format_data_summary(data: &TaskData) -> String {
    format!(
        "Data {} of task {}: {} ({} KiB)\n  {}\n",
        data.id, data.task_id, data.filename, data.size_kib, data.path
    )
}
