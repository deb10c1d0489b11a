use rusqlite::{Connection, OptionalExtension, Row};
use crate::error::DomainError;
use crate::models::{
    decode_values, encode_values, Annotation, AnnotationAttribute, AnnotationData,
    AnnotationLabelPayload, AnnotationPayload,
};
use crate::repo::{JobRepo, LabelRepo};
use anyhow::{Context, Result};
use std::collections::HashSet;

const ANNOTATION_COLUMNS: &str =
    "id, job_id, start_mark, end_mark, color, name, transcription, created_ts, updated_ts";

/// Annotation repository
///
/// Labels are stored on an annotation as snapshots: the label and attribute
/// names are copied when the annotation is written. An update throws away
/// every snapshot and writes the payload's list afresh.
pub struct AnnotationRepo;

impl AnnotationRepo {
    /// Create an annotation on a job
    pub fn create(conn: &Connection, job_id: i64, payload: &AnnotationPayload) -> Result<Annotation> {
        let tx = conn.unchecked_transaction()?;
        if JobRepo::get_by_id(&tx, job_id)?.is_none() {
            return Err(DomainError::not_found("Job", job_id).into());
        }

        let now = chrono::Utc::now().timestamp();
        tx.execute(
            "INSERT INTO annotations (job_id, start_mark, end_mark, color, name, transcription,
                    created_ts, updated_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                job_id,
                payload.start,
                payload.end,
                payload.color,
                payload.name,
                payload.transcription,
                now,
                now
            ],
        )
        .with_context(|| format!("Failed to create annotation for job {}", job_id))?;
        let id = tx.last_insert_rowid();

        write_snapshots(&tx, id, job_id, &payload.labels)?;
        let annotation = Self::get_by_id(&tx, id)?
            .ok_or_else(|| anyhow::anyhow!("Annotation {} vanished after insert", id))?;

        tx.commit()?;
        log::info!("Created annotation {} on job {} with {} label(s)", id, job_id, annotation.labels.len());
        Ok(annotation)
    }

    /// Get annotation by ID, with its label snapshots
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Annotation>> {
        let sql = format!("SELECT {} FROM annotations WHERE id = ?1", ANNOTATION_COLUMNS);
        let annotation = conn.query_row(&sql, [id], annotation_from_row).optional()?;
        match annotation {
            Some(mut annotation) => {
                annotation.labels = load_snapshots(conn, annotation.id)?;
                Ok(Some(annotation))
            }
            None => Ok(None),
        }
    }

    /// Annotations of a job ordered by id
    pub fn list_by_job(conn: &Connection, job_id: i64) -> Result<Vec<Annotation>> {
        let sql = format!(
            "SELECT {} FROM annotations WHERE job_id = ?1 ORDER BY id",
            ANNOTATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([job_id], annotation_from_row)?;

        let mut annotations = Vec::new();
        for row in rows {
            let mut annotation = row?;
            annotation.labels = load_snapshots(conn, annotation.id)?;
            annotations.push(annotation);
        }
        Ok(annotations)
    }

    /// Replace an annotation's fields and label snapshots
    pub fn update(conn: &Connection, id: i64, payload: &AnnotationPayload) -> Result<Annotation> {
        let tx = conn.unchecked_transaction()?;
        let existing = Self::get_by_id(&tx, id)?
            .ok_or_else(|| DomainError::not_found("Annotation", id))?;

        // Snapshot attributes go with their data rows
        let removed = tx.execute("DELETE FROM annotation_data WHERE annotation_id = ?1", [id])?;

        tx.execute(
            "UPDATE annotations SET start_mark = ?1, end_mark = ?2, color = ?3, name = ?4,
                    transcription = ?5, updated_ts = ?6
             WHERE id = ?7",
            rusqlite::params![
                payload.start,
                payload.end,
                payload.color,
                payload.name,
                payload.transcription,
                chrono::Utc::now().timestamp(),
                id
            ],
        )
        .with_context(|| format!("Failed to update annotation {}", id))?;

        write_snapshots(&tx, id, existing.job_id, &payload.labels)?;
        let annotation = Self::get_by_id(&tx, id)?
            .ok_or_else(|| DomainError::not_found("Annotation", id))?;

        tx.commit()?;
        log::info!(
            "Replaced annotation {}: {} label snapshot(s) removed, {} written",
            id,
            removed,
            annotation.labels.len()
        );
        Ok(annotation)
    }

    /// Delete an annotation and its snapshots
    pub fn delete(conn: &Connection, id: i64) -> Result<Annotation> {
        let tx = conn.unchecked_transaction()?;
        let annotation = Self::get_by_id(&tx, id)?
            .ok_or_else(|| DomainError::not_found("Annotation", id))?;
        tx.execute("DELETE FROM annotations WHERE id = ?1", [id])
            .with_context(|| format!("Failed to delete annotation {}", id))?;
        tx.commit()?;
        log::info!("Deleted annotation {} from job {}", id, annotation.job_id);
        Ok(annotation)
    }
}

/// Validate label payloads against the job's label set and write snapshots
fn write_snapshots(
    conn: &Connection,
    annotation_id: i64,
    job_id: i64,
    labels: &[AnnotationLabelPayload],
) -> Result<()> {
    if labels.is_empty() {
        return Ok(());
    }
    let allowed: HashSet<i64> = LabelRepo::resolve_for_job(conn, job_id)?
        .iter()
        .map(|label| label.id)
        .collect();

    for payload in labels {
        let label = LabelRepo::get_by_id(conn, payload.label_id)?
            .ok_or_else(|| DomainError::not_found("Label", payload.label_id))?;
        if !allowed.contains(&label.id) {
            return Err(DomainError::validation(
                "labels",
                format!("Label {} is not in the label set of job {}", label.id, job_id),
            )
            .into());
        }

        conn.execute(
            "INSERT INTO annotation_data (annotation_id, label_id, name) VALUES (?1, ?2, ?3)",
            rusqlite::params![annotation_id, label.id, label.name],
        )?;
        let data_id = conn.last_insert_rowid();

        for chosen in &payload.attributes {
            let attribute = label.attribute(chosen.attribute_id).ok_or_else(|| {
                DomainError::validation(
                    "attributes",
                    format!("Attribute {} does not belong to label {}", chosen.attribute_id, label.id),
                )
            })?;
            conn.execute(
                "INSERT INTO annotation_attributes (annotation_data_id, attribute_id, name, chosen_values)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![data_id, attribute.id, attribute.name, encode_values(&chosen.values)],
            )?;
        }
    }
    Ok(())
}

fn load_snapshots(conn: &Connection, annotation_id: i64) -> Result<Vec<AnnotationData>> {
    let mut stmt = conn.prepare(
        "SELECT id, label_id, name FROM annotation_data WHERE annotation_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([annotation_id], |row| {
        Ok(AnnotationData {
            id: row.get(0)?,
            label_id: row.get(1)?,
            name: row.get(2)?,
            attributes: Vec::new(),
        })
    })?;

    let mut attr_stmt = conn.prepare(
        "SELECT id, attribute_id, name, chosen_values FROM annotation_attributes
         WHERE annotation_data_id = ?1 ORDER BY id",
    )?;
    let mut snapshots = Vec::new();
    for row in rows {
        let mut data = row?;
        let attributes = attr_stmt.query_map([data.id], |row| {
            Ok(AnnotationAttribute {
                id: row.get(0)?,
                attribute_id: row.get(1)?,
                name: row.get(2)?,
                values: decode_values(&row.get::<_, String>(3)?),
            })
        })?;
        for attribute in attributes {
            data.attributes.push(attribute?);
        }
        snapshots.push(data);
    }
    Ok(snapshots)
}

fn annotation_from_row(row: &Row) -> rusqlite::Result<Annotation> {
    Ok(Annotation {
        id: row.get(0)?,
        job_id: row.get(1)?,
        start: row.get(2)?,
        end: row.get(3)?,
        color: row.get(4)?,
        name: row.get(5)?,
        transcription: row.get(6)?,
        labels: Vec::new(),
        created_ts: row.get(7)?,
        updated_ts: row.get(8)?,
    })
}
