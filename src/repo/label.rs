use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};
use crate::error::{validate_max_len, validate_non_empty, DomainError};
use crate::models::{
    decode_values, encode_values, Attribute, AttributePayload, InputType, Label, LabelOwner,
    LabelPayload, LabelType,
};
use crate::repo::{JobRepo, ProjectRepo, TaskRepo};
use crate::repo::taxonomy::{self, LabelTaxonomyChanged};
use anyhow::{Context, Result};

const LABEL_NAME_MAX: usize = 65;

const LABEL_COLUMNS: &str = "id, project_id, task_id, name, label_type, created_ts, updated_ts";

/// Label repository
///
/// Labels and their attributes form the taxonomy annotators pick from.
/// Every public mutation runs in its own transaction; the `pub(crate)`
/// helpers expect the caller to hold one.
///
/// # Example
///
/// ```no_run
/// use audino::db::DbConnection;
/// use audino::models::{AttributePayload, LabelOwner, LabelPayload};
/// use audino::repo::LabelRepo;
///
/// let conn = DbConnection::connect().unwrap();
/// let payload = LabelPayload::named("speaker")
///     .with_attributes(vec![AttributePayload::named("gender", &["male", "female"])]);
/// let label = LabelRepo::create(&conn, LabelOwner::Project(1), &payload).unwrap();
/// ```
pub struct LabelRepo;

impl LabelRepo {
    /// Create a label with its attributes
    pub fn create(conn: &Connection, owner: LabelOwner, payload: &LabelPayload) -> Result<Label> {
        let tx = conn.unchecked_transaction()?;
        let label = Self::insert(&tx, owner, payload)?;
        taxonomy::propagate(&tx, &LabelTaxonomyChanged { owner })?;
        tx.commit()?;
        Ok(label)
    }

    /// Update a label and upsert its attributes
    pub fn update(conn: &Connection, label_id: i64, payload: &LabelPayload) -> Result<Label> {
        let tx = conn.unchecked_transaction()?;
        let label = Self::get_by_id(&tx, label_id)?
            .ok_or_else(|| DomainError::not_found("Label", label_id))?;
        let updated = Self::apply_update(&tx, &label, payload)?;
        taxonomy::propagate(&tx, &LabelTaxonomyChanged { owner: label.owner })?;
        tx.commit()?;
        Ok(updated)
    }

    /// Delete a label and signal the taxonomy change to its owner's jobs
    pub fn delete(conn: &Connection, label_id: i64) -> Result<Label> {
        let tx = conn.unchecked_transaction()?;
        let label = Self::get_by_id(&tx, label_id)?
            .ok_or_else(|| DomainError::not_found("Label", label_id))?;

        tx.execute("DELETE FROM labels WHERE id = ?1", [label_id])
            .with_context(|| format!("Failed to delete label {}", label_id))?;
        taxonomy::propagate(&tx, &LabelTaxonomyChanged { owner: label.owner })?;

        tx.commit()?;
        log::info!("Deleted label {} ('{}') from {} {}", label.id, label.name, label.owner.entity(), label.owner.id());
        Ok(label)
    }

    /// Get label by ID, with attributes
    pub fn get_by_id(conn: &Connection, label_id: i64) -> Result<Option<Label>> {
        let sql = format!("SELECT {} FROM labels WHERE id = ?1", LABEL_COLUMNS);
        let label = conn.query_row(&sql, [label_id], label_from_row).optional()?;
        match label {
            Some(mut label) => {
                label.attributes = Self::get_attributes(conn, label.id)?;
                Ok(Some(label))
            }
            None => Ok(None),
        }
    }

    /// Labels bound directly to an owner, newest first
    pub fn list_by_owner(conn: &Connection, owner: LabelOwner) -> Result<Vec<Label>> {
        let column = match owner {
            LabelOwner::Project(_) => "project_id",
            LabelOwner::Task(_) => "task_id",
        };
        let sql = format!(
            "SELECT {} FROM labels WHERE {} = ?1 ORDER BY created_ts DESC, id DESC",
            LABEL_COLUMNS, column
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([owner.id()], label_from_row)?;

        let mut labels = Vec::new();
        for row in rows {
            let mut label = row?;
            label.attributes = Self::get_attributes(conn, label.id)?;
            labels.push(label);
        }
        Ok(labels)
    }

    /// The label set of a project
    pub fn resolve_for_project(conn: &Connection, project_id: i64) -> Result<Vec<Label>> {
        if ProjectRepo::get_by_id(conn, project_id)?.is_none() {
            return Err(DomainError::not_found("Project", project_id).into());
        }
        Self::list_by_owner(conn, LabelOwner::Project(project_id))
    }

    /// The label set of a task: its project's labels if it has a project,
    /// otherwise the labels bound to the task itself
    pub fn resolve_for_task(conn: &Connection, task_id: i64) -> Result<Vec<Label>> {
        let task = TaskRepo::get_by_id(conn, task_id)?
            .ok_or_else(|| DomainError::not_found("Task", task_id))?;
        match task.project_id {
            Some(project_id) => Self::list_by_owner(conn, LabelOwner::Project(project_id)),
            None => Self::list_by_owner(conn, LabelOwner::Task(task.id)),
        }
    }

    /// The label set a job's annotators work with
    pub fn resolve_for_job(conn: &Connection, job_id: i64) -> Result<Vec<Label>> {
        let job = JobRepo::get_by_id(conn, job_id)?
            .ok_or_else(|| DomainError::not_found("Job", job_id))?;
        Self::resolve_for_task(conn, job.task_id)
    }

    /// Organization of the label's owner
    pub fn organization_id(conn: &Connection, label: &Label) -> Result<Option<i64>> {
        let organization_id = match label.owner {
            LabelOwner::Project(id) => ProjectRepo::get_by_id(conn, id)?.and_then(|p| p.organization_id),
            LabelOwner::Task(id) => TaskRepo::get_by_id(conn, id)?.and_then(|t| t.organization_id),
        };
        Ok(organization_id)
    }

    /// Get attributes of a label ordered by id
    pub fn get_attributes(conn: &Connection, label_id: i64) -> Result<Vec<Attribute>> {
        let mut stmt = conn.prepare(
            "SELECT id, label_id, name, mutable, input_type, default_value, allowed_values
             FROM attributes WHERE label_id = ?1 ORDER BY id"
        )?;
        let rows = stmt.query_map([label_id], |row| {
            Ok(Attribute {
                id: row.get(0)?,
                label_id: row.get(1)?,
                name: row.get(2)?,
                mutable: row.get::<_, i64>(3)? != 0,
                input_type: InputType::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
                default_value: row.get(5)?,
                values: decode_values(&row.get::<_, String>(6)?),
            })
        })?;

        let mut attributes = Vec::new();
        for row in rows {
            attributes.push(row?);
        }
        Ok(attributes)
    }

    /// Insert a label and its attributes (caller holds the transaction)
    pub(crate) fn insert(conn: &Connection, owner: LabelOwner, payload: &LabelPayload) -> Result<Label> {
        let name = payload.name.as_deref().unwrap_or("");
        validate_label_name(name)?;
        let label_type = payload.label_type.unwrap_or_default();
        let now = chrono::Utc::now().timestamp();

        conn.execute(
            "INSERT INTO labels (project_id, task_id, name, label_type, created_ts, updated_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                owner.project_id(),
                owner.task_id(),
                name.trim(),
                label_type.as_str(),
                now,
                now
            ],
        )
        .with_context(|| format!("Failed to create label: {}", name))?;
        let label_id = conn.last_insert_rowid();

        if let Some(attributes) = &payload.attributes {
            Self::upsert_attributes(conn, label_id, attributes)?;
        }
        log::debug!("Created label {} ('{}') on {} {}", label_id, name.trim(), owner.entity(), owner.id());

        Self::get_by_id(conn, label_id)?
            .ok_or_else(|| anyhow::anyhow!("Label {} vanished after insert", label_id))
    }

    /// Apply a payload to an existing label (caller holds the transaction)
    ///
    /// Fields missing from the payload keep their values. The attribute list
    /// is only touched when the payload carries one.
    pub(crate) fn apply_update(conn: &Connection, label: &Label, payload: &LabelPayload) -> Result<Label> {
        let name = match payload.name.as_deref() {
            Some(name) => {
                validate_label_name(name)?;
                name.trim().to_string()
            }
            None => label.name.clone(),
        };
        let label_type = payload.label_type.unwrap_or(label.label_type);
        let now = chrono::Utc::now().timestamp();

        conn.execute(
            "UPDATE labels SET name = ?1, label_type = ?2, updated_ts = ?3 WHERE id = ?4",
            rusqlite::params![name, label_type.as_str(), now, label.id],
        )
        .with_context(|| format!("Failed to update label {}", label.id))?;

        if let Some(attributes) = &payload.attributes {
            Self::upsert_attributes(conn, label.id, attributes)?;
        }
        log::debug!("Updated label {}", label.id);

        Self::get_by_id(conn, label.id)?
            .ok_or_else(|| DomainError::not_found("Label", label.id).into())
    }

    /// Merge label payloads into an owner's label set (caller holds the transaction)
    ///
    /// Payloads with an id update that label, which must already belong to
    /// `owner`. Payloads without one add a label. Labels not mentioned stay.
    pub(crate) fn merge_into_owner(conn: &Connection, owner: LabelOwner, payloads: &[LabelPayload]) -> Result<()> {
        if payloads.is_empty() {
            return Ok(());
        }
        for payload in payloads {
            match payload.id {
                Some(label_id) => {
                    let label = Self::get_by_id(conn, label_id)?
                        .ok_or_else(|| DomainError::not_found("Label", label_id))?;
                    if label.owner != owner {
                        return Err(DomainError::validation(
                            "labels",
                            format!(
                                "Label {} does not belong to {} {}",
                                label_id,
                                owner.entity().to_lowercase(),
                                owner.id()
                            ),
                        )
                        .into());
                    }
                    Self::apply_update(conn, &label, payload)?;
                }
                None => {
                    Self::insert(conn, owner, payload)?;
                }
            }
        }
        taxonomy::propagate(conn, &LabelTaxonomyChanged { owner })?;
        Ok(())
    }

    /// Make the label's attributes match `payloads`
    ///
    /// Payloads whose id names an attribute of this label update it in place,
    /// all others create a new attribute. Existing attributes not named by
    /// any payload are deleted.
    pub(crate) fn upsert_attributes(conn: &Connection, label_id: i64, payloads: &[AttributePayload]) -> Result<()> {
        let existing: HashMap<i64, Attribute> = Self::get_attributes(conn, label_id)?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        let mut kept = HashSet::new();

        for payload in payloads {
            match payload.id.and_then(|id| existing.get(&id)) {
                Some(attribute) => {
                    update_attribute(conn, attribute, payload)?;
                    kept.insert(attribute.id);
                }
                None => {
                    let id = insert_attribute(conn, label_id, payload)?;
                    kept.insert(id);
                }
            }
        }

        for id in existing.keys().filter(|id| !kept.contains(id)) {
            conn.execute("DELETE FROM attributes WHERE id = ?1", [id])?;
            log::debug!("Removed attribute {} from label {}", id, label_id);
        }
        Ok(())
    }
}

fn label_from_row(row: &Row) -> rusqlite::Result<Label> {
    let project_id: Option<i64> = row.get(1)?;
    let task_id: Option<i64> = row.get(2)?;
    let owner = LabelOwner::from_columns(project_id, task_id).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(1, "project_id".to_string(), rusqlite::types::Type::Null)
    })?;
    Ok(Label {
        id: row.get(0)?,
        owner,
        name: row.get(3)?,
        label_type: LabelType::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
        attributes: Vec::new(),
        created_ts: row.get(5)?,
        updated_ts: row.get(6)?,
    })
}

fn validate_label_name(name: &str) -> Result<(), DomainError> {
    validate_non_empty(name, "name")?;
    validate_max_len(name.trim(), LABEL_NAME_MAX, "name")
}

fn insert_attribute(conn: &Connection, label_id: i64, payload: &AttributePayload) -> Result<i64> {
    let name = payload.name.as_deref().unwrap_or("");
    validate_non_empty(name, "attributes.name")?;
    let values = payload.values.clone().unwrap_or_default();

    conn.execute(
        "INSERT INTO attributes (label_id, name, mutable, input_type, default_value, allowed_values)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            label_id,
            name.trim(),
            payload.mutable.unwrap_or(false),
            payload.input_type.unwrap_or_default().as_str(),
            payload.default_value,
            encode_values(&values),
        ],
    )
    .with_context(|| format!("Failed to create attribute: {}", name))?;
    Ok(conn.last_insert_rowid())
}

fn update_attribute(conn: &Connection, attribute: &Attribute, payload: &AttributePayload) -> Result<()> {
    let name = match payload.name.as_deref() {
        Some(name) => {
            validate_non_empty(name, "attributes.name")?;
            name.trim().to_string()
        }
        None => attribute.name.clone(),
    };
    let values = payload.values.as_ref().unwrap_or(&attribute.values);
    let default_value = payload.default_value.clone().or_else(|| attribute.default_value.clone());

    conn.execute(
        "UPDATE attributes SET name = ?1, mutable = ?2, input_type = ?3, default_value = ?4,
                allowed_values = ?5
         WHERE id = ?6",
        rusqlite::params![
            name,
            payload.mutable.unwrap_or(attribute.mutable),
            payload.input_type.unwrap_or(attribute.input_type).as_str(),
            default_value,
            encode_values(values),
            attribute.id,
        ],
    )
    .with_context(|| format!("Failed to update attribute {}", attribute.id))?;
    Ok(())
}
