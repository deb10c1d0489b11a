use rusqlite::{Connection, Result};
use std::collections::HashMap;

/// Current database schema version
pub const CURRENT_VERSION: u32 = 2;

/// Migration system for managing database schema versions
pub struct MigrationManager;

impl MigrationManager {
    /// Initialize the database with the current schema
    /// This creates the schema_version table and applies all migrations
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        let current_version = Self::get_version(conn)?;

        for version in (current_version + 1)..=CURRENT_VERSION {
            Self::apply_migration(conn, version)?;
            log::info!("Applied schema migration v{}", version);
        }

        Ok(())
    }

    /// Apply a specific migration by version number
    fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
        let migrations = get_migrations();
        if let Some(migration) = migrations.get(&version) {
            let tx = conn.unchecked_transaction()?;
            migration(&tx)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
            tx.commit()
        } else {
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
                Some(format!("No migration found for version {}", version)),
            ))
        }
    }

    /// Get the current schema version
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

type Migration = fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>;

/// Get all migrations indexed by version
fn get_migrations() -> HashMap<u32, Migration> {
    let mut migrations: HashMap<u32, Migration> = HashMap::new();
    migrations.insert(1, migration_v1);
    migrations.insert(2, migration_v2);
    migrations
}

/// Migration v1: Initial schema
fn migration_v1(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "CREATE TABLE storages (
            id INTEGER PRIMARY KEY,
            location TEXT NOT NULL DEFAULT 'local' CHECK(location IN ('local','cloud')),
            cloud_storage_id INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    // Users and organizations live in the identity service; only their ids are stored here.
    tx.execute(
        "CREATE TABLE projects (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            owner_id INTEGER NULL,
            assignee_id INTEGER NULL,
            organization_id INTEGER NULL,
            source_storage_id INTEGER NULL REFERENCES storages(id) ON DELETE SET NULL,
            target_storage_id INTEGER NULL REFERENCES storages(id) ON DELETE SET NULL,
            created_ts INTEGER NOT NULL,
            updated_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_projects_organization ON projects(organization_id)",
        [],
    )?;

    tx.execute(
        "CREATE TABLE tasks (
            id INTEGER PRIMARY KEY,
            name TEXT NULL,
            project_id INTEGER NULL REFERENCES projects(id) ON DELETE CASCADE,
            owner_id INTEGER NULL,
            assignee_id INTEGER NULL,
            subset TEXT NOT NULL DEFAULT 'Train' CHECK(subset IN ('Train','Test','Validation')),
            source_storage_id INTEGER NULL REFERENCES storages(id) ON DELETE SET NULL,
            target_storage_id INTEGER NULL REFERENCES storages(id) ON DELETE SET NULL,
            organization_id INTEGER NULL,
            created_ts INTEGER NOT NULL,
            updated_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute("CREATE INDEX idx_tasks_project_id ON tasks(project_id)", [])?;
    tx.execute("CREATE INDEX idx_tasks_organization ON tasks(organization_id)", [])?;

    // A label belongs to exactly one of project or task
    tx.execute(
        "CREATE TABLE labels (
            id INTEGER PRIMARY KEY,
            project_id INTEGER NULL REFERENCES projects(id) ON DELETE CASCADE,
            task_id INTEGER NULL REFERENCES tasks(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            label_type TEXT NOT NULL DEFAULT 'any' CHECK(label_type IN ('any')),
            created_ts INTEGER NOT NULL,
            updated_ts INTEGER NOT NULL,
            CHECK((project_id IS NULL) <> (task_id IS NULL))
        )",
        [],
    )?;
    tx.execute("CREATE INDEX idx_labels_project_id ON labels(project_id)", [])?;
    tx.execute("CREATE INDEX idx_labels_task_id ON labels(task_id)", [])?;

    tx.execute(
        "CREATE TABLE attributes (
            id INTEGER PRIMARY KEY,
            label_id INTEGER NOT NULL REFERENCES labels(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            mutable INTEGER NOT NULL DEFAULT 0,
            input_type TEXT NOT NULL DEFAULT 'select' CHECK(input_type IN ('select','radio')),
            default_value TEXT NULL,
            allowed_values TEXT NOT NULL DEFAULT '[]'
        )",
        [],
    )?;
    tx.execute("CREATE INDEX idx_attributes_label_id ON attributes(label_id)", [])?;
    // Note: allowed_values is a JSON array of strings

    tx.execute(
        "CREATE TABLE jobs (
            id INTEGER PRIMARY KEY,
            task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            assignee_id INTEGER NULL,
            guide_id INTEGER NULL,
            stage TEXT NOT NULL DEFAULT 'annotation'
                CHECK(stage IN ('annotation','validation','acceptance')),
            state TEXT NOT NULL DEFAULT 'new'
                CHECK(state IN ('new','in progress','completed','rejected')),
            created_ts INTEGER NOT NULL,
            updated_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute("CREATE INDEX idx_jobs_task_id ON jobs(task_id)", [])?;
    // Note: the legacy status is derived from (stage, state) and never stored

    tx.execute(
        "CREATE TABLE annotations (
            id INTEGER PRIMARY KEY,
            job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
            start_mark TEXT NULL,
            end_mark TEXT NULL,
            color TEXT NULL,
            name TEXT NULL,
            transcription TEXT NULL,
            created_ts INTEGER NOT NULL,
            updated_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute("CREATE INDEX idx_annotations_job_id ON annotations(job_id)", [])?;

    // Snapshots: names are copied, source ids are only kept for reference
    tx.execute(
        "CREATE TABLE annotation_data (
            id INTEGER PRIMARY KEY,
            annotation_id INTEGER NOT NULL REFERENCES annotations(id) ON DELETE CASCADE,
            label_id INTEGER NULL REFERENCES labels(id) ON DELETE SET NULL,
            name TEXT NOT NULL
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_annotation_data_annotation ON annotation_data(annotation_id)",
        [],
    )?;

    tx.execute(
        "CREATE TABLE annotation_attributes (
            id INTEGER PRIMARY KEY,
            annotation_data_id INTEGER NOT NULL REFERENCES annotation_data(id) ON DELETE CASCADE,
            attribute_id INTEGER NULL REFERENCES attributes(id) ON DELETE SET NULL,
            name TEXT NOT NULL,
            chosen_values TEXT NOT NULL DEFAULT '[]'
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_annotation_attributes_data ON annotation_attributes(annotation_data_id)",
        [],
    )?;

    tx.execute(
        "CREATE TABLE task_data (
            id INTEGER PRIMARY KEY,
            task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            filename TEXT NOT NULL,
            size_kib INTEGER NOT NULL DEFAULT 0,
            path TEXT NOT NULL,
            created_ts INTEGER NOT NULL,
            updated_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute("CREATE INDEX idx_task_data_task_id ON task_data(task_id)", [])?;

    Ok(())
}

/// Migration v2: Add job type (annotation or ground truth)
///
/// Existing jobs become regular annotation jobs.
fn migration_v2(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "ALTER TABLE jobs ADD COLUMN job_type TEXT NOT NULL DEFAULT 'annotation'
            CHECK(job_type IN ('annotation','ground_truth'))",
        [],
    )?;
    tx.execute("CREATE INDEX idx_jobs_type ON jobs(job_type)", [])?;
    Ok(())
}
