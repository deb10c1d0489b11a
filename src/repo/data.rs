use rusqlite::{Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use crate::error::DomainError;
use crate::files::FileStore;
use crate::models::TaskData;
use crate::repo::TaskRepo;
use anyhow::{Context, Result};

const DATA_COLUMNS: &str = "id, task_id, filename, size_kib, path, created_ts, updated_ts";

/// Uploaded audio attached to tasks
pub struct DataRepo;

impl DataRepo {
    /// Copy `source` into the store under the task's name and record it
    pub fn add(conn: &Connection, store: &FileStore, task_id: i64, source: &Path) -> Result<TaskData> {
        let task = TaskRepo::get_by_id(conn, task_id)?
            .ok_or_else(|| DomainError::not_found("Task", task_id))?;
        if !source.is_file() {
            return Err(DomainError::validation(
                "file",
                format!("File not found: {}", source.display()),
            )
            .into());
        }

        let (path, bytes) = store.store(&task.name, source)?;
        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let size_kib = (bytes / 1024) as i64;
        let now = chrono::Utc::now().timestamp();

        let inserted = conn.execute(
            "INSERT INTO task_data (task_id, filename, size_kib, path, created_ts, updated_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![task_id, filename, size_kib, path.to_string_lossy(), now, now],
        );
        if let Err(e) = inserted {
            if let Err(cleanup) = store.remove(&path) {
                log::warn!("Failed to clean up {}: {:#}", path.display(), cleanup);
            }
            return Err(e).with_context(|| format!("Failed to record data for task {}", task_id));
        }

        log::info!("Attached {} ({} KiB) to task {}", filename, size_kib, task_id);
        Ok(TaskData {
            id: conn.last_insert_rowid(),
            task_id,
            filename,
            size_kib,
            path: path.to_string_lossy().into_owned(),
            created_ts: now,
            updated_ts: now,
        })
    }

    /// First data record of a task
    pub fn get_first(conn: &Connection, task_id: i64) -> Result<Option<TaskData>> {
        let sql = format!("SELECT {} FROM task_data WHERE task_id = ?1 ORDER BY id LIMIT 1", DATA_COLUMNS);
        let data = conn.query_row(&sql, [task_id], data_from_row).optional()?;
        Ok(data)
    }

    pub fn list_by_task(conn: &Connection, task_id: i64) -> Result<Vec<TaskData>> {
        let sql = format!("SELECT {} FROM task_data WHERE task_id = ?1 ORDER BY id", DATA_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([task_id], data_from_row)?;

        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(data)
    }

    /// Remove every data record of a task and its stored files
    ///
    /// Returns the first removed record.
    pub fn delete_all(conn: &Connection, store: &FileStore, task_id: i64) -> Result<TaskData> {
        let tx = conn.unchecked_transaction()?;
        let records = Self::list_by_task(&tx, task_id)?;
        let first = match records.first() {
            Some(first) => first.clone(),
            None => {
                return Err(DomainError::validation("data", "No data are associated with this task.").into());
            }
        };

        tx.execute("DELETE FROM task_data WHERE task_id = ?1", [task_id])
            .with_context(|| format!("Failed to delete data of task {}", task_id))?;
        tx.commit()?;

        Self::remove_files(store, &records)?;
        log::info!("Removed {} data record(s) from task {}", records.len(), task_id);
        Ok(first)
    }

    /// Remove the stored files behind `records`
    pub fn remove_files(store: &FileStore, records: &[TaskData]) -> Result<()> {
        for record in records {
            store.remove(&PathBuf::from(&record.path))?;
        }
        Ok(())
    }
}

fn data_from_row(row: &Row) -> rusqlite::Result<TaskData> {
    Ok(TaskData {
        id: row.get(0)?,
        task_id: row.get(1)?,
        filename: row.get(2)?,
        size_kib: row.get(3)?,
        path: row.get(4)?,
        created_ts: row.get(5)?,
        updated_ts: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RequestContext;
    use crate::db::DbConnection;
    use crate::models::{LabelPayload, NewTask};
    use tempfile::TempDir;

    fn setup() -> (Connection, TempDir, FileStore, i64) {
        let conn = DbConnection::connect_in_memory().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("files"));
        let task = TaskRepo::create(
            &conn,
            &RequestContext::new(1),
            &NewTask::with_labels("interview", vec![LabelPayload::named("speech")]),
        ).unwrap();
        (conn, temp_dir, store, task.id)
    }

    #[test]
    fn test_add_records_size_in_kib() {
        let (conn, temp_dir, store, task_id) = setup();
        let source = temp_dir.path().join("take1.wav");
        std::fs::write(&source, vec![1u8; 5000]).unwrap();

        let data = DataRepo::add(&conn, &store, task_id, &source).unwrap();
        assert_eq!(data.filename, "take1.wav");
        assert_eq!(data.size_kib, 4);
        assert!(Path::new(&data.path).ends_with("interview/take1.wav"));
        assert_eq!(DataRepo::get_first(&conn, task_id).unwrap(), Some(data));
    }

    #[test]
    fn test_same_filename_twice_keeps_both_uploads() {
        let (conn, temp_dir, store, task_id) = setup();
        for (dir, size) in [("a", 8192usize), ("b", 1024)] {
            std::fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
            std::fs::write(temp_dir.path().join(dir).join("take.wav"), vec![1u8; size]).unwrap();
        }

        let first = DataRepo::add(&conn, &store, task_id, &temp_dir.path().join("a/take.wav")).unwrap();
        let second = DataRepo::add(&conn, &store, task_id, &temp_dir.path().join("b/take.wav")).unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(first.filename, "take.wav");
        assert_eq!(second.filename, "take.wav");
        assert_eq!(std::fs::metadata(&first.path).unwrap().len(), 8192);
        assert_eq!(first.size_kib, 8);
        assert_eq!(second.size_kib, 1);
    }

    #[test]
    fn test_failed_insert_reports_insert_error() {
        let (conn, temp_dir, store, task_id) = setup();
        let source = temp_dir.path().join("take1.wav");
        std::fs::write(&source, b"RIFF").unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_data BEFORE INSERT ON task_data
             BEGIN SELECT RAISE(ABORT, 'data rejected'); END;",
        )
        .unwrap();

        let err = DataRepo::add(&conn, &store, task_id, &source).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to record data for task"));
        assert!(!temp_dir.path().join("files/interview/take1.wav").exists());
    }

    #[test]
    fn test_add_missing_file() {
        let (conn, temp_dir, store, task_id) = setup();
        let err = DataRepo::add(&conn, &store, task_id, &temp_dir.path().join("nope.wav")).unwrap_err();
        assert!(DomainError::classify(&err).unwrap().is_validation());
    }

    #[test]
    fn test_delete_all() {
        let (conn, temp_dir, store, task_id) = setup();
        let source = temp_dir.path().join("take1.wav");
        std::fs::write(&source, b"RIFF").unwrap();
        let data = DataRepo::add(&conn, &store, task_id, &source).unwrap();

        let removed = DataRepo::delete_all(&conn, &store, task_id).unwrap();
        assert_eq!(removed.id, data.id);
        assert!(!Path::new(&data.path).exists());
        assert!(DataRepo::get_first(&conn, task_id).unwrap().is_none());

        let err = DataRepo::delete_all(&conn, &store, task_id).unwrap_err();
        assert_eq!(
            DomainError::classify(&err).unwrap().to_string(),
            "No data are associated with this task."
        );
    }
}
