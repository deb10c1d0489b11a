use rusqlite::{Connection, OptionalExtension};
use crate::models::{Storage, StorageConfig, StorageLocation};
use anyhow::{Context, Result};

/// Storage repository
///
/// Storage rows are private to the project or task that references them;
/// a task inheriting its project's storage gets its own copy.
pub struct StorageRepo;

impl StorageRepo {
    pub fn create(conn: &Connection, config: &StorageConfig) -> Result<Storage> {
        conn.execute(
            "INSERT INTO storages (location, cloud_storage_id) VALUES (?1, ?2)",
            rusqlite::params![config.location.as_str(), config.cloud_storage_id],
        )
        .context("Failed to create storage")?;

        Ok(Storage {
            id: conn.last_insert_rowid(),
            location: config.location,
            cloud_storage_id: config.cloud_storage_id,
        })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Storage>> {
        let storage = conn
            .query_row(
                "SELECT id, location, cloud_storage_id FROM storages WHERE id = ?1",
                [id],
                |row| {
                    Ok(Storage {
                        id: row.get(0)?,
                        location: StorageLocation::from_str(&row.get::<_, String>(1)?)
                            .unwrap_or_default(),
                        cloud_storage_id: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(storage)
    }

    /// Load an optional storage reference
    pub fn get_optional(conn: &Connection, id: Option<i64>) -> Result<Option<Storage>> {
        match id {
            Some(id) => Self::get_by_id(conn, id),
            None => Ok(None),
        }
    }

    /// Resolve the storage a new row should reference
    ///
    /// Explicit configuration wins, then a copy of the inherited storage,
    /// then local defaults.
    pub fn resolve(conn: &Connection, explicit: Option<&StorageConfig>, inherited: Option<i64>) -> Result<Storage> {
        if let Some(config) = explicit {
            return Self::create(conn, config);
        }
        let config = match Self::get_optional(conn, inherited)? {
            Some(storage) => storage.config(),
            None => StorageConfig::default(),
        };
        Self::create(conn, &config)
    }

    pub fn delete_many(conn: &Connection, ids: &[Option<i64>]) -> Result<()> {
        for id in ids.iter().flatten() {
            conn.execute("DELETE FROM storages WHERE id = ?1", [id])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;

    #[test]
    fn test_create_and_get() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let config = StorageConfig::parse("cloud:4").unwrap();
        let storage = StorageRepo::create(&conn, &config).unwrap();

        let loaded = StorageRepo::get_by_id(&conn, storage.id).unwrap().unwrap();
        assert_eq!(loaded.location, StorageLocation::Cloud);
        assert_eq!(loaded.cloud_storage_id, 4);
    }

    #[test]
    fn test_resolve_copies_inherited() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let parent = StorageRepo::create(&conn, &StorageConfig::parse("cloud:2").unwrap()).unwrap();

        let resolved = StorageRepo::resolve(&conn, None, Some(parent.id)).unwrap();
        assert_ne!(resolved.id, parent.id);
        assert_eq!(resolved.config(), parent.config());

        let fallback = StorageRepo::resolve(&conn, None, None).unwrap();
        assert_eq!(fallback.config(), StorageConfig::default());

        let explicit = StorageConfig::parse("local").unwrap();
        let chosen = StorageRepo::resolve(&conn, Some(&explicit), Some(parent.id)).unwrap();
        assert_eq!(chosen.location, StorageLocation::Local);
    }
}
