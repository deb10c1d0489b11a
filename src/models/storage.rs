use serde::{Deserialize, Serialize};

/// Where task audio is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    #[default]
    Local,
    Cloud,
}

impl StorageLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageLocation::Local => "local",
            StorageLocation::Cloud => "cloud",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "local" => Some(StorageLocation::Local),
            "cloud" => Some(StorageLocation::Cloud),
            _ => None,
        }
    }
}

/// Storage row attached to a project or task as source or target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Storage {
    pub id: i64,
    pub location: StorageLocation,
    pub cloud_storage_id: i64,
}

impl Storage {
    pub fn config(&self) -> StorageConfig {
        StorageConfig {
            location: self.location,
            cloud_storage_id: self.cloud_storage_id,
        }
    }
}

fn default_cloud_storage_id() -> i64 {
    1
}

/// Storage settings as supplied by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub location: StorageLocation,
    #[serde(default = "default_cloud_storage_id")]
    pub cloud_storage_id: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            location: StorageLocation::Local,
            cloud_storage_id: default_cloud_storage_id(),
        }
    }
}

impl StorageConfig {
    /// Parse the short form used on the command line: `local`, `cloud` or `cloud:<id>`
    pub fn parse(spec: &str) -> Result<Self, String> {
        let (location, id) = match spec.split_once(':') {
            Some((location, id)) => (location, Some(id)),
            None => (spec, None),
        };
        let location = StorageLocation::from_str(location.trim())
            .ok_or_else(|| format!("Invalid storage location: '{}'. Expected local or cloud.", location))?;
        let cloud_storage_id = match id {
            Some(id) => id
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("Invalid cloud storage id: '{}'", id))?,
            None => default_cloud_storage_id(),
        };
        Ok(Self { location, cloud_storage_id })
    }
}
