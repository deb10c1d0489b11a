use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// Settings read from `~/.audino/rc`
///
/// The rc file is a flat list of `key=value` lines. Unknown keys and
/// comment lines (starting with `#`) are ignored.
///
/// ```text
/// data.location=./audino.db
/// storage.root=/srv/audino/files
/// user.id=3
/// organization.id=1
/// user.admin=false
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub data_location: Option<PathBuf>,
    pub storage_root: Option<PathBuf>,
    pub user_id: Option<i64>,
    pub organization_id: Option<i64>,
    pub is_admin: bool,
}

impl Config {
    /// Directory holding the rc file, database and uploaded files
    pub fn home_dir() -> PathBuf {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        home.join(".audino")
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        Self::home_dir().join("rc")
    }

    /// Load the rc file, returning defaults when it does not exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content, path.parent().unwrap_or_else(|| Path::new(".")))
    }

    /// Parse rc content. Relative paths resolve against `base_dir`.
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self> {
        let mut config = Self::default();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                log::warn!("Ignoring malformed config line {}: {}", lineno + 1, line);
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "data.location" => config.data_location = Some(resolve(base_dir, value)),
                "storage.root" => config.storage_root = Some(resolve(base_dir, value)),
                "user.id" => {
                    config.user_id = Some(value.parse().with_context(|| {
                        format!("Invalid user.id on line {}: '{}'", lineno + 1, value)
                    })?)
                }
                "organization.id" => {
                    config.organization_id = Some(value.parse().with_context(|| {
                        format!("Invalid organization.id on line {}: '{}'", lineno + 1, value)
                    })?)
                }
                "user.admin" => {
                    config.is_admin = matches!(value, "1" | "true" | "yes" | "on");
                }
                other => log::debug!("Ignoring unknown config key '{}'", other),
            }
        }
        Ok(config)
    }

    /// Database path, defaulting to `~/.audino/audino.db`
    pub fn database_path(&self) -> PathBuf {
        self.data_location
            .clone()
            .unwrap_or_else(|| Self::home_dir().join("audino.db"))
    }

    /// Upload root, defaulting to `~/.audino/files`
    pub fn storage_path(&self) -> PathBuf {
        self.storage_root
            .clone()
            .unwrap_or_else(|| Self::home_dir().join("files"))
    }
}

fn resolve(base_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_relative() {
        base_dir.join(path)
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let content = "# audino\ndata.location=./custom.db\nstorage.root=/srv/files\nuser.id=3\norganization.id=9\nuser.admin=true\n";
        let config = Config::parse(content, Path::new("/home/me/.audino")).unwrap();
        assert_eq!(config.data_location, Some(PathBuf::from("/home/me/.audino/./custom.db")));
        assert_eq!(config.storage_root, Some(PathBuf::from("/srv/files")));
        assert_eq!(config.user_id, Some(3));
        assert_eq!(config.organization_id, Some(9));
        assert!(config.is_admin);
    }

    #[test]
    fn test_parse_ignores_unknown_and_malformed_lines() {
        let config = Config::parse("color=on\nnot a pair\n", Path::new("/tmp")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_rejects_bad_user_id() {
        assert!(Config::parse("user.id=abc\n", Path::new("/tmp")).is_err());
    }

    #[test]
    fn test_default_paths() {
        let config = Config::default();
        assert!(config.database_path().ends_with("audino.db"));
        assert!(config.storage_path().ends_with("files"));
    }
}
