use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::error::DomainError;

/// Upload location resolver
///
/// Files are kept under `<root>/<task name>/<filename>`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an upload for the named task is stored at
    pub fn upload_path(&self, task_name: &str, filename: &str) -> Result<PathBuf> {
        let dir = path_component(task_name, "task name")?;
        let file = path_component(filename, "filename")?;
        Ok(self.root.join(dir).join(file))
    }

    /// Copy `source` into the store, returning the stored path and size in bytes
    ///
    /// An upload never replaces an earlier one: when the name is taken the
    /// file is stored as `<stem>_<n>.<ext>` instead.
    pub fn store(&self, task_name: &str, source: &Path) -> Result<(PathBuf, u64)> {
        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DomainError::validation("file", format!("Invalid file path: {}", source.display())))?;
        let target = self.free_path(&self.upload_path(task_name, filename)?)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let size = std::fs::copy(source, &target)
            .with_context(|| format!("Failed to store {} at {}", source.display(), target.display()))?;
        log::info!("Stored {} ({} bytes)", target.display(), size);
        Ok((target, size))
    }

    /// First path derived from `wanted` that nothing is stored at yet
    fn free_path(&self, wanted: &Path) -> Result<PathBuf> {
        let mut candidate = wanted.to_path_buf();
        let stem = wanted.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
        let extension = wanted.extension().and_then(|e| e.to_str()).map(|e| e.to_string());
        let mut n = 0;
        while candidate
            .try_exists()
            .with_context(|| format!("Failed to inspect {}", candidate.display()))?
        {
            n += 1;
            let name = match &extension {
                Some(ext) => format!("{}_{}.{}", stem, n, ext),
                None => format!("{}_{}", stem, n),
            };
            candidate = wanted.with_file_name(name);
        }
        Ok(candidate)
    }

    /// Remove a stored file; a file that is already gone is not an error
    pub fn remove(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Stored file already missing: {}", path.display());
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

/// A single path segment: no separators, no parent references
fn path_component<'a>(value: &'a str, field: &str) -> Result<&'a str, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." || trimmed.contains(|c: char| c == '/' || c == '\\') {
        return Err(DomainError::validation(
            field,
            format!("Invalid {}: '{}' cannot be used as a storage path", field, value),
        ));
    }
    Ok(trimmed)
}
