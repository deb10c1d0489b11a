//! Domain error taxonomy
//!
//! Repository functions return `anyhow::Result` and attach a [`DomainError`]
//! whenever the caller needs to tell a user mistake apart from an internal
//! failure. Database errors stay plain `anyhow` errors with context.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input, conflicting fields or a violated invariant
    #[error("{message}")]
    Validation { field: String, message: String },

    /// Referenced entity does not exist (or is outside the caller's scope)
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Authorization gate denied the action
    #[error("Permission denied: cannot {action} {entity}")]
    PermissionDenied { action: String, entity: &'static str },
}

impl DomainError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        DomainError::NotFound { entity, id }
    }

    /// Find the domain error inside an `anyhow` chain, if any
    pub fn classify(err: &anyhow::Error) -> Option<&DomainError> {
        err.chain().find_map(|cause| cause.downcast_ref::<DomainError>())
    }

    /// Field name for validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            DomainError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound { .. })
    }
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        Err(DomainError::validation(field_name, format!("{} cannot be empty", field_name)))
    } else {
        Ok(())
    }
}

/// Validate a length limit on a text column
pub fn validate_max_len(value: &str, max: usize, field_name: &str) -> Result<(), DomainError> {
    if value.chars().count() > max {
        Err(DomainError::validation(
            field_name,
            format!("{} must be at most {} characters", field_name, max),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_validate_non_empty() {
        assert!(validate_non_empty("speaker", "name").is_ok());
        assert!(validate_non_empty("", "name").is_err());
        assert!(validate_non_empty("   ", "name").is_err());
    }

    #[test]
    fn test_validate_max_len() {
        assert!(validate_max_len("abc", 3, "name").is_ok());
        let err = validate_max_len("abcd", 3, "name").unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn test_classify_through_context() {
        let err: anyhow::Error = Err::<(), _>(DomainError::not_found("Job", 7))
            .context("Failed to update job")
            .unwrap_err();
        let domain = DomainError::classify(&err).unwrap();
        assert!(domain.is_not_found());
        assert_eq!(domain.to_string(), "Job 7 not found");
    }

    #[test]
    fn test_classify_plain_error() {
        let err = anyhow::anyhow!("disk full");
        assert!(DomainError::classify(&err).is_none());
    }
}
