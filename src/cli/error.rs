// Error reporting and input helpers shared by the command handlers

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use crate::error::DomainError;

/// Exit code for user errors (bad input, missing entities, denied actions)
pub const EXIT_USER_ERROR: i32 = 1;
/// Exit code for internal failures (database, filesystem)
pub const EXIT_INTERNAL_ERROR: i32 = 2;

/// Print an error the way the binary reports it and return the exit code
///
/// Errors carrying a [`DomainError`] are the user's to fix and print as a
/// single `Error:` line. Anything else is internal and prints its cause chain.
pub fn report_error(err: &anyhow::Error) -> i32 {
    match DomainError::classify(err) {
        Some(domain) => {
            eprintln!("Error: {}", domain);
            EXIT_USER_ERROR
        }
        None => {
            eprintln!("Internal error: {}", err);
            let mut causes = err.chain().skip(1).peekable();
            if causes.peek().is_some() {
                eprintln!("\nCaused by:");
                for (indent, cause) in causes.enumerate() {
                    eprintln!("{:indent$}  {}", "", cause, indent = indent + 1);
                }
            }
            EXIT_INTERNAL_ERROR
        }
    }
}

/// Parse a JSON payload argument
///
/// `raw` is either inline JSON or `@path` naming a file holding it.
pub fn parse_payload<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {} payload from {}", what, path))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).map_err(|e| {
        DomainError::validation(what, format!("Invalid {} payload: {}", what, e)).into()
    })
}

/// Validate that an entity ID is positive
pub fn validate_id(id: i64, entity: &str) -> Result<i64, DomainError> {
    if id > 0 {
        Ok(id)
    } else {
        Err(DomainError::validation(
            "id",
            format!("Invalid {} ID: {}. IDs must be positive.", entity, id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabelPayload;

    #[test]
    fn test_validate_id() {
        assert_eq!(validate_id(4, "task").unwrap(), 4);
        assert!(validate_id(0, "task").is_err());
        assert!(validate_id(-3, "job").is_err());
    }

    #[test]
    fn test_parse_inline_payload() {
        let payload: LabelPayload = parse_payload(r#"{"name": "speaker"}"#, "label").unwrap();
        assert_eq!(payload.name.as_deref(), Some("speaker"));
    }

    #[test]
    fn test_parse_payload_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("label.json");
        std::fs::write(&path, r#"{"name": "noise", "attributes": []}"#).unwrap();

        let payload: LabelPayload = parse_payload(&format!("@{}", path.display()), "label").unwrap();
        assert_eq!(payload.attributes, Some(vec![]));
    }

    #[test]
    fn test_malformed_payload_is_user_error() {
        let err = parse_payload::<LabelPayload>("{name:", "label").unwrap_err();
        assert!(DomainError::classify(&err).unwrap().is_validation());
    }

    #[test]
    fn test_exit_codes() {
        let user: anyhow::Error = DomainError::not_found("Task", 3).into();
        assert_eq!(report_error(&user), EXIT_USER_ERROR);
        let internal = anyhow::anyhow!("disk I/O error").context("Failed to update job 1");
        assert_eq!(report_error(&internal), EXIT_INTERNAL_ERROR);
    }
}
