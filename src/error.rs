// File: src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the glossary core.
///
/// Only conditions that cannot be recovered by carrying on are raised here.
/// Validation and ingestion problems are collected into report structs instead.
#[derive(Debug, Error)]
pub enum GlossaryError {
    /// The store file exists but could not be parsed. Existing data is left untouched.
    #[error("failed to load glossary store from {path}: {source}")]
    StoreLoad {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, GlossaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_load_display_names_path() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = GlossaryError::StoreLoad { path: PathBuf::from("glossary.json"), source };
        assert!(err.to_string().contains("glossary.json"));
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: GlossaryError = io_err.into();
        assert!(matches!(err, GlossaryError::Io(_)));
    }

    #[test]
    fn invalid_config_display() {
        let err = GlossaryError::InvalidConfig("max_terms_per_category must be > 0".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: max_terms_per_category must be > 0"
        );
    }
}
