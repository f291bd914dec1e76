//! Error types shared across lexmap crates.

use thiserror::Error;

/// Errors raised while loading settings or building shared types.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TypesError::Config("missing index_path".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing index_path");

        let err = TypesError::InvalidInput("latitude out of range".to_string());
        assert_eq!(err.to_string(), "Invalid input: latitude out of range");
    }

    #[test]
    fn test_serialization_from() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: TypesError = json_err.into();
        assert!(err.to_string().starts_with("Serialization error:"));
    }
}
