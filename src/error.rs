//! Error types and handling for Metamove
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for Metamove operations
#[derive(Error, Diagnostic, Debug)]
pub enum MetamoveError {
    // File system errors
    #[error("Failed to read file: {path}")]
    #[diagnostic(
        code(metamove::fs::read_failed),
        help("Check that the path exists and is readable")
    )]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(metamove::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    // Parse errors
    #[error("Failed to parse YAML at line {line}: {reason}")]
    #[diagnostic(
        code(metamove::yaml::parse_failed),
        help("Malformed documents are never partially rewritten; fix the YAML and rerun")
    )]
    YamlParseFailed { line: usize, reason: String },
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, MetamoveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MetamoveError::FileReadFailed {
            path: "models/schema.yml".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to read file: models/schema.yml");
    }

    #[test]
    fn test_error_code() {
        let err = MetamoveError::YamlParseFailed {
            line: 3,
            reason: "unexpected indentation".to_string(),
        };
        assert_eq!(
            err.code().map(|c| c.to_string()),
            Some("metamove::yaml::parse_failed".to_string())
        );
    }

    #[test]
    fn test_parse_error_carries_line() {
        let err = MetamoveError::YamlParseFailed {
            line: 12,
            reason: "tab character in indentation".to_string(),
        };
        assert!(err.to_string().contains("line 12"));
        assert!(err.to_string().contains("tab character"));
    }
}
