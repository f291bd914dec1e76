//! Analysis error types.

use thiserror::Error;

/// Errors raised while selecting an analyzer.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No analyzer is available for the requested culture
    #[error("No analyzer available for language: {0}")]
    UnknownLanguage(String),
}
