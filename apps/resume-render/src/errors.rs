use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::compiler::Diagnostic;
use crate::validation::ValidationReport;

/// Application-level error type.
/// Every variant maps to a stable machine code via [`AppError::code`] so batch
/// callers and the CLI can report failures without matching on message text.
#[derive(Debug, Error)]
pub enum AppError {
    /// The record could not be interpreted at all (e.g. the root is not an object).
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Validation error: {0}")]
    Validation(ValidationReport),

    /// Internal formatter fault. Unreachable for a validated record.
    #[error("Render error in section '{section}': {reason}")]
    Render { section: String, reason: String },

    #[error("Compiler could not be started: {0}")]
    CompilerInvocation(String),

    #[error("Compilation failed: {summary}")]
    CompilerDiagnostics {
        summary: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("Compilation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Compilation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn render(section: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Render {
            section: section.into(),
            reason: reason.into(),
        }
    }

    /// Stable, machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MalformedInput(_) => "MALFORMED_INPUT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Render { .. } => "RENDER_ERROR",
            AppError::CompilerInvocation(_) => "COMPILER_INVOCATION_ERROR",
            AppError::CompilerDiagnostics { .. } => "COMPILER_DIAGNOSTIC_FAILURE",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::Cancelled => "CANCELLED",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io { .. } => "IO_ERROR",
            AppError::Json { .. } => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
