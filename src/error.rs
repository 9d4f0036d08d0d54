//! Error types for fillpdf

use thiserror::Error;

/// Result type alias for fillpdf
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for fillpdf
#[derive(Error, Debug)]
pub enum Error {
    /// Required external tool is not on the search path
    #[error("{tool} utility is not installed: {reason}")]
    ToolNotFound { tool: String, reason: String },

    /// mcpdf jar is missing, unreadable or not a zip archive
    #[error("mcpdf file at {path} is unusable: {reason}")]
    InvalidFiller { path: String, reason: String },

    /// Missing or malformed configuration
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// File operation failed on a known path
    #[error("cannot {action} {path}: {source}")]
    FileAccess {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed line in a field dump
    #[error("cannot parse field dump line {line:?}")]
    DumpParse { line: String },

    /// PDF could not be loaded for field discovery
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// Field name is not part of the form
    #[error("field {name:?} is not in the form")]
    UnknownField { name: String },

    /// Field exists but has a different type than the value supplied for it
    #[error("field {name:?} is not {expected}, is {actual}")]
    FieldTypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// External program exited unsuccessfully
    #[error("{program} failed with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// External program could not be started
    #[error("cannot run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// PDF file not found
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Path access denied (outside allowed resource directories)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, tool output) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::ToolNotFound { tool, .. } => format!("{} utility is not installed", tool),
            Error::InvalidFiller { .. } => "Form filler is not available".to_string(),
            Error::Config { .. } => "Invalid configuration".to_string(),
            Error::FileAccess { action, .. } => format!("cannot {}", action),
            Error::Io(_) => "I/O error".to_string(),
            Error::DumpParse { .. } => "Cannot read form fields".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::UnknownField { name } => format!("Field {:?} is not in the form", name),
            Error::FieldTypeMismatch {
                name,
                expected,
                actual,
            } => format!("Field {:?} is not {}, is {}", name, expected, actual),
            Error::CommandFailed { .. } | Error::Spawn { .. } => {
                "PDF processing error".to_string()
            }
            Error::PdfNotFound { .. } => "PDF not found".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
        }
    }
}
