//! Error types for comfy-notes.
//!
//! Uses `thiserror` for structured error definitions. Document and
//! configuration errors are fatal to a run; translation errors are always
//! recovered per node.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for loading and saving workflow documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The input file does not exist
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The input file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid JSON
    #[error("{} is not valid JSON: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON does not look like a ComfyUI workflow
    #[error("Not a ComfyUI workflow: {0}")]
    SchemaViolation(String),

    /// The output file could not be written
    #[error("Failed to write {}: {message}", .path.display())]
    WriteFailure { path: PathBuf, message: String },
}

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Missing required configuration value
    #[error("Missing required config value: {0}")]
    MissingValue(String),

    /// Invalid configuration value
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Config directory not found
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Error type for translation backends.
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The backend has no usable credential
    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    /// HTTP request to the service failed
    #[error("Request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The service returned an error response
    #[error("API error: {0}")]
    ApiError(String),

    /// Failed to parse the service response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The model answered with no text
    #[error("Empty response")]
    EmptyResponse,

    /// The result looks truncated
    #[error("Suspiciously short result ({translated} chars for {original} chars of input)")]
    SuspiciousOutput { original: usize, translated: usize },
}
