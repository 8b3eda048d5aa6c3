//! Error types for the migration generator.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for generation operations.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two entities project to the same physical table name.
    /// Raised before any file is written.
    #[error("Duplicate table name '{table}' projected by entities '{first}' and '{second}'")]
    DuplicateTableName {
        table: String,
        first: String,
        second: String,
    },

    /// Entity descriptor discovery failed (unreadable descriptor pack, etc.)
    #[error("Entity discovery failed: {0}")]
    Discovery(String),

    /// A projected table violates a schema invariant (FK without a matching
    /// column, index over a missing column). Raised before any file is written.
    #[error("Invalid schema for table '{table}': {message}")]
    InvalidSchema { table: String, message: String },

    /// A previously emitted SQL file could not be parsed. Always absorbed by
    /// the extractor (logged, the affected table yields no prior schema).
    #[error("SQL parse failed: {0}")]
    SqlParse(String),

    /// The writer computed a filename that already exists on disk.
    /// Emitted files are append-only and are never overwritten.
    #[error("Refusing to overwrite existing migration file {}", path.display())]
    FileConflict { path: PathBuf },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GeneratorError {
    /// Create an InvalidSchema error.
    pub fn invalid_schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        GeneratorError::InvalidSchema {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a SqlParse error.
    pub fn parse(message: impl Into<String>) -> Self {
        GeneratorError::SqlParse(message.into())
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GeneratorError>;
