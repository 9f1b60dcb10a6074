//! gsedit - Round-trip editor engine for game-server configuration files
//!
//! gsedit parses, edits, and re-serializes the two textual formats a dedicated
//! game server ships with: the privileges XML access-control list and the flat
//! key/value `dedicated.cfg`. Privileges entries can be asynchronously
//! validated against the Steam community directory, with debounced per-field
//! lookups and batched bulk validation.

pub mod cli;
pub mod codecs;
pub mod logging;
pub mod models;
pub mod services;
pub mod validation;

pub use codecs::{detect, FormatKind};
pub use models::*;
pub use services::*;
pub use validation::*;

/// Result type alias for gsedit operations
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to gsedit operations
#[derive(thiserror::Error, Debug)]
pub enum GseditError {
    #[error("File IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Ambiguous format: {0}")]
    AmbiguousFormat(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
