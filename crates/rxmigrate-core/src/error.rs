//! Error types for rxmigrate.
//!
//! `MigrateError` is the single error type surfaced by the library entry
//! points. Subsystem errors (parse errors, edit conflicts, I/O, JSON) are
//! bridged into it with `From` impls so callers can use `?` throughout.
//!
//! Nothing inside a rewrite pass produces an error: a construct that does not
//! match a rule is simply not rewritten. Errors only come from the
//! collaborators around the pass (parsing, loading data, applying edits) and
//! from the fixed-point driver.

use std::path::PathBuf;

use thiserror::Error;

use crate::patch::Conflict;

/// Unified error type for migration entry points.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The source text could not be parsed.
    #[error("parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// A batch of edits could not be applied.
    #[error("apply error: {0}")]
    Apply(#[from] Conflict),

    /// Repeated passes did not reach a fixed point.
    #[error("migration did not converge after {iterations} passes")]
    NonConvergent { iterations: usize },

    /// A configuration or type-facts file was invalid.
    #[error("invalid {what} in {path}: {reason}")]
    InvalidInput {
        what: &'static str,
        path: PathBuf,
        reason: String,
    },

    /// IO error while reading inputs.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for migration operations.
pub type MigrateResult<T> = Result<T, MigrateError>;

impl MigrateError {
    /// Create a parse error.
    pub fn parse(offset: usize, message: impl Into<String>) -> Self {
        MigrateError::Parse {
            offset,
            message: message.into(),
        }
    }
}
