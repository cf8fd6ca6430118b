//! Compiler error taxonomy.
//!
//! Every error is fatal for the compile call that raised it. Nothing is
//! retried here and no partially assembled artifact is ever written.
use crate::capability::FeatureFamily;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for the compiler core.
pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    /// The target version string is not a dotted numeric version.
    #[error("invalid version format: {0:?}")]
    InvalidVersionFormat(String),

    /// A spec lacks a field its emitter cannot do without.
    #[error("{family} spec {variable:?} is missing required field {field:?}")]
    MissingRequiredField {
        family: FeatureFamily,
        variable: String,
        field: &'static str,
    },

    /// A feature family that the capability table does not cover.
    #[error("unknown feature family {0:?}")]
    UnknownFeatureFamily(String),

    #[error("write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub(crate) fn missing(family: FeatureFamily, variable: &str, field: &'static str) -> Self {
        CompileError::MissingRequiredField {
            family,
            variable: variable.to_string(),
            field,
        }
    }
}
