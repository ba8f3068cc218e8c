//! Error taxonomy for the outline engine.
//!
//! Kinds, not types: every fallible core operation returns this enum so
//! callers (in practice, the CLI) can pick an exit code without downcasting
//! an opaque `anyhow::Error`.

use std::path::PathBuf;

use thiserror::Error;

/// A single outline-engine error.
///
/// Variants are grouped by the three kinds from the error handling design:
/// domain errors, integrity violations, and I/O errors. `exit_code` encodes
/// the mapping a CLI driver is expected to apply.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown id: {0}")]
    UnknownId(String),

    #[error("path already occupied: {0}")]
    DuplicatePath(String),

    #[error("id already exists: {0}")]
    DuplicateId(String),

    #[error("no sibling position available between {a} and {b}; run compact")]
    Exhausted { a: String, b: String },

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("doctype {0:?} is reserved and cannot be added or removed")]
    ReservedDoctype(String),

    #[error("node {id} has no doctype {doctype:?}")]
    UnknownDoctype { id: String, doctype: String },

    #[error("node {id} already has doctype {doctype:?}")]
    DoctypeAlreadyPresent { id: String, doctype: String },

    #[error("invalid doctype name {0:?}: must be non-empty, underscore-free, [A-Za-z0-9-]")]
    InvalidDoctype(String),

    #[error("cannot move {id} into its own subtree")]
    CycleDetected { id: String },

    #[error("could not parse filename {0:?}")]
    UnparseableFilename(String),

    #[error("invalid materialized path {0:?}: {1}")]
    InvalidPath(String, String),

    #[error("invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("node {0} has children; use --recursive or --promote")]
    HasChildren(String),

    #[error("doctype {0:?} not found on any node in the selected subtree")]
    DoctypeNotFound(String),

    #[error("{0} integrity violation(s) found")]
    Invalid(usize),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Exit code a CLI should use when this error escapes to the top level.
    ///
    /// 1 for domain errors and integrity violations, 2 for I/O errors, per
    /// the error handling design.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Io { .. } => 2,
            _ => 1,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
