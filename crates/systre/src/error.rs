//! Error taxonomy shared by all phases.
//!
//! Every failure that aborts the processing of one structure is a
//! [`SystreError`]; its [`Category`] decides the tag of the batch driver's
//! `!!! ERROR (TAG) - message` line.

use std::fmt;

use thiserror::Error;

use crate::pgraph::GraphError;

/// Coarse classification used in user-facing error lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Structure,
    Internal,
    File,
    Cancelled,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Structure => "STRUCTURE",
            Category::Internal => "INTERNAL",
            Category::File => "FILE",
            Category::Cancelled => "CANCELLED",
        })
    }
}

#[derive(Debug, Error)]
pub enum SystreError {
    /// The input net is unsuitable (disconnected, collisions, ...).
    #[error("{0}")]
    Structure(String),
    #[error("No further support yet for dimension {0}")]
    UnsupportedDimension(usize),
    #[error("Space group not recognized: {0}")]
    UnrecognizedGroup(String),
    #[error("{0}")]
    ConsistencyCheck(String),
    #[error("Execution stopped for this structure")]
    Cancelled,
    #[error("{0}")]
    Internal(String),
    #[error("{0}")]
    File(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("Found translation of finite order")]
    NonTranslationalQuotient,
    #[error("line {line}: {msg}")]
    Parse { line: usize, msg: String },
}

impl SystreError {
    pub fn category(&self) -> Category {
        match self {
            SystreError::Structure(_)
            | SystreError::UnsupportedDimension(_)
            | SystreError::Graph(_)
            | SystreError::NonTranslationalQuotient => Category::Structure,
            SystreError::UnrecognizedGroup(_)
            | SystreError::ConsistencyCheck(_)
            | SystreError::Internal(_) => Category::Internal,
            SystreError::File(_) | SystreError::Parse { .. } => Category::File,
            SystreError::Cancelled => Category::Cancelled,
        }
    }

    pub(crate) fn parse(line: usize, msg: impl Into<String>) -> Self {
        SystreError::Parse {
            line,
            msg: msg.into(),
        }
    }

    /// Re-anchors a parse error at `line`; other errors pass through.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            SystreError::Parse { msg, .. } => SystreError::Parse { line, msg },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, SystreError>;
