// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parser and store errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning raw text (or register readings) into samples.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Input is structurally unusable: missing column, every timestamp or
    /// value unparseable, too few registers.
    #[error("format error: {reason}")]
    Format { reason: String },

    /// Header present but no data rows.
    #[error("input contains no data rows")]
    EmptyInput,
}

impl ParseError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        ParseError::Format {
            reason: reason.into(),
        }
    }
}

/// Series store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing persisted state failed. The previous file is intact.
    #[error("persistence failure for {}: {source}", path.display())]
    Persistence {
        project: Option<u32>,
        path: PathBuf,
        source: std::io::Error,
    },

    /// Persisted data exists but cannot be decoded.
    #[error("corrupt store at {}: {reason}", path.display())]
    CorruptStore {
        project: Option<u32>,
        path: PathBuf,
        reason: String,
    },

    /// A project is already bound to a different dataset name.
    #[error("project {project} is already registered as {existing:?} (requested {requested:?})")]
    IndexConflict {
        project: u32,
        existing: String,
        requested: String,
    },

    #[error("project {0} is not registered")]
    UnknownProject(u32),

    /// Dataset names must be a single path component inside the store root.
    #[error("invalid dataset name {name:?} for project {project}")]
    InvalidName { project: u32, name: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl StoreError {
    /// Project number the error refers to, when known.
    pub fn project(&self) -> Option<u32> {
        match self {
            StoreError::Persistence { project, .. } | StoreError::CorruptStore { project, .. } => {
                *project
            }
            StoreError::IndexConflict { project, .. }
            | StoreError::UnknownProject(project)
            | StoreError::InvalidName { project, .. } => Some(*project),
            StoreError::Parse(_) => None,
        }
    }
}
