//! Error types for library operations.

use std::io;
use std::path::PathBuf;

use crate::types::{AttributeKind, MovieId};

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from library operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Destination path is already occupied.
    #[error("Unable to move {} -> {} as it already exists", .source_path.display(), .target_path.display())]
    PathConflict {
        source_path: PathBuf,
        target_path: PathBuf,
    },

    /// Directory could not be listed.
    #[error("Unable to read path {}: {source}", .path.display())]
    PathUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Link directory maintenance failed.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Entity with the same name already exists.
    #[error("{kind} {name} already exists")]
    DuplicateEntity { kind: AttributeKind, name: String },

    /// Entity name cannot be used as a link directory name.
    #[error("{kind} name {name:?} is not a valid directory name")]
    InvalidEntityName { kind: AttributeKind, name: String },

    /// Rendered filename would point outside the library directory.
    #[error("Filename {0:?} is not a plain file name")]
    InvalidFilename(String),

    /// Referenced entity does not exist.
    #[error("{kind} {name} does not exist")]
    UnknownEntity { kind: AttributeKind, name: String },

    /// Referenced movie does not exist.
    #[error("Movie ID {0} does not exist")]
    UnknownMovie(MovieId),

    /// Entity is still referenced by movies.
    #[error("{kind} {name} exists in {movies} movie(s)")]
    ReferentialIntegrity {
        kind: AttributeKind,
        name: String,
        movies: usize,
    },

    /// Filesystem operation other than link maintenance failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// State that should not be reachable, for example a failed record update after a rename.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors from creating or removing entries in a link directory.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Refusing to use {name:?} as a name in the {kind} link directory")]
    InvalidName { kind: AttributeKind, name: String },

    #[error("Link directory {} could not be created: {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to create link {} -> {}: {source}", .target.display(), .link.display())]
    CreateLink {
        target: PathBuf,
        link: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to delete link {}: {source}", .link.display())]
    RemoveLink {
        link: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Wrap an IO error with a description of the failed operation.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True for errors caused by an occupied destination path.
    #[must_use]
    pub const fn is_path_conflict(&self) -> bool {
        matches!(self, Self::PathConflict { .. })
    }
}
