use std::{error::Error, fmt};

use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Unique indexes a backend must enforce on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConstraint {
    /// Names of non-finished games are pairwise distinct.
    ActiveGameName,
    /// A user owns at most one participant across non-finished games.
    ActiveParticipantUser,
    /// Updates must carry the successor of the stored version.
    GameVersion,
}

impl fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniqueConstraint::ActiveGameName => "active game name",
            UniqueConstraint::ActiveParticipantUser => "active participant user",
            UniqueConstraint::GameVersion => "game version",
        };
        f.write_str(name)
    }
}

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or failed mid-operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable context.
        message: String,
        /// Backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A write violated a unique index.
    #[error("{constraint} conflict on `{key}`")]
    Conflict {
        /// Violated index.
        constraint: UniqueConstraint,
        /// Offending key value.
        key: String,
    },
    /// A stored aggregate breaks the structural invariants of a game.
    #[error("corrupted aggregate: {message}")]
    Corrupted {
        /// What was found broken.
        message: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    ///
    /// The in-memory store never fails this way; external backends wrap their driver
    /// errors with it so the coordinator can retry.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a unique-index violation.
    pub fn conflict(constraint: UniqueConstraint, key: impl Into<String>) -> Self {
        StorageError::Conflict {
            constraint,
            key: key.into(),
        }
    }

    /// Construct a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        StorageError::Corrupted {
            message: message.into(),
        }
    }
}
