// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Error types of the synchronization core.

use std::path::PathBuf;

/// Failure reported by a [`LocalStore`](crate::LocalStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or the operation was interrupted.
    ///
    /// The pass is aborted and retried by the scheduler.
    #[error("local store unavailable: {0}")]
    Unavailable(String),

    /// The operation violated a constraint of the store.
    ///
    /// This indicates a programming error and is not retried.
    #[error("local store constraint violated: {0}")]
    ConstraintViolation(String),

    /// The requested row does not exist.
    #[error("record not found")]
    NotFound,
}

impl StoreError {
    /// Whether retrying the same operation later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) => {
                // SQLITE_BUSY and SQLITE_LOCKED, including their extended codes, are transient
                let primary = db
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff);
                if matches!(primary, Some(5 | 6)) {
                    StoreError::Unavailable(err.to_string())
                } else {
                    StoreError::ConstraintViolation(err.to_string())
                }
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// Failure reported by a [`Remote`](crate::Remote) collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The server rejected a write because its precondition no longer holds.
    #[error("remote conflict: {0}")]
    Conflict(String),

    /// Any other remote failure, including network errors.
    #[error("remote failure: {0}")]
    Failure(String),
}

/// Error that aborts a synchronization pass.
///
/// Per-resource remote failures do not abort a pass; they are collected in
/// the [`SyncReport`](crate::SyncReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The local store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The remote could not be set up for the account.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl SyncError {
    /// Whether the pass should be retried with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Store(err) => err.is_retryable(),
            SyncError::Remote(_) => true,
        }
    }
}

/// Failure reported by a task queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// The queue refused the submission.
    #[error("task queue rejected {name}: {reason}")]
    Rejected {
        /// Name of the task that was refused.
        name: String,
        /// Why the queue refused it.
        reason: String,
    },

    /// The queue has been shut down.
    #[error("task queue is shut down")]
    ShutDown,
}

/// Failure while loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// The file was parsed but holds an invalid value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<davsync_webdav::DavError> for RemoteError {
    fn from(err: davsync_webdav::DavError) -> Self {
        if err.is_conflict() {
            RemoteError::Conflict(err.to_string())
        } else {
            RemoteError::Failure(err.to_string())
        }
    }
}
