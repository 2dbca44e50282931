//! Error type shared by every stage of the audit pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::contract::MailError;

/// Failures raised while auditing repositories or delivering the report.
#[derive(Error, Debug)]
pub enum AuditError {
    /// `git clone` terminated with a non-zero status.
    #[error("git clone failed for repository {repository} (exit code {exit_code:?})")]
    Clone {
        repository: String,
        exit_code: Option<i32>,
    },

    /// `git log` terminated with a non-zero status.
    #[error("git log failed for repository {repository} (exit code {exit_code:?})")]
    Fetch {
        repository: String,
        exit_code: Option<i32>,
    },

    /// The `git` process could not be started at all.
    #[error("failed to launch git for repository {repository}: {source}")]
    Spawn {
        repository: String,
        #[source]
        source: std::io::Error,
    },

    /// The raw history stream is not a well-formed sequence of records.
    #[error("malformed commit records for repository {repository}: {reason}")]
    Parse {
        repository: String,
        raw: String,
        reason: String,
    },

    /// A commit carried a date that is not RFC 2822.
    #[error("unparseable commit date {date:?} in repository {repository}: {source}")]
    DateParse {
        repository: String,
        date: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A repository name that cannot serve as a working copy directory.
    #[error("repository name {repository:?} is not usable as a working copy directory: {reason}")]
    RepositoryName { repository: String, reason: String },

    /// An acceptance pattern is not a valid regular expression.
    #[error("invalid acceptance pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Preparing the workspace or writing the report file failed.
    #[error("workspace I/O failed at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The mail transport rejected the report.
    #[error("report delivery failed: {source}")]
    Delivery {
        #[source]
        source: MailError,
    },
}

impl AuditError {
    /// Name of the repository the failure belongs to, if any.
    pub fn repository(&self) -> Option<&str> {
        match self {
            AuditError::Clone { repository, .. }
            | AuditError::Fetch { repository, .. }
            | AuditError::Spawn { repository, .. }
            | AuditError::Parse { repository, .. }
            | AuditError::DateParse { repository, .. }
            | AuditError::RepositoryName { repository, .. } => Some(repository),
            AuditError::Pattern { .. }
            | AuditError::Workspace { .. }
            | AuditError::Delivery { .. } => None,
        }
    }
}
