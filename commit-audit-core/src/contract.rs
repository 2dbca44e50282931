//! # contract: interfaces to the external collaborators of an audit run
//!
//! The pipeline talks to exactly two things outside the process:
//! - a version-control client ([`VcsClient`]) that materializes working copies and
//!   emits raw commit history,
//! - a mail transport ([`Mailer`]) that delivers the rendered report.
//!
//! Both traits are annotated for `mockall` so tests can drive the orchestrator
//! without `git` or a mail server. The real `git` implementation lives in
//! [`crate::workspace`]; the mail transport is provided by the binary crate.
//!
//! Mail handles are created, verified and dropped by the caller and injected into
//! [`crate::audit::run_audit`]; nothing here keeps a global connection.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::RepositorySpec;
use crate::error::AuditError;
use crate::record::RecordFormat;

/// Error type for the Mailer trait (boxed, transport specific).
pub type MailError = Box<dyn std::error::Error + Send + Sync>;

/// Trait for obtaining local working copies and their history.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait VcsClient: Send + Sync {
    /// Clone `repository` at its configured branch into `destination`.
    /// Completion is a precondition for [`VcsClient::fetch_history`].
    async fn materialize_working_copy(
        &self,
        repository: &RepositorySpec,
        destination: &Path,
    ) -> Result<(), AuditError>;

    /// Return the raw history of the working copy, one record per commit in `format`.
    async fn fetch_history(
        &self,
        repository: &RepositorySpec,
        working_copy: &Path,
        format: RecordFormat,
    ) -> Result<String, AuditError>;
}

/// A file attached to an outgoing mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub path: PathBuf,
}

/// A fully addressed mail ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    /// Plain-text body, if any.
    pub text: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Trait for delivering mail through some transport.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Check that the transport is usable before the first run.
    async fn verify(&self) -> Result<(), MailError>;

    /// Send `mail`, returning the transport's message id.
    async fn send(&self, mail: OutgoingMail) -> Result<String, MailError>;
}
