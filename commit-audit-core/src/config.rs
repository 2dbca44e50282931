use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::record::RecordFormat;

/// Everything one audit run needs, read-only for the duration of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Directory holding one working copy per repository, plus `run.log`.
    pub workspace_dir: PathBuf,
    /// Length of the trailing window in days.
    pub limit_days_before: i64,
    /// Acceptance patterns (regular expressions) tested against commit subjects.
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub send: SendConfig,
    /// Locale identifier used for report dates, e.g. `pt-BR`.
    #[serde(default = "default_locale")]
    pub locale_date: String,
    #[serde(default)]
    pub record_format: RecordFormat,
    #[serde(default)]
    pub on_failure: FailurePolicy,
    #[serde(default)]
    pub remote: RemoteConfig,
    pub repositories: Vec<RepositorySpec>,
}

fn default_locale() -> String {
    "en-US".to_string()
}

impl AuditConfig {
    pub fn trace_loaded(&self) {
        info!(
            workspace_dir = %self.workspace_dir.display(),
            limit_days_before = self.limit_days_before,
            patterns_count = self.patterns.len(),
            repositories_count = self.repositories.len(),
            on_failure = ?self.on_failure,
            "Loaded AuditConfig"
        );
        for repository in &self.repositories {
            repository.trace_loaded();
        }
        debug!(send = ?self.send, locale = %self.locale_date, "AuditConfig report options");
    }
}

/// Which classifications end up in the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendConfig {
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub not_accepted: bool,
}

/// What to do with the rest of the batch once one repository fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing repository; no report, no mail.
    #[default]
    AbortAll,
    /// Record the failure and keep going; report the repositories that succeeded.
    ReportSucceeded,
}

/// Identity of one audited repository as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySpec {
    pub name: String,
    /// Path relative to `remote.base_url`, or a complete clone URL.
    pub url: String,
    pub branch: String,
}

impl RepositorySpec {
    pub fn trace_loaded(&self) {
        info!(
            name = %self.name,
            url = %self.url,
            branch = %self.branch,
            "Loaded repository"
        );
    }
}

/// Where relative repository URLs are cloned from, and with which credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
}

fn default_protocol() -> String {
    "https".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            base_url: String::new(),
            user: None,
            pass: None,
        }
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("protocol", &self.protocol)
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "***"))
            .finish()
    }
}

impl RemoteConfig {
    /// URL handed to `git clone` for `repository`.
    ///
    /// Absolute (`scheme://`) and scp-like (`git@host:path`) repository URLs are
    /// used as they are. Relative ones are joined onto `protocol://base_url/`, with
    /// the configured credentials percent-encoded into the authority.
    pub fn clone_url(&self, repository: &RepositorySpec) -> String {
        self.build_url(repository, false)
    }

    /// Same as [`RemoteConfig::clone_url`] with the password masked, for logs.
    pub fn redacted_url(&self, repository: &RepositorySpec) -> String {
        self.build_url(repository, true)
    }

    fn build_url(&self, repository: &RepositorySpec, redact: bool) -> String {
        if is_complete_url(&repository.url) {
            return repository.url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        let path = repository.url.trim_start_matches('/');
        let plain = format!("{}://{}/{}", self.protocol, base, path);

        let Ok(mut parsed) = url::Url::parse(&plain) else {
            return plain;
        };
        if let Some(user) = &self.user {
            // file URLs and URLs without a host cannot carry credentials
            if parsed.set_username(user).is_err() {
                warn!(
                    repository = %repository.name,
                    protocol = %self.protocol,
                    "Clone URL cannot carry a user name, cloning without credentials"
                );
                return parsed.to_string();
            }
            let password = self.pass.as_deref().map(|p| if redact { "***" } else { p });
            if parsed.set_password(password).is_err() {
                warn!(
                    repository = %repository.name,
                    protocol = %self.protocol,
                    "Clone URL cannot carry a password, cloning without it"
                );
            }
        }
        parsed.to_string()
    }
}

fn is_complete_url(url: &str) -> bool {
    if url.contains("://") {
        return true;
    }
    // scp-like syntax: user@host:path
    match (url.find('@'), url.find(':')) {
        (Some(at), Some(colon)) => at < colon,
        _ => false,
    }
}
