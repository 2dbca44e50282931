use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::{RemoteConfig, RepositorySpec};
use crate::contract::VcsClient;
use crate::error::AuditError;
use crate::record::RecordFormat;

/// Remove and recreate the workspace directory so every run starts clean.
pub async fn reset_workspace(dir: &Path) -> Result<(), AuditError> {
    let to_error = |source| AuditError::Workspace {
        path: dir.to_path_buf(),
        source,
    };
    if tokio::fs::try_exists(dir).await.map_err(to_error)? {
        tokio::fs::remove_dir_all(dir).await.map_err(to_error)?;
        tracing::debug!(path = %dir.display(), "Removed existing workspace");
    }
    tokio::fs::create_dir_all(dir).await.map_err(to_error)?;
    tracing::info!(path = %dir.display(), "Prepared clean workspace");
    Ok(())
}

/// Directory name of a repository's working copy.
///
/// The name must be a single, ordinary path component: empty names, `.`, `..`
/// and names containing path separators are rejected. `:` is replaced by `_`.
pub fn working_copy_dir_name(name: &str) -> Result<String, AuditError> {
    let reject = |reason: &str| {
        tracing::error!(repository = name, reason, "Rejected repository name");
        Err(AuditError::RepositoryName {
            repository: name.to_string(),
            reason: reason.to_string(),
        })
    };
    if name.trim().is_empty() {
        return reject("name is empty");
    }
    if name.contains(['/', '\\']) {
        return reject("name contains a path separator");
    }
    if name.chars().any(char::is_control) {
        return reject("name contains control characters");
    }

    let dir_name = name.replace(':', "_");
    let mut components = Path::new(&dir_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(dir_name),
        _ => reject("name does not denote a directory inside the workspace"),
    }
}

/// Deterministic location of a repository's working copy: always a direct
/// child of `workspace_dir`.
pub fn working_copy_path(
    workspace_dir: &Path,
    repository: &RepositorySpec,
) -> Result<PathBuf, AuditError> {
    Ok(workspace_dir.join(working_copy_dir_name(&repository.name)?))
}

/// Check every name and that no two repositories share a working copy.
pub fn check_repository_names(repositories: &[RepositorySpec]) -> Result<(), AuditError> {
    let mut seen = HashSet::new();
    for repository in repositories {
        let dir_name = working_copy_dir_name(&repository.name)?;
        if !seen.insert(dir_name.clone()) {
            tracing::error!(
                repository = %repository.name,
                dir_name = %dir_name,
                "Duplicate working copy directory"
            );
            return Err(AuditError::RepositoryName {
                repository: repository.name.clone(),
                reason: format!("working copy directory {dir_name:?} is used by another repository"),
            });
        }
    }
    Ok(())
}

/// [`VcsClient`] backed by the `git` executable.
pub struct GitClient {
    remote: RemoteConfig,
    program: PathBuf,
}

impl GitClient {
    pub fn new(remote: RemoteConfig) -> Self {
        Self {
            remote,
            program: PathBuf::from("git"),
        }
    }

    /// Use a specific `git` executable instead of the one on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl VcsClient for GitClient {
    async fn materialize_working_copy(
        &self,
        repository: &RepositorySpec,
        destination: &Path,
    ) -> Result<(), AuditError> {
        if destination.file_name().is_none() {
            return Err(AuditError::RepositoryName {
                repository: repository.name.clone(),
                reason: format!("{} is not a working copy directory", destination.display()),
            });
        }

        let to_error = |source| AuditError::Workspace {
            path: destination.to_path_buf(),
            source,
        };
        if tokio::fs::try_exists(destination).await.map_err(to_error)? {
            tokio::fs::remove_dir_all(destination).await.map_err(to_error)?;
            tracing::debug!(path = %destination.display(), "Removed stale working copy");
        }

        let redacted = self.remote.redacted_url(repository);

        // `git clone <url> -b <branch> <destination>`
        let status = Command::new(&self.program)
            .arg("clone")
            .arg("--quiet")
            .arg(self.remote.clone_url(repository))
            .arg("-b")
            .arg(&repository.branch)
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .await;

        match status {
            Ok(s) if s.success() => {
                tracing::info!(
                    repository = %repository.name,
                    url = %redacted,
                    branch = %repository.branch,
                    path = %destination.display(),
                    "Cloned git repository"
                );
                Ok(())
            }
            Ok(s) => {
                tracing::error!(
                    repository = %repository.name,
                    url = %redacted,
                    branch = %repository.branch,
                    "Git clone exited with non-zero code: {}", s
                );
                Err(AuditError::Clone {
                    repository: repository.name.clone(),
                    exit_code: s.code(),
                })
            }
            Err(e) => {
                tracing::error!(
                    error = ?e,
                    repository = %repository.name,
                    url = %redacted,
                    "Failed to launch git clone"
                );
                Err(AuditError::Spawn {
                    repository: repository.name.clone(),
                    source: e,
                })
            }
        }
    }

    async fn fetch_history(
        &self,
        repository: &RepositorySpec,
        working_copy: &Path,
        format: RecordFormat,
    ) -> Result<String, AuditError> {
        let output = Command::new(&self.program)
            .arg("-C")
            .arg(working_copy)
            .arg("log")
            .arg(format!("--pretty=format:{}", format.pretty_format()))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, repository = %repository.name, "Failed to launch git log");
                AuditError::Spawn {
                    repository: repository.name.clone(),
                    source: e,
                }
            })?;

        if !output.status.success() {
            tracing::error!(
                repository = %repository.name,
                path = %working_copy.display(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Git log exited with non-zero code: {}", output.status
            );
            return Err(AuditError::Fetch {
                repository: repository.name.clone(),
                exit_code: output.status.code(),
            });
        }

        let raw = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(
            repository = %repository.name,
            bytes = raw.len(),
            "Fetched raw commit history"
        );
        Ok(raw)
    }
}
