// Exercises GitClient against a throwaway local repository; requires `git` on PATH.

use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use commit_audit_core::config::{RemoteConfig, RepositorySpec};
use commit_audit_core::contract::VcsClient;
use commit_audit_core::record::{parse_records, RecordFormat};
use commit_audit_core::workspace::{reset_workspace, working_copy_path, GitClient};
use commit_audit_core::AuditError;
use tempfile::tempdir;

fn git(dir: &Path, args: &[&str], date: &str) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "user.name=Ana Lima", "-c", "user.email=ana@example.com"])
        .args(args)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .status()
        .expect("git should be installed");
    assert!(status.success(), "git {args:?} failed");
}

fn origin_with_commits(root: &Path) -> std::path::PathBuf {
    let origin = root.join("origin");
    std::fs::create_dir_all(&origin).unwrap();
    git(&origin, &["init", "--quiet", "-b", "main"], "2024-01-01T00:00:00Z");
    git(
        &origin,
        &["commit", "--quiet", "--allow-empty", "-m", "feat: add \"login\" {v2}, [beta]"],
        "2024-01-01T10:00:00+00:00",
    );
    git(
        &origin,
        &["commit", "--quiet", "--allow-empty", "-m", "wip"],
        "2024-01-02T11:30:00+00:00",
    );
    origin
}

fn spec_for(origin: &Path, branch: &str) -> RepositorySpec {
    RepositorySpec {
        name: "origin".to_string(),
        url: format!("file://{}", origin.display()),
        branch: branch.to_string(),
    }
}

#[tokio::test]
async fn clone_and_fetch_delimited_history() {
    let root = tempdir().unwrap();
    let origin = origin_with_commits(root.path());
    let workspace = root.path().join("workspace");
    reset_workspace(&workspace).await.unwrap();

    let client = GitClient::new(RemoteConfig::default());
    let spec = spec_for(&origin, "main");
    let copy = working_copy_path(&workspace, &spec).unwrap();

    client.materialize_working_copy(&spec, &copy).await.unwrap();
    // a second materialization replaces the stale copy
    client.materialize_working_copy(&spec, &copy).await.unwrap();

    let raw = client
        .fetch_history(&spec, &copy, RecordFormat::Delimited)
        .await
        .unwrap();
    let commits = parse_records(&spec.name, &raw, RecordFormat::Delimited).unwrap();

    let subjects: Vec<_> = commits.iter().map(|c| c.subject.as_str()).collect();
    assert_eq!(subjects, vec!["wip", "feat: add \"login\" {v2}, [beta]"]);
    assert_eq!(commits[0].committer, "Ana Lima");
    assert_eq!(commits[0].email, "ana@example.com");
    assert_eq!(
        commits[0].date.with_timezone(&Utc),
        DateTime::parse_from_rfc3339("2024-01-02T11:30:00Z").unwrap()
    );
}

#[tokio::test]
async fn legacy_json_history_uses_sanitized_subjects() {
    let root = tempdir().unwrap();
    let origin = origin_with_commits(root.path());
    let workspace = root.path().join("workspace");
    reset_workspace(&workspace).await.unwrap();

    let client = GitClient::new(RemoteConfig::default());
    let spec = spec_for(&origin, "main");
    let copy = working_copy_path(&workspace, &spec).unwrap();
    client.materialize_working_copy(&spec, &copy).await.unwrap();

    let raw = client
        .fetch_history(&spec, &copy, RecordFormat::Json)
        .await
        .unwrap();
    let commits = parse_records(&spec.name, &raw, RecordFormat::Json).unwrap();

    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].subject, "wip");
    assert!(!commits[1].subject.contains('"'));
}

#[tokio::test]
async fn unknown_branch_is_a_clone_error() {
    let root = tempdir().unwrap();
    let origin = origin_with_commits(root.path());
    let workspace = root.path().join("workspace");
    reset_workspace(&workspace).await.unwrap();

    let client = GitClient::new(RemoteConfig::default());
    let spec = spec_for(&origin, "does-not-exist");

    let err = client
        .materialize_working_copy(&spec, &working_copy_path(&workspace, &spec).unwrap())
        .await
        .unwrap_err();

    match err {
        AuditError::Clone { repository, exit_code } => {
            assert_eq!(repository, "origin");
            assert!(matches!(exit_code, Some(code) if code != 0));
        }
        other => panic!("expected clone error, got {other:?}"),
    }
}

#[tokio::test]
async fn log_outside_a_repository_is_a_fetch_error() {
    let root = tempdir().unwrap();
    let client = GitClient::new(RemoteConfig::default());
    let spec = spec_for(root.path(), "main");

    let err = client
        .fetch_history(&spec, &root.path().join("missing"), RecordFormat::Delimited)
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::Fetch { .. }), "got {err:?}");
}

#[tokio::test]
async fn missing_git_binary_is_a_spawn_error() {
    let root = tempdir().unwrap();
    let client = GitClient::new(RemoteConfig::default()).with_program("/nonexistent/git");
    let spec = spec_for(root.path(), "main");

    let err = client
        .fetch_history(&spec, root.path(), RecordFormat::Delimited)
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::Spawn { .. }));
}

#[tokio::test]
async fn reset_workspace_clears_previous_content() {
    let root = tempdir().unwrap();
    let workspace = root.path().join("workspace");
    std::fs::create_dir_all(workspace.join("stale")).unwrap();
    std::fs::write(workspace.join("run.log"), "old").unwrap();

    reset_workspace(&workspace).await.unwrap();

    assert!(workspace.is_dir());
    assert_eq!(std::fs::read_dir(&workspace).unwrap().count(), 0);
}
