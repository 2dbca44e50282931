//! High-level pipeline: orchestrates fetch → parse → window → classify → aggregate
//! for every configured repository, then renders and delivers the report.
//!
//! Repositories are processed strictly one at a time in configured order; the report
//! lists them in that same order. Each repository yields an explicit result, and the
//! configured [`FailurePolicy`] decides what a failure does to the batch:
//!   - [`FailurePolicy::AbortAll`] stops at the first failure. Later repositories are not
//!     processed and no report or mail is produced.
//!   - [`FailurePolicy::ReportSucceeded`] records the failure and carries on, reporting
//!     the repositories that did succeed.
//!
//! Configuration errors (an invalid acceptance pattern, a repository name that does not
//! map to its own directory inside the workspace) fail the batch before any repository
//! is touched, whatever the policy.
//!
//! # Navigation
//! - Per repository: [`audit_repository`]
//! - Whole batch: [`audit_all`]
//! - Batch plus report file plus mail: [`run_audit`]

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use tracing::{error, info, warn};

use crate::classify::{classify, filter_window, PatternSet};
use crate::config::{AuditConfig, FailurePolicy, RepositorySpec};
use crate::contract::{Mailer, VcsClient};
use crate::error::AuditError;
use crate::notify::{build_mail, MailSettings};
use crate::record::parse_records;
use crate::report::{render_report, write_report_file, Report, ReportOptions};
use crate::repository::Repository;
use crate::workspace::{check_repository_names, reset_workspace, working_copy_path};

/// A repository that could not be audited in this run.
#[derive(Debug)]
pub struct RepositoryFailure {
    pub name: String,
    pub error: AuditError,
}

/// Per-repository results of one run, in configured order.
#[derive(Debug, Default)]
pub struct AuditBatch {
    pub repositories: Vec<Repository>,
    pub failures: Vec<RepositoryFailure>,
}

/// Outcome of a complete run, including delivery.
#[derive(Debug)]
pub struct RunSummary {
    pub report: Report,
    pub report_path: PathBuf,
    pub message_id: String,
    pub audited: usize,
    pub failures: Vec<RepositoryFailure>,
}

/// Run the full sub-pipeline for one repository.
pub async fn audit_repository<V>(
    vcs: &V,
    config: &AuditConfig,
    patterns: &PatternSet,
    spec: &RepositorySpec,
    now: &DateTime<FixedOffset>,
) -> Result<Repository, AuditError>
where
    V: VcsClient + ?Sized,
{
    let working_copy = working_copy_path(&config.workspace_dir, spec)?;

    vcs.materialize_working_copy(spec, &working_copy).await?;
    let raw = vcs
        .fetch_history(spec, &working_copy, config.record_format)
        .await?;

    let commits = parse_records(&spec.name, &raw, config.record_format)?;
    let parsed = commits.len();
    let recent = filter_window(commits, now, config.limit_days_before);
    let in_window = recent.len();
    let classification = classify(recent, patterns);

    info!(
        repository = %spec.name,
        parsed,
        in_window,
        accepted = classification.accepted.len(),
        rejected = classification.rejected.len(),
        "[AUDIT] Classified commits"
    );

    Ok(Repository::from(spec).with_classification(classification))
}

/// Audit every configured repository, honouring the failure policy.
pub async fn audit_all<V>(
    vcs: &V,
    config: &AuditConfig,
    now: &DateTime<FixedOffset>,
) -> Result<AuditBatch, AuditError>
where
    V: VcsClient + ?Sized,
{
    let patterns = PatternSet::compile(&config.patterns)?;
    check_repository_names(&config.repositories)?;
    let mut batch = AuditBatch::default();

    for spec in &config.repositories {
        info!(repository = %spec.name, branch = %spec.branch, "[AUDIT] Starting repository");
        match audit_repository(vcs, config, &patterns, spec, now).await {
            Ok(repository) => batch.repositories.push(repository),
            Err(e) => match config.on_failure {
                FailurePolicy::AbortAll => {
                    error!(repository = %spec.name, error = %e, "[AUDIT][ERROR] Aborting run");
                    return Err(e);
                }
                FailurePolicy::ReportSucceeded => {
                    warn!(repository = %spec.name, error = %e, "[AUDIT] Repository failed, continuing");
                    batch.failures.push(RepositoryFailure {
                        name: spec.name.clone(),
                        error: e,
                    });
                }
            },
        }
    }

    info!(
        audited = batch.repositories.len(),
        failed = batch.failures.len(),
        "[AUDIT] Batch finished"
    );
    Ok(batch)
}

/// One complete run: clean workspace, audit, render, write `run.log`, send mail.
pub async fn run_audit<V, M>(
    vcs: &V,
    mailer: &M,
    config: &AuditConfig,
    mail: &MailSettings,
    now: &DateTime<FixedOffset>,
) -> Result<RunSummary, AuditError>
where
    V: VcsClient + ?Sized,
    M: Mailer + ?Sized,
{
    info!(now = %now, "[AUDIT] Starting audit run");
    reset_workspace(&config.workspace_dir).await?;

    let batch = audit_all(vcs, config, now).await?;

    let report = render_report(&batch.repositories, &ReportOptions::from_config(config));
    let report_path = write_report_file(&config.workspace_dir, &report).await?;

    let outgoing = build_mail(mail, &report, &report_path);
    let message_id = mailer.send(outgoing).await.map_err(|source| {
        error!(error = %source, "[AUDIT][ERROR] Failed to send report mail");
        AuditError::Delivery { source }
    })?;
    info!(message_id = %message_id, has_content = report.has_content, "[AUDIT] Report mail sent");

    Ok(RunSummary {
        report,
        report_path,
        message_id,
        audited: batch.repositories.len(),
        failures: batch.failures,
    })
}
