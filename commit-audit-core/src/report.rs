//! Text report rendering.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Locale};
use tracing::{debug, info, warn};

use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::record::Commit;
use crate::repository::Repository;

/// File name of the rendered report inside the workspace.
pub const REPORT_FILE_NAME: &str = "run.log";

const SECTION_RULE: &str = "::::::::::::::::::::::::::::";

/// What to include and how to print dates.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub include_accepted: bool,
    pub include_not_accepted: bool,
    pub locale: Locale,
}

impl ReportOptions {
    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            include_accepted: config.send.accepted,
            include_not_accepted: config.send.not_accepted,
            locale: resolve_locale(&config.locale_date),
        }
    }
}

/// Map identifiers such as `pt-BR` or `en_US` onto a chrono locale, falling
/// back to POSIX.
pub fn resolve_locale(identifier: &str) -> Locale {
    let normalized = identifier.trim().replace('-', "_");
    match Locale::try_from(normalized.as_str()) {
        Ok(locale) => locale,
        Err(_) => {
            warn!(locale = identifier, "Unknown locale, using POSIX date format");
            Locale::POSIX
        }
    }
}

/// Rendered report text and whether any repository section was written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub text: String,
    pub has_content: bool,
}

/// Render one section per repository that has something to show.
pub fn render_report(repositories: &[Repository], options: &ReportOptions) -> Report {
    let mut report = Report::default();

    for repository in repositories {
        let emit = (options.include_accepted && repository.has_accepted())
            || (options.include_not_accepted && repository.has_rejected());
        if !emit {
            debug!(repository = %repository.name, "Nothing to report for repository");
            continue;
        }

        report.has_content = true;
        report.text.push_str(&format!("Repository: {}\n", repository.name));
        report.text.push_str(&format!("{SECTION_RULE}\n\n"));

        if options.include_accepted {
            for commit in &repository.accepted_commits {
                push_commit(&mut report.text, commit, &format_date(&commit.date, options.locale));
            }
        }
        if options.include_not_accepted {
            for commit in &repository.rejected_commits {
                push_commit(
                    &mut report.text,
                    commit,
                    &format_date_time(&commit.date, options.locale),
                );
            }
        }

        report.text.push_str("\n\n\n\n");
    }

    info!(
        repositories = repositories.len(),
        has_content = report.has_content,
        bytes = report.text.len(),
        "Rendered report"
    );
    report
}

fn push_commit(out: &mut String, commit: &Commit, date: &str) {
    out.push_str(&format!("Subject: {}\n", commit.subject));
    out.push_str(&format!("Committer: {}\n", commit.committer));
    out.push_str(&format!("Date: {date}\n"));
    out.push_str("--\n");
}

fn format_date(date: &DateTime<FixedOffset>, locale: Locale) -> String {
    date.format_localized("%x", locale).to_string()
}

fn format_date_time(date: &DateTime<FixedOffset>, locale: Locale) -> String {
    date.format_localized("%x %H:%M", locale).to_string()
}

/// Write `report` to `<dir>/run.log`, returning the file path.
pub async fn write_report_file(dir: &Path, report: &Report) -> Result<PathBuf, AuditError> {
    let path = dir.join(REPORT_FILE_NAME);
    tokio::fs::write(&path, report.text.as_bytes())
        .await
        .map_err(|source| AuditError::Workspace {
            path: path.clone(),
            source,
        })?;
    debug!(path = %path.display(), "Wrote report file");
    Ok(path)
}
