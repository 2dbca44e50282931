//! Raw `git log` output → ordered [`Commit`] values.
//!
//! Two record formats are understood:
//!
//! - [`RecordFormat::Delimited`] (default): fields separated by the ASCII unit
//!   separator and records terminated by the record separator, so commit subjects
//!   may contain any printable character.
//! - [`RecordFormat::Json`]: the legacy object-per-line stream
//!   `{"subject": .., "commiter": .., "date": .., "email": ..},` with a trailing
//!   comma and no enclosing brackets. Subjects containing quotes or braces break it,
//!   which is why `%f` (the sanitized subject) is requested for this format.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::AuditError;

const FIELD_SEPARATOR: char = '\u{1f}';
const RECORD_SEPARATOR: char = '\u{1e}';

/// One commit as reported by `git log`. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub subject: String,
    pub committer: String,
    pub date: DateTime<FixedOffset>,
    pub email: String,
}

/// Wire format of the history stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    #[default]
    Delimited,
    Json,
}

impl RecordFormat {
    /// Value for `git log --pretty=format:<..>`.
    pub fn pretty_format(self) -> &'static str {
        match self {
            RecordFormat::Delimited => "%s%x1f%cN%x1f%cD%x1f%cE%x1e",
            RecordFormat::Json => {
                r#"{"subject": "%f", "commiter": "%cN", "date": "%cD", "email": "%cE"},"#
            }
        }
    }
}

#[derive(Deserialize)]
struct JsonRecord {
    subject: String,
    #[serde(rename = "commiter", alias = "committer")]
    committer: String,
    date: String,
    email: String,
}

/// Parse the raw history of `repository` into commits, preserving order.
///
/// An empty stream yields no commits. A malformed stream is a
/// [`AuditError::Parse`]; an unparseable date is a [`AuditError::DateParse`].
pub fn parse_records(
    repository: &str,
    raw: &str,
    format: RecordFormat,
) -> Result<Vec<Commit>, AuditError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let commits = match format {
        RecordFormat::Json => parse_json(repository, raw)?,
        RecordFormat::Delimited => parse_delimited(repository, raw)?,
    };
    tracing::debug!(repository, commits = commits.len(), ?format, "Parsed commit records");
    Ok(commits)
}

fn parse_json(repository: &str, raw: &str) -> Result<Vec<Commit>, AuditError> {
    let Some(body) = raw.trim_end().strip_suffix(',') else {
        return Err(parse_error(repository, raw, "missing trailing record separator ','"));
    };
    let document = format!("[{body}]");
    let records: Vec<JsonRecord> = serde_json::from_str(&document)
        .map_err(|e| parse_error(repository, raw, &e.to_string()))?;

    records
        .into_iter()
        .map(|r| build_commit(repository, r.subject, r.committer, &r.date, r.email))
        .collect()
}

fn parse_delimited(repository: &str, raw: &str) -> Result<Vec<Commit>, AuditError> {
    let body = raw.trim_end_matches(['\n', '\r']);
    let Some(body) = body.strip_suffix(RECORD_SEPARATOR) else {
        return Err(parse_error(repository, raw, "missing trailing record separator"));
    };

    body.split(RECORD_SEPARATOR)
        .map(|record| {
            let record = record.trim_start_matches(['\n', '\r']);
            let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
            match fields.as_slice() {
                [subject, committer, date, email] => build_commit(
                    repository,
                    subject.to_string(),
                    committer.to_string(),
                    date,
                    email.to_string(),
                ),
                _ => Err(parse_error(
                    repository,
                    raw,
                    &format!("expected 4 fields per record, found {}", fields.len()),
                )),
            }
        })
        .collect()
}

fn build_commit(
    repository: &str,
    subject: String,
    committer: String,
    date: &str,
    email: String,
) -> Result<Commit, AuditError> {
    let date = parse_date(repository, date)?;
    Ok(Commit {
        subject,
        committer,
        date,
        email,
    })
}

/// Parse an RFC 2822 date as printed by `git log --format=%cD`.
pub fn parse_date(repository: &str, date: &str) -> Result<DateTime<FixedOffset>, AuditError> {
    DateTime::parse_from_rfc2822(date.trim()).map_err(|source| AuditError::DateParse {
        repository: repository.to_string(),
        date: date.to_string(),
        source,
    })
}

fn parse_error(repository: &str, raw: &str, reason: &str) -> AuditError {
    tracing::error!(repository, reason, "Malformed commit record stream");
    AuditError::Parse {
        repository: repository.to_string(),
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}
