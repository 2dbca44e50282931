//! Trailing-window filter and pattern classification.

use chrono::{DateTime, Duration, TimeZone};
use regex::Regex;

use crate::error::AuditError;
use crate::record::Commit;

/// Start of the trailing window `[now - days, now]`, or `None` when it lies
/// before the earliest representable instant.
pub fn window_cutoff<Tz: TimeZone>(now: &DateTime<Tz>, days: i64) -> Option<DateTime<Tz>> {
    Duration::try_days(days).and_then(|span| now.clone().checked_sub_signed(span))
}

/// Keep the commits dated at or after `now - days`. Order is preserved.
///
/// A window reaching past the representable range keeps every commit.
pub fn filter_window<Tz: TimeZone>(
    commits: Vec<Commit>,
    now: &DateTime<Tz>,
    days: i64,
) -> Vec<Commit> {
    let Some(cutoff) = window_cutoff(now, days) else {
        tracing::debug!(days, "Window start out of range, keeping all commits");
        return commits;
    };
    commits
        .into_iter()
        .filter(|commit| commit.date >= cutoff)
        .collect()
}

/// Compiled acceptance patterns, matched as a logical OR.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, AuditError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| AuditError::Pattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// True iff any pattern matches somewhere in `subject`.
    pub fn accepts(&self, subject: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(subject))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Commits split by whether their subject matched an acceptance pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub accepted: Vec<Commit>,
    pub rejected: Vec<Commit>,
}

/// Partition `commits`; every commit lands in exactly one list, in input order.
pub fn classify(commits: Vec<Commit>, patterns: &PatternSet) -> Classification {
    let (accepted, rejected) = commits
        .into_iter()
        .partition(|commit| patterns.accepts(&commit.subject));
    Classification { accepted, rejected }
}
