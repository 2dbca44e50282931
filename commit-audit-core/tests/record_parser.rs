use chrono::{DateTime, TimeZone, Utc};
use commit_audit_core::record::{parse_records, RecordFormat};
use commit_audit_core::AuditError;

#[test]
fn legacy_stream_with_single_record() {
    let raw = r#"{"subject":"fix: bug","commiter":"Al","date":"Mon, 01 Jan 2024 00:00:00 GMT","email":"a@x.com"},"#;

    let commits = parse_records("api", raw, RecordFormat::Json).expect("stream should parse");

    assert_eq!(commits.len(), 1);
    let commit = &commits[0];
    assert_eq!(commit.subject, "fix: bug");
    assert_eq!(commit.committer, "Al");
    assert_eq!(commit.email, "a@x.com");
    assert_eq!(commit.date, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
}

#[test]
fn legacy_stream_preserves_order_across_lines() {
    let raw = concat!(
        r#"{"subject": "feat-add-login", "commiter": "Ana", "date": "Tue, 2 Jan 2024 10:00:00 -0300", "email": "ana@x.com"},"#,
        "\n",
        r#"{"subject": "wip", "commiter": "Bo", "date": "Mon, 1 Jan 2024 09:30:00 +0100", "email": "bo@x.com"},"#,
    );

    let commits = parse_records("api", raw, RecordFormat::Json).unwrap();

    let subjects: Vec<_> = commits.iter().map(|c| c.subject.as_str()).collect();
    assert_eq!(subjects, vec!["feat-add-login", "wip"]);
    assert_eq!(
        commits[0].date,
        DateTime::parse_from_rfc3339("2024-01-02T10:00:00-03:00").unwrap()
    );
}

#[test]
fn empty_stream_yields_no_commits() {
    for format in [RecordFormat::Json, RecordFormat::Delimited] {
        let commits = parse_records("api", "", format).unwrap();
        assert!(commits.is_empty(), "{format:?} should yield nothing");
    }
}

#[test]
fn unbalanced_braces_are_a_parse_error() {
    let raw = r#"{"subject":"fix: bug","commiter":"Al","date":"Mon, 01 Jan 2024 00:00:00 GMT","email":"a@x.com","#;

    let err = parse_records("api", raw, RecordFormat::Json).unwrap_err();
    match err {
        AuditError::Parse { repository, raw: kept, .. } => {
            assert_eq!(repository, "api");
            assert_eq!(kept, raw);
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn unescaped_quote_in_subject_breaks_legacy_format() {
    let raw = r#"{"subject": "say "hi"", "commiter": "Al", "date": "Mon, 01 Jan 2024 00:00:00 GMT", "email": "a@x.com"},"#;

    let err = parse_records("api", raw, RecordFormat::Json).unwrap_err();
    assert!(matches!(err, AuditError::Parse { .. }));
}

#[test]
fn missing_trailing_separator_is_a_parse_error() {
    let raw = r#"{"subject":"fix: bug","commiter":"Al","date":"Mon, 01 Jan 2024 00:00:00 GMT","email":"a@x.com"}"#;

    let err = parse_records("api", raw, RecordFormat::Json).unwrap_err();
    assert!(matches!(err, AuditError::Parse { .. }));
}

#[test]
fn unparseable_date_is_fatal() {
    let raw = r#"{"subject":"fix: bug","commiter":"Al","date":"yesterday","email":"a@x.com"},"#;

    let err = parse_records("api", raw, RecordFormat::Json).unwrap_err();
    match err {
        AuditError::DateParse { repository, date, .. } => {
            assert_eq!(repository, "api");
            assert_eq!(date, "yesterday");
        }
        other => panic!("expected date error, got {other:?}"),
    }
}

#[test]
fn delimited_stream_tolerates_any_subject_characters() {
    let raw = concat!(
        "fix: handle \"quoted\" {braces}, [brackets] and commas\u{1f}Al\u{1f}Mon, 1 Jan 2024 10:00:00 +0000\u{1f}a@x.com\u{1e}",
        "\n",
        "chore: bump\u{1f}Bo\u{1f}Sun, 31 Dec 2023 23:59:59 +0000\u{1f}b@x.com\u{1e}",
    );

    let commits = parse_records("api", raw, RecordFormat::Delimited).unwrap();

    assert_eq!(commits.len(), 2);
    assert_eq!(
        commits[0].subject,
        "fix: handle \"quoted\" {braces}, [brackets] and commas"
    );
    assert_eq!(commits[1].committer, "Bo");
    assert_eq!(commits[1].email, "b@x.com");
}

#[test]
fn delimited_record_with_missing_field_is_a_parse_error() {
    let raw = "fix: bug\u{1f}Al\u{1f}Mon, 1 Jan 2024 10:00:00 +0000\u{1e}";

    let err = parse_records("api", raw, RecordFormat::Delimited).unwrap_err();
    match err {
        AuditError::Parse { reason, .. } => assert!(reason.contains("4 fields"), "{reason}"),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn pretty_formats_match_their_parsers() {
    assert_eq!(
        RecordFormat::Json.pretty_format(),
        r#"{"subject": "%f", "commiter": "%cN", "date": "%cD", "email": "%cE"},"#
    );
    assert!(RecordFormat::Delimited.pretty_format().ends_with("%x1e"));
}
