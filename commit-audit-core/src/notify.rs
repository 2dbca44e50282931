//! Turning a rendered report into an outgoing mail.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::contract::{Attachment, OutgoingMail};
use crate::report::Report;

/// Name the report carries when attached to a mail.
pub const ATTACHMENT_NAME: &str = "report.log";

/// Addressing and static texts of the report mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailSettings {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    /// Body sent instead of the attachment when the report is empty.
    pub message_ok: String,
}

/// Attach the report file when the report has content, otherwise send the
/// "all clear" text.
pub fn build_mail(settings: &MailSettings, report: &Report, report_path: &Path) -> OutgoingMail {
    let (text, attachments) = if report.has_content {
        (
            None,
            vec![Attachment {
                filename: ATTACHMENT_NAME.to_string(),
                path: report_path.to_path_buf(),
            }],
        )
    } else {
        (Some(settings.message_ok.clone()), Vec::new())
    };

    OutgoingMail {
        from: settings.from.clone(),
        to: settings.to.clone(),
        subject: settings.subject.clone(),
        text,
        attachments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MailSettings {
        MailSettings {
            from: "audit@example.com".into(),
            to: vec!["lead@example.com".into()],
            subject: "Commit audit".into(),
            message_ok: "All commits follow the conventions.".into(),
        }
    }

    #[test]
    fn report_with_content_is_attached() {
        let report = Report {
            text: "Repository: api\n".into(),
            has_content: true,
        };
        let mail = build_mail(&settings(), &report, Path::new("/tmp/ws/run.log"));
        assert_eq!(mail.text, None);
        assert_eq!(mail.attachments.len(), 1);
        assert_eq!(mail.attachments[0].filename, "report.log");
        assert_eq!(mail.attachments[0].path, Path::new("/tmp/ws/run.log"));
    }

    #[test]
    fn empty_report_sends_all_clear_text() {
        let mail = build_mail(&settings(), &Report::default(), Path::new("/tmp/ws/run.log"));
        assert!(mail.attachments.is_empty());
        assert_eq!(mail.text.as_deref(), Some("All commits follow the conventions."));
        assert_eq!(mail.subject, "Commit audit");
    }
}
