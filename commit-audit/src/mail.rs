//! Mail transports implementing [`Mailer`].
//!
//! [`SmtpMailer`] delivers through a pooled `lettre` SMTP transport and is the
//! usual choice. [`SendmailMailer`] hands the message to a local
//! sendmail-compatible program. [`StdoutMailer`] prints it instead, for dry runs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use commit_audit_core::contract::{MailError, Mailer, OutgoingMail};
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{
    AsyncSendmailTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::load_config::{SmtpSettings, SmtpTls};

/// An attachment's name and raw bytes, read from disk before composing.
pub struct LoadedAttachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Delivers mail through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
    port: u16,
}

impl SmtpMailer {
    /// Build the transport. No connection is opened until [`Mailer::verify`]
    /// or the first send.
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let parameters = || {
            TlsParameters::builder(settings.host.clone())
                .dangerous_accept_invalid_certs(settings.accept_invalid_certs)
                .build()
        };
        let tls = match settings.tls {
            SmtpTls::None => Tls::None,
            SmtpTls::Opportunistic => Tls::Opportunistic(parameters()?),
            SmtpTls::Required => Tls::Required(parameters()?),
            SmtpTls::Wrapper => Tls::Wrapper(parameters()?),
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            .port(settings.port)
            .tls(tls);
        if let Some(user) = &settings.user {
            builder = builder.credentials(Credentials::new(
                user.clone(),
                settings.pass.clone().unwrap_or_default(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            host: settings.host.clone(),
            port: settings.port,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => {
                tracing::info!(host = %self.host, port = self.port, "E-mail configuration: Success.");
                Ok(())
            }
            Ok(false) => {
                tracing::error!(host = %self.host, port = self.port, "SMTP connection test failed");
                Err(format!("SMTP server {}:{} failed the connection test", self.host, self.port).into())
            }
            Err(e) => {
                tracing::error!(error = %e, host = %self.host, port = self.port, "SMTP connection test failed");
                Err(Box::new(e))
            }
        }
    }

    async fn send(&self, mail: OutgoingMail) -> Result<String, MailError> {
        let attachments = load_attachments(&mail).await?;
        let message_id = new_message_id();
        let message = build_message(&mail, &attachments, &message_id)?;

        let response = self.transport.send(message).await.map_err(|e| {
            tracing::error!(error = %e, host = %self.host, "SMTP delivery failed");
            e
        })?;

        tracing::info!(
            message_id = %message_id,
            recipients = mail.to.len(),
            code = %response.code(),
            "Send Email - Success"
        );
        Ok(message_id)
    }
}

/// Delivers mail through a local sendmail-compatible executable.
pub struct SendmailMailer {
    program: PathBuf,
    transport: AsyncSendmailTransport<Tokio1Executor>,
}

impl SendmailMailer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        Self {
            transport: AsyncSendmailTransport::new_with_command(program.clone()),
            program,
        }
    }
}

#[async_trait]
impl Mailer for SendmailMailer {
    async fn verify(&self) -> Result<(), MailError> {
        match resolve_program(&self.program) {
            Some(path) => {
                tracing::info!(program = %path.display(), "E-mail configuration: Success.");
                Ok(())
            }
            None => {
                tracing::error!(program = %self.program.display(), "sendmail program not found");
                Err(format!("sendmail program {} not found", self.program.display()).into())
            }
        }
    }

    async fn send(&self, mail: OutgoingMail) -> Result<String, MailError> {
        let attachments = load_attachments(&mail).await?;
        let message_id = new_message_id();
        let message = build_message(&mail, &attachments, &message_id)?;

        self.transport.send(message).await.map_err(|e| {
            tracing::error!(error = %e, program = %self.program.display(), "sendmail delivery failed");
            e
        })?;

        tracing::info!(message_id = %message_id, recipients = mail.to.len(), "Send Email - Success");
        Ok(message_id)
    }
}

/// Prints mails to stdout instead of sending them.
#[derive(Default)]
pub struct StdoutMailer;

#[async_trait]
impl Mailer for StdoutMailer {
    async fn verify(&self) -> Result<(), MailError> {
        Ok(())
    }

    async fn send(&self, mail: OutgoingMail) -> Result<String, MailError> {
        let attachments = load_attachments(&mail).await?;
        println!("To: {}", mail.to.join(", "));
        println!("Subject: {}", mail.subject);
        if let Some(text) = &mail.text {
            println!("\n{text}");
        }
        for attachment in &attachments {
            println!("\n--- {} ---", attachment.filename);
            println!("{}", String::from_utf8_lossy(&attachment.content));
        }
        Ok(new_message_id())
    }
}

fn new_message_id() -> String {
    format!("<{}@commit-audit>", Uuid::new_v4())
}

async fn load_attachments(mail: &OutgoingMail) -> Result<Vec<LoadedAttachment>, MailError> {
    let mut loaded = Vec::with_capacity(mail.attachments.len());
    for attachment in &mail.attachments {
        let content = tokio::fs::read(&attachment.path)
            .await
            .map_err(|e| format!("failed to read attachment {}: {e}", attachment.path.display()))?;
        loaded.push(LoadedAttachment {
            filename: attachment.filename.clone(),
            content,
        });
    }
    Ok(loaded)
}

/// Build the RFC 5322 message for `mail`: `text/plain` when there is nothing
/// to attach, `multipart/mixed` otherwise.
pub fn build_message(
    mail: &OutgoingMail,
    attachments: &[LoadedAttachment],
    message_id: &str,
) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(mail.from.parse::<Mailbox>()?)
        .subject(mail.subject.clone())
        .message_id(Some(message_id.to_string()))
        .date_now();
    for recipient in &mail.to {
        builder = builder.to(recipient.parse::<Mailbox>()?);
    }

    if attachments.is_empty() {
        let body = mail.text.clone().unwrap_or_default();
        return Ok(builder.header(ContentType::TEXT_PLAIN).body(body)?);
    }

    let text = mail.text.iter().map(|text| SinglePart::plain(text.clone()));
    let files = attachments.iter().map(|attachment| {
        MailAttachment::new(attachment.filename.clone())
            .body(attachment.content.clone(), ContentType::TEXT_PLAIN)
    });
    let multipart = text
        .chain(files)
        .fold(None, |parts: Option<MultiPart>, part| {
            Some(match parts {
                None => MultiPart::mixed().singlepart(part),
                Some(parts) => parts.singlepart(part),
            })
        })
        .ok_or("multipart message without parts")?;

    Ok(builder.multipart(multipart)?)
}

fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
