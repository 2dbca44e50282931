/// `load_config` module: Loads a static YAML config, injects secrets from the
/// environment and validates it into the typed [`CliConfig`].
///
/// This module is the only place where user-supplied YAML is parsed. Acceptance
/// patterns are compiled once here so a typo surfaces before any repository is
/// cloned.
///
/// # Secrets
/// Credentials may be kept out of the file: `COMMIT_AUDIT_GIT_USER` and
/// `COMMIT_AUDIT_GIT_PASS` override `remote.user` / `remote.pass`;
/// `COMMIT_AUDIT_SMTP_USER` and `COMMIT_AUDIT_SMTP_PASS` override
/// `mailer.smtp.user` / `mailer.smtp.pass`.
use anyhow::{Context, Result};
use commit_audit_core::classify::PatternSet;
use commit_audit_core::config::AuditConfig;
use commit_audit_core::notify::MailSettings;
use commit_audit_core::workspace::check_repository_names;
use lettre::message::Mailbox;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const GIT_USER_ENV: &str = "COMMIT_AUDIT_GIT_USER";
pub const GIT_PASS_ENV: &str = "COMMIT_AUDIT_GIT_PASS";
pub const SMTP_USER_ENV: &str = "COMMIT_AUDIT_SMTP_USER";
pub const SMTP_PASS_ENV: &str = "COMMIT_AUDIT_SMTP_PASS";

/// Upper bound for `limit_days_before`, one century.
pub const MAX_LIMIT_DAYS: i64 = 36_500;

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub audit: AuditConfig,
    pub mailer: MailerSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
}

#[derive(Debug, Deserialize)]
pub struct MailerSection {
    #[serde(flatten)]
    pub settings: MailSettings,
    /// SMTP relay; when absent mail goes through `sendmail`.
    #[serde(default)]
    pub smtp: Option<SmtpSettings>,
    /// sendmail-compatible executable used when no SMTP relay is configured.
    #[serde(default = "default_sendmail")]
    pub sendmail: PathBuf,
}

/// Connection settings of the SMTP relay.
#[derive(Clone, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
    #[serde(default)]
    pub tls: SmtpTls,
    /// Accept self-signed or otherwise invalid server certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_smtp_port() -> u16 {
    587
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "***"))
            .field("tls", &self.tls)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpTls {
    /// Plain text only.
    None,
    /// STARTTLS when the server offers it.
    #[default]
    Opportunistic,
    /// STARTTLS, failing when the server does not offer it.
    Required,
    /// TLS from the first byte (SMTPS, usually port 465).
    Wrapper,
}

fn default_sendmail() -> PathBuf {
    PathBuf::from("sendmail")
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleSection {
    /// Period between runs of `commit-audit watch`.
    #[serde(default)]
    pub every_minutes: Option<u64>,
}

/// Loads a static YAML config file and injects secrets from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if let Ok(user) = std::env::var(GIT_USER_ENV) {
        info!(var = GIT_USER_ENV, "Git user injected from environment");
        config.audit.remote.user = Some(user);
    }
    if let Ok(pass) = std::env::var(GIT_PASS_ENV) {
        info!(var = GIT_PASS_ENV, "Git password injected from environment");
        config.audit.remote.pass = Some(pass);
    }
    if let Some(smtp) = config.mailer.smtp.as_mut() {
        if let Ok(user) = std::env::var(SMTP_USER_ENV) {
            info!(var = SMTP_USER_ENV, "SMTP user injected from environment");
            smtp.user = Some(user);
        }
        if let Ok(pass) = std::env::var(SMTP_PASS_ENV) {
            info!(var = SMTP_PASS_ENV, "SMTP password injected from environment");
            smtp.pass = Some(pass);
        }
    }

    validate(&config)?;
    config.audit.trace_loaded();
    Ok(config)
}

fn validate(config: &CliConfig) -> Result<()> {
    PatternSet::compile(&config.audit.patterns).context("Invalid acceptance pattern in config")?;

    check_repository_names(&config.audit.repositories)
        .context("Invalid repository list in config")?;

    if !(0..=MAX_LIMIT_DAYS).contains(&config.audit.limit_days_before) {
        anyhow::bail!(
            "limit_days_before must be between 0 and {MAX_LIMIT_DAYS}, got {}",
            config.audit.limit_days_before
        );
    }

    let mail = &config.mailer.settings;
    if mail.to.is_empty() {
        anyhow::bail!("mailer.to must name at least one recipient");
    }
    for (field, value) in [("mailer.from", &mail.from), ("mailer.subject", &mail.subject)]
        .into_iter()
        .chain(mail.to.iter().map(|to| ("mailer.to", to)))
    {
        if value.chars().any(char::is_control) {
            anyhow::bail!("{field} must not contain control characters, got {value:?}");
        }
        if field != "mailer.subject" {
            value
                .parse::<Mailbox>()
                .with_context(|| format!("{field} is not a valid mail address: {value:?}"))?;
        }
    }
    if let Some(smtp) = &config.mailer.smtp {
        if smtp.host.trim().is_empty() {
            anyhow::bail!("mailer.smtp.host must not be empty");
        }
        if smtp.pass.is_some() && smtp.user.is_none() {
            warn!("mailer.smtp.pass is set without a user; authentication is skipped");
        }
    }
    if config.schedule.every_minutes == Some(0) {
        anyhow::bail!("schedule.every_minutes must be greater than zero");
    }
    if config.audit.repositories.is_empty() {
        warn!("No repositories configured; reports will always be empty");
    }
    if !config.audit.send.accepted && !config.audit.send.not_accepted {
        warn!("Neither send.accepted nor send.not_accepted is set; reports will always be empty");
    }
    Ok(())
}
