///
/// This module implements the CLI interface for commit-audit: command parsing,
/// wiring of the real collaborators (git, SMTP or sendmail) and the one-shot and
/// scheduled entrypoints.
///
/// All pipeline logic lives in the [`commit-audit-core`] crate; this module only
/// constructs and injects the `git` client and the mail transport.
///
/// [`commit-audit-core`]: ../../commit-audit-core/
use crate::load_config::{load_config, CliConfig};
use crate::mail::{SendmailMailer, SmtpMailer, StdoutMailer};
use crate::schedule::watch;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commit_audit_core::audit::{run_audit, RunSummary};
use commit_audit_core::contract::Mailer;
use commit_audit_core::workspace::GitClient;
use std::path::PathBuf;
use std::time::Duration;

/// CLI for commit-audit: audit recent commits of many repositories and mail a report.
#[derive(Parser)]
#[clap(
    name = "commit-audit",
    version,
    about = "Classify recent commits of many git repositories against message patterns and mail a report"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one audit and deliver the report
    Run {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Print the mail to stdout instead of sending it
        #[clap(long)]
        dry_run: bool,
    },
    /// Run audits periodically until interrupted
    Watch {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Minutes between runs; overrides schedule.every_minutes
        #[clap(long)]
        every_minutes: Option<u64>,
        /// Print mails to stdout instead of sending them
        #[clap(long)]
        dry_run: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run { config, dry_run } => {
            let config = load_config(config)?;
            let mailer = build_mailer(&config, dry_run).await?;
            tracing::info!(command = "run", "Starting audit run");
            let summary = audit_once(&config, mailer.as_ref()).await?;
            print_summary(&summary);
            Ok(())
        }
        Commands::Watch {
            config,
            every_minutes,
            dry_run,
        } => {
            let config = load_config(config)?;
            let minutes = every_minutes
                .or(config.schedule.every_minutes)
                .context("No schedule: pass --every-minutes or set schedule.every_minutes")?;
            if minutes == 0 {
                anyhow::bail!("--every-minutes must be greater than zero");
            }
            let mailer = build_mailer(&config, dry_run).await?;
            tracing::info!(command = "watch", every_minutes = minutes, "Starting scheduled audits");
            let config = &config;
            let mailer = mailer.as_ref();
            watch(Duration::from_secs(minutes * 60), None, move || async move {
                audit_once(config, mailer)
                    .await
                    .map(|summary| print_summary(&summary))
            })
            .await;
            Ok(())
        }
    }
}

/// The mail handle is created and verified here, once, and injected into every run.
async fn build_mailer(config: &CliConfig, dry_run: bool) -> Result<Box<dyn Mailer>> {
    let mailer: Box<dyn Mailer> = if dry_run {
        Box::new(StdoutMailer)
    } else if let Some(smtp) = &config.mailer.smtp {
        tracing::info!(smtp = ?smtp, "Using SMTP transport");
        Box::new(
            SmtpMailer::new(smtp)
                .map_err(|e| anyhow::anyhow!("Invalid SMTP configuration: {e}"))?,
        )
    } else {
        tracing::info!(program = %config.mailer.sendmail.display(), "Using sendmail transport");
        Box::new(SendmailMailer::new(config.mailer.sendmail.clone()))
    };
    mailer
        .verify()
        .await
        .map_err(|e| anyhow::anyhow!("Mail transport verification failed: {e}"))?;
    Ok(mailer)
}

async fn audit_once(config: &CliConfig, mailer: &dyn Mailer) -> Result<RunSummary> {
    let git = GitClient::new(config.audit.remote.clone());
    let now = chrono::Local::now().fixed_offset();
    let summary = run_audit(&git, mailer, &config.audit, &config.mailer.settings, &now)
        .await
        .context("Audit run failed")?;
    for failure in &summary.failures {
        tracing::warn!(repository = %failure.name, error = %failure.error, "Repository skipped in report");
    }
    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Audit complete: {} repositories audited, {} failed, report {}.",
        summary.audited,
        summary.failures.len(),
        if summary.report.has_content {
            "attached"
        } else {
            "empty"
        }
    );
}
