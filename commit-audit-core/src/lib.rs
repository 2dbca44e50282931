#![doc = "commit-audit-core: core logic library for commit-audit."]

//! This crate contains the commit audit pipeline and its data model:
//! fetching raw history through `git`, parsing it into commits, windowing,
//! classifying against acceptance patterns and rendering the report.
//! Transport-specific delivery (mail) and configuration loading live in the
//! `commit-audit` binary crate.
//!
//! # Usage
//! Build an [`config::AuditConfig`], a [`contract::VcsClient`] and a
//! [`contract::Mailer`], then call [`audit::run_audit`].

pub mod audit;
pub mod classify;
pub mod config;
pub mod contract;
pub mod error;
pub mod notify;
pub mod record;
pub mod report;
pub mod repository;
pub mod workspace;

pub use error::AuditError;
