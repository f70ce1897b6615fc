// ABOUTME: Error types for the NOBEL install helper
// ABOUTME: Kind-tagged origin errors plus the envelope the install/uninstall workflows return

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::models::APP_DATABASE;

/// What went wrong, independent of where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    ResourceMissing,
    ConnectionFailed,
    StatementFailed,
    PermissionDenied,
    ConfigIo,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ResourceMissing => "resource missing",
            ErrorKind::ConnectionFailed => "connection failed",
            ErrorKind::StatementFailed => "statement failed",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::ConfigIo => "config i/o failed",
        };
        f.write_str(s)
    }
}

/// Raw failure raised where it happens. Propagates unchanged up to the workflow boundary.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Script resource not found: {0}")]
    ResourceMissing(String),
    #[error("Connection to {target} failed: {message}")]
    ConnectionFailed { target: String, message: String },
    #[error("Statement failed: {0}")]
    StatementFailed(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Config store error: {0}")]
    Config(#[from] ConfigError),
}

impl ProvisionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisionError::ResourceMissing(_) => ErrorKind::ResourceMissing,
            ProvisionError::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            ProvisionError::StatementFailed(_) => ErrorKind::StatementFailed,
            ProvisionError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ProvisionError::Config(_) => ErrorKind::ConfigIo,
        }
    }
}

/// Public workflow that produced a [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    Install,
    Uninstall,
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workflow::Install => f.write_str("installing"),
            Workflow::Uninstall => f.write_str("uninstalling"),
        }
    }
}

/// Install/uninstall failure as seen by the front-end.
///
/// The message is fixed per workflow and points at the install log; the
/// underlying failure stays reachable through [`std::error::Error::source`]
/// and its category through [`WorkflowError::kind`].
#[derive(Error, Debug)]
#[error(
    "Errors occurred while {workflow} the {} database. Please view the log file at {}",
    APP_DATABASE,
    .log_file.display()
)]
pub struct WorkflowError {
    pub workflow: Workflow,
    pub log_file: PathBuf,
    #[source]
    pub source: ProvisionError,
}

impl WorkflowError {
    pub fn new(workflow: Workflow, log_file: impl Into<PathBuf>, source: ProvisionError) -> Self {
        Self {
            workflow,
            log_file: log_file.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}
