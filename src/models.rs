// ABOUTME: Shared data models for the NOBEL install helper
// ABOUTME: Server identity, database contexts, script batches and elevation outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical name of the application database. Not parameterized per installation.
pub const APP_DATABASE: &str = "NOBEL";

/// Server-wide management database used for CREATE/DROP.
pub const ADMIN_DATABASE: &str = "MASTER";

/// Collation the application database is created with.
pub const DATABASE_COLLATION: &str = "SQL_Latin1_General_CP1_CI_AS";

/// Reserved token meaning "the local default named instance".
pub const DEFAULT_INSTANCE: &str = "SQLEXPRESS";

/// Name of a target SQL Server, as supplied by the caller or read back from config.
///
/// The raw value is kept as given; normalization to a connectable host
/// happens in [`ServerName::host_spec`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerName(String);

impl ServerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The reserved local default instance.
    pub fn local_default() -> Self {
        Self(DEFAULT_INSTANCE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Host part used in a connection string.
    ///
    /// Empty maps to the reserved token; the reserved token in any casing
    /// becomes the canonical `.\SQLEXPRESS`. Anything else passes through untouched.
    pub fn host_spec(&self) -> String {
        let name = if self.is_empty() {
            DEFAULT_INSTANCE
        } else {
            self.0.as_str()
        };

        if name.eq_ignore_ascii_case(DEFAULT_INSTANCE) {
            format!(".\\{}", DEFAULT_INSTANCE)
        } else {
            name.to_string()
        }
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "(default {})", DEFAULT_INSTANCE)
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for ServerName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Which database a connection is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseContext {
    /// `MASTER`; the only context CREATE/DROP may run in.
    Admin,
    /// The installed `NOBEL` database.
    Application,
}

impl DatabaseContext {
    pub fn database_name(self) -> &'static str {
        match self {
            DatabaseContext::Admin => ADMIN_DATABASE,
            DatabaseContext::Application => APP_DATABASE,
        }
    }
}

impl Default for DatabaseContext {
    fn default() -> Self {
        DatabaseContext::Admin
    }
}

/// (server, database) pair a command runner connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub server: ServerName,
    pub context: DatabaseContext,
}

impl ConnectionTarget {
    pub fn admin(server: &ServerName) -> Self {
        Self {
            server: server.clone(),
            context: DatabaseContext::Admin,
        }
    }

    pub fn application(server: &ServerName) -> Self {
        Self {
            server: server.clone(),
            context: DatabaseContext::Application,
        }
    }

    pub fn database_name(&self) -> &'static str {
        self.context.database_name()
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.server, self.database_name())
    }
}

/// Ordered statements produced by splitting a script on `GO` lines.
///
/// Segments are kept exactly as authored, blank ones included; use
/// [`ScriptBatch::statements`] to get what is actually sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptBatch {
    segments: Vec<String>,
}

impl ScriptBatch {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Non-blank statements, in authored order.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn statement_count(&self) -> usize {
        self.statements().count()
    }
}

/// Result of running the external privilege-elevation helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "outcome", content = "detail")]
pub enum ElevationOutcome {
    /// Helper exited within the timeout. Exit code is informational only.
    Completed(Option<i32>),
    /// Helper still running at the deadline; it is abandoned, not killed.
    TimedOut,
    /// Helper could not be started or waited on.
    Failed(String),
}

impl ElevationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ElevationOutcome::Completed(_))
    }
}

/// Installation status reported by the `status` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseStatus {
    pub installed: bool,
    pub server: String,
    pub database: String,
}
