// ABOUTME: Connection string construction for SQL Server targets
// ABOUTME: Integrated authentication only; normalizes the default local instance name

use crate::models::{ConnectionTarget, ServerName};

/// Build an ADO.NET style connection string using integrated (SSPI) authentication.
///
/// No validation happens here: a malformed server name surfaces later as a
/// connection failure.
pub fn build(server: &ServerName, database: &str) -> String {
    format!(
        "Server={};Database={};Integrated Security=SSPI;TrustServerCertificate=true",
        server.host_spec(),
        database
    )
}

pub fn for_target(target: &ConnectionTarget) -> String {
    build(&target.server, target.database_name())
}

/// Mask credential values before a connection string reaches the log.
pub fn mask(conn_str: &str) -> String {
    conn_str
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, _)) => {
                let norm = key.trim().to_ascii_lowercase().replace([' ', '_'], "");
                if norm == "password" || norm == "pwd" {
                    format!("{}=***", key.trim())
                } else {
                    part.to_string()
                }
            }
            None => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}
