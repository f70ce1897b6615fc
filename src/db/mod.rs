// ABOUTME: Database module exports for the NOBEL install helper
// ABOUTME: Connection strings, the command runner contract, its SQL Server backend and lifecycle operations

pub mod connection_string;
pub mod lifecycle;
pub mod runner;
pub mod sqlserver;

pub use lifecycle::RetryPolicy;
pub use runner::{CommandRunner, Session};
pub use sqlserver::TdsCommandRunner;
