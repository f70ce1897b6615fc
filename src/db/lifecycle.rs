// ABOUTME: NOBEL database lifecycle operations built on the command runner
// ABOUTME: Conditional drop, create with permission retry, script batch execution and health check

use log::{debug, info, warn};
use std::thread;
use std::time::{Duration, Instant};

use super::runner::CommandRunner;
use crate::error::ProvisionError;
use crate::models::{ConnectionTarget, ScriptBatch, ServerName, APP_DATABASE, DATABASE_COLLATION};

/// Statement used to probe whether the application database is usable.
pub const HEALTH_CHECK: &str = "select 1";

/// Bracket-quote a SQL Server identifier
fn bracket_quote(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Drop the application database if present, kicking other sessions off first.
pub fn drop_if_exists_stmt() -> String {
    let db = bracket_quote(APP_DATABASE);
    format!(
        r#"IF EXISTS (SELECT name FROM sys.databases WHERE name = N'{name}')
BEGIN
    ALTER DATABASE {db} SET SINGLE_USER WITH ROLLBACK IMMEDIATE
    ALTER DATABASE {db} SET MULTI_USER
    DROP DATABASE {db}
END"#,
        name = APP_DATABASE.replace('\'', "''"),
        db = db
    )
}

pub fn create_stmt() -> String {
    format!(
        "CREATE DATABASE {} COLLATE {}",
        bracket_quote(APP_DATABASE),
        DATABASE_COLLATION
    )
}

/// How long CREATE DATABASE keeps retrying while the server still reports
/// missing permissions.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub deadline: Duration,
    pub interval: Duration,
}

/// Remove the application database. A no-op when it does not exist.
pub fn drop_database_if_exists(
    runner: &dyn CommandRunner,
    server: &ServerName,
) -> Result<(), ProvisionError> {
    info!("Dropping {} on {} if it exists", APP_DATABASE, server);
    let stmt = drop_if_exists_stmt();
    runner.run(&ConnectionTarget::admin(server), &mut |session| {
        session.execute(&stmt)
    })
}

/// Create the application database from the admin context.
///
/// Each attempt logs in on a fresh connection. A permission failure is
/// retried until `retry.deadline` elapses, since a grant made moments ago
/// may not be visible yet; any other failure is returned immediately.
pub fn create_database(
    runner: &dyn CommandRunner,
    server: &ServerName,
    retry: &RetryPolicy,
) -> Result<(), ProvisionError> {
    let stmt = create_stmt();
    let target = ConnectionTarget::admin(server);
    let started = Instant::now();
    let mut attempt = 1u32;

    loop {
        info!("Creating {} on {} (attempt {})", APP_DATABASE, server, attempt);
        match runner.run(&target, &mut |session| session.execute(&stmt)) {
            Ok(()) => return Ok(()),
            Err(ProvisionError::PermissionDenied(msg))
                if started.elapsed() + retry.interval < retry.deadline =>
            {
                warn!("CREATE DATABASE not permitted yet, retrying: {}", msg);
                thread::sleep(retry.interval);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Run every non-blank statement of `batch` in order on one application connection.
///
/// Stops at the first failure. Statements already executed stay committed.
/// Returns the number of statements executed.
pub fn execute_script_batch(
    runner: &dyn CommandRunner,
    server: &ServerName,
    batch: &ScriptBatch,
) -> Result<usize, ProvisionError> {
    let total = batch.statement_count();
    info!("Executing {} script statements on {}", total, server);

    let mut executed = 0usize;
    runner.run(&ConnectionTarget::application(server), &mut |session| {
        for statement in batch.statements() {
            session.execute(statement).map_err(|e| {
                warn!("Script statement {} of {} failed", executed + 1, total);
                e
            })?;
            executed += 1;
        }
        Ok(())
    })?;

    debug!("Executed {} statements", executed);
    Ok(executed)
}

/// Succeeds when the application database accepts a trivial query.
pub fn check_health(runner: &dyn CommandRunner, server: &ServerName) -> Result<(), ProvisionError> {
    runner.run(&ConnectionTarget::application(server), &mut |session| {
        session.execute_scalar(HEALTH_CHECK).map(|_| ())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::DatabaseContext;
    use crate::test_support::RecordingRunner;

    fn quick_retry() -> RetryPolicy {
        RetryPolicy {
            deadline: Duration::from_secs(2),
            interval: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_statements() {
        let drop = drop_if_exists_stmt();
        assert!(drop.contains("WHERE name = N'NOBEL'"));
        let single = drop.find("SET SINGLE_USER WITH ROLLBACK IMMEDIATE").unwrap();
        let multi = drop.find("SET MULTI_USER").unwrap();
        let dropped = drop.find("DROP DATABASE [NOBEL]").unwrap();
        assert!(single < multi && multi < dropped);

        assert_eq!(
            create_stmt(),
            "CREATE DATABASE [NOBEL] COLLATE SQL_Latin1_General_CP1_CI_AS"
        );
    }

    #[test]
    fn test_drop_runs_in_admin_context_and_is_idempotent() {
        let runner = RecordingRunner::new();
        let server = ServerName::new("db01");

        drop_database_if_exists(&runner, &server).unwrap();
        drop_database_if_exists(&runner, &server).unwrap();

        let attempts = runner.attempts();
        assert_eq!(attempts.len(), 2);
        assert!(attempts.iter().all(|a| a.context == DatabaseContext::Admin && a.ok));
        assert_eq!(runner.connections().len(), 2);
    }

    #[test]
    fn test_drop_removes_existing_database() {
        let runner = RecordingRunner::with_database();
        drop_database_if_exists(&runner, &ServerName::new("db01")).unwrap();
        assert!(!runner.database_exists());
    }

    #[test]
    fn test_create_runs_in_admin_context() {
        let runner = RecordingRunner::new();
        create_database(&runner, &ServerName::new("db01"), &quick_retry()).unwrap();

        let attempts = runner.attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].context, DatabaseContext::Admin);
        assert!(attempts[0].sql.starts_with("CREATE DATABASE [NOBEL]"));
        assert!(runner.database_exists());
    }

    #[test]
    fn test_create_retries_permission_denied_on_fresh_connections() {
        let runner = RecordingRunner::new();
        runner.deny_permission("CREATE DATABASE", 2);

        create_database(&runner, &ServerName::new("db01"), &quick_retry()).unwrap();

        assert_eq!(runner.attempts().len(), 3);
        assert_eq!(runner.connections().len(), 3);
        assert!(runner.database_exists());
    }

    #[test]
    fn test_create_gives_up_at_deadline() {
        let runner = RecordingRunner::new();
        runner.deny_permission("CREATE DATABASE", usize::MAX);
        let retry = RetryPolicy {
            deadline: Duration::from_millis(50),
            interval: Duration::from_millis(10),
        };

        let err = create_database(&runner, &ServerName::new("db01"), &retry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(runner.attempts().len() >= 2);
        assert!(!runner.database_exists());
    }

    #[test]
    fn test_create_does_not_retry_other_failures() {
        let runner = RecordingRunner::new();
        runner.fail_statement("CREATE DATABASE");

        let err = create_database(&runner, &ServerName::new("db01"), &quick_retry()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StatementFailed);
        assert_eq!(runner.attempts().len(), 1);
    }

    #[test]
    fn test_batch_executes_non_blank_statements_in_order() {
        let runner = RecordingRunner::with_database();
        let batch = crate::script::split_batches("SELECT 1\nGO\n\nGO\nSELECT 2");

        let executed = execute_script_batch(&runner, &ServerName::new("db01"), &batch).unwrap();

        assert_eq!(executed, 2);
        let sql: Vec<String> = runner.attempts().into_iter().map(|a| a.sql.trim().to_string()).collect();
        assert_eq!(sql, vec!["SELECT 1", "SELECT 2"]);
        assert_eq!(runner.connections().len(), 1);
        assert_eq!(runner.connections()[0].context, DatabaseContext::Application);
    }

    #[test]
    fn test_batch_stops_at_first_failure_without_rollback() {
        let runner = RecordingRunner::with_database();
        runner.fail_statement("second");
        let batch = crate::script::split_batches(
            "INSERT first\nGO\nINSERT second\nGO\nINSERT third",
        );

        let err = execute_script_batch(&runner, &ServerName::new("db01"), &batch).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StatementFailed);
        let attempts = runner.attempts();
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].ok && attempts[0].sql.contains("first"));
        assert!(!attempts[1].ok && attempts[1].sql.contains("second"));
        assert!(attempts.iter().all(|a| !a.sql.contains("third")));
    }

    #[test]
    fn test_health_check() {
        let runner = RecordingRunner::with_database();
        check_health(&runner, &ServerName::new("db01")).unwrap();
        assert_eq!(runner.attempts()[0].sql, HEALTH_CHECK);

        let missing = RecordingRunner::new();
        let err = check_health(&missing, &ServerName::new("db01")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    }
}
