// ABOUTME: In-memory doubles for unit tests
// ABOUTME: A recording command runner that simulates the NOBEL database, plus scripted collaborators

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::config::{ConfigError, ConfigStore};
use crate::db::runner::{CommandRunner, Session, SessionAction};
use crate::elevation::Elevator;
use crate::error::ProvisionError;
use crate::models::{ConnectionTarget, DatabaseContext, ElevationOutcome, ServerName};

#[derive(Debug, Clone)]
pub struct Attempt {
    pub context: DatabaseContext,
    pub server: String,
    pub sql: String,
    pub ok: bool,
}

enum Failure {
    Statement,
    Permission,
}

struct Rule {
    needle: String,
    failure: Failure,
    remaining: usize,
}

#[derive(Default)]
struct State {
    database_exists: bool,
    refuse_all: bool,
    rules: Vec<Rule>,
    attempts: Vec<Attempt>,
    connections: Vec<ConnectionTarget>,
}

/// Fake server: tracks whether NOBEL exists and records every statement.
///
/// CREATE DATABASE brings the database into existence, the conditional drop
/// removes it, and connecting to the application context fails while it is
/// absent, the way a real login does.
#[derive(Default)]
pub struct RecordingRunner {
    state: Mutex<State>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database() -> Self {
        let runner = Self::default();
        runner.lock().database_exists = true;
        runner
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn refuse_connections(&self) {
        self.lock().refuse_all = true;
    }

    /// Every statement containing `needle` fails with a statement error.
    pub fn fail_statement(&self, needle: &str) {
        self.lock().rules.push(Rule {
            needle: needle.to_string(),
            failure: Failure::Statement,
            remaining: usize::MAX,
        });
    }

    /// The next `times` statements containing `needle` fail with permission denied.
    pub fn deny_permission(&self, needle: &str, times: usize) {
        self.lock().rules.push(Rule {
            needle: needle.to_string(),
            failure: Failure::Permission,
            remaining: times,
        });
    }

    pub fn database_exists(&self) -> bool {
        self.lock().database_exists
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.lock().attempts.clone()
    }

    pub fn connections(&self) -> Vec<ConnectionTarget> {
        self.lock().connections.clone()
    }

    fn statement(&self, target: &ConnectionTarget, sql: &str) -> Result<(), ProvisionError> {
        let mut state = self.lock();

        let mut outcome = Ok(());
        if let Some(rule) = state
            .rules
            .iter_mut()
            .find(|r| r.remaining > 0 && sql.contains(&r.needle))
        {
            rule.remaining = rule.remaining.saturating_sub(1);
            outcome = Err(match rule.failure {
                Failure::Statement => {
                    ProvisionError::StatementFailed(format!("simulated failure: {}", rule.needle))
                }
                Failure::Permission => {
                    ProvisionError::PermissionDenied(format!("simulated denial: {}", rule.needle))
                }
            });
        }

        if outcome.is_ok() {
            if sql.starts_with("CREATE DATABASE") {
                if state.database_exists {
                    outcome = Err(ProvisionError::StatementFailed(
                        "Database 'NOBEL' already exists".to_string(),
                    ));
                } else {
                    state.database_exists = true;
                }
            } else if sql.contains("DROP DATABASE") {
                state.database_exists = false;
            }
        }

        state.attempts.push(Attempt {
            context: target.context,
            server: target.server.as_str().to_string(),
            sql: sql.to_string(),
            ok: outcome.is_ok(),
        });
        outcome
    }
}

impl CommandRunner for RecordingRunner {
    fn run(
        &self,
        target: &ConnectionTarget,
        action: &mut SessionAction<'_>,
    ) -> Result<(), ProvisionError> {
        {
            let mut state = self.lock();
            state.connections.push(target.clone());
            let missing_db =
                target.context == DatabaseContext::Application && !state.database_exists;
            if state.refuse_all || missing_db {
                return Err(ProvisionError::ConnectionFailed {
                    target: target.to_string(),
                    message: "simulated login failure".to_string(),
                });
            }
        }

        let mut session = FakeSession {
            runner: self,
            target,
        };
        action(&mut session)
    }
}

struct FakeSession<'a> {
    runner: &'a RecordingRunner,
    target: &'a ConnectionTarget,
}

impl Session for FakeSession<'_> {
    fn execute(&mut self, sql: &str) -> Result<(), ProvisionError> {
        self.runner.statement(self.target, sql)
    }

    fn execute_scalar(&mut self, sql: &str) -> Result<Option<i32>, ProvisionError> {
        self.runner.statement(self.target, sql).map(|_| Some(1))
    }
}

/// Elevator returning a fixed outcome and counting calls.
pub struct ScriptedElevator {
    outcome: ElevationOutcome,
    calls: AtomicUsize,
}

impl ScriptedElevator {
    pub fn new(outcome: ElevationOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn completed() -> Self {
        Self::new(ElevationOutcome::Completed(Some(0)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Elevator for ScriptedElevator {
    fn elevate(&self) -> ElevationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<T> {
    fn run(
        &self,
        target: &ConnectionTarget,
        action: &mut SessionAction<'_>,
    ) -> Result<(), ProvisionError> {
        (**self).run(target, action)
    }
}

impl<T: Elevator + ?Sized> Elevator for std::sync::Arc<T> {
    fn elevate(&self) -> ElevationOutcome {
        (**self).elevate()
    }
}

impl<T: ConfigStore + ?Sized> ConfigStore for std::sync::Arc<T> {
    fn server_name(&self) -> Result<Option<ServerName>, ConfigError> {
        (**self).server_name()
    }

    fn set_server_name(
        &self,
        server: &ServerName,
    ) -> Result<(), ConfigError> {
        (**self).set_server_name(server)
    }

    fn clear(&self) -> Result<(), ConfigError> {
        (**self).clear()
    }
}

/// Store whose reads and writes always fail.
pub struct BrokenConfigStore;

impl ConfigStore for BrokenConfigStore {
    fn server_name(&self) -> Result<Option<ServerName>, ConfigError> {
        Err(ConfigError::NoDirFound)
    }

    fn set_server_name(
        &self,
        _server: &ServerName,
    ) -> Result<(), ConfigError> {
        Err(ConfigError::ReadError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "access denied",
        )))
    }

    fn clear(&self) -> Result<(), ConfigError> {
        Err(ConfigError::NoDirFound)
    }
}
