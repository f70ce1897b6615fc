// ABOUTME: Command runner contract: one fresh connection per run, statements issued through a session
// ABOUTME: Lifecycle operations and the installer only ever talk to the server through this trait

use crate::error::ProvisionError;
use crate::models::ConnectionTarget;

/// An open connection handed to a runner action.
///
/// Every call issues a new command on the same connection.
pub trait Session {
    /// Run one batch and drain all of its results.
    fn execute(&mut self, sql: &str) -> Result<(), ProvisionError>;

    /// Run one batch and return the first column of its first row, if any.
    fn execute_scalar(&mut self, sql: &str) -> Result<Option<i32>, ProvisionError>;
}

pub type SessionAction<'a> = dyn FnMut(&mut dyn Session) -> Result<(), ProvisionError> + 'a;

/// Opens a connection scoped to `target`, runs `action` on it, and releases it.
///
/// Implementations must never hand out a connection reused from an earlier
/// run, and must release the connection on every exit path. Errors from
/// connecting or from the action propagate unchanged, with no retry.
pub trait CommandRunner: Send + Sync {
    fn run(&self, target: &ConnectionTarget, action: &mut SessionAction<'_>)
        -> Result<(), ProvisionError>;
}
