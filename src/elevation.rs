// ABOUTME: Privilege elevation step run before CREATE DATABASE
// ABOUTME: Launches the out-of-process sysadmin helper and waits for it with a bounded timeout

use log::{info, warn};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::models::ElevationOutcome;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Grants the current execution identity administrative rights on the server.
pub trait Elevator: Send + Sync {
    fn elevate(&self) -> ElevationOutcome;
}

/// Runs an external helper and waits up to `timeout` for it to exit.
///
/// Exit code and output are ignored. A helper still running at the deadline
/// is left alone: it is neither killed nor awaited further.
pub struct HelperProcessElevator {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl HelperProcessElevator {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
        }
    }

    #[cfg(test)]
    fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Elevator for HelperProcessElevator {
    fn elevate(&self) -> ElevationOutcome {
        info!(
            "Running elevation helper {} for user {}",
            self.program.display(),
            whoami::username()
        );

        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("Elevation helper could not be started: {}", e);
                return ElevationOutcome::Failed(format!("{}: {}", self.program.display(), e));
            }
        };

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!("Elevation helper exited with {}", status);
                    return ElevationOutcome::Completed(status.code());
                }
                Ok(None) if Instant::now() >= deadline => {
                    warn!(
                        "Elevation helper still running after {:?}, abandoning it",
                        self.timeout
                    );
                    return ElevationOutcome::TimedOut;
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    warn!("Failed waiting for elevation helper: {}", e);
                    return ElevationOutcome::Failed(e.to_string());
                }
            }
        }
    }
}
