// ABOUTME: Install, uninstall and detection workflows for the NOBEL database
// ABOUTME: Sequences lifecycle operations and config store calls, wrapping failures for the front-end

use log::{debug, error, info, warn};

use crate::config::{ConfigStore, FileConfigStore, InstallerSettings};
use crate::db::{lifecycle, CommandRunner, RetryPolicy, TdsCommandRunner};
use crate::elevation::{Elevator, HelperProcessElevator};
use crate::error::{ProvisionError, Workflow, WorkflowError};
use crate::models::{ElevationOutcome, ServerName, APP_DATABASE};
use crate::script::{split_batches, EmbeddedScript, FileScript, ScriptSource};

/// Entry point for the three public workflows.
///
/// All collaborators are injected; [`Provisioner::from_settings`] wires the
/// production ones.
pub struct Provisioner {
    runner: Box<dyn CommandRunner>,
    store: Box<dyn ConfigStore>,
    script: Box<dyn ScriptSource>,
    elevator: Box<dyn Elevator>,
    settings: InstallerSettings,
}

impl Provisioner {
    pub fn new(
        runner: Box<dyn CommandRunner>,
        store: Box<dyn ConfigStore>,
        script: Box<dyn ScriptSource>,
        elevator: Box<dyn Elevator>,
        settings: InstallerSettings,
    ) -> Self {
        Self {
            runner,
            store,
            script,
            elevator,
            settings,
        }
    }

    /// SQL Server runner, per-user file store, embedded (or overridden) script
    /// and the helper-process elevator next to the executable.
    pub fn from_settings(settings: InstallerSettings) -> Result<Self, ProvisionError> {
        let runner = TdsCommandRunner::new(settings.connect_timeout())?;
        let store = FileConfigStore::open_default()?;
        let script: Box<dyn ScriptSource> = match &settings.script_path {
            Some(path) => Box::new(FileScript::new(path)),
            None => Box::new(EmbeddedScript),
        };
        let elevator = HelperProcessElevator::new(
            settings.elevation_helper_path(),
            settings.elevation_timeout(),
        );

        Ok(Self::new(
            Box::new(runner),
            Box::new(store),
            script,
            Box::new(elevator),
            settings,
        ))
    }

    pub fn settings(&self) -> &InstallerSettings {
        &self.settings
    }

    /// Drop any existing copy, create the database, run the install script and
    /// remember the server. Stops at the first failing step.
    pub fn install_database(&self, server: &str) -> Result<(), WorkflowError> {
        let server = ServerName::new(server);
        info!("Installing {} database on {}", APP_DATABASE, server);

        self.try_install(&server)
            .map_err(|e| self.fail(Workflow::Install, e))?;

        info!("{} database installed on {}", APP_DATABASE, server);
        Ok(())
    }

    fn try_install(&self, server: &ServerName) -> Result<(), ProvisionError> {
        let script = self.script.load()?;
        let batch = split_batches(&script);
        debug!(
            "Install script: {} segments, {} statements",
            batch.segments().len(),
            batch.statement_count()
        );

        lifecycle::drop_database_if_exists(self.runner.as_ref(), server)?;
        self.elevate()?;
        lifecycle::create_database(self.runner.as_ref(), server, &self.retry_policy())?;
        lifecycle::execute_script_batch(self.runner.as_ref(), server, &batch)?;
        self.store.set_server_name(server)?;
        Ok(())
    }

    /// Drop the database on the remembered server. The stored server is kept.
    pub fn uninstall_database(&self) -> Result<(), WorkflowError> {
        let server = self.resolve_server(None);
        info!("Uninstalling {} database from {}", APP_DATABASE, server);

        lifecycle::drop_database_if_exists(self.runner.as_ref(), &server)
            .map_err(|e| self.fail(Workflow::Uninstall, e))?;

        info!("{} database removed from {}", APP_DATABASE, server);
        Ok(())
    }

    /// Whether the database answers a trivial query. Every failure reads as `false`.
    pub fn database_is_installed(&self, server: Option<&str>) -> bool {
        let server = self.resolve_server(server);
        match lifecycle::check_health(self.runner.as_ref(), &server) {
            Ok(()) => true,
            Err(e) => {
                debug!("{} not usable on {} ({}): {}", APP_DATABASE, server, e.kind(), e);
                false
            }
        }
    }

    /// Forget the remembered server. Uninstall does not do this on its own.
    pub fn forget_server(&self) -> Result<(), ProvisionError> {
        self.store.clear()?;
        info!("Stored server identity removed");
        Ok(())
    }

    /// Explicit name, else the stored one, else the local default instance.
    pub fn resolve_server(&self, explicit: Option<&str>) -> ServerName {
        if let Some(name) = explicit.filter(|s| !s.is_empty()) {
            return ServerName::new(name);
        }

        match self.store.server_name() {
            Ok(Some(server)) => server,
            Ok(None) => ServerName::local_default(),
            Err(e) => {
                warn!("Could not read stored server name, using default: {}", e);
                ServerName::local_default()
            }
        }
    }

    fn elevate(&self) -> Result<(), ProvisionError> {
        match self.elevator.elevate() {
            ElevationOutcome::Completed(_) => Ok(()),
            outcome if self.settings.require_elevation => Err(ProvisionError::PermissionDenied(
                format!("elevation helper did not complete: {:?}", outcome),
            )),
            outcome => {
                warn!(
                    "Elevation helper did not complete ({:?}); attempting CREATE DATABASE anyway",
                    outcome
                );
                Ok(())
            }
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            deadline: self.settings.create_retry_deadline(),
            interval: self.settings.create_retry_interval(),
        }
    }

    fn fail(&self, workflow: Workflow, err: ProvisionError) -> WorkflowError {
        error!("Failed {} {} ({}): {}", workflow, APP_DATABASE, err.kind(), err);
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            error!("  caused by: {}", cause);
            source = cause.source();
        }
        WorkflowError::new(workflow, self.settings.log_file.clone(), err)
    }
}
