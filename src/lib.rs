// ABOUTME: Main library for the NOBEL database install helper
// ABOUTME: Module declarations, the front-end response envelope and the binary's run loop

use serde::{Deserialize, Serialize};
use std::process::ExitCode;

// Module declarations
pub mod commands;
pub mod config;
pub mod db;
pub mod elevation;
pub mod error;
pub mod installer;
pub mod logging;
pub mod models;
pub mod script;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ErrorKind, ProvisionError, WorkflowError};
pub use installer::Provisioner;

use commands::CliCommand;
use config::InstallerSettings;

/// Standard response format read by the setup wizard
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub messages: Messages,
    #[serde(rename = "errorKind", default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Messages {
    pub error: Vec<String>,
    pub warning: Vec<String>,
    pub info: Vec<String>,
    pub success: Vec<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            messages: Messages::default(),
            error_kind: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            messages: Messages {
                error: vec![message],
                ..Default::default()
            },
            error_kind: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Workflow failure: the fixed log-pointing message plus the cause
    pub fn failure(err: &WorkflowError) -> Self {
        let mut response = Self::error(err.to_string()).with_kind(err.kind());
        response.messages.info.push(err.source.to_string());
        response
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.error_kind = Some(kind);
        self
    }

    pub fn with_success(mut self, message: String) -> Self {
        self.messages.success.push(message);
        self
    }
}

impl<T: Serialize> ApiResponse<T> {
    fn print(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize response: {}", e),
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Parse the command line, run one workflow, print its response.
pub fn run() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match CliCommand::parse(&args) {
        Ok(command) => command,
        Err(usage) => {
            eprintln!("{}", usage);
            return ExitCode::from(2);
        }
    };

    let settings = InstallerSettings::load().unwrap_or_else(|e| {
        eprintln!("Warning: ignoring unreadable installer settings: {}", e);
        InstallerSettings::default()
    });

    if let Err(e) = logging::init_logging(&settings.log_file, true) {
        eprintln!("Failed to initialize logging: {:#}", e);
        if let Err(e) = logging::init_stderr_logging() {
            eprintln!("Failed to initialize stderr logging: {:#}", e);
        }
    }

    let provisioner = match Provisioner::from_settings(settings) {
        Ok(p) => p,
        Err(e) => {
            log::error!("Installer setup failed: {}", e);
            let response: ApiResponse<()> =
                ApiResponse::error(format!("Installer setup failed: {}", e)).with_kind(e.kind());
            response.print();
            return exit_code(false);
        }
    };

    match command {
        CliCommand::Install { server } => {
            let response = commands::install_database(&provisioner, server.as_deref());
            response.print();
            exit_code(response.success)
        }
        CliCommand::Uninstall => {
            let response = commands::uninstall_database(&provisioner);
            response.print();
            exit_code(response.success)
        }
        CliCommand::Status { server } => {
            let response = commands::database_status(&provisioner, server.as_deref());
            response.print();
            exit_code(response.success)
        }
        CliCommand::Forget => {
            let response = commands::forget_server(&provisioner);
            response.print();
            exit_code(response.success)
        }
    }
}
