// ABOUTME: Database commands exposed to the installer front-end
// ABOUTME: Wraps the provisioner workflows in ApiResponse envelopes

use crate::installer::Provisioner;
use crate::models::{DatabaseStatus, APP_DATABASE};
use crate::ApiResponse;

fn status_for(provisioner: &Provisioner, server: Option<&str>) -> DatabaseStatus {
    let resolved = provisioner.resolve_server(server);
    DatabaseStatus {
        installed: provisioner.database_is_installed(Some(resolved.as_str())),
        server: resolved.to_string(),
        database: APP_DATABASE.to_string(),
    }
}

/// Install the database on `server` (default instance when omitted)
pub fn install_database(provisioner: &Provisioner, server: Option<&str>) -> ApiResponse<DatabaseStatus> {
    match provisioner.install_database(server.unwrap_or("")) {
        Ok(()) => {
            let status = status_for(provisioner, server);
            ApiResponse::success(status)
                .with_success(format!("{} database installed", APP_DATABASE))
        }
        Err(e) => ApiResponse::failure(&e),
    }
}

/// Drop the database from the remembered server
pub fn uninstall_database(provisioner: &Provisioner) -> ApiResponse<()> {
    match provisioner.uninstall_database() {
        Ok(()) => ApiResponse::success(()).with_success(format!("{} database removed", APP_DATABASE)),
        Err(e) => ApiResponse::failure(&e),
    }
}

/// Report whether the database is installed; never fails
pub fn database_status(provisioner: &Provisioner, server: Option<&str>) -> ApiResponse<DatabaseStatus> {
    ApiResponse::success(status_for(provisioner, server))
}

/// Remove the remembered server name
pub fn forget_server(provisioner: &Provisioner) -> ApiResponse<()> {
    match provisioner.forget_server() {
        Ok(()) => ApiResponse::success(()),
        Err(e) => ApiResponse::error(format!("Failed to remove stored server: {}", e))
            .with_kind(e.kind()),
    }
}
