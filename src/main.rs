// ABOUTME: Entry point for the NOBEL database install helper
// ABOUTME: Calls the library run function and exits with its status

use std::process::ExitCode;

fn main() -> ExitCode {
    nobel_installer_lib::run()
}
