// ABOUTME: Front-end command module exports
// ABOUTME: Parses the positional command line and dispatches to the database commands

pub mod database;

pub use database::*;

/// What the caller asked the binary to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Install { server: Option<String> },
    Uninstall,
    Status { server: Option<String> },
    Forget,
}

pub const USAGE: &str = "usage: nobel-installer <install [server] | uninstall | status [server] | forget>";

impl CliCommand {
    /// Parse positional arguments (program name excluded).
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut args = args.iter().map(String::as_str);
        let command = args.next().ok_or_else(|| USAGE.to_string())?;
        let server = args.next().map(str::to_string);
        if let Some(extra) = args.next() {
            return Err(format!("unexpected argument '{}'\n{}", extra, USAGE));
        }

        match (command.to_ascii_lowercase().as_str(), server) {
            ("install", server) => Ok(CliCommand::Install { server }),
            ("status", server) => Ok(CliCommand::Status { server }),
            ("uninstall", None) => Ok(CliCommand::Uninstall),
            ("forget", None) => Ok(CliCommand::Forget),
            (other @ ("uninstall" | "forget"), Some(_)) => {
                Err(format!("'{}' takes no server argument\n{}", other, USAGE))
            }
            (other, _) => Err(format!("unknown command '{}'\n{}", other, USAGE)),
        }
    }
}
