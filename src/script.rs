// ABOUTME: Install script loading and batch splitting
// ABOUTME: Reads the bundled NOBEL schema script and splits it on GO separator lines

use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::error::ProvisionError;
use crate::models::ScriptBatch;

const EMBEDDED_SCRIPT: &str = include_str!("../sql/nobel.sql");

/// Source of the install script text.
pub trait ScriptSource: Send + Sync {
    fn load(&self) -> Result<String, ProvisionError>;
}

/// The script compiled into the binary.
pub struct EmbeddedScript;

impl ScriptSource for EmbeddedScript {
    fn load(&self) -> Result<String, ProvisionError> {
        if EMBEDDED_SCRIPT.trim().is_empty() {
            return Err(ProvisionError::ResourceMissing(
                "embedded nobel.sql is empty".to_string(),
            ));
        }
        Ok(EMBEDDED_SCRIPT.to_string())
    }
}

/// A script read from disk at install time.
pub struct FileScript {
    path: PathBuf,
}

impl FileScript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScriptSource for FileScript {
    fn load(&self) -> Result<String, ProvisionError> {
        fs::read_to_string(&self.path).map_err(|e| {
            ProvisionError::ResourceMissing(format!("{}: {}", self.path.display(), e))
        })
    }
}

/// Static text, mainly for tests.
pub struct InlineScript(pub String);

impl ScriptSource for InlineScript {
    fn load(&self) -> Result<String, ProvisionError> {
        Ok(self.0.clone())
    }
}

fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    // `GO` alone on its line, any case, surrounding whitespace allowed.
    SEPARATOR.get_or_init(|| Regex::new(r"(?im)^\s*GO\s*$").expect("separator pattern is valid"))
}

/// Split a script into batches on `GO` lines, preserving order and blank segments.
pub fn split_batches(script: &str) -> ScriptBatch {
    ScriptBatch::new(separator().split(script).map(str::to_string).collect())
}
