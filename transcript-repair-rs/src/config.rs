//! Configuration for the repair collaborators
//!
//! Values come from the environment with defaults suitable for a local
//! install. Command line flags, where given, override them.

use std::env;
use std::path::PathBuf;

use crate::errors::{RepairError, RepairResult};
use crate::logging::LoggingConfig;

/// Default agent whose sessions are scanned
pub const DEFAULT_AGENT: &str = "main";

/// Directory name under the home directory holding agent data
pub const DEFAULT_ROOT_DIR_NAME: &str = ".openclaw";

/// Settings for locating and repairing session transcripts
#[derive(Debug, Clone)]
pub struct RepairConfig {
    /// Root of the agent data tree (contains `agents/<name>/sessions`)
    pub root_dir: PathBuf,
    /// Agent scanned when no target is given
    pub agent: String,
    pub logging: LoggingConfig,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            agent: DEFAULT_AGENT.to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_root_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_ROOT_DIR_NAME)
}

fn parse_flag(key: &str, value: &str) -> RepairResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RepairError::Configuration(format!(
            "Invalid boolean value for {}: {}",
            key, value
        ))),
    }
}

impl RepairConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> RepairResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> RepairResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("OPENCLAW_DIR").filter(|v| !v.is_empty()) {
            config.root_dir = PathBuf::from(dir);
        }
        if let Some(agent) = lookup("SESSION_REPAIR_AGENT").filter(|v| !v.is_empty()) {
            config.agent = agent;
        }
        if let Some(level) = lookup("SESSION_REPAIR_LOG_LEVEL").filter(|v| !v.is_empty()) {
            config.logging.level = level;
        }
        if let Some(json) = lookup("SESSION_REPAIR_LOG_JSON") {
            config.logging.json_format = parse_flag("SESSION_REPAIR_LOG_JSON", &json)?;
        }

        Ok(config)
    }

    /// `<root>/agents`
    pub fn agents_dir(&self) -> PathBuf {
        self.root_dir.join("agents")
    }

    /// `<root>/agents/<agent>/sessions`
    pub fn sessions_dir(&self) -> PathBuf {
        self.agents_dir().join(&self.agent).join("sessions")
    }
}
