//! Process configuration, read once from the environment at startup.

use std::env::{self, VarError};
use std::path::PathBuf;

pub const WORKSPACE_ENV: &str = "SCHOOLDESK_WORKSPACE";
pub const LOG_ENV: &str = "SCHOOLDESK_LOG";
pub const DEFAULT_LOG_FILTER: &str = "schooldeskd=info";

#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace opened before the first request, if set.
    pub workspace: Option<PathBuf>,
    /// tracing-subscriber filter directive.
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_values(env::var(WORKSPACE_ENV), env::var(LOG_ENV).ok())
    }

    /// Blank values count as unset.
    fn from_values(
        workspace: Result<String, VarError>,
        log_filter: Option<String>,
    ) -> Result<Self, ConfigError> {
        let workspace = match workspace {
            Ok(v) => Some(v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            Err(VarError::NotPresent) => None,
            Err(VarError::NotUnicode(_)) => {
                return Err(ConfigError::InvalidValue(WORKSPACE_ENV))
            }
        };

        let log_filter = log_filter
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            workspace,
            log_filter,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
