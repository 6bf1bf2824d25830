//! Runtime configuration, read from the environment (and a `.env` file
//! during development) once at startup.

use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub model: String,
    pub max_tokens: u32,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("CAPTAIN_DATA_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let model = lookup("CAPTAIN_MODEL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_tokens = match lookup("CAPTAIN_MAX_TOKENS") {
            Some(raw) => raw.trim().parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                ConfigError::InvalidValue("CAPTAIN_MAX_TOKENS".to_string(), raw.clone())
            })?,
            None => DEFAULT_MAX_TOKENS,
        };

        let log_filter = lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            data_dir,
            model,
            max_tokens,
            log_filter,
        })
    }
}

fn default_data_dir() -> PathBuf {
    // XDG data directory, or ./data when there is no home
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "captain") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from("data")
    }
}
