use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR_PREFIX: &str = "gsheet-export";

pub const DEFAULT_SPREADSHEET_ID: &str = "1zFjra05ZGfaVgKNorPdvAU-bh0QDkOn-CVoXjWtiw2w";
pub const DEFAULT_RANGE: &str = "A3:F6";
pub const DEFAULT_CLIENT_SECRET: &str = "client_secret.json";
pub const DEFAULT_OUTPUT: &str = "gsheet_result.csv";
const DEFAULT_CACHE_DIR: &str = ".credentials";

/// Optional settings read from `config.toml`. Every field may be omitted.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub sheet: SheetConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SheetConfig {
    pub spreadsheet_id: Option<String>,
    pub range: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PathsConfig {
    pub client_secret: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Config {
    /// Load the config file, falling back to defaults when it does not exist.
    pub fn load() -> Result<Self> {
        match Self::xdg_dirs().find_config_file("config.toml") {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        toml::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }

    /// Get the config file path, creating its directory
    pub fn config_file() -> Result<PathBuf> {
        Self::xdg_dirs()
            .place_config_file("config.toml")
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))
    }
}

/// Where the token cache lives unless told otherwise: `~/.credentials`.
pub fn default_cache_dir() -> Result<PathBuf> {
    home::home_dir()
        .map(|home| home.join(DEFAULT_CACHE_DIR))
        .ok_or_else(|| {
            AppError::Config("Unable to determine home directory, pass --cache-dir".to_string())
        })
}

/// How the authorization code reaches us during the interactive flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Print the URL and read the pasted code from stdin.
    Console,
    /// Receive the browser redirect on a local port.
    Loopback { port: u16 },
}

/// Fully resolved inputs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub client_secret: PathBuf,
    pub cache_dir: PathBuf,
    pub output: PathBuf,
    pub spreadsheet_id: String,
    pub range: String,
    pub auth_mode: AuthMode,
}

/// Values given on the command line. They take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub client_secret: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub spreadsheet_id: Option<String>,
    pub range: Option<String>,
    pub listen: Option<u16>,
}

impl Settings {
    pub fn resolve(overrides: Overrides, config: Config) -> Result<Self> {
        let cache_dir = match overrides.cache_dir.or(config.paths.cache_dir) {
            Some(dir) => dir,
            None => default_cache_dir()?,
        };

        let auth_mode = match overrides.listen {
            Some(port) => AuthMode::Loopback { port },
            None => AuthMode::Console,
        };

        Ok(Self {
            client_secret: overrides
                .client_secret
                .or(config.paths.client_secret)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CLIENT_SECRET)),
            cache_dir,
            output: overrides
                .output
                .or(config.paths.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            spreadsheet_id: overrides
                .spreadsheet_id
                .or(config.sheet.spreadsheet_id)
                .unwrap_or_else(|| DEFAULT_SPREADSHEET_ID.to_string()),
            range: overrides
                .range
                .or(config.sheet.range)
                .unwrap_or_else(|| DEFAULT_RANGE.to_string()),
            auth_mode,
        })
    }
}
