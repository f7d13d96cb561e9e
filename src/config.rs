use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::{CirclogError, Result};

const DEFAULT_HOST: &str = "https://circleci.com";

/// Config file location relative to the home directory. Shared with the
/// official CircleCI CLI, which already stores the token there.
const DEFAULT_CONFIG_PATH: &str = ".circleci/cli.yml";

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    token: Option<String>,
    host: Option<String>,
    project: Option<String>,
}

/// Resolved client configuration.
///
/// File values come from a YAML file (`~/.circleci/cli.yml` by default);
/// CLI flags override the file. A missing default file is fine as long
/// as a token arrives some other way.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub host: String,
    pub project: Option<String>,
}

impl Config {
    /// Loads configuration, merging an optional config file with
    /// flag-provided overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file cannot be read or
    /// parsed, or if no token is available from any source.
    pub fn load(
        path: Option<&Path>,
        token: Option<String>,
        host: Option<String>,
        project: Option<String>,
    ) -> Result<Self> {
        let file = match path {
            Some(path) => Self::read_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read_file(&path)?,
                _ => ConfigFile::default(),
            },
        };

        let token = token.or(file.token).ok_or_else(|| {
            CirclogError::Config(
                "No API token; pass --token or set `token` in the config file".into(),
            )
        })?;

        Ok(Self {
            token,
            host: host.or(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            project: project.or(file.project).filter(|p| !p.trim().is_empty()),
        })
    }

    fn read_file(path: &Path) -> Result<ConfigFile> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| CirclogError::Config(format!("Failed to parse {}: {e}", path.display())))
    }

    fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_PATH))
    }
}
