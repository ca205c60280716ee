//! Process configuration: optional TOML file, then `PDR_*` environment
//! overrides. Command-line flags are applied by the caller last.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Config file picked up from the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "pdr.toml";

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("error reading config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("error parsing config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub(crate) server: ServerConfig,
    pub(crate) auth: AuthConfig,
    pub(crate) logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerConfig {
    pub(crate) port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AuthConfig {
    /// When set, every route except `/health` requires this key.
    pub(crate) api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub(crate) filter: Option<String>,
    pub(crate) json: bool,
}

impl Config {
    /// Load from `explicit`, else from [`DEFAULT_CONFIG_FILE`] if it exists,
    /// else defaults; then apply environment overrides.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if default_path.is_file() => Self::from_file(default_path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&src).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup("PDR_PORT") {
            self.server.port = value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv {
                    var: "PDR_PORT",
                    value,
                })?;
        }
        if let Some(key) = lookup("PDR_API_KEY") {
            self.auth.api_key = Some(key);
        }
        if let Some(filter) = lookup("PDR_LOG") {
            self.logging.filter = Some(filter);
        }
        // An empty key disables auth rather than requiring an empty header.
        self.auth.api_key = self.auth.api_key.take().filter(|k| !k.is_empty());
        Ok(())
    }
}
