// Recorder option loading for reqtrail
//
// Options are layered: built-in defaults, then an optional file (JSON, TOML
// or .env), then `REQTRAIL_*` environment variables. The merged options are
// validated into a `SanitizationConfig` once, at startup.

pub mod env;
pub mod error;
pub mod loader;

pub use env::{DEFAULT_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use reqtrail_core::{RecorderOptions, SanitizationConfig};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Layered recorder option loader
///
/// # Examples
///
/// ```
/// use reqtrail_config::{EnvLoader, OptionsLoader};
///
/// let config = OptionsLoader::new()
///     .env(EnvLoader::from_vars("REQTRAIL", [("REQTRAIL_MAX_HEADER_VALUE_LENGTH", "64")]))
///     .load_config()
///     .unwrap();
///
/// assert_eq!(config.max_header_value_length(), 64);
/// ```
pub struct OptionsLoader {
    file: Option<PathBuf>,
    dotenv: Option<PathBuf>,
    load_dotenv: bool,
    env: Option<EnvLoader>,
}

impl OptionsLoader {
    /// Create a loader reading `REQTRAIL_*` variables from the process
    /// environment
    pub fn new() -> Self {
        Self {
            file: None,
            dotenv: None,
            load_dotenv: false,
            env: Some(EnvLoader::default()),
        }
    }

    /// Read options from a file; the format follows the extension
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load `.env` into the process environment before reading variables.
    ///
    /// Without a path the usual `.env` lookup applies and a missing file is
    /// ignored.
    pub fn dotenv(mut self, path: Option<&Path>) -> Self {
        self.load_dotenv = true;
        self.dotenv = path.map(Path::to_path_buf);
        self
    }

    /// Replace the environment loader
    pub fn env(mut self, env: EnvLoader) -> Self {
        self.env = Some(env);
        self
    }

    /// Ignore environment variables
    pub fn without_env(mut self) -> Self {
        self.env = None;
        self
    }

    /// Merge all layers into raw options
    pub fn load(&self) -> Result<RecorderOptions> {
        if self.load_dotenv {
            match &self.dotenv {
                Some(path) => {
                    dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
                }
                None => {
                    dotenvy::dotenv().ok();
                }
            }
        }

        let mut merged = match serde_json::to_value(RecorderOptions::default()) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(ConfigError::DeserializationError(e.to_string())),
        };

        if let Some(path) = &self.file {
            let loader = ConfigLoader::auto(path)?;
            let data = loader.load_file(path)?;
            let layer = match loader.format() {
                FileFormat::Env => {
                    let vars = match data {
                        Value::Object(map) => map
                            .into_iter()
                            .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                            .collect::<Vec<_>>(),
                        _ => Vec::new(),
                    };
                    let prefix = self
                        .env
                        .as_ref()
                        .map(|env| env.prefix().to_string())
                        .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
                    EnvLoader::from_vars(prefix, vars).load()?
                }
                _ => match data {
                    Value::Object(map) => map,
                    _ => {
                        return Err(ConfigError::ParseError(format!(
                            "{} must contain a table of options",
                            path.display()
                        )));
                    }
                },
            };
            tracing::debug!(path = %path.display(), keys = layer.len(), "recorder options loaded from file");
            merged.extend(layer);
        }

        if let Some(env) = &self.env {
            merged.extend(env.load()?);
        }

        serde_json::from_value(Value::Object(merged))
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Merge all layers and validate the result
    pub fn load_config(&self) -> Result<SanitizationConfig> {
        let options = self.load()?;
        Ok(SanitizationConfig::try_from(options)?)
    }
}

impl Default for OptionsLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and validate options from `path` and the process environment
pub fn load_config(path: Option<&Path>) -> Result<SanitizationConfig> {
    let mut loader = OptionsLoader::new();
    if let Some(path) = path {
        loader = loader.file(path);
    }
    loader.load_config()
}
