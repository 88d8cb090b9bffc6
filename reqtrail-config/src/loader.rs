// Option file readers

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Option file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    /// `KEY=value` lines, as read by `dotenvy`
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Detect the format of `path`; a bare `.env` file counts as `Env`
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.file_name().and_then(|n| n.to_str()) == Some(".env") {
            return Some(FileFormat::Env);
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Json => "JSON",
            FileFormat::Toml => "TOML",
            FileFormat::Env => "env",
        }
    }
}

/// Reads an option file into a JSON table.
///
/// JSON and TOML files are read as option tables keyed by option name.
/// `.env` files yield their raw variable assignments, which
/// [`EnvLoader`](crate::EnvLoader) maps onto options.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Pick the format from the file name of `path`
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        FileFormat::from_path(path).map(Self::new).ok_or_else(|| {
            ConfigError::LoadError(format!(
                "cannot tell the format of {} (expected .json, .toml or .env)",
                path.display()
            ))
        })
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("failed to read {}: {}", path.display(), e))
        })?;

        self.parse(&content)
    }

    pub fn parse(&self, content: &str) -> Result<Value> {
        let parse_error = |e: &dyn std::fmt::Display| {
            ConfigError::ParseError(format!("{} parse error: {}", self.format.name(), e))
        };

        match self.format {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| parse_error(&e)),
            FileFormat::Toml => toml::from_str::<Value>(content).map_err(|e| parse_error(&e)),
            FileFormat::Env => {
                let mut vars = Map::new();
                for item in dotenvy::from_read_iter(content.as_bytes()) {
                    let (key, value) = item.map_err(|e| parse_error(&e))?;
                    vars.insert(key, Value::String(value));
                }
                Ok(Value::Object(vars))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let json = r#"{"headersToMask": ["cookie"], "maxHeaderValueLength": 42}"#;

        let result = loader.parse(json).unwrap();
        assert_eq!(result["maxHeaderValueLength"], 42);
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            excludedRoutes = ["site/health"]
            maxHeaderValueLength = 64
            postParamPatternsToMask = ['/password/i', '#token#']
        "#;

        let result = loader.parse(toml).unwrap();
        assert_eq!(result["excludedRoutes"][0], "site/health");
        assert_eq!(result["maxHeaderValueLength"], 64);
        assert_eq!(result["postParamPatternsToMask"][1], "#token#");
    }

    #[test]
    fn test_parse_env() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let env = "REQTRAIL_HEADERS_TO_MASK=cookie,authorization\n\
                   # Comment\n\
                   export REQTRAIL_TRUNCATION_MARKER=\"...\"\n";

        let result = loader.parse(env).unwrap();
        assert_eq!(result["REQTRAIL_HEADERS_TO_MASK"], "cookie,authorization");
        assert_eq!(result["REQTRAIL_TRUNCATION_MARKER"], "...");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ConfigLoader::new(FileFormat::Json).parse("{"),
            Err(ConfigError::ParseError(_))
        ));
        assert!(matches!(
            ConfigLoader::new(FileFormat::Toml).parse("= nope"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("yaml"), None);
        assert_eq!(
            FileFormat::from_path(Path::new("/srv/app/.env")),
            Some(FileFormat::Env)
        );

        assert_eq!(
            ConfigLoader::auto("config/reqtrail.toml").unwrap().format(),
            FileFormat::Toml
        );
        assert!(ConfigLoader::auto("reqtrail").is_err());
    }
}
