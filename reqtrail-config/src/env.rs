// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::env;

/// Default environment variable prefix
pub const DEFAULT_PREFIX: &str = "REQTRAIL";

#[derive(Debug, Clone, Copy)]
enum Kind {
    List,
    Integer,
    Text,
}

/// Variable suffix, option key and value kind
const OPTION_VARS: &[(&str, &str, Kind)] = &[
    ("EXCLUDED_ROUTES", "excludedRoutes", Kind::List),
    ("HEADERS_TO_MASK", "headersToMask", Kind::List),
    ("MAX_HEADER_VALUE_LENGTH", "maxHeaderValueLength", Kind::Integer),
    ("POST_PARAM_PATTERNS_TO_MASK", "postParamPatternsToMask", Kind::List),
    ("TRUNCATION_MARKER", "truncationMarker", Kind::Text),
];

/// Environment variable loader
///
/// Lists are comma separated; blank segments are ignored, so an empty
/// variable yields an empty list. A value starting with `[` is read as a
/// JSON array of strings instead, for entries that contain commas such as
/// the pattern `/x{1,3}/`.
pub struct EnvLoader {
    prefix: String,
    vars: Option<HashMap<String, String>>,
}

impl EnvLoader {
    /// Create a loader reading the process environment
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            vars: None,
        }
    }

    /// Create a loader reading the given variables instead of the process
    /// environment
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Load a specific variable, `key` being the unprefixed name
    pub fn load_var(&self, key: &str) -> Option<String> {
        let full_key = format!("{}_{}", self.prefix, key.to_uppercase());
        match &self.vars {
            Some(vars) => vars.get(&full_key).cloned(),
            None => env::var(&full_key).ok(),
        }
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|| default.to_string())
    }

    /// Option overrides found in the environment, keyed by option name
    pub fn load(&self) -> Result<Map<String, Value>> {
        let mut overrides = Map::new();

        for (suffix, option, kind) in OPTION_VARS {
            let Some(raw) = self.load_var(suffix) else {
                continue;
            };

            let value = match kind {
                Kind::List if raw.trim_start().starts_with('[') => {
                    let items: Vec<String> =
                        serde_json::from_str(&raw).map_err(|e| ConfigError::EnvError {
                            key: format!("{}_{}", self.prefix, suffix),
                            reason: format!("invalid JSON list: {}", e),
                        })?;
                    Value::from(items)
                }
                Kind::List => Value::Array(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|segment| !segment.is_empty())
                        .map(|segment| Value::String(segment.to_string()))
                        .collect(),
                ),
                Kind::Integer => {
                    let parsed: i64 = raw.trim().parse().map_err(|e| ConfigError::EnvError {
                        key: format!("{}_{}", self.prefix, suffix),
                        reason: format!("{}", e),
                    })?;
                    Value::from(parsed)
                }
                Kind::Text => Value::String(raw),
            };

            tracing::debug!(option = *option, "recorder option overridden from environment");
            overrides.insert(option.to_string(), value);
        }

        Ok(overrides)
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_loader_with_default() {
        let loader = EnvLoader::new("REQTRAIL_TEST_NONEXISTENT_12345");
        assert_eq!(loader.load_var_or("MISSING", "default"), "default");
        assert!(loader.load().unwrap().is_empty());
    }

    #[test]
    fn test_prefix_applied() {
        let loader = EnvLoader::from_vars("MYAPP", [("MYAPP_TRUNCATION_MARKER", "~")]);
        assert_eq!(loader.load_var("truncation_marker").as_deref(), Some("~"));
        assert_eq!(loader.load_var("TRUNCATION_MARKER").as_deref(), Some("~"));
        assert!(EnvLoader::from_vars("OTHER", [("MYAPP_TRUNCATION_MARKER", "~")])
            .load_var("TRUNCATION_MARKER")
            .is_none());
    }

    #[test]
    fn test_lists_and_numbers() {
        let loader = EnvLoader::from_vars(
            DEFAULT_PREFIX,
            [
                ("REQTRAIL_HEADERS_TO_MASK", "Cookie, Authorization ,"),
                ("REQTRAIL_EXCLUDED_ROUTES", ""),
                ("REQTRAIL_MAX_HEADER_VALUE_LENGTH", " 128 "),
            ],
        );

        let overrides = loader.load().unwrap();
        assert_eq!(
            overrides["headersToMask"],
            serde_json::json!(["Cookie", "Authorization"])
        );
        assert_eq!(overrides["excludedRoutes"], serde_json::json!([]));
        assert_eq!(overrides["maxHeaderValueLength"], 128);
        assert!(!overrides.contains_key("truncationMarker"));
    }

    #[test]
    fn test_json_list_keeps_commas() {
        let loader = EnvLoader::from_vars(
            DEFAULT_PREFIX,
            [(
                "REQTRAIL_POST_PARAM_PATTERNS_TO_MASK",
                r#"["/x{1,3}/", "/password/i"]"#,
            )],
        );

        let overrides = loader.load().unwrap();
        assert_eq!(
            overrides["postParamPatternsToMask"],
            serde_json::json!(["/x{1,3}/", "/password/i"])
        );

        let broken = EnvLoader::from_vars(
            DEFAULT_PREFIX,
            [("REQTRAIL_EXCLUDED_ROUTES", r#"["site/login""#)],
        );
        assert!(matches!(broken.load(), Err(ConfigError::EnvError { .. })));
    }

    #[test]
    fn test_invalid_number() {
        let loader = EnvLoader::from_vars(
            DEFAULT_PREFIX,
            [("REQTRAIL_MAX_HEADER_VALUE_LENGTH", "lots")],
        );

        match loader.load() {
            Err(ConfigError::EnvError { key, .. }) => {
                assert_eq!(key, "REQTRAIL_MAX_HEADER_VALUE_LENGTH")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
