//! Body-param masking
//!
//! Masking is decided by key name only. A key matching any configured
//! pattern has its whole value replaced, whatever the value's type or
//! content. Traversal stops at [`MAX_DEPTH`]; containers found at that depth
//! are replaced by [`TRUNCATED`].

use crate::{MaskPattern, SanitizationConfig};
use serde_json::{Map, Value};

/// Sentinel replacing masked values (headers and body params)
pub const MASKED: &str = "[Masked]";

/// Sentinel replacing containers nested beyond [`MAX_DEPTH`]
pub const TRUNCATED: &str = "[Truncated]";

/// Maximum container depth traversed by the body-param sanitizer
pub const MAX_DEPTH: usize = 3;

/// Recursively masks body params whose keys match configured patterns
#[derive(Debug, Clone, Copy)]
pub struct BodyParamSanitizer<'a> {
    patterns: &'a [MaskPattern],
}

impl<'a> BodyParamSanitizer<'a> {
    pub fn new(config: &'a SanitizationConfig) -> Self {
        Self::with_patterns(config.body_param_mask_patterns())
    }

    pub fn with_patterns(patterns: &'a [MaskPattern]) -> Self {
        Self { patterns }
    }

    /// Sanitize a body-param tree
    ///
    /// # Examples
    ///
    /// ```
    /// use reqtrail_core::{BodyParamSanitizer, SanitizationConfig};
    /// use serde_json::json;
    ///
    /// let config = SanitizationConfig::builder()
    ///     .body_param_patterns(["/password/i"])
    ///     .build()
    ///     .unwrap();
    ///
    /// let params = json!({"LoginForm": {"username": "u1", "password": "p1"}});
    /// let sanitized = BodyParamSanitizer::new(&config).sanitize(&params);
    ///
    /// assert_eq!(sanitized, json!({"LoginForm": {"username": "u1", "password": "[Masked]"}}));
    /// ```
    pub fn sanitize(&self, params: &Value) -> Value {
        self.sanitize_at(params, 0)
    }

    /// Sanitize a subtree found at `depth`
    pub fn sanitize_at(&self, value: &Value, depth: usize) -> Value {
        match value {
            Value::Object(map) => {
                if depth >= MAX_DEPTH {
                    tracing::trace!(depth, "body params nested too deep, truncating");
                    return Value::String(TRUNCATED.to_string());
                }

                let mut sanitized = Map::with_capacity(map.len());
                for (key, val) in map {
                    sanitized.insert(key.clone(), self.sanitize_entry(key, val, depth));
                }
                Value::Object(sanitized)
            }
            Value::Array(items) => {
                if depth >= MAX_DEPTH {
                    tracing::trace!(depth, "body params nested too deep, truncating");
                    return Value::String(TRUNCATED.to_string());
                }

                // Sequences behave as maps keyed by position
                Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(index, val)| self.sanitize_entry(&index.to_string(), val, depth))
                        .collect(),
                )
            }
            _ => value.clone(),
        }
    }

    /// First pattern matching `key`, in configured order
    pub fn matching_pattern(&self, key: &str) -> Option<&'a MaskPattern> {
        self.patterns.iter().find(|pattern| pattern.is_match(key))
    }

    fn sanitize_entry(&self, key: &str, value: &Value, depth: usize) -> Value {
        if self.matching_pattern(key).is_some() {
            Value::String(MASKED.to_string())
        } else {
            self.sanitize_at(value, depth + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(patterns: &[&str]) -> SanitizationConfig {
        SanitizationConfig::builder()
            .body_param_patterns(patterns.iter().copied())
            .build()
            .unwrap()
    }

    #[test]
    fn test_scalars_pass_through() {
        let config = config(&["/password/i"]);
        let sanitizer = BodyParamSanitizer::new(&config);

        for scalar in [json!("password"), json!(42), json!(null), json!(true)] {
            assert_eq!(sanitizer.sanitize(&scalar), scalar);
        }
    }

    #[test]
    fn test_masking_by_key_regardless_of_value() {
        let config = config(&["/password/i"]);
        let sanitizer = BodyParamSanitizer::new(&config);

        assert_eq!(
            sanitizer.sanitize(&json!({"password": ""})),
            json!({"password": MASKED})
        );
        assert_eq!(
            sanitizer.sanitize(&json!({"Password": {"nested": 1}})),
            json!({"Password": MASKED})
        );
        assert_eq!(
            sanitizer.sanitize(&json!({"password": [1, 2, 3]})),
            json!({"password": MASKED})
        );
    }

    #[test]
    fn test_depth_bound() {
        let config = config(&["/password/i"]);
        let sanitizer = BodyParamSanitizer::new(&config);

        let sanitized = sanitizer.sanitize(&json!({"a": {"b": {"c": {"d": "secret"}}}}));
        assert_eq!(sanitized, json!({"a": {"b": {"c": TRUNCATED}}}));
    }

    #[test]
    fn test_scalar_at_depth_limit_is_kept() {
        let config = config(&["/password/i"]);
        let sanitizer = BodyParamSanitizer::new(&config);

        let params = json!({"a": {"b": {"c": "visible", "password": "hidden"}}});
        assert_eq!(
            sanitizer.sanitize(&params),
            json!({"a": {"b": {"c": "visible", "password": MASKED}}})
        );
    }

    #[test]
    fn test_sequences_use_positional_keys() {
        let config = config(&["/password/i", "/^1$/"]);
        let sanitizer = BodyParamSanitizer::new(&config);

        let params = json!({"users": [
            {"name": "alice", "password": "p1"},
            {"name": "bob", "password": "p2"}
        ]});

        assert_eq!(
            sanitizer.sanitize(&params),
            json!({"users": [{"name": "alice", "password": MASKED}, MASKED]})
        );
    }

    #[test]
    fn test_sequence_at_depth_limit_truncated() {
        let config = config(&[]);
        let sanitizer = BodyParamSanitizer::new(&config);

        let params = json!({"a": {"b": {"list": [1, 2]}}});
        assert_eq!(
            sanitizer.sanitize(&params),
            json!({"a": {"b": {"list": TRUNCATED}}})
        );
    }

    #[test]
    fn test_first_matching_pattern_wins() {
        let config = config(&["/pass/", "/password/i", "/word/"]);
        let sanitizer = BodyParamSanitizer::new(&config);

        assert_eq!(
            sanitizer.matching_pattern("password").map(|p| p.source()),
            Some("/pass/")
        );
        assert_eq!(
            sanitizer.matching_pattern("PASSWORD").map(|p| p.source()),
            Some("/password/i")
        );
        assert!(sanitizer.matching_pattern("username").is_none());
    }

    #[test]
    fn test_no_patterns_only_bounds_depth() {
        let config = config(&[]);
        let sanitizer = BodyParamSanitizer::new(&config);

        let params = json!({"password": "p1", "_csrf": "token"});
        assert_eq!(sanitizer.sanitize(&params), params);
    }

    #[test]
    fn test_csrf_and_login_form() {
        let config = SanitizationConfig::builder().build().unwrap();
        let sanitizer = BodyParamSanitizer::new(&config);

        let params = json!({
            "_csrf-main": "secret data!",
            "login-button": "button no 1",
            "LoginForm": {"username": "user1", "password": "password of the user"}
        });

        assert_eq!(
            sanitizer.sanitize(&params),
            json!({
                "_csrf-main": MASKED,
                "login-button": "button no 1",
                "LoginForm": {"username": "user1", "password": MASKED}
            })
        );
    }

    #[test]
    fn test_key_order_kept() {
        let config = SanitizationConfig::builder().build().unwrap();
        let sanitizer = BodyParamSanitizer::new(&config);

        let params = json!({"zeta": 1, "password": "p1", "alpha": {"mid": 2, "csrf": "t"}});
        let sanitized = sanitizer.sanitize(&params);

        assert_eq!(
            serde_json::to_string(&sanitized).unwrap(),
            r#"{"zeta":1,"password":"[Masked]","alpha":{"mid":2,"csrf":"[Masked]"}}"#
        );
    }
}
