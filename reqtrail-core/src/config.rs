//! Sanitization configuration
//!
//! [`RecorderOptions`] is the raw, host-facing option set (deserializable
//! from any serde source). [`SanitizationConfig`] is the validated,
//! immutable value built from it once per process and shared read-only by
//! every event handler.

use crate::validation::ConfigValidator;
use crate::{ConfigurationError, MaskPattern};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Routes excluded by default (debug toolbar endpoints)
pub const DEFAULT_EXCLUDED_ROUTES: &[&str] = &[
    "debug/default/toolbar",
    "debug/default/view",
    "debug/default/index",
    "debug/default/db-explain",
];

/// Header names masked by default
pub const DEFAULT_HEADERS_TO_MASK: &[&str] = &["cookie", "x-forwarded-for"];

/// Default limit for header values, in characters
pub const DEFAULT_MAX_HEADER_VALUE_LENGTH: i64 = 256;

/// Body-param key patterns masked by default
pub const DEFAULT_BODY_PARAM_PATTERNS: &[&str] = &["/password/i", "/csrf/i"];

/// Marker appended to truncated header values
pub const DEFAULT_TRUNCATION_MARKER: &str = "... [truncated]";

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Raw recorder options, as supplied by the host
///
/// # Examples
///
/// ```
/// use reqtrail_core::RecorderOptions;
///
/// let options: RecorderOptions = serde_json::from_value(serde_json::json!({
///     "headersToMask": ["Cookie", "Authorization"],
///     "maxHeaderValueLength": 128
/// })).unwrap();
///
/// assert_eq!(options.max_header_value_length, 128);
/// // Unspecified options keep their defaults
/// assert_eq!(options.post_param_patterns_to_mask, vec!["/password/i", "/csrf/i"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderOptions {
    /// Route identifiers that are never observed
    pub excluded_routes: Vec<String>,

    /// Header names whose values are replaced by the mask sentinel
    pub headers_to_mask: Vec<String>,

    /// Maximum header value length, in characters (must be > 1)
    pub max_header_value_length: i64,

    /// Ordered body-param key patterns; first match wins
    pub post_param_patterns_to_mask: Vec<String>,

    /// Marker appended to truncated header values
    pub truncation_marker: String,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            excluded_routes: owned(DEFAULT_EXCLUDED_ROUTES),
            headers_to_mask: owned(DEFAULT_HEADERS_TO_MASK),
            max_header_value_length: DEFAULT_MAX_HEADER_VALUE_LENGTH,
            post_param_patterns_to_mask: owned(DEFAULT_BODY_PARAM_PATTERNS),
            truncation_marker: DEFAULT_TRUNCATION_MARKER.to_string(),
        }
    }
}

/// Validated, immutable sanitization configuration
#[derive(Debug, Clone)]
pub struct SanitizationConfig {
    excluded_routes: HashSet<String>,
    headers_to_mask: HashSet<String>,
    max_header_value_length: usize,
    body_param_mask_patterns: Vec<MaskPattern>,
    truncation_marker: String,
}

impl SanitizationConfig {
    /// Create a configuration builder seeded with the default options
    ///
    /// # Examples
    ///
    /// ```
    /// use reqtrail_core::SanitizationConfig;
    ///
    /// let config = SanitizationConfig::builder()
    ///     .headers_to_mask(["Cookie", "Authorization"])
    ///     .max_header_value_length(128)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert!(config.is_header_masked("authorization"));
    /// assert_eq!(config.max_header_value_length(), 128);
    /// ```
    pub fn builder() -> SanitizationConfigBuilder {
        SanitizationConfigBuilder::new()
    }

    /// Validate raw options into a configuration
    pub fn from_options(options: &RecorderOptions) -> Result<Self, ConfigurationError> {
        let excluded_routes = ConfigValidator::excluded_routes(&options.excluded_routes)?;
        let headers_to_mask = ConfigValidator::headers_to_mask(&options.headers_to_mask)?;
        let max_header_value_length =
            ConfigValidator::max_header_value_length(options.max_header_value_length)?;
        let body_param_mask_patterns =
            ConfigValidator::mask_patterns(&options.post_param_patterns_to_mask)?;
        ConfigValidator::truncation_marker(&options.truncation_marker)?;

        Ok(Self {
            excluded_routes,
            headers_to_mask,
            max_header_value_length,
            body_param_mask_patterns,
            truncation_marker: options.truncation_marker.clone(),
        })
    }

    pub fn excluded_routes(&self) -> &HashSet<String> {
        &self.excluded_routes
    }

    /// Lowercased header names to mask
    pub fn headers_to_mask(&self) -> &HashSet<String> {
        &self.headers_to_mask
    }

    /// Case-insensitive header mask lookup
    pub fn is_header_masked(&self, name: &str) -> bool {
        self.headers_to_mask.contains(&name.to_lowercase())
    }

    pub fn max_header_value_length(&self) -> usize {
        self.max_header_value_length
    }

    pub fn body_param_mask_patterns(&self) -> &[MaskPattern] {
        &self.body_param_mask_patterns
    }

    pub fn truncation_marker(&self) -> &str {
        &self.truncation_marker
    }
}

impl TryFrom<RecorderOptions> for SanitizationConfig {
    type Error = ConfigurationError;

    fn try_from(options: RecorderOptions) -> Result<Self, Self::Error> {
        Self::from_options(&options)
    }
}

impl TryFrom<&RecorderOptions> for SanitizationConfig {
    type Error = ConfigurationError;

    fn try_from(options: &RecorderOptions) -> Result<Self, Self::Error> {
        Self::from_options(options)
    }
}

/// Builder for [`SanitizationConfig`]
///
/// Setters replace the corresponding option wholesale; `build()` runs the
/// validator.
#[derive(Debug, Clone, Default)]
pub struct SanitizationConfigBuilder {
    options: RecorderOptions,
}

impl SanitizationConfigBuilder {
    /// Create a builder seeded with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder seeded with the given options
    pub fn from_options(options: RecorderOptions) -> Self {
        Self { options }
    }

    /// Set excluded route identifiers
    pub fn excluded_routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.excluded_routes = routes.into_iter().map(Into::into).collect();
        self
    }

    /// Set header names to mask
    pub fn headers_to_mask<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.headers_to_mask = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the maximum header value length
    pub fn max_header_value_length(mut self, length: i64) -> Self {
        self.options.max_header_value_length = length;
        self
    }

    /// Set body-param mask patterns, in evaluation order
    pub fn body_param_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.post_param_patterns_to_mask = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the truncation marker
    pub fn truncation_marker(mut self, marker: impl Into<String>) -> Self {
        self.options.truncation_marker = marker.into();
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<SanitizationConfig, ConfigurationError> {
        SanitizationConfig::from_options(&self.options)
    }
}
