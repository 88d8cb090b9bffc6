//! Configuration validation
//!
//! Every rule runs at construction time; a violation yields a
//! [`ConfigurationError`] naming the offending option and value.

use crate::{ConfigurationError, MaskPattern};
use std::collections::HashSet;

/// Option names, as exposed to hosts
pub const FIELD_EXCLUDED_ROUTES: &str = "excludedRoutes";
pub const FIELD_HEADERS_TO_MASK: &str = "headersToMask";
pub const FIELD_MAX_HEADER_VALUE_LENGTH: &str = "maxHeaderValueLength";
pub const FIELD_BODY_PARAM_PATTERNS: &str = "postParamPatternsToMask";
pub const FIELD_TRUNCATION_MARKER: &str = "truncationMarker";

/// Validation rules for the recorder configuration
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that every entry is a non-empty string
    pub fn non_empty_entries(field: &'static str, values: &[String]) -> Result<(), ConfigurationError> {
        for (index, value) in values.iter().enumerate() {
            if value.trim().is_empty() {
                return Err(ConfigurationError::new(
                    field,
                    format!("{:?}", value),
                    format!("entry #{} must be a non-empty string", index),
                ));
            }
        }
        Ok(())
    }

    /// Validate excluded routes and collect them into a set
    pub fn excluded_routes(values: &[String]) -> Result<HashSet<String>, ConfigurationError> {
        Self::non_empty_entries(FIELD_EXCLUDED_ROUTES, values)?;
        Ok(values.iter().cloned().collect())
    }

    /// Validate header names and normalize them to a lowercase set
    pub fn headers_to_mask(values: &[String]) -> Result<HashSet<String>, ConfigurationError> {
        Self::non_empty_entries(FIELD_HEADERS_TO_MASK, values)?;
        Ok(values.iter().map(|name| name.to_lowercase()).collect())
    }

    /// Validate the header value length limit.
    ///
    /// The limit must leave room for at least one character of the value
    /// plus the truncation marker, so anything below 2 is rejected.
    pub fn max_header_value_length(value: i64) -> Result<usize, ConfigurationError> {
        if value <= 1 {
            return Err(ConfigurationError::new(
                FIELD_MAX_HEADER_VALUE_LENGTH,
                value.to_string(),
                "must be an integer greater than 1",
            ));
        }

        usize::try_from(value).map_err(|_| {
            ConfigurationError::new(
                FIELD_MAX_HEADER_VALUE_LENGTH,
                value.to_string(),
                "does not fit the platform size type",
            )
        })
    }

    /// Validate and compile body-param mask patterns, preserving order
    pub fn mask_patterns(values: &[String]) -> Result<Vec<MaskPattern>, ConfigurationError> {
        Self::non_empty_entries(FIELD_BODY_PARAM_PATTERNS, values)?;

        values
            .iter()
            .map(|source| {
                MaskPattern::compile(source).map_err(|reason| {
                    ConfigurationError::new(FIELD_BODY_PARAM_PATTERNS, source.clone(), reason)
                })
            })
            .collect()
    }

    /// Validate the header truncation marker
    pub fn truncation_marker(value: &str) -> Result<(), ConfigurationError> {
        if value.is_empty() {
            return Err(ConfigurationError::new(
                FIELD_TRUNCATION_MARKER,
                "\"\"",
                "must be a non-empty string",
            ));
        }
        Ok(())
    }
}
