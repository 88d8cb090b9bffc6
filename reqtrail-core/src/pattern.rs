//! Body-param mask patterns
//!
//! Patterns are written in the delimited form hosts already use for request
//! filters: `/password/i`, `#token#`, `~^api[-_]?key$~i`. Supported flags are
//! `i` (case-insensitive), `m` (multi-line), `s` (dot matches newline),
//! `x` (ignore whitespace), `U` (swap greed) and `u` (accepted, regexes are
//! always Unicode-aware). A string that is not in delimited form is compiled
//! as a plain regular expression.

use regex::{Regex, RegexBuilder};
use std::fmt;

/// Characters accepted as pattern delimiters
const DELIMITERS: &[char] = &['/', '#', '~', '!', '@', '%', ';', ',', '|'];

/// A compiled body-param mask pattern
#[derive(Clone)]
pub struct MaskPattern {
    source: String,
    regex: Regex,
}

impl MaskPattern {
    /// Compile a pattern from its configured source string.
    ///
    /// The error string describes why the pattern was rejected; callers wrap
    /// it into a [`ConfigurationError`](crate::ConfigurationError).
    ///
    /// # Examples
    ///
    /// ```
    /// use reqtrail_core::MaskPattern;
    ///
    /// let pattern = MaskPattern::compile("/password/i").unwrap();
    /// assert!(pattern.is_match("LoginForm[Password]"));
    /// assert!(!pattern.is_match("username"));
    /// ```
    pub fn compile(source: &str) -> Result<Self, String> {
        let regex = match split_delimited(source) {
            Some((body, flags)) => {
                if body.is_empty() {
                    return Err("pattern body is empty".to_string());
                }
                let mut builder = RegexBuilder::new(body);
                for flag in flags.chars() {
                    match flag {
                        'i' => builder.case_insensitive(true),
                        'm' => builder.multi_line(true),
                        's' => builder.dot_matches_new_line(true),
                        'x' => builder.ignore_whitespace(true),
                        'U' => builder.swap_greed(true),
                        'u' => builder.unicode(true),
                        other => return Err(format!("unsupported pattern flag '{}'", other)),
                    };
                }
                builder.build()
            }
            None => Regex::new(source),
        }
        .map_err(|e| e.to_string())?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Test a body-param key against this pattern
    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The pattern as it was configured
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for MaskPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MaskPattern").field(&self.source).finish()
    }
}

/// Split `<d>body<d>flags` into `(body, flags)`.
///
/// Returns `None` when the string does not start with a known delimiter, has
/// no closing delimiter, or carries non-letter characters after it; such
/// strings are treated as plain regular expressions.
fn split_delimited(source: &str) -> Option<(&str, &str)> {
    let delimiter = source.chars().next()?;
    if !DELIMITERS.contains(&delimiter) {
        return None;
    }

    let end = source.rfind(delimiter)?;
    if end == 0 {
        return None;
    }

    let body = &source[delimiter.len_utf8()..end];
    let flags = &source[end + delimiter.len_utf8()..];
    if !flags.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some((body, flags))
}
