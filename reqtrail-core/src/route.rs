//! Route exclusion
//!
//! Decides whether a request or invocation is skipped entirely. Matching is
//! exact string equality against the resolved route identifier. Route
//! resolution is only attempted when at least one route is excluded, since
//! it can be costly.

use crate::error::panic_message;
use crate::{RouteResolutionError, SanitizationConfig};
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

/// Host capability resolving the route identifier of the current invocation
pub trait RouteResolver {
    /// Resolve the route identifier (e.g. `"site/login"`)
    fn resolve_route(&self) -> Result<String, RouteResolutionError>;
}

/// Matches resolved routes against the configured exclusion set
#[derive(Debug, Clone, Copy)]
pub struct RouteExclusionMatcher<'a> {
    excluded: &'a HashSet<String>,
}

impl<'a> RouteExclusionMatcher<'a> {
    pub fn new(config: &'a SanitizationConfig) -> Self {
        Self::with_routes(config.excluded_routes())
    }

    pub fn with_routes(excluded: &'a HashSet<String>) -> Self {
        Self { excluded }
    }

    /// Whether the invocation behind `resolver` must be skipped.
    ///
    /// A resolution failure means "not excluded"; it is logged at debug
    /// level and never propagated. A panicking resolver counts as a failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use reqtrail_core::{RouteExclusionMatcher, RouteResolutionError, RouteResolver, SanitizationConfig};
    ///
    /// struct Fixed(&'static str);
    ///
    /// impl RouteResolver for Fixed {
    ///     fn resolve_route(&self) -> Result<String, RouteResolutionError> {
    ///         Ok(self.0.to_string())
    ///     }
    /// }
    ///
    /// let config = SanitizationConfig::builder()
    ///     .excluded_routes(["health/check"])
    ///     .build()
    ///     .unwrap();
    /// let matcher = RouteExclusionMatcher::new(&config);
    ///
    /// assert!(matcher.is_excluded(&Fixed("health/check")));
    /// assert!(!matcher.is_excluded(&Fixed("health/checks")));
    /// ```
    pub fn is_excluded(&self, resolver: &dyn RouteResolver) -> bool {
        if self.excluded.is_empty() {
            return false;
        }

        let resolved = panic::catch_unwind(AssertUnwindSafe(|| resolver.resolve_route()))
            .unwrap_or_else(|payload| {
                Err(RouteResolutionError(format!(
                    "resolver panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });

        match resolved {
            Ok(route) => {
                let excluded = self.excluded.contains(&route);
                if excluded {
                    tracing::debug!(route = %route, "route excluded from request logging");
                }
                excluded
            }
            Err(err) => {
                tracing::debug!(error = %err, "route resolution failed, not excluding");
                false
            }
        }
    }
}
