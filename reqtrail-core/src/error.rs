//! Error types for the sanitization pipeline

use std::any::Any;
use thiserror::Error;

/// Invalid configuration detected while building a [`SanitizationConfig`].
///
/// Raised once, at construction time. Nothing downstream catches it: a
/// process holding an invalid configuration never starts observing events.
///
/// [`SanitizationConfig`]: crate::SanitizationConfig
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration for `{field}` (value: {value}): {reason}")]
pub struct ConfigurationError {
    /// Configuration option name, as exposed to the host (`excludedRoutes`, ...)
    pub field: &'static str,
    /// Offending raw value, rendered as text
    pub value: String,
    /// What is wrong with it
    pub reason: String,
}

impl ConfigurationError {
    pub fn new(field: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Recoverable failure while gathering context for a lifecycle event.
///
/// Always caught at the boundary of the handler that raised it and logged
/// together with the partial context gathered so far.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("unable to read {what}: {reason}")]
    ContextUnavailable { what: &'static str, reason: String },

    #[error("host accessor panicked inside {handler}: {message}")]
    Panicked {
        handler: &'static str,
        message: String,
    },

    #[error("attempt to register lifecycle hooks after they were already registered")]
    AlreadyRegistered,
}

impl HandlerError {
    /// Shorthand for [`HandlerError::ContextUnavailable`]
    pub fn unavailable(what: &'static str, reason: impl Into<String>) -> Self {
        Self::ContextUnavailable {
            what,
            reason: reason.into(),
        }
    }
}

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Informational anomaly noticed during processing.
///
/// Reported as a warning; never alters the sanitized output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeAnomaly {
    #[error("several header values were found for the same header name, check attached context")]
    DuplicateHeaderValues { headers: serde_json::Value },
}

/// Route resolution failed (for instance, no route matches the request).
///
/// Never treated as an exclusion and never propagated past the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("route resolution failed: {0}")]
pub struct RouteResolutionError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = ConfigurationError::new("maxHeaderValueLength", "1", "must be greater than 1");
        let text = err.to_string();
        assert!(text.contains("maxHeaderValueLength"));
        assert!(text.contains("must be greater than 1"));
    }

    #[test]
    fn test_handler_error_unavailable() {
        let err = HandlerError::unavailable("identity", "session store offline");
        assert_eq!(
            err.to_string(),
            "unable to read identity: session store offline"
        );
    }

    #[test]
    fn test_panicked_names_handler() {
        let err = HandlerError::Panicked {
            handler: "EventRecorder::on_request_end",
            message: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "host accessor panicked inside EventRecorder::on_request_end: boom"
        );
    }

    fn message_of(f: impl FnOnce() + std::panic::UnwindSafe) -> String {
        match std::panic::catch_unwind(f) {
            Ok(()) => panic!("closure did not panic"),
            Err(payload) => panic_message(payload.as_ref()),
        }
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(message_of(|| panic!("static text")), "static text");
        assert_eq!(message_of(|| panic!("code {}", 7)), "code 7");
        assert_eq!(
            message_of(|| std::panic::panic_any(42u8)),
            "unknown panic payload"
        );
    }
}
