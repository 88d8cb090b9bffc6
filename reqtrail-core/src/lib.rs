//! Request/response observability core for reqtrail
//!
//! This crate turns web requests, responses and console invocations into
//! sanitized structured log records.
//!
//! # Features
//!
//! - **Route Exclusion** - Skip configured routes entirely
//! - **Header Sanitization** - Single-valued headers, masking, truncation
//! - **Body-Param Masking** - Key-pattern masking with bounded depth
//! - **Validated Configuration** - Invalid options are rejected up front
//! - **Lifecycle Hooks** - Request and console phases, registered once
//! - **Pluggable Sinks** - `tracing` by default, in-memory for tests
//!
//! # Quick Start
//!
//! ```
//! use reqtrail_core::*;
//! use std::sync::Arc;
//!
//! let config = SanitizationConfig::builder()
//!     .headers_to_mask(["Cookie", "Authorization"])
//!     .build()
//!     .unwrap();
//!
//! let sink = MemorySink::new();
//! let recorder = Arc::new(EventRecorder::new(config, sink.clone()));
//!
//! let mut dispatcher = LifecycleDispatcher::web();
//! recorder.register_for_lifecycle(&mut dispatcher);
//!
//! let request = RequestSnapshot::new("POST", "https://example.com/site/login")
//!     .with_route("site/login")
//!     .with_header("Authorization", "Bearer abc")
//!     .with_body_params(serde_json::json!({"password": "hunter2"}));
//!
//! let scope = dispatcher.begin_request(&request);
//! scope.complete(&ResponseSnapshot::new(302));
//!
//! let entries = sink.entries();
//! assert_eq!(entries.len(), 2);
//! assert_eq!(entries[0].context["headers"]["Authorization"], MASKED);
//! assert_eq!(entries[0].context["request"]["bodyParams"]["password"], MASKED);
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod headers;
pub mod host;
pub mod lifecycle;
pub mod masking;
pub mod pattern;
pub mod probe;
pub mod recorder;
pub mod route;
pub mod sink;
pub mod validation;

pub use config::*;
pub use error::*;
pub use event::*;
pub use headers::*;
pub use host::*;
pub use lifecycle::*;
pub use masking::*;
pub use pattern::*;
pub use probe::*;
pub use recorder::*;
pub use route::*;
pub use sink::*;
pub use validation::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _ = EventRecord::new(LifecyclePhase::RequestStart);
        let _ = MemorySink::new();
        assert_eq!(MASKED, "[Masked]");
        assert_eq!(TRUNCATED, "[Truncated]");
        assert_eq!(LOG_CATEGORY, "requestResponseData");
    }
}
