// reqtrail - Sanitized request/response records for structured logs
//
// This library observes web requests, responses and console invocations and
// emits one structured record per lifecycle phase, with sensitive headers and
// body parameters masked before anything reaches the log.

// Re-export core functionality
pub use reqtrail_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use reqtrail_config;

#[cfg(feature = "log")]
pub use reqtrail_log;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        ApplicationKind,
        EventRecord,
        EventRecorder,
        IncomingRequest,
        LifecycleDispatcher,
        LifecycleHooks,
        LifecyclePhase,
        LogSink,
        MemorySink,
        OutgoingResponse,
        ProcessInvocation,
        ProcessSnapshot,
        RecorderOptions,
        RequestSnapshot,
        ResponseSnapshot,
        SanitizationConfig,
        TracingSink,
    };

    #[cfg(feature = "config")]
    pub use reqtrail_config::{OptionsLoader, load_config};

    #[cfg(feature = "log")]
    pub use reqtrail_log::{LogConfig, LogFormat, LogLevel as LogOutputLevel, LogOutput};
}
