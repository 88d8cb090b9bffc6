//! Event recorder
//!
//! Main interface for observing lifecycle events. For each event the
//! recorder checks route exclusion, gathers context through the host
//! traits, sanitizes headers and body params, and hands one structured
//! record to the [`LogSink`].
//!
//! Handlers never fail. A failure while gathering context (an accessor
//! error or panic) is logged at error level together with the partial
//! record, and the partial record is still emitted.

use crate::error::panic_message;
use crate::lifecycle::{LifecycleEventSource, LifecycleHooks};
use crate::{
    BodyParamSanitizer, ConfigurationError, EventRecord, HandlerError, HeaderSanitizer,
    HeaderSnapshot, IncomingRequest, LOG_CATEGORY, LifecyclePhase, LogSink, OutgoingResponse,
    ProcessInvocation, ProcessProbe, RouteExclusionMatcher, RouteResolver, RuntimeAnomaly,
    RuntimeProbe, SanitizationConfig, SanitizedHeaders, TracingSink,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Records request/response and process lifecycle events
pub struct EventRecorder {
    config: Arc<SanitizationConfig>,
    sink: Arc<dyn LogSink>,
    probe: Arc<dyn RuntimeProbe>,
    registered: AtomicBool,
}

impl EventRecorder {
    /// Create a new event recorder builder
    ///
    /// # Examples
    ///
    /// ```
    /// use reqtrail_core::{EventRecorder, MemorySink, SanitizationConfig};
    ///
    /// let recorder = EventRecorder::builder()
    ///     .config(SanitizationConfig::builder().build().unwrap())
    ///     .sink(MemorySink::new())
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(recorder.config().max_header_value_length(), 256);
    /// ```
    pub fn builder() -> EventRecorderBuilder {
        EventRecorderBuilder::new()
    }

    /// Create a recorder with the default probe
    pub fn new(config: SanitizationConfig, sink: impl LogSink + 'static) -> Self {
        Self {
            config: Arc::new(config),
            sink: Arc::new(sink),
            probe: Arc::new(ProcessProbe::new()),
            registered: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SanitizationConfig {
        &self.config
    }

    /// Whether hooks were attached to a lifecycle source
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Attach this recorder's hooks to `source`.
    ///
    /// Web sources get the request phases, console sources the process
    /// phases. Returns `false` (and logs a warning) when hooks were already
    /// registered; nothing is attached twice.
    pub fn register_for_lifecycle(self: &Arc<Self>, source: &mut dyn LifecycleEventSource) -> bool {
        if self.registered.swap(true, Ordering::AcqRel) {
            let err = HandlerError::AlreadyRegistered;
            self.sink.warn(
                &err.to_string(),
                "EventRecorder::register_for_lifecycle",
                &serde_json::json!({}),
            );
            return false;
        }

        let hooks: Arc<dyn LifecycleHooks> = self.clone();
        let kind = source.kind();
        for phase in kind.phases() {
            source.attach(*phase, hooks.clone());
        }

        tracing::debug!(kind = ?kind, "event recorder attached to lifecycle");
        true
    }

    /// Whether the invocation behind `resolver` is excluded from logging
    pub fn is_excluded(&self, resolver: &dyn RouteResolver) -> bool {
        RouteExclusionMatcher::new(&self.config).is_excluded(resolver)
    }

    /// Log an incoming request.
    ///
    /// Returns the emitted record, or `None` when the route is excluded.
    pub fn record_request_start(&self, request: &dyn IncomingRequest) -> Option<EventRecord> {
        if self.is_excluded(request) {
            return None;
        }

        let mut record = EventRecord::new(LifecyclePhase::RequestStart);
        self.gather("EventRecorder::on_request_start", &mut record, |record| {
            let identity = request.identity()?;
            let user = record.user_mut();
            user.id = Some(identity.id().to_string());
            user.username = Some(identity.username().to_string());

            record.request_mut().method = Some(request.method()?);
            record.request_mut().absolute_url = Some(request.absolute_url()?);

            let params = request.body_params()?;
            record.request_mut().body_params =
                Some(BodyParamSanitizer::new(&self.config).sanitize(&params));

            record.request_mut().referrer = request.referrer()?;
            record.request_mut().user_ip = request.user_ip()?;
            record.request_mut().user_agent = request.user_agent()?;

            record.headers = Some(self.sanitize_headers(&request.headers()?));
            Ok(())
        });

        Some(self.emit(record))
    }

    /// Log an outgoing response.
    ///
    /// Returns the emitted record, or `None` when the route is excluded.
    pub fn record_request_end(
        &self,
        request: &dyn IncomingRequest,
        response: &dyn OutgoingResponse,
    ) -> Option<EventRecord> {
        if self.is_excluded(request) {
            return None;
        }

        let mut record = EventRecord::new(LifecyclePhase::RequestEnd);
        self.gather("EventRecorder::on_request_end", &mut record, |record| {
            record.response_mut().status_code = Some(response.status_code()?);
            record.response_mut().format = Some(response.format()?);

            let is_stream = response.is_stream()?;
            record.response_mut().is_stream = Some(is_stream);
            if !is_stream {
                record.response_mut().content_length = Some(response.content_length()?);
            }

            record.headers = Some(self.sanitize_headers(&response.headers()?));
            self.measure(record)
        });

        Some(self.emit(record))
    }

    /// Log a console command start.
    ///
    /// Returns the emitted record, or `None` when the route is excluded.
    pub fn record_process_start(&self, process: &dyn ProcessInvocation) -> Option<EventRecord> {
        if self.is_excluded(process) {
            return None;
        }

        let mut record = EventRecord::new(LifecyclePhase::ProcessStart);
        self.gather("EventRecorder::on_process_start", &mut record, |record| {
            record.command = process.command()?;
            Ok(())
        });

        Some(self.emit(record))
    }

    /// Log a console command end.
    ///
    /// Returns the emitted record, or `None` when the route is excluded.
    pub fn record_process_end(&self, process: &dyn ProcessInvocation) -> Option<EventRecord> {
        if self.is_excluded(process) {
            return None;
        }

        let mut record = EventRecord::new(LifecyclePhase::ProcessEnd);
        self.gather("EventRecorder::on_process_end", &mut record, |record| {
            record.exit_status = Some(process.exit_status()?);
            self.measure(record)
        });

        Some(self.emit(record))
    }

    /// Flatten and sanitize headers, reporting duplicate values
    fn sanitize_headers(&self, snapshot: &HeaderSnapshot) -> SanitizedHeaders {
        let (flat, duplicated) = HeaderSanitizer::flatten(snapshot);
        if duplicated {
            let headers = snapshot.to_json();
            let context = serde_json::json!({ "headers": headers });
            let anomaly = RuntimeAnomaly::DuplicateHeaderValues { headers };
            self.sink
                .warn(&anomaly.to_string(), "EventRecorder::sanitize_headers", &context);
        }

        HeaderSanitizer::new(&self.config).sanitize(flat)
    }

    fn measure(&self, record: &mut EventRecord) -> Result<(), HandlerError> {
        record.exec_time_sec = Some(self.probe.elapsed_seconds());
        record.memory_peak_usage_bytes = Some(self.probe.peak_memory_bytes()?);
        Ok(())
    }

    /// Run `collect` against `record`, logging any failure with the
    /// partial record gathered so far
    fn gather<F>(&self, handler: &'static str, record: &mut EventRecord, collect: F)
    where
        F: FnOnce(&mut EventRecord) -> Result<(), HandlerError>,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| collect(record)));

        let err = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => HandlerError::Panicked {
                handler,
                message: panic_message(payload.as_ref()),
            },
        };

        tracing::debug!(handler, error = %err, "failed to gather event context");
        self.sink.error(&err.to_string(), handler, &record.to_context());
    }

    fn emit(&self, record: EventRecord) -> EventRecord {
        self.sink
            .info(record.phase.message(), LOG_CATEGORY, &record.to_context());
        record
    }
}

impl LifecycleHooks for EventRecorder {
    fn on_request_start(&self, request: &dyn IncomingRequest) {
        self.record_request_start(request);
    }

    fn on_request_end(&self, request: &dyn IncomingRequest, response: &dyn OutgoingResponse) {
        self.record_request_end(request, response);
    }

    fn on_process_start(&self, process: &dyn ProcessInvocation) {
        self.record_process_start(process);
    }

    fn on_process_end(&self, process: &dyn ProcessInvocation) {
        self.record_process_end(process);
    }
}

/// Event recorder builder
pub struct EventRecorderBuilder {
    config: Option<SanitizationConfig>,
    sink: Option<Arc<dyn LogSink>>,
    probe: Option<Arc<dyn RuntimeProbe>>,
}

impl EventRecorderBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: None,
            sink: None,
            probe: None,
        }
    }

    /// Set the sanitization configuration (defaults apply otherwise)
    pub fn config(mut self, config: SanitizationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the log sink ([`TracingSink`] otherwise)
    pub fn sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Set the runtime probe ([`ProcessProbe`] otherwise)
    pub fn probe(mut self, probe: impl RuntimeProbe + 'static) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    /// Build the event recorder.
    ///
    /// Without an explicit configuration the defaults are validated here.
    pub fn build(self) -> Result<EventRecorder, ConfigurationError> {
        let config = match self.config {
            Some(config) => config,
            None => SanitizationConfig::builder().build()?,
        };

        Ok(EventRecorder {
            config: Arc::new(config),
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink::new())),
            probe: self.probe.unwrap_or_else(|| Arc::new(ProcessProbe::new())),
            registered: AtomicBool::new(false),
        })
    }
}

impl Default for EventRecorderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
