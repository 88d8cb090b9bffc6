//! Event record structures
//!
//! Field names serialize to the stable keys downstream log consumers rely
//! on (`user.id`, `request.absoluteUrl`, `response.statusCode`,
//! `execTimeSec`, ...). Every field is optional so a record can be emitted
//! with whatever context was gathered before a failure.

use crate::SanitizedHeaders;
use serde::{Deserialize, Serialize};

/// Log category of every lifecycle record
pub const LOG_CATEGORY: &str = "requestResponseData";

/// Lifecycle point at which a record is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecyclePhase {
    /// Inbound HTTP request received
    RequestStart,
    /// HTTP response sent
    RequestEnd,
    /// Non-HTTP invocation started
    ProcessStart,
    /// Non-HTTP invocation finished
    ProcessEnd,
}

impl LifecyclePhase {
    /// Log message for records of this phase
    pub fn message(&self) -> &'static str {
        match self {
            LifecyclePhase::RequestStart => "Incoming request",
            LifecyclePhase::RequestEnd => "Outgoing response",
            LifecyclePhase::ProcessStart => "CLI command start",
            LifecyclePhase::ProcessEnd => "CLI command end",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::RequestStart => "request-start",
            LifecyclePhase::RequestEnd => "request-end",
            LifecyclePhase::ProcessStart => "process-start",
            LifecyclePhase::ProcessEnd => "process-end",
        }
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who issued the request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Inbound request metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_url: Option<String>,

    /// Sanitized body params
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_params: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ip: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Outbound response metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_stream: Option<bool>,

    /// Body length in bytes; absent for streamed responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

/// Structured record handed to the log sink
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub phase: LifecyclePhase,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserContext>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestContext>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<SanitizedHeaders>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseContext>,

    /// Command line of a non-HTTP invocation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec_time_sec: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_peak_usage_bytes: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<i32>,
}

impl EventRecord {
    /// Create an empty record for `phase`
    ///
    /// # Examples
    ///
    /// ```
    /// use reqtrail_core::{EventRecord, LifecyclePhase};
    ///
    /// let mut record = EventRecord::new(LifecyclePhase::RequestStart);
    /// record.request_mut().method = Some("GET".to_string());
    ///
    /// let json = record.to_context();
    /// assert_eq!(json["phase"], "request-start");
    /// assert_eq!(json["request"]["method"], "GET");
    /// ```
    pub fn new(phase: LifecyclePhase) -> Self {
        Self {
            phase,
            user: None,
            request: None,
            headers: None,
            response: None,
            command: None,
            exec_time_sec: None,
            memory_peak_usage_bytes: None,
            exit_status: None,
        }
    }

    pub fn user_mut(&mut self) -> &mut UserContext {
        self.user.get_or_insert_with(UserContext::default)
    }

    pub fn request_mut(&mut self) -> &mut RequestContext {
        self.request.get_or_insert_with(RequestContext::default)
    }

    pub fn response_mut(&mut self) -> &mut ResponseContext {
        self.response.get_or_insert_with(ResponseContext::default)
    }

    /// Record as a JSON context object for the log sink
    pub fn to_context(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "phase": self.phase.as_str() })
        })
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
