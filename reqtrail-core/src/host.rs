//! Host capabilities
//!
//! The recorder reads request, response and process context through these
//! traits. Every accessor is fallible: the host may be unable to answer
//! (no session, detached socket, ...), and the recorder logs whatever was
//! gathered before the failure. The snapshot types implement the traits
//! over plain captured values, for hosts that prefer to copy data up front
//! and for tests.

use crate::{HandlerError, HeaderSnapshot, RouteResolutionError, RouteResolver};
use serde_json::Value;
use std::sync::atomic::{AtomicI32, Ordering};

/// Identity attached to a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UserIdentity {
    /// Anonymous caller
    #[default]
    Guest,
    /// Authenticated principal
    Authenticated { id: String, username: String },
}

impl UserIdentity {
    /// Id reported for guests
    pub const GUEST_ID: &'static str = "0";

    /// Username reported for guests
    pub const GUEST_USERNAME: &'static str = "[guest]";

    pub fn authenticated(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self::Authenticated {
            id: id.into(),
            username: username.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            UserIdentity::Guest => Self::GUEST_ID,
            UserIdentity::Authenticated { id, .. } => id,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            UserIdentity::Guest => Self::GUEST_USERNAME,
            UserIdentity::Authenticated { username, .. } => username,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, UserIdentity::Guest)
    }
}

/// Inbound HTTP request, as seen by the recorder
pub trait IncomingRequest: RouteResolver {
    fn method(&self) -> Result<String, HandlerError>;

    /// Full URL including scheme, host and query string
    fn absolute_url(&self) -> Result<String, HandlerError>;

    /// Raw headers, possibly multi-valued
    fn headers(&self) -> Result<HeaderSnapshot, HandlerError>;

    /// Parsed body params as a tree (objects, arrays, scalars)
    fn body_params(&self) -> Result<Value, HandlerError>;

    /// Client address, when known
    fn user_ip(&self) -> Result<Option<String>, HandlerError>;

    fn referrer(&self) -> Result<Option<String>, HandlerError> {
        Ok(None)
    }

    fn user_agent(&self) -> Result<Option<String>, HandlerError> {
        Ok(None)
    }

    /// Identity of the caller; guests map to [`UserIdentity::Guest`]
    fn identity(&self) -> Result<UserIdentity, HandlerError>;
}

/// Outbound HTTP response, as seen by the recorder
pub trait OutgoingResponse {
    fn status_code(&self) -> Result<u16, HandlerError>;

    /// Response format (e.g. `html`, `json`)
    fn format(&self) -> Result<String, HandlerError>;

    /// Whether the body is streamed
    fn is_stream(&self) -> Result<bool, HandlerError>;

    /// Body length in bytes. Only queried for non-streamed responses.
    fn content_length(&self) -> Result<u64, HandlerError>;

    fn headers(&self) -> Result<HeaderSnapshot, HandlerError>;
}

/// Non-HTTP invocation (console command, job, ...)
pub trait ProcessInvocation: RouteResolver {
    /// Command line, when available
    fn command(&self) -> Result<Option<String>, HandlerError>;

    /// Exit status. Only queried at process end.
    fn exit_status(&self) -> Result<i32, HandlerError>;
}

fn resolve(route: &Option<String>, what: &str) -> Result<String, RouteResolutionError> {
    route
        .clone()
        .ok_or_else(|| RouteResolutionError(format!("no route matches {}", what)))
}

/// Captured request values
///
/// # Examples
///
/// ```
/// use reqtrail_core::{IncomingRequest, RequestSnapshot};
///
/// let request = RequestSnapshot::new("POST", "https://example.com/site/login")
///     .with_header("Content-Type", "application/x-www-form-urlencoded")
///     .with_body_params(serde_json::json!({"LoginForm": {"username": "u1"}}))
///     .with_route("site/login");
///
/// assert_eq!(request.method().unwrap(), "POST");
/// assert!(request.identity().unwrap().is_guest());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub headers: HeaderSnapshot,
    pub body_params: Value,
    pub client_ip: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub identity: UserIdentity,
    pub route: Option<String>,
}

impl RequestSnapshot {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body_params: Value::Object(Default::default()),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body_params(mut self, params: Value) -> Self {
        self.body_params = params;
        self
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn with_user(mut self, id: impl Into<String>, username: impl Into<String>) -> Self {
        self.identity = UserIdentity::authenticated(id, username);
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Capture method, URI and headers from an `http` request
    pub fn from_http<B>(request: &http::Request<B>) -> Self {
        Self {
            method: request.method().as_str().to_string(),
            url: request.uri().to_string(),
            headers: HeaderSnapshot::from(request.headers()),
            body_params: Value::Object(Default::default()),
            user_agent: request
                .headers()
                .get(http::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            referrer: request
                .headers()
                .get(http::header::REFERER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            ..Self::default()
        }
    }
}

impl RouteResolver for RequestSnapshot {
    fn resolve_route(&self) -> Result<String, RouteResolutionError> {
        resolve(&self.route, &self.url)
    }
}

impl IncomingRequest for RequestSnapshot {
    fn method(&self) -> Result<String, HandlerError> {
        Ok(self.method.clone())
    }

    fn absolute_url(&self) -> Result<String, HandlerError> {
        Ok(self.url.clone())
    }

    fn headers(&self) -> Result<HeaderSnapshot, HandlerError> {
        Ok(self.headers.clone())
    }

    fn body_params(&self) -> Result<Value, HandlerError> {
        Ok(self.body_params.clone())
    }

    fn user_ip(&self) -> Result<Option<String>, HandlerError> {
        Ok(self.client_ip.clone())
    }

    fn referrer(&self) -> Result<Option<String>, HandlerError> {
        Ok(self.referrer.clone())
    }

    fn user_agent(&self) -> Result<Option<String>, HandlerError> {
        Ok(self.user_agent.clone())
    }

    fn identity(&self) -> Result<UserIdentity, HandlerError> {
        Ok(self.identity.clone())
    }
}

/// Captured response values
#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    pub format: String,
    pub stream: bool,
    pub content_length: u64,
    pub headers: HeaderSnapshot,
}

impl ResponseSnapshot {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            format: "html".to_string(),
            stream: false,
            content_length: 0,
            headers: HeaderSnapshot::new(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = length;
        self
    }

    /// Mark the body as streamed
    pub fn streamed(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Capture status, headers and body length from an `http` response
    pub fn from_http<B: AsRef<[u8]>>(response: &http::Response<B>) -> Self {
        Self {
            status_code: response.status().as_u16(),
            format: "raw".to_string(),
            stream: false,
            content_length: response.body().as_ref().len() as u64,
            headers: HeaderSnapshot::from(response.headers()),
        }
    }
}

impl Default for ResponseSnapshot {
    fn default() -> Self {
        Self::new(200)
    }
}

impl OutgoingResponse for ResponseSnapshot {
    fn status_code(&self) -> Result<u16, HandlerError> {
        Ok(self.status_code)
    }

    fn format(&self) -> Result<String, HandlerError> {
        Ok(self.format.clone())
    }

    fn is_stream(&self) -> Result<bool, HandlerError> {
        Ok(self.stream)
    }

    fn content_length(&self) -> Result<u64, HandlerError> {
        Ok(self.content_length)
    }

    fn headers(&self) -> Result<HeaderSnapshot, HandlerError> {
        Ok(self.headers.clone())
    }
}

/// Captured process values
///
/// The exit status can be set through a shared reference once the
/// invocation has finished.
#[derive(Debug, Default)]
pub struct ProcessSnapshot {
    pub route: Option<String>,
    pub argv: Vec<String>,
    exit_status: AtomicI32,
}

impl ProcessSnapshot {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Capture the current process arguments
    pub fn from_env() -> Self {
        Self::new(std::env::args())
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn set_exit_status(&self, status: i32) {
        self.exit_status.store(status, Ordering::Release);
    }
}

impl RouteResolver for ProcessSnapshot {
    fn resolve_route(&self) -> Result<String, RouteResolutionError> {
        resolve(&self.route, &self.argv.join(" "))
    }
}

impl ProcessInvocation for ProcessSnapshot {
    fn command(&self) -> Result<Option<String>, HandlerError> {
        if self.argv.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.argv.join(" ")))
        }
    }

    fn exit_status(&self) -> Result<i32, HandlerError> {
        Ok(self.exit_status.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_identity() {
        let guest = UserIdentity::default();
        assert!(guest.is_guest());
        assert_eq!(guest.id(), "0");
        assert_eq!(guest.username(), "[guest]");

        let user = UserIdentity::authenticated("7", "bob");
        assert!(!user.is_guest());
        assert_eq!(user.id(), "7");
        assert_eq!(user.username(), "bob");
    }

    #[test]
    fn test_request_snapshot_route() {
        let request = RequestSnapshot::new("GET", "https://example.com/missing");
        let err = request.resolve_route().unwrap_err();
        assert!(err.0.contains("https://example.com/missing"));

        let request = request.with_route("site/index");
        assert_eq!(request.resolve_route().unwrap(), "site/index");
    }

    #[test]
    fn test_request_from_http() {
        let request = http::Request::builder()
            .method("PUT")
            .uri("https://example.com/api/items?id=3")
            .header("User-Agent", "curl/8.0")
            .header("Referer", "https://example.com/")
            .header("Accept", "a")
            .header("Accept", "b")
            .body(())
            .unwrap();

        let snapshot = RequestSnapshot::from_http(&request);
        assert_eq!(snapshot.method, "PUT");
        assert_eq!(snapshot.url, "https://example.com/api/items?id=3");
        assert_eq!(snapshot.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(snapshot.referrer.as_deref(), Some("https://example.com/"));
        assert!(snapshot.headers.has_duplicates());
    }

    #[test]
    fn test_response_from_http() {
        let response = http::Response::builder()
            .status(404)
            .header("Content-Type", "text/plain")
            .body(b"not found".to_vec())
            .unwrap();

        let snapshot = ResponseSnapshot::from_http(&response);
        assert_eq!(snapshot.status_code().unwrap(), 404);
        assert_eq!(snapshot.content_length().unwrap(), 9);
        assert!(!snapshot.is_stream().unwrap());
    }

    #[test]
    fn test_process_snapshot() {
        let process = ProcessSnapshot::new(["./console", "migrate/up", "--interactive=0"]).with_route("migrate/up");
        assert_eq!(
            process.command().unwrap().as_deref(),
            Some("./console migrate/up --interactive=0")
        );
        assert_eq!(process.exit_status().unwrap(), 0);

        process.set_exit_status(3);
        assert_eq!(process.exit_status().unwrap(), 3);

        assert_eq!(ProcessSnapshot::default().command().unwrap(), None);
    }
}
