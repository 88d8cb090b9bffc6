//! Integration tests for common reqtrail workflows.
//!
//! These tests drive the facade the way a host application would.

use reqtrail::*;
use serde_json::json;
use std::sync::Arc;

fn recorder_with_defaults() -> (Arc<EventRecorder>, MemorySink) {
    let sink = MemorySink::new();
    let config = SanitizationConfig::builder().build().unwrap();
    (Arc::new(EventRecorder::new(config, sink.clone())), sink)
}

// =============================================================================
// Web Application Tests
// =============================================================================

#[test]
fn test_http_request_roundtrip() {
    let (recorder, sink) = recorder_with_defaults();
    let mut dispatcher = LifecycleDispatcher::web();
    recorder.register_for_lifecycle(&mut dispatcher);

    let http_request = http::Request::builder()
        .method("GET")
        .uri("https://shop.example.com/catalog?page=2")
        .header("Cookie", "session=abc")
        .header("X-Forwarded-For", "10.0.0.1")
        .header("User-Agent", "curl/8.0")
        .header("Referer", "https://shop.example.com/")
        .body(())
        .unwrap();
    let request = RequestSnapshot::from_http(&http_request)
        .with_route("catalog/index")
        .with_client_ip("203.0.113.7");

    let http_response = http::Response::builder()
        .status(200)
        .header("Content-Type", "text/html")
        .body(b"<html></html>".to_vec())
        .unwrap();
    let response = ResponseSnapshot::from_http(&http_response);

    dispatcher.begin_request(&request).complete(&response);

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);

    let start = &entries[0];
    assert_eq!(start.message, "Incoming request");
    assert_eq!(start.category, LOG_CATEGORY);
    assert_eq!(start.context["request"]["method"], "GET");
    assert_eq!(
        start.context["request"]["absoluteUrl"],
        "https://shop.example.com/catalog?page=2"
    );
    assert_eq!(start.context["request"]["userIp"], "203.0.113.7");
    assert_eq!(start.context["request"]["userAgent"], "curl/8.0");
    assert_eq!(start.context["request"]["referrer"], "https://shop.example.com/");
    assert_eq!(start.context["user"], json!({"id": "0", "username": "[guest]"}));
    assert_eq!(start.context["headers"]["cookie"], MASKED);
    assert_eq!(start.context["headers"]["x-forwarded-for"], MASKED);

    let end = &entries[1];
    assert_eq!(end.message, "Outgoing response");
    assert_eq!(end.context["response"]["statusCode"], 200);
    assert_eq!(end.context["response"]["contentLength"], 13);
    assert_eq!(end.context["response"]["isStream"], false);
    assert_eq!(end.context["headers"]["content-type"], "text/html");
}

#[test]
fn test_debug_toolbar_routes_excluded_by_default() {
    let (recorder, sink) = recorder_with_defaults();
    let mut dispatcher = LifecycleDispatcher::web();
    recorder.register_for_lifecycle(&mut dispatcher);

    for route in ["debug/default/toolbar", "debug/default/view"] {
        let request = RequestSnapshot::new("GET", "/debug").with_route(route);
        dispatcher.begin_request(&request).complete(&ResponseSnapshot::default());
    }
    assert!(sink.is_empty());

    let request = RequestSnapshot::new("GET", "/").with_route("site/index");
    dispatcher.begin_request(&request).complete(&ResponseSnapshot::default());
    assert_eq!(sink.len(), 2);
}

#[test]
fn test_long_header_truncated_with_marker() {
    let (recorder, sink) = recorder_with_defaults();
    let agent = "a".repeat(300);
    let request = RequestSnapshot::new("GET", "/")
        .with_route("site/index")
        .with_header("User-Agent", agent.as_str());

    recorder.record_request_start(&request);

    let entries = sink.entries();
    let logged = entries[0].context["headers"]["User-Agent"].as_str().unwrap();
    assert_eq!(logged.chars().count(), 256);
    assert!(logged.ends_with(DEFAULT_TRUNCATION_MARKER));
}

#[test]
fn test_authenticated_user_and_nested_params() {
    let (recorder, sink) = recorder_with_defaults();
    let request = RequestSnapshot::new("POST", "/profile")
        .with_route("profile/update")
        .with_user("42", "alice")
        .with_body_params(json!({
            "_csrf": "token",
            "Profile": {"name": "Alice", "Security": {"Inner": {"password": "x"}}}
        }));

    recorder.record_request_start(&request);

    let context = &sink.entries()[0].context;
    assert_eq!(context["user"], json!({"id": "42", "username": "alice"}));
    assert_eq!(context["request"]["bodyParams"]["_csrf"], MASKED);
    assert_eq!(context["request"]["bodyParams"]["Profile"]["name"], "Alice");
    assert_eq!(
        context["request"]["bodyParams"]["Profile"]["Security"]["Inner"],
        TRUNCATED
    );
}

// =============================================================================
// Console Application Tests
// =============================================================================

#[test]
fn test_console_command_lifecycle() {
    let (recorder, sink) = recorder_with_defaults();
    let mut dispatcher = LifecycleDispatcher::console();
    assert!(recorder.register_for_lifecycle(&mut dispatcher));

    let process = ProcessSnapshot::new(["./console", "migrate/up", "--interactive=0"])
        .with_route("migrate/up");
    let scope = dispatcher.begin_process(&process);
    process.set_exit_status(1);
    assert_eq!(scope.complete(), InvocationState::ProcessEnded);

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message, "CLI command start");
    assert_eq!(
        entries[0].context["command"],
        "./console migrate/up --interactive=0"
    );
    assert_eq!(entries[1].message, "CLI command end");
    assert_eq!(entries[1].context["exitStatus"], 1);
    assert!(entries[1].context["execTimeSec"].is_number());
}

// =============================================================================
// Optional Crates
// =============================================================================

#[cfg(feature = "config")]
#[test]
fn test_config_feature_builds_recorder() {
    use reqtrail::reqtrail_config::{EnvLoader, OptionsLoader};

    let config = OptionsLoader::new()
        .env(EnvLoader::from_vars(
            "REQTRAIL",
            [("REQTRAIL_HEADERS_TO_MASK", "authorization")],
        ))
        .load_config()
        .unwrap();

    let sink = MemorySink::new();
    let recorder = EventRecorder::new(config, sink.clone());
    let request = RequestSnapshot::new("GET", "/")
        .with_route("site/index")
        .with_header("Authorization", "Bearer x")
        .with_header("Cookie", "kept");

    recorder.record_request_start(&request);

    let context = &sink.entries()[0].context;
    assert_eq!(context["headers"]["Authorization"], MASKED);
    assert_eq!(context["headers"]["Cookie"], "kept");
}

#[cfg(feature = "log")]
#[test]
fn test_log_feature_default_config() {
    use reqtrail::reqtrail_log::{LogConfig, LogFormat, LogOutput};

    let config = LogConfig::default();
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.output, LogOutput::Stderr);
}
