//! Tests for content negotiation at the dispatch boundary
//!
//! # Test Coverage
//!
//! - Encoder precedence: URL format suffix > Accept header > defaults
//! - 406 with the available-format list when nothing matches Accept
//! - 415 when a body arrives with a missing or unknown Content-Type
//! - Encode/decode round-trips through the non-default codecs
//! - Error bodies are themselves negotiated (best effort)

mod common;
mod tracing_util;

use common::{json_body, polls_api};
use declarest::transport::Request;
use http::Method;
use serde_json::Value;
use tracing_util::TestTracing;

#[test]
fn test_format_suffix_overrides_accept_header() {
    let _tracing = TestTracing::init();
    let api = polls_api();
    let res = api.dispatch(
        &Request::new(Method::GET, "/polls/1.yaml").with_header("accept", "application/json"),
    );
    assert_eq!(res.status, 200);
    assert_eq!(res.get_header("content-type"), Some("application/yaml"));
    let body: Value = serde_yaml::from_slice(&res.body).expect("YAML body");
    assert_eq!(body["question"], "What's new?");
}

#[test]
fn test_accept_header_selects_encoder() {
    let api = polls_api();
    let res =
        api.dispatch(&Request::new(Method::GET, "/polls/1").with_header("accept", "text/yaml"));
    assert_eq!(res.status, 200);
    assert_eq!(res.get_header("content-type"), Some("application/yaml"));
}

#[test]
fn test_default_encoder_is_json() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::GET, "/polls/1"));
    assert_eq!(res.get_header("content-type"), Some("application/json"));
}

#[test]
fn test_unmatchable_accept_is_not_acceptable() {
    let api = polls_api();
    let res =
        api.dispatch(&Request::new(Method::GET, "/polls/1").with_header("accept", "image/png"));
    assert_eq!(res.status, 406);
    let body = json_body(&res.body);
    let available = body["available"].as_array().expect("format list");
    assert!(available.iter().any(|f| f == "json"));
    assert!(available.iter().any(|f| f == "yaml"));
}

#[test]
fn test_body_without_content_type_is_unsupported() {
    let api = polls_api();
    let res = api.dispatch(
        &Request::new(Method::POST, "/polls").with_body(r#"{"question":"A?"}"#),
    );
    assert_eq!(res.status, 415);
}

#[test]
fn test_unknown_content_type_is_unsupported() {
    let api = polls_api();
    let res = api.dispatch(
        &Request::new(Method::POST, "/polls")
            .with_header("content-type", "application/msgpack")
            .with_body(r#"{"question":"A?"}"#),
    );
    assert_eq!(res.status, 415);
}

#[test]
fn test_yaml_body_decodes_on_write() {
    let api = polls_api();
    let res = api.dispatch(
        &Request::new(Method::POST, "/polls")
            .with_header("content-type", "application/yaml")
            .with_body("question: From YAML?\nvotes: 1\n"),
    );
    assert_eq!(res.status, 201);
    assert_eq!(json_body(&res.body)["question"], "From YAML?");
}

#[test]
fn test_form_body_decodes_on_write() {
    let api = polls_api();
    let res = api.dispatch(
        &Request::new(Method::POST, "/polls")
            .with_header("content-type", "application/x-www-form-urlencoded")
            .with_body("question=From+a+form%3F"),
    );
    assert_eq!(res.status, 201);
    assert_eq!(json_body(&res.body)["question"], "From a form?");
}

#[test]
fn test_malformed_json_body_is_bad_request() {
    let api = polls_api();
    let res = api.dispatch(
        &Request::new(Method::POST, "/polls")
            .with_header("content-type", "application/json")
            .with_body("{not json"),
    );
    assert_eq!(res.status, 400);
}

#[test]
fn test_error_bodies_follow_the_accept_header() {
    let api = polls_api();
    let res = api.dispatch(
        &Request::new(Method::GET, "/polls/99").with_header("accept", "application/yaml"),
    );
    assert_eq!(res.status, 404);
    assert_eq!(res.get_header("content-type"), Some("application/yaml"));
    let body: Value = serde_yaml::from_slice(&res.body).expect("YAML error body");
    assert_eq!(body["error"], "not found");
}
