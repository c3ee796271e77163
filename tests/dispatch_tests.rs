//! Tests for the resource dispatch engine
//!
//! # Test Coverage
//!
//! Validates the per-request state machine end to end:
//! - Method resolution (recognized set, allow-lists, override header)
//! - CRUD flows: create-then-read, update with clearing, delete
//! - Filtering and pagination on collection reads
//! - Body decoding, defaults, backfill, and schema validation
//! - Error-to-response mapping (404 on missing items, 400 on bad input)
//!
//! # Test Strategy
//!
//! Requests are built directly and handed to `Api::dispatch`; stores are
//! in-memory, so every test runs hermetically against its own fixture.

mod common;
mod tracing_util;

use common::{json_body, polls_api};
use declarest::field::{Declared, FieldKind};
use declarest::resource::ResourceType;
use declarest::store::MemoryStore;
use declarest::transport::Request;
use http::Method;
use serde_json::json;
use std::sync::Arc;
use tracing_util::TestTracing;

#[test]
fn test_post_then_get_round_trip() {
    let _tracing = TestTracing::init();
    let mut api = polls_api();
    api.add_middleware(Arc::new(declarest::middleware::TracingMiddleware));

    let created = api.dispatch(
        &Request::new(Method::POST, "/polls")
            .with_header("content-type", "application/json")
            .with_body(r#"{"question":"A?","votes":0}"#),
    );
    assert_eq!(created.status, 201);
    let body = json_body(&created.body);
    assert_eq!(body["question"], "A?");
    let uri = body["resource_uri"].as_str().expect("uri field present");

    let fetched = api.dispatch(&Request::new(Method::GET, uri));
    assert_eq!(fetched.status, 200);
    assert_eq!(json_body(&fetched.body)["question"], "A?");
}

#[test]
fn test_uri_field_leads_prepared_payload() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::GET, "/polls/1"));
    assert_eq!(res.status, 200);
    let body = json_body(&res.body);
    let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
    assert_eq!(keys[0], "resource_uri");
    assert_eq!(body["resource_uri"], "/polls/1");
}

#[test]
fn test_unrecognized_verb_is_not_implemented() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::OPTIONS, "/polls"));
    assert_eq!(res.status, 501);
}

#[test]
fn test_disallowed_verb_names_the_allowed_set() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::PUT, "/polls"));
    assert_eq!(res.status, 405);
    assert_eq!(res.get_header("allow"), Some("GET, POST"));
    let body = json_body(&res.body);
    assert_eq!(body["allow"], json!(["GET", "POST"]));
}

#[test]
fn test_operation_gate_is_independent_of_verb_gate() {
    // PUT at list granularity passes the verb gate once listed, but the
    // update operation stays outside the list operation allow-list.
    let store = Arc::new(MemoryStore::new());
    let ty = ResourceType::builder("notes", store)
        .declare(Declared::new("text", FieldKind::Text))
        .http_list(vec![Method::GET, Method::POST, Method::PUT])
        .build()
        .expect("builds");
    let mut api = declarest::api::Api::with_config(Default::default());
    api.register(ty);

    let res = api.dispatch(
        &Request::new(Method::PUT, "/notes")
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":"x"}"#),
    );
    assert_eq!(res.status, 403);
    let body = json_body(&res.body);
    assert!(body["error"].as_str().unwrap().contains("read, create"));
}

#[test]
fn test_method_override_header() {
    let _tracing = TestTracing::init();
    let api = polls_api();
    // POST is not allowed at detail granularity, but the override upgrades
    // it to a DELETE before the allow-list check.
    let res = api.dispatch(
        &Request::new(Method::POST, "/polls/2").with_header("x-http-method-override", "DELETE"),
    );
    assert_eq!(res.status, 204);
    assert!(res.body.is_empty());

    let gone = api.dispatch(&Request::new(Method::GET, "/polls/2"));
    assert_eq!(gone.status, 404);
}

#[test]
fn test_delete_missing_item_is_not_found() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::DELETE, "/polls/5"));
    assert_eq!(res.status, 404);
}

#[test]
fn test_get_unknown_resource_is_not_found() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::GET, "/missing"));
    assert_eq!(res.status, 404);
}

#[test]
fn test_update_clears_omitted_editable_fields() {
    let api = polls_api();
    let res = api.dispatch(
        &Request::new(Method::PUT, "/polls/1")
            .with_header("content-type", "application/json")
            .with_body(r#"{"question":"Updated?"}"#),
    );
    assert_eq!(res.status, 200);
    let body = json_body(&res.body);
    assert_eq!(body["question"], "Updated?");
    // `votes` was editable and omitted, so it cleared.
    assert_eq!(body["votes"], json!(null));
}

#[test]
fn test_partial_update_backfills_read_only_fields() {
    // `votes` is read-only and required by the schema; a PUT that omits it
    // passes validation because the stored value backfills, and the stored
    // value survives the write.
    let store = Arc::new(MemoryStore::with_rows(vec![
        json!({ "id": 1, "question": "Q?", "votes": 7 }),
    ]));
    let ty = ResourceType::builder("polls", store)
        .declare(Declared::new("question", FieldKind::Text))
        .declare(Declared::new("votes", FieldKind::Integer).read_only())
        .schema(json!({
            "type": "object",
            "required": ["question", "votes"],
            "properties": {
                "question": { "type": "string" },
                "votes": { "type": "integer" }
            }
        }))
        .build()
        .expect("builds");
    let mut api = declarest::api::Api::with_config(Default::default());
    api.register(ty);

    let res = api.dispatch(
        &Request::new(Method::PUT, "/polls/1")
            .with_header("content-type", "application/json")
            .with_body(r#"{"question":"New?"}"#),
    );
    assert_eq!(res.status, 200);
    let body = json_body(&res.body);
    assert_eq!(body["question"], "New?");
    assert_eq!(body["votes"], 7);
}

#[test]
fn test_schema_violation_is_field_keyed_bad_request() {
    let store = Arc::new(MemoryStore::new());
    let ty = ResourceType::builder("polls", store)
        .declare(Declared::new("question", FieldKind::Text))
        .declare(Declared::new("votes", FieldKind::Integer))
        .schema(json!({
            "type": "object",
            "required": ["question"],
            "properties": {
                "question": { "type": "string" },
                "votes": { "type": "integer" }
            }
        }))
        .build()
        .expect("builds");
    let mut api = declarest::api::Api::with_config(Default::default());
    api.register(ty);

    let res = api.dispatch(
        &Request::new(Method::POST, "/polls")
            .with_header("content-type", "application/json")
            .with_body(r#"{"votes":"many"}"#),
    );
    assert_eq!(res.status, 400);
    let body = json_body(&res.body);
    // Missing required field reported at the root, bad type at its path.
    assert!(body.get("detail").is_some());
    assert!(body.get("votes").is_some());
}

#[test]
fn test_clean_hook_failures_are_field_keyed() {
    let store = Arc::new(MemoryStore::new());
    let ty = ResourceType::builder("polls", store)
        .declare(
            Declared::new("question", FieldKind::Text).clean(Arc::new(|value| {
                let text = value.as_str().unwrap_or("");
                if text.ends_with('?') {
                    Ok(json!(text))
                } else {
                    Err(declarest::Error::bad_request("questions end with `?`"))
                }
            })),
        )
        .build()
        .expect("builds");
    let mut api = declarest::api::Api::with_config(Default::default());
    api.register(ty);

    let rejected = api.dispatch(
        &Request::new(Method::POST, "/polls")
            .with_header("content-type", "application/json")
            .with_body(r#"{"question":"no question mark"}"#),
    );
    assert_eq!(rejected.status, 400);
    let body = json_body(&rejected.body);
    assert!(body["question"][0].as_str().unwrap().contains("end with"));

    let accepted = api.dispatch(
        &Request::new(Method::POST, "/polls")
            .with_header("content-type", "application/json")
            .with_body(r#"{"question":"Really?"}"#),
    );
    assert_eq!(accepted.status, 201);
}

#[test]
fn test_field_defaults_fill_omitted_values() {
    let store = Arc::new(MemoryStore::new());
    let ty = ResourceType::builder("polls", store)
        .declare(Declared::new("question", FieldKind::Text))
        .declare(Declared::new("votes", FieldKind::Integer).default_value(json!(0)))
        .build()
        .expect("builds");
    let mut api = declarest::api::Api::with_config(Default::default());
    api.register(ty);

    let res = api.dispatch(
        &Request::new(Method::POST, "/polls")
            .with_header("content-type", "application/json")
            .with_body(r#"{"question":"A?"}"#),
    );
    assert_eq!(res.status, 201);
    assert_eq!(json_body(&res.body)["votes"], 0);
}

#[test]
fn test_produced_default_fills_omitted_values() {
    let store = Arc::new(MemoryStore::new());
    let ty = ResourceType::builder("notes", store)
        .declare(Declared::new("text", FieldKind::Text))
        .declare(
            Declared::new("state", FieldKind::Text).default_with(Arc::new(|| json!("draft"))),
        )
        .build()
        .expect("builds");
    let mut api = declarest::api::Api::with_config(Default::default());
    api.register(ty);

    let res = api.dispatch(
        &Request::new(Method::POST, "/notes")
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":"x"}"#),
    );
    assert_eq!(res.status, 201);
    assert_eq!(json_body(&res.body)["state"], "draft");
}

#[test]
fn test_no_return_data_answers_204_on_writes() {
    let store = Arc::new(MemoryStore::new());
    let ty = ResourceType::builder("notes", store)
        .declare(Declared::new("text", FieldKind::Text))
        .no_return_data()
        .build()
        .expect("builds");
    let mut api = declarest::api::Api::with_config(Default::default());
    api.register(ty);

    let res = api.dispatch(
        &Request::new(Method::POST, "/notes")
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":"x"}"#),
    );
    assert_eq!(res.status, 204);
    assert!(res.body.is_empty());
}

#[test]
fn test_collection_filtering_via_query_string() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::GET, "/polls?votes__gt=4"));
    assert_eq!(res.status, 200);
    let body = json_body(&res.body);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["question"], "Best pet?");
}

#[test]
fn test_unknown_filter_field_is_bad_request() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::GET, "/polls?bogus=1"));
    assert_eq!(res.status, 400);
}

#[test]
fn test_filter_inversion_partitions_collection() {
    let api = polls_api();
    let kept = api.dispatch(&Request::new(Method::GET, "/polls?votes=3"));
    let dropped = api.dispatch(&Request::new(Method::GET, "/polls?votes__not=3"));
    let kept_items = json_body(&kept.body).as_array().unwrap().len();
    let dropped_items = json_body(&dropped.body).as_array().unwrap().len();
    assert_eq!(kept_items + dropped_items, 2);
    assert_eq!(kept_items, 1);
}

#[test]
fn test_pagination_headers_on_collection_reads() {
    let api = polls_api();
    let res = api.dispatch(
        &Request::new(Method::GET, "/choices").with_header("range", "objects=0-1"),
    );
    assert_eq!(res.status, 200);
    assert_eq!(res.get_header("content-range"), Some("0-1/3"));
    assert_eq!(res.get_header("accept-ranges"), Some("objects"));
    assert_eq!(json_body(&res.body).as_array().unwrap().len(), 2);
}

#[test]
fn test_multi_range_request_is_not_implemented() {
    let api = polls_api();
    let res = api.dispatch(
        &Request::new(Method::GET, "/choices").with_header("range", "objects=0-1,2-3"),
    );
    assert_eq!(res.status, 501);
}

#[test]
fn test_metrics_middleware_counts_dispatches() {
    let mut api = polls_api();
    let metrics = Arc::new(declarest::middleware::MetricsMiddleware::new());
    let mw: Arc<dyn declarest::middleware::Middleware> = Arc::clone(&metrics) as _;
    api.add_middleware(mw);

    api.dispatch(&Request::new(Method::GET, "/polls"));
    api.dispatch(&Request::new(Method::GET, "/missing"));
    assert_eq!(metrics.request_count(), 2);
    assert_eq!(metrics.error_count(), 0);
}
