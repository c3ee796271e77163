//! Tests for sub-resource traversal and relation serialization
//!
//! # Test Coverage
//!
//! - To-many traversal scopes the related resource by the parent identifier
//! - A trailing component selects one related item
//! - To-one traversal resolves the related identifier before descending
//! - Non-relation leaf components narrow the response to one field value
//! - Referenced relations serialize as URIs; embedded relations inline the
//!   full prepared representation
//! - Relation values in write bodies resolve from URI/identifier form

mod common;
mod tracing_util;

use common::{json_body, polls_api};
use declarest::api::Api;
use declarest::field::{Declared, FieldKind, Relation};
use declarest::resource::ResourceType;
use declarest::store::MemoryStore;
use declarest::transport::Request;
use http::Method;
use serde_json::json;
use std::sync::Arc;
use tracing_util::TestTracing;

#[test]
fn test_to_many_traversal_scopes_by_parent() {
    let _tracing = TestTracing::init();
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::GET, "/polls/1/choices"));
    assert_eq!(res.status, 200);
    let items = json_body(&res.body);
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items
        .iter()
        .all(|c| c["poll"].as_str() == Some("/polls/1")));
}

#[test]
fn test_to_many_traversal_consumes_sub_identifier() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::GET, "/polls/1/choices/2"));
    assert_eq!(res.status, 200);
    let body = json_body(&res.body);
    assert_eq!(body["text"], "The sky");
    assert_eq!(body["resource_uri"], "/choices/2");
}

#[test]
fn test_to_many_traversal_misses_out_of_scope_items() {
    // Choice 3 belongs to poll 2; reaching it through poll 1 is a 404.
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::GET, "/polls/1/choices/3"));
    assert_eq!(res.status, 404);
}

#[test]
fn test_to_one_traversal_resolves_related_identifier() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::GET, "/choices/3/poll"));
    assert_eq!(res.status, 200);
    let body = json_body(&res.body);
    assert_eq!(body["question"], "Best pet?");
    assert_eq!(body["resource_uri"], "/polls/2");
}

#[test]
fn test_unknown_component_is_not_found() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::GET, "/polls/1/nonsense"));
    assert_eq!(res.status, 404);
}

#[test]
fn test_leaf_field_narrows_response() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::GET, "/polls/1/question"));
    assert_eq!(res.status, 200);
    assert_eq!(json_body(&res.body), json!("What's new?"));
}

#[test]
fn test_uri_field_component_narrows_to_uri() {
    let api = polls_api();
    let res = api.dispatch(&Request::new(Method::GET, "/polls/1/resource_uri"));
    assert_eq!(res.status, 200);
    assert_eq!(json_body(&res.body), json!("/polls/1"));
}

#[test]
fn test_post_through_traversal_scopes_the_new_item() {
    let _tracing = TestTracing::init();
    let api = polls_api();
    let res = api.dispatch(
        &Request::new(Method::POST, "/polls/1/choices")
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":"Everything"}"#),
    );
    assert_eq!(res.status, 201);
    let body = json_body(&res.body);
    assert_eq!(body["text"], "Everything");
    // The new choice carries the reverse foreign key back to poll 1.
    assert_eq!(body["poll"], "/polls/1");

    let listed = api.dispatch(&Request::new(Method::GET, "/polls/1/choices"));
    assert_eq!(json_body(&listed.body).as_array().unwrap().len(), 3);
}

fn library_api() -> Api {
    let author_store = Arc::new(MemoryStore::with_rows(vec![
        json!({ "id": 1, "name": "Ursula" }),
    ]));
    let book_store = Arc::new(MemoryStore::with_rows(vec![
        json!({ "id": 1, "title": "Dispossessed", "author": 1 }),
    ]));

    let authors = ResourceType::builder("authors", author_store)
        .declare(Declared::new("name", FieldKind::Text))
        .build()
        .expect("authors build");
    let books = ResourceType::builder("books", book_store)
        .declare(Declared::new("title", FieldKind::Text))
        .declare(
            Declared::new("author", FieldKind::Other)
                .relation(Relation::to("authors").embedded()),
        )
        .build()
        .expect("books build");

    let mut api = Api::with_config(Default::default());
    api.register(authors);
    api.register(books);
    api
}

#[test]
fn test_embedded_relation_inlines_representation() {
    let api = library_api();
    let res = api.dispatch(&Request::new(Method::GET, "/books/1"));
    assert_eq!(res.status, 200);
    let body = json_body(&res.body);
    assert_eq!(body["author"]["name"], "Ursula");
    assert_eq!(body["author"]["resource_uri"], "/authors/1");
}

#[test]
fn test_relation_values_resolve_from_uri_form_on_write() {
    let api = library_api();
    let res = api.dispatch(
        &Request::new(Method::POST, "/books")
            .with_header("content-type", "application/json")
            .with_body(r#"{"title":"Left Hand","author":"/authors/1"}"#),
    );
    assert_eq!(res.status, 201);
    let body = json_body(&res.body);
    assert_eq!(body["author"]["name"], "Ursula");
}

#[test]
fn test_unresolvable_relation_reference_is_bad_request() {
    let api = library_api();
    let res = api.dispatch(
        &Request::new(Method::POST, "/books")
            .with_header("content-type", "application/json")
            .with_body(r#"{"title":"Ghost","author":"/authors/99"}"#),
    );
    assert_eq!(res.status, 400);
}
