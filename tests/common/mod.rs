#![allow(dead_code)]

use declarest::api::Api;
use declarest::field::{Declared, FieldKind, Relation};
use declarest::resource::ResourceType;
use declarest::store::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;

/// A poll/choice fixture: two related resources over in-memory stores.
///
/// Polls carry a reverse to-many `choices` relation (choice rows reference
/// their poll through a `poll` column); choices carry a local to-one `poll`
/// relation back.
pub fn polls_api() -> Api {
    let poll_store = Arc::new(MemoryStore::with_rows(vec![
        json!({ "id": 1, "question": "What's new?", "votes": 3 }),
        json!({ "id": 2, "question": "Best pet?", "votes": 5 }),
    ]));
    let choice_store = Arc::new(MemoryStore::with_rows(vec![
        json!({ "id": 1, "poll": 1, "text": "Not much" }),
        json!({ "id": 2, "poll": 1, "text": "The sky" }),
        json!({ "id": 3, "poll": 2, "text": "Dogs" }),
    ]));

    let polls = ResourceType::builder("polls", poll_store)
        .declare(Declared::new("question", FieldKind::Text))
        .declare(Declared::new("votes", FieldKind::Integer))
        .declare(
            Declared::new("choices", FieldKind::Other)
                .collection()
                .read_only()
                .not_filterable()
                .relation(Relation::to("choices").remote().related_name("poll")),
        )
        .build()
        .expect("polls resource builds");

    let choices = ResourceType::builder("choices", choice_store)
        .declare(Declared::new("text", FieldKind::Text))
        .declare(Declared::new("poll", FieldKind::Other).relation(Relation::to("polls")))
        .build()
        .expect("choices resource builds");

    let mut api = Api::with_config(declarest::runtime_config::RuntimeConfig::default());
    api.register(polls);
    api.register(choices);
    api
}

/// Decode a JSON response body.
pub fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("response body is JSON")
}
