//! # declarest
//!
//! **declarest** is a declarative REST resource framework for Rust: resources
//! map HTTP verbs to CRUD operations over a pluggable store, with content
//! negotiation, authentication chains, authorization policies, query-string
//! filtering, and Range-header pagination.
//!
//! ## Overview
//!
//! A resource is declared once (fields, allowed verbs and operations,
//! credential checkers, policy, schema) and frozen into an immutable
//! [`resource::ResourceType`]. Registered types form an [`api::Api`], which
//! takes inbound [`transport::Request`]s, resolves them through the address
//! scheme `{resource}[/{id}][/{component}...][.{format}]`, and answers with
//! encoded [`transport::Response`]s. The web server itself stays outside:
//! anything that can produce a `Request` can embed an `Api`.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`api`]** - Resource registry, address parsing, dispatch boundary
//! - **[`resource`]** - Declarative resource definitions and the per-request
//!   dispatch state machine
//! - **[`field`]** - Field metadata, ordered field maps, accessor chains,
//!   relation descriptors
//! - **[`codec`]** - MIME-negotiated encoder/decoder registry (JSON, YAML,
//!   form)
//! - **[`auth`]** - Ordered credential checker chains
//! - **[`authorize`]** - Accessibility and per-object permission policies
//! - **[`filter`]** - Query-string filter expressions over collections
//! - **[`paginate`]** - Range-header pagination
//! - **[`store`]** - The CRUD capability contract and an in-memory store
//! - **[`middleware`]** - Before/after hooks around dispatch
//! - **[`transport`]** - Request/response wrapper types
//! - **[`error`]** - The domain failure hierarchy
//! - **[`runtime_config`]** - Environment-driven runtime settings
//!
//! ## Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Server as Embedding Server
//!     participant Api as Api
//!     participant Dispatch as Dispatch
//!     participant Auth as Authentication Chain
//!     participant Policy as Authorization Policy
//!     participant Store as Store
//!
//!     Server->>Api: dispatch(Request)
//!     Api->>Api: parse target<br/>(resource, id, components, format)
//!     Api->>Dispatch: run()
//!     Dispatch->>Auth: run_chain(request)
//!     Auth-->>Dispatch: Principal / challenge
//!     Dispatch->>Dispatch: determine method<br/>(override header, allow-lists)
//!     Dispatch->>Policy: is_accessible?
//!     Dispatch->>Dispatch: traverse components<br/>(relations recurse)
//!     Dispatch->>Dispatch: decode + validate body
//!     Dispatch->>Policy: is_authorized(item)?
//!     Dispatch->>Store: read / create / update / destroy
//!     Dispatch->>Dispatch: prepare item graph<br/>(URIs, embeds, narrowing)
//!     Dispatch-->>Api: Outcome + negotiated codec
//!     Api-->>Server: Response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use declarest::api::Api;
//! use declarest::field::{Declared, FieldKind};
//! use declarest::resource::ResourceType;
//! use declarest::store::MemoryStore;
//! use declarest::transport::Request;
//! use http::Method;
//!
//! let polls = ResourceType::builder("polls", Arc::new(MemoryStore::new()))
//!     .declare(Declared::new("question", FieldKind::Text))
//!     .build()
//!     .expect("valid resource");
//!
//! let mut api = Api::new();
//! api.register(polls);
//!
//! let response = api.dispatch(
//!     &Request::new(Method::POST, "/polls")
//!         .with_header("content-type", "application/json")
//!         .with_body(r#"{"question":"A?"}"#),
//! );
//! assert_eq!(response.status, 201);
//! ```
//!
//! ## Concurrency Model
//!
//! Request handling is synchronous and single-request-per-instance: every
//! dispatch builds its own ephemeral state, and the only process-wide shared
//! state, the codec registry and the frozen resource definitions, is
//! read-only after startup. Any threading or multi-process deployment can
//! share one `Api` without synchronization.

pub mod api;
pub mod auth;
pub mod authorize;
pub mod codec;
pub mod error;
pub mod field;
pub mod filter;
pub mod middleware;
pub mod paginate;
pub mod resource;
pub mod runtime_config;
pub mod store;
pub mod transport;

pub use api::Api;
pub use error::{Error, Result};
pub use resource::{ConfigError, Operation, ResourceType};
pub use store::{MemoryStore, Store};
pub use transport::{Request, Response};
