//! # Resource Module
//!
//! Declarative resource definitions and the per-request dispatch engine.
//!
//! ## Overview
//!
//! A [`ResourceType`] is the immutable product of [`ResourceType::builder`]:
//! field map, verb and operation allow-lists, authentication chain,
//! authorization policy, codecs, store, and (optionally) a compiled request
//! schema. It is built once at startup and shared via `Arc`; nothing on it
//! mutates afterwards, so concurrent requests read it without locks.
//!
//! Each inbound request gets its own ephemeral [`Dispatch`] carrying the
//! request-scoped state (resolved method, identifier, remaining path
//! components, traversal scope, principal, status override). The dispatch
//! state machine runs:
//!
//! ```text
//! AUTHENTICATE -> DETERMINE_METHOD -> CHECK_ACCESSIBLE -> [TRAVERSE]
//!   -> DECODE_AND_VALIDATE -> CHECK_AUTHORIZED -> INVOKE -> PREPARE
//!   -> ENCODE -> RESPOND
//! ```
//!
//! with every step able to short-circuit into the error path.

mod core;
mod dispatch;
mod prepare;

pub use self::core::{http_method_names, ConfigError, Operation, ResourceBuilder, ResourceType};
pub use dispatch::Dispatch;
pub(crate) use dispatch::Outcome;
