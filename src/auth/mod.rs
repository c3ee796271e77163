//! # Authentication Module
//!
//! Ordered credential checkers for resources.
//!
//! ## Overview
//!
//! A resource carries an ordered chain of [`Authenticator`]s. Dispatch runs
//! the chain with these semantics:
//!
//! 1. The first checker returning a concrete [`Principal`] wins; that
//!    principal is attached to the request context.
//! 2. A checker returning [`Authentication::Anonymous`] is a *definitive*
//!    failed authentication; the chain short-circuits with that checker's
//!    challenge rather than falling through to later checkers.
//! 3. If every checker returns [`Authentication::NoOpinion`], the *last*
//!    checker's challenge is returned.
//!
//! Malformed credential headers are swallowed: checkers log them at `debug`
//! and answer `NoOpinion`, never a hard error.

mod basic;
mod bearer;

pub use basic::{BasicAuthenticator, CredentialCheck};
pub use bearer::BearerAuthenticator;

use crate::error::{Error, Result};
use crate::transport::Request;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// An authenticated caller.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Stable identifier of the caller
    pub id: String,
    /// Named permissions granted to the caller
    pub permissions: HashSet<String>,
    /// Checker-specific claims (e.g. a decoded token payload)
    pub claims: Value,
}

impl Principal {
    /// A named principal with no permissions or claims.
    #[must_use]
    pub fn named(id: impl Into<String>) -> Self {
        Principal {
            id: id.into(),
            permissions: HashSet::new(),
            claims: json!({}),
        }
    }

    /// The anonymous principal produced by [`AllowAny`].
    #[must_use]
    pub fn anonymous() -> Self {
        Principal::named("anonymous")
    }

    /// Grant permissions.
    #[must_use]
    pub fn with_permissions<I, S>(mut self, perms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.extend(perms.into_iter().map(Into::into));
        self
    }

    /// Whether the caller holds the named permission.
    #[inline]
    #[must_use]
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }
}

/// Outcome of a single checker.
pub enum Authentication {
    /// Definitive success: this is the caller
    Principal(Principal),
    /// Definitive failure: credentials were understood and rejected
    Anonymous,
    /// This checker has nothing to say about the request
    NoOpinion,
}

/// One credential checker in a resource's authentication chain.
pub trait Authenticator: Send + Sync {
    /// Inspect the request and render a verdict.
    fn authenticate(&self, request: &Request) -> Authentication;

    /// The challenge/denial returned when this checker's verdict ends the
    /// chain without a principal.
    fn unauthenticated_error(&self) -> Error {
        Error::Unauthorized { challenge: None }
    }
}

/// Checker that admits every request as the anonymous principal.
///
/// The default chain for resources that declare no checkers.
pub struct AllowAny;

impl Authenticator for AllowAny {
    fn authenticate(&self, _request: &Request) -> Authentication {
        Authentication::Principal(Principal::anonymous())
    }
}

/// Run a chain of checkers against a request.
pub fn run_chain(chain: &[Arc<dyn Authenticator>], request: &Request) -> Result<Principal> {
    for (idx, checker) in chain.iter().enumerate() {
        match checker.authenticate(request) {
            Authentication::Principal(principal) => {
                debug!(checker = idx, principal = %principal.id, "Authentication succeeded");
                return Ok(principal);
            }
            Authentication::Anonymous => {
                debug!(checker = idx, "Authentication definitively failed");
                return Err(checker.unauthenticated_error());
            }
            Authentication::NoOpinion => {}
        }
    }
    match chain.last() {
        Some(last) => Err(last.unauthenticated_error()),
        None => Err(Error::Unauthorized { challenge: None }),
    }
}
