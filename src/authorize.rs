//! Authorization policies.
//!
//! A resource's policy is consulted at three points: before any object is
//! loaded ([`Authorizer::is_accessible`]), after the target of an
//! individual-item write is known ([`Authorizer::is_authorized`]), and after
//! a collection read ([`Authorizer::filter`]).

use crate::auth::Principal;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;

/// Accessibility and per-object permission checks, plus collection
/// narrowing. The default implementations allow everything.
pub trait Authorizer: Send + Sync {
    /// Checked before any object is loaded. `false` is an immediate 403.
    fn is_accessible(&self, principal: &Principal, method: &Method) -> bool {
        let _ = (principal, method);
        true
    }

    /// Checked once the object of an individual-item write is known.
    fn is_authorized(&self, principal: &Principal, method: &Method, item: &Value) -> bool {
        let _ = (principal, method, item);
        true
    }

    /// Narrow a collection after a read.
    fn filter(&self, principal: &Principal, method: &Method, items: Vec<Value>) -> Vec<Value> {
        let _ = (principal, method);
        items
    }
}

/// The base policy: always allow, pass collections through untouched.
pub struct AllowAll;

impl Authorizer for AllowAll {}

/// Policy keyed by a method-to-permission-name map, separately configurable
/// for resource-level and object-level checks.
///
/// A method with no configured permission is allowed (fail-open). This is a
/// deliberate, reproducible behavior match of the system this framework is
/// modeled on; see DESIGN.md before hardening.
#[derive(Default)]
pub struct PermissionPolicy {
    resource_perms: HashMap<Method, String>,
    object_perms: HashMap<Method, String>,
}

impl PermissionPolicy {
    /// A policy with no configured permissions (allows everything).
    #[must_use]
    pub fn new() -> Self {
        PermissionPolicy::default()
    }

    /// Require a permission for a method at resource level.
    #[must_use]
    pub fn require(mut self, method: Method, permission: impl Into<String>) -> Self {
        self.resource_perms.insert(method, permission.into());
        self
    }

    /// Require a permission for a method at object level.
    #[must_use]
    pub fn require_object(mut self, method: Method, permission: impl Into<String>) -> Self {
        self.object_perms.insert(method, permission.into());
        self
    }
}

impl Authorizer for PermissionPolicy {
    fn is_accessible(&self, principal: &Principal, method: &Method) -> bool {
        match self.resource_perms.get(method) {
            Some(permission) => principal.has_permission(permission),
            None => true,
        }
    }

    fn is_authorized(&self, principal: &Principal, method: &Method, _item: &Value) -> bool {
        match self.object_perms.get(method) {
            Some(permission) => principal.has_permission(permission),
            None => true,
        }
    }
}
