use crate::api::Api;
use crate::error::{Error, Result};
use crate::field::AccessPath;
use crate::resource::ResourceType;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Describes how a relation field points at another resource.
///
/// The target is referenced by name and resolved lazily against the [`Api`]
/// registry; resources may therefore relate to each other cyclically without
/// load-order gymnastics.
pub struct Relation {
    /// Deferred reference to the related resource type
    pub target: ResourceRef,
    /// Optional path into the related resource used to pull the identifier
    /// off the current item (defaults to the field's own access path)
    pub path: Option<AccessPath>,
    /// Inline the full related representation instead of its URI
    pub embed: bool,
    /// The relation is stored on this resource (direct foreign key) rather
    /// than on the related one (reverse relation)
    pub local: bool,
    /// Name the related resource knows this resource by, when it differs
    pub related_name: Option<String>,
}

impl Relation {
    /// A local, referenced (non-embedded) relation to the named resource.
    #[must_use]
    pub fn to(target: impl Into<String>) -> Self {
        Relation {
            target: ResourceRef::new(target),
            path: None,
            embed: false,
            local: true,
            related_name: None,
        }
    }

    /// Inline the related representation instead of referencing its URI.
    #[must_use]
    pub fn embedded(mut self) -> Self {
        self.embed = true;
        self
    }

    /// Mark the relation as stored on the related resource (reverse/many).
    #[must_use]
    pub fn remote(mut self) -> Self {
        self.local = false;
        self
    }

    /// Pull the related identifier through `path` instead of the field name.
    #[must_use]
    pub fn via(mut self, path: impl Into<String>) -> Self {
        self.path = Some(AccessPath::new(path));
        self
    }

    /// Set the name the related resource uses for this side of the relation.
    #[must_use]
    pub fn related_name(mut self, name: impl Into<String>) -> Self {
        self.related_name = Some(name.into());
        self
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("target", &self.target.name())
            .field("embed", &self.embed)
            .field("local", &self.local)
            .field("related_name", &self.related_name)
            .finish()
    }
}

/// A by-name reference to a resource type, resolved on first use.
///
/// Resolution goes through the [`Api`] registry (the explicit indirection
/// table) and is memoized, so the cost is a single map lookup once per
/// process per relation.
pub struct ResourceRef {
    name: String,
    resolved: OnceCell<Arc<ResourceType>>,
}

impl ResourceRef {
    /// Create an unresolved reference to the named resource.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ResourceRef {
            name: name.into(),
            resolved: OnceCell::new(),
        }
    }

    /// The referenced resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve against the registry, memoizing the result.
    ///
    /// An unregistered target is a configuration mistake surfacing at
    /// request time and maps to a 500, not a 404.
    pub fn resolve(&self, api: &Api) -> Result<Arc<ResourceType>> {
        if let Some(ty) = self.resolved.get() {
            return Ok(Arc::clone(ty));
        }
        let ty = api.resource(&self.name).ok_or_else(|| {
            Error::Internal(anyhow::anyhow!(
                "relation targets unregistered resource `{}`",
                self.name
            ))
        })?;
        let _ = self.resolved.set(Arc::clone(&ty));
        Ok(ty)
    }
}

impl fmt::Debug for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRef")
            .field("name", &self.name)
            .field("resolved", &self.resolved.get().is_some())
            .finish()
    }
}
