//! # Field Metadata Module
//!
//! The declarative field model behind every resource: which attributes are
//! exposed on read, accepted on write, filterable, relation-valued, and how
//! each value is pulled out of a stored item.
//!
//! ## Overview
//!
//! Field sets are computed once, when a resource type is built, from:
//!
//! 1. The declared field list ([`Declared`]) plus include/exclude lists
//! 2. For model-backed resources, the backing model's column and relation
//!    metadata ([`ModelMeta`])
//!
//! The result is an ordered [`FieldMap`] (insertion order is exposure
//! order) that is immutable for the life of the process.
//!
//! ## Accessors
//!
//! A field's value is located by walking its access path through the stored
//! item. Each path segment resolves to an explicit [`AccessStep`] (object
//! key or sequence index), probed once per path and memoized; computed
//! fields skip the walk entirely via their `produce` hook. Unresolvable
//! segments yield a [`FieldLookupError`], which item preparation treats as
//! "value absent", never as a hard failure.

mod accessor;
mod core;
mod relation;

pub use accessor::{resolve_segments, AccessPath, AccessStep, FieldLookupError};
pub use relation::{Relation, ResourceRef};
pub use self::core::{
    build_fields, CleanFn, ColumnMeta, Declared, DefaultSource, Field, FieldKind, FieldMap,
    ModelMeta, ProduceFn, RelationMeta,
};
