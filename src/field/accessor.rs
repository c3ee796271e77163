use once_cell::sync::OnceCell;
use serde_json::Value;
use std::fmt;

/// One resolved step of an access path.
///
/// The capability probe is explicit and ordered: a segment is tried as an
/// object key first, then as a sequence index. No exception-driven
/// fallthrough; what a segment resolved to is recorded and reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessStep {
    /// Mapping-style key access
    Key(String),
    /// Sequence-style index access
    Index(usize),
}

/// Lookup failure while walking an access path.
///
/// Callers preparing items treat this as "value absent" rather than fatal.
#[derive(Debug, Clone)]
pub struct FieldLookupError {
    /// The path segment that failed to resolve
    pub segment: String,
}

impl fmt::Display for FieldLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unresolvable access segment `{}`", self.segment)
    }
}

impl std::error::Error for FieldLookupError {}

/// A lazily-split, lazily-planned access path into a stored item.
///
/// The raw path uses `__` (or `.`) separators and is split on first use.
/// The resolved step plan is memoized after the first successful walk; a
/// later item with a different shape falls back to a fresh probe without
/// disturbing the cached plan.
#[derive(Debug, Clone)]
pub struct AccessPath {
    raw: String,
    segments: OnceCell<Vec<String>>,
    plan: OnceCell<Vec<AccessStep>>,
}

impl AccessPath {
    /// Create a path from its raw `__`/`.`-separated form.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        AccessPath {
            raw: raw.into(),
            segments: OnceCell::new(),
            plan: OnceCell::new(),
        }
    }

    /// The raw path string.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Path segments, split on first use.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        self.segments.get_or_init(|| {
            if self.raw.contains("__") {
                self.raw.split("__").map(str::to_string).collect()
            } else {
                self.raw.split('.').map(str::to_string).collect()
            }
        })
    }

    /// Walk the path through `item`, returning the located value.
    pub fn resolve(&self, item: &Value) -> Result<Value, FieldLookupError> {
        if let Some(plan) = self.plan.get() {
            if let Some(value) = apply_plan(plan, item) {
                return Ok(value);
            }
            // Shape changed for this item; probe it directly.
            return resolve_segments(self.segments(), item);
        }
        let (value, plan) = probe(self.segments(), item)?;
        let _ = self.plan.set(plan);
        Ok(value)
    }
}

/// Walk `segments` through `item` without plan caching.
///
/// Used by the filter engine, where paths are request-supplied and not worth
/// memoizing.
pub fn resolve_segments(segments: &[String], item: &Value) -> Result<Value, FieldLookupError> {
    probe(segments, item).map(|(value, _)| value)
}

fn probe(segments: &[String], item: &Value) -> Result<(Value, Vec<AccessStep>), FieldLookupError> {
    let mut current = item;
    let mut plan = Vec::with_capacity(segments.len());
    for segment in segments {
        let (step, next) = probe_step(segment, current).ok_or_else(|| FieldLookupError {
            segment: segment.clone(),
        })?;
        plan.push(step);
        current = next;
    }
    Ok((current.clone(), plan))
}

fn probe_step<'v>(segment: &str, value: &'v Value) -> Option<(AccessStep, &'v Value)> {
    match value {
        Value::Object(map) => map
            .get(segment)
            .map(|v| (AccessStep::Key(segment.to_string()), v)),
        Value::Array(items) => {
            let idx: usize = segment.parse().ok()?;
            items.get(idx).map(|v| (AccessStep::Index(idx), v))
        }
        _ => None,
    }
}

fn apply_plan(plan: &[AccessStep], item: &Value) -> Option<Value> {
    let mut current = item;
    for step in plan {
        current = match step {
            AccessStep::Key(key) => current.as_object()?.get(key)?,
            AccessStep::Index(idx) => current.as_array()?.get(*idx)?,
        };
    }
    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_segment_key() {
        let path = AccessPath::new("name");
        let item = json!({ "name": "Max" });
        assert_eq!(path.resolve(&item).unwrap(), json!("Max"));
    }

    #[test]
    fn test_nested_path_with_index() {
        let path = AccessPath::new("tags__0");
        let item = json!({ "tags": ["friendly", "trained"] });
        assert_eq!(path.resolve(&item).unwrap(), json!("friendly"));
    }

    #[test]
    fn test_dot_separator() {
        let path = AccessPath::new("owner.name");
        let item = json!({ "owner": { "name": "John" } });
        assert_eq!(path.resolve(&item).unwrap(), json!("John"));
    }

    #[test]
    fn test_unresolvable_segment() {
        let path = AccessPath::new("missing");
        let err = path.resolve(&json!({ "name": "Max" })).unwrap_err();
        assert_eq!(err.segment, "missing");
    }

    #[test]
    fn test_plan_survives_shape_change() {
        let path = AccessPath::new("value");
        assert_eq!(path.resolve(&json!({ "value": 1 })).unwrap(), json!(1));
        // Same path, different item shape: falls back to a fresh probe.
        let nested = json!([{ "value": 2 }]);
        assert!(path.resolve(&nested).is_err());
        assert_eq!(path.resolve(&json!({ "value": 3 })).unwrap(), json!(3));
    }
}
