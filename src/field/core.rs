use crate::error::Error;
use crate::field::{AccessPath, Relation};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Validation hook run against an incoming raw value; raises on bad input.
pub type CleanFn = Arc<dyn Fn(&Value) -> Result<Value, Error> + Send + Sync>;

/// Producer hook for computed fields: given the stored item, produce the
/// exposed value. Replaces runtime "is this callable" probing with an
/// explicit declaration.
pub type ProduceFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Default applied when a write omits a field: a fixed value, or a zero-arg
/// producer for defaults that must be computed per write.
#[derive(Clone)]
pub enum DefaultSource {
    Value(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultSource {
    /// Materialize the default.
    #[must_use]
    pub fn produce(&self) -> Value {
        match self {
            DefaultSource::Value(v) => v.clone(),
            DefaultSource::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultSource::Value(v) => write!(f, "DefaultSource::Value({v})"),
            DefaultSource::Producer(_) => write!(f, "DefaultSource::Producer"),
        }
    }
}

/// Underlying value shape of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
    /// File-like upload field
    File,
    /// Multiple-choice field; always collection-valued
    MultiChoice,
    Other,
}

/// One resource attribute: visibility, editability, relation info, and the
/// accessor used to pull its value out of a stored item.
pub struct Field {
    /// Field name, unique within a resource
    pub name: String,
    /// Acceptable on write
    pub editable: bool,
    /// Value is a sequence rather than a scalar
    pub collection: bool,
    /// Usable in query-string filter expressions
    pub filterable: bool,
    /// Exposed on read
    pub visible: bool,
    /// Relation descriptor, when this field points at another resource
    pub relation: Option<Relation>,
    /// Underlying type is file-like
    pub is_file: bool,
    /// Value (or producer result) applied when a write omits the field
    pub default: Option<DefaultSource>,
    /// Validation hook: raw -> validated value
    pub clean: Option<CleanFn>,
    /// Computed-field producer; bypasses the access path
    pub produce: Option<ProduceFn>,
    /// Access path into the stored item
    pub path: AccessPath,
}

impl Field {
    /// Locate this field's value on `item`.
    ///
    /// Computed fields call their producer; everything else walks the access
    /// path. `None` means the value is absent on this item; lookup failures
    /// are not fatal here.
    #[must_use]
    pub fn value_of(&self, item: &Value) -> Option<Value> {
        if let Some(produce) = &self.produce {
            return Some(produce(item));
        }
        match self.path.resolve(item) {
            Ok(v) => Some(v),
            Err(err) => {
                debug!(field = %self.name, segment = %err.segment, "Field value absent on item");
                None
            }
        }
    }

    /// Whether this field is a relation.
    #[inline]
    #[must_use]
    pub fn is_relation(&self) -> bool {
        self.relation.is_some()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("editable", &self.editable)
            .field("collection", &self.collection)
            .field("filterable", &self.filterable)
            .field("visible", &self.visible)
            .field("relation", &self.relation)
            .field("is_file", &self.is_file)
            .finish()
    }
}

/// Ordered field map: insertion order is exposure order.
#[derive(Debug, Default)]
pub struct FieldMap {
    order: Vec<String>,
    fields: HashMap<String, Field>,
}

impl FieldMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        FieldMap::default()
    }

    /// Insert a field. A repeated name replaces the field in place, keeping
    /// its original position.
    pub fn insert(&mut self, field: Field) {
        if !self.fields.contains_key(&field.name) {
            self.order.push(field.name.clone());
        }
        self.fields.insert(field.name.clone(), field);
    }

    /// Get a field by name.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Whether a field with this name exists.
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.order.iter().filter_map(|name| self.fields.get(name))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A schema-declared field, before visibility computation.
///
/// This is the builder-facing declaration; [`build_fields`] turns a list of
/// these (plus optional model metadata) into the final [`FieldMap`].
pub struct Declared {
    pub name: String,
    pub kind: FieldKind,
    pub editable: bool,
    pub filterable: bool,
    pub collection: bool,
    pub default: Option<DefaultSource>,
    pub clean: Option<CleanFn>,
    pub produce: Option<ProduceFn>,
    pub relation: Option<Relation>,
    /// Accessor path override; defaults to the field name
    pub path: Option<String>,
}

impl Declared {
    /// Declare a field of the given kind with defaults: editable,
    /// filterable, scalar.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Declared {
            name: name.into(),
            kind,
            editable: true,
            filterable: true,
            collection: false,
            default: None,
            clean: None,
            produce: None,
            relation: None,
            path: None,
        }
    }

    /// Mark the field read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Exclude the field from filter expressions.
    #[must_use]
    pub fn not_filterable(mut self) -> Self {
        self.filterable = false;
        self
    }

    /// Mark the value as a sequence.
    #[must_use]
    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    /// Default value applied when a write omits this field.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(DefaultSource::Value(value));
        self
    }

    /// Default produced per write when this field is omitted.
    #[must_use]
    pub fn default_with(mut self, producer: Arc<dyn Fn() -> Value + Send + Sync>) -> Self {
        self.default = Some(DefaultSource::Producer(producer));
        self
    }

    /// Attach a validation hook.
    #[must_use]
    pub fn clean(mut self, clean: CleanFn) -> Self {
        self.clean = Some(clean);
        self
    }

    /// Declare the field computed via a producer hook.
    #[must_use]
    pub fn computed(mut self, produce: ProduceFn) -> Self {
        self.produce = Some(produce);
        self
    }

    /// Attach a relation descriptor.
    #[must_use]
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }

    /// Override the accessor path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Column metadata of a backing model.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    pub kind: FieldKind,
}

impl ColumnMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        ColumnMeta {
            name: name.into(),
            kind,
        }
    }
}

/// Relation metadata of a backing model.
#[derive(Debug, Clone)]
pub struct RelationMeta {
    pub name: String,
    /// Registered name of the related resource
    pub target: String,
    /// Many-valued (reverse/many) rather than a scalar foreign key
    pub many: bool,
}

impl RelationMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, target: impl Into<String>, many: bool) -> Self {
        RelationMeta {
            name: name.into(),
            target: target.into(),
            many,
        }
    }
}

/// Introspected metadata of the backing model, for model-backed resources.
#[derive(Debug, Clone, Default)]
pub struct ModelMeta {
    pub columns: Vec<ColumnMeta>,
    pub relations: Vec<RelationMeta>,
}

fn is_visible(name: &str, include: Option<&[String]>, exclude: &[String]) -> bool {
    let included = include.map_or(true, |list| list.iter().any(|n| n == name));
    included && !exclude.iter().any(|n| n == name)
}

/// Build the ordered field map for a resource type.
///
/// Declared fields come first, in declaration order; model columns and
/// relations not already declared are appended afterwards with
/// `filterable = true` and `collection` following the relation's arity.
#[must_use]
pub fn build_fields(
    declared: Vec<Declared>,
    include: Option<&[String]>,
    exclude: &[String],
    model: Option<&ModelMeta>,
) -> FieldMap {
    let mut map = FieldMap::new();

    for d in declared {
        let visible = is_visible(&d.name, include, exclude);
        let collection = d.collection || d.kind == FieldKind::MultiChoice;
        let path = AccessPath::new(d.path.unwrap_or_else(|| d.name.clone()));
        map.insert(Field {
            name: d.name,
            editable: d.editable,
            collection,
            filterable: d.filterable,
            visible,
            relation: d.relation,
            is_file: d.kind == FieldKind::File,
            default: d.default,
            clean: d.clean,
            produce: d.produce,
            path,
        });
    }

    if let Some(model) = model {
        for col in &model.columns {
            if map.contains(&col.name) {
                continue;
            }
            let visible = is_visible(&col.name, include, exclude);
            map.insert(Field {
                name: col.name.clone(),
                editable: true,
                collection: col.kind == FieldKind::MultiChoice,
                filterable: true,
                visible,
                relation: None,
                is_file: col.kind == FieldKind::File,
                default: None,
                clean: None,
                produce: None,
                path: AccessPath::new(col.name.clone()),
            });
        }
        for rel in &model.relations {
            if map.contains(&rel.name) {
                continue;
            }
            let visible = is_visible(&rel.name, include, exclude);
            let relation = if rel.many {
                Relation::to(rel.target.clone()).remote()
            } else {
                Relation::to(rel.target.clone())
            };
            map.insert(Field {
                name: rel.name.clone(),
                editable: true,
                collection: rel.many,
                filterable: true,
                visible,
                relation: Some(relation),
                is_file: false,
                default: None,
                clean: None,
                produce: None,
                path: AccessPath::new(rel.name.clone()),
            });
        }
    }

    debug!(field_count = map.len(), "Field map built");
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_declaration_order_is_exposure_order() {
        let map = build_fields(
            vec![
                Declared::new("question", FieldKind::Text),
                Declared::new("pub_date", FieldKind::Text),
            ],
            None,
            &[],
            None,
        );
        let names: Vec<&str> = map.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["question", "pub_date"]);
    }

    #[test]
    fn test_include_exclude_drive_visibility() {
        let include = vec!["question".to_string(), "secret".to_string()];
        let exclude = vec!["secret".to_string()];
        let map = build_fields(
            vec![
                Declared::new("question", FieldKind::Text),
                Declared::new("secret", FieldKind::Text),
                Declared::new("internal", FieldKind::Text),
            ],
            Some(&include),
            &exclude,
            None,
        );
        assert!(map.get("question").unwrap().visible);
        assert!(!map.get("secret").unwrap().visible);
        assert!(!map.get("internal").unwrap().visible);
    }

    #[test]
    fn test_model_scan_adds_missing_fields_only() {
        let model = ModelMeta {
            columns: vec![
                ColumnMeta::new("question", FieldKind::Text),
                ColumnMeta::new("votes", FieldKind::Integer),
            ],
            relations: vec![RelationMeta::new("choices", "choice", true)],
        };
        let map = build_fields(
            vec![Declared::new("question", FieldKind::Text).read_only()],
            None,
            &[],
            Some(&model),
        );
        // Declared wins; model adds the rest.
        assert!(!map.get("question").unwrap().editable);
        assert!(map.get("votes").unwrap().filterable);
        let choices = map.get("choices").unwrap();
        assert!(choices.collection);
        assert!(choices.is_relation());
    }

    #[test]
    fn test_multi_choice_and_file_flags() {
        let map = build_fields(
            vec![
                Declared::new("options", FieldKind::MultiChoice),
                Declared::new("attachment", FieldKind::File),
            ],
            None,
            &[],
            None,
        );
        assert!(map.get("options").unwrap().collection);
        assert!(map.get("attachment").unwrap().is_file);
    }

    #[test]
    fn test_value_of_prefers_producer() {
        let map = build_fields(
            vec![Declared::new("shout", FieldKind::Text).computed(Arc::new(|item: &Value| {
                let name = item.get("name").and_then(Value::as_str).unwrap_or("");
                Value::String(name.to_uppercase())
            }))],
            None,
            &[],
            None,
        );
        let field = map.get("shout").unwrap();
        assert_eq!(field.value_of(&json!({ "name": "max" })), Some(json!("MAX")));
    }
}
