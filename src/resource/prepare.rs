use crate::api::Api;
use crate::error::Result;
use crate::field::{Field, Relation};
use crate::resource::core::{stringify, ResourceType};
use serde_json::{Map, Value};

/// Transform a stored item into its ordered wire representation.
///
/// The URI field comes first (reversed from the item's identifier), then
/// each visible field in declaration order. Relation values become nested
/// URIs, or full embedded representations when the relation says so;
/// collection fields always normalize to a sequence.
pub(crate) fn prepare_item(api: &Api, ty: &ResourceType, item: &Value) -> Result<Value> {
    let mut out = Map::new();

    let uri = item
        .get(&ty.id_field)
        .map(|id| Value::String(api.reverse(&ty.name, &stringify(id))))
        .unwrap_or(Value::Null);
    out.insert(ty.uri_field.clone(), uri);

    for field in ty.fields.iter().filter(|f| f.visible) {
        let raw = field.value_of(item);
        let value = match &field.relation {
            Some(relation) => prepare_relation(api, field, relation, raw)?,
            None => raw.unwrap_or(Value::Null),
        };
        let value = if field.collection {
            normalize_collection(value)
        } else {
            value
        };
        out.insert(field.name.clone(), value);
    }

    Ok(Value::Object(out))
}

fn prepare_relation(
    api: &Api,
    field: &Field,
    relation: &Relation,
    raw: Option<Value>,
) -> Result<Value> {
    let target = relation.target.resolve(api)?;
    let raw = raw.unwrap_or(Value::Null);
    if field.collection {
        // A to-many relation iterates and reverses each element.
        let elements = match raw {
            Value::Array(v) => v,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        let mut out = Vec::with_capacity(elements.len());
        for element in elements {
            out.push(relation_value(api, &target, relation, element)?);
        }
        Ok(Value::Array(out))
    } else {
        relation_value(api, &target, relation, raw)
    }
}

fn relation_value(
    api: &Api,
    target: &ResourceType,
    relation: &Relation,
    element: Value,
) -> Result<Value> {
    if element.is_null() {
        return Ok(Value::Null);
    }
    if relation.embed {
        let related = match &element {
            Value::Object(_) => Some(element.clone()),
            other => target.resolve_reference(other).ok(),
        };
        return match related {
            Some(item) => prepare_item(api, target, &item),
            None => Ok(Value::Null),
        };
    }
    let id = match &element {
        Value::Object(map) => map.get(&target.id_field).cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };
    if id.is_null() {
        Ok(Value::Null)
    } else {
        Ok(Value::String(api.reverse(&target.name, &stringify(&id))))
    }
}

/// Collection fields always expose a sequence: absent becomes empty, a
/// non-string scalar becomes a single-element sequence. Strings are left
/// alone, matching the sequence-like treatment they had upstream.
fn normalize_collection(value: Value) -> Value {
    match value {
        Value::Null => Value::Array(Vec::new()),
        Value::Array(_) | Value::String(_) => value,
        scalar => Value::Array(vec![scalar]),
    }
}
