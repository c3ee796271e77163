use crate::error::{Error, Result};
use crate::field::{resolve_segments, FieldMap};
use regex::RegexBuilder;
use serde_json::Value;
use tracing::debug;

/// Comparison named by a filter expression suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Exact,
    IExact,
    Contains,
    IContains,
    Gt,
    Gte,
    Lt,
    Lte,
    StartsWith,
    EndsWith,
    Regex,
    IRegex,
}

impl Terminator {
    fn from_segment(segment: &str) -> Option<Self> {
        Some(match segment {
            "exact" => Terminator::Exact,
            "iexact" => Terminator::IExact,
            "contains" => Terminator::Contains,
            "icontains" => Terminator::IContains,
            "gt" => Terminator::Gt,
            "gte" => Terminator::Gte,
            "lt" => Terminator::Lt,
            "lte" => Terminator::Lte,
            "startswith" => Terminator::StartsWith,
            "endswith" => Terminator::EndsWith,
            "regex" => Terminator::Regex,
            "iregex" => Terminator::IRegex,
            _ => return None,
        })
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    /// Normalized path; the first segment is a validated field name
    pub path: Vec<String>,
    pub terminator: Terminator,
    pub invert: bool,
}

/// Parse one filter expression against the resource's field map.
pub fn parse(expression: &str, fields: &FieldMap) -> Result<FilterSpec> {
    let mut segments: Vec<String> = expression.split("__").map(str::to_string).collect();

    let invert = segments.last().is_some_and(|s| s == "not");
    if invert {
        segments.pop();
    }

    let terminator = if segments.len() > 1 {
        match segments.last().and_then(|s| Terminator::from_segment(s)) {
            Some(t) => {
                segments.pop();
                t
            }
            None => Terminator::Exact,
        }
    } else {
        Terminator::Exact
    };

    let leading = segments.first().cloned().unwrap_or_default();
    match fields.get(&leading) {
        Some(field) if field.filterable => {}
        Some(_) => {
            return Err(Error::bad_request(format!(
                "cannot filter on `{leading}`"
            )))
        }
        None => {
            return Err(Error::bad_request(format!(
                "unknown filter field `{leading}`"
            )))
        }
    }

    Ok(FilterSpec {
        path: segments,
        terminator,
        invert,
    })
}

/// Apply filter expressions to a collection.
///
/// Each `(name, value)` pair is one query parameter; the same name appearing
/// twice contributes two AND-ed conditions.
pub fn apply(
    items: Vec<Value>,
    params: &[(String, String)],
    fields: &FieldMap,
) -> Result<Vec<Value>> {
    if params.is_empty() {
        return Ok(items);
    }

    let mut specs = Vec::with_capacity(params.len());
    for (name, raw) in params {
        let spec = parse(name, fields)?;
        let values: Vec<&str> = raw.split(',').collect();
        specs.push((spec, values));
    }

    let before = items.len();
    let mut kept = Vec::with_capacity(items.len());
    'item: for item in items {
        for (spec, values) in &specs {
            if !condition_holds(&item, spec, values, fields)? {
                continue 'item;
            }
        }
        kept.push(item);
    }
    debug!(before = before, after = kept.len(), "Filters applied");
    Ok(kept)
}

fn condition_holds(
    item: &Value,
    spec: &FilterSpec,
    values: &[&str],
    fields: &FieldMap,
) -> Result<bool> {
    // parse() guarantees the leading segment is a known field
    let field = match fields.get(&spec.path[0]) {
        Some(f) => f,
        None => return Ok(spec.invert),
    };
    let mut segments: Vec<String> = field.path.segments().to_vec();
    segments.extend(spec.path[1..].iter().cloned());

    let target = resolve_segments(&segments, item).ok();
    let mut matched = false;
    if let Some(target) = &target {
        for raw in values {
            if value_matches(target, raw, spec.terminator)? {
                matched = true;
                break;
            }
        }
    }
    Ok(if spec.invert { !matched } else { matched })
}

fn value_matches(target: &Value, raw: &str, terminator: Terminator) -> Result<bool> {
    // A stored sequence matches if any element matches
    if let Value::Array(elements) = target {
        for element in elements {
            if value_matches(element, raw, terminator)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }

    match terminator {
        Terminator::Gt | Terminator::Gte | Terminator::Lt | Terminator::Lte => {
            match (numeric(target), raw.parse::<f64>()) {
                // Native numeric ordering when the stored value is a number
                (Some(lhs), Ok(rhs)) => Ok(apply_ordering(lhs, rhs, terminator)),
                _ => {
                    let lhs = text_of(target);
                    Ok(apply_ordering_str(&lhs, raw, terminator))
                }
            }
        }
        Terminator::Exact => Ok(match target {
            Value::String(s) => s == raw,
            other => text_of(other) == raw,
        }),
        Terminator::IExact => Ok(text_of(target).eq_ignore_ascii_case(raw)),
        Terminator::Contains => Ok(text_of(target).contains(raw)),
        Terminator::IContains => Ok(text_of(target)
            .to_lowercase()
            .contains(&raw.to_lowercase())),
        Terminator::StartsWith => Ok(text_of(target).starts_with(raw)),
        Terminator::EndsWith => Ok(text_of(target).ends_with(raw)),
        Terminator::Regex | Terminator::IRegex => {
            let re = RegexBuilder::new(raw)
                .case_insensitive(terminator == Terminator::IRegex)
                .build()
                .map_err(|e| Error::bad_request(format!("invalid regex filter: {e}")))?;
            Ok(re.is_match(&text_of(target)))
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn apply_ordering(lhs: f64, rhs: f64, terminator: Terminator) -> bool {
    match terminator {
        Terminator::Gt => lhs > rhs,
        Terminator::Gte => lhs >= rhs,
        Terminator::Lt => lhs < rhs,
        Terminator::Lte => lhs <= rhs,
        _ => false,
    }
}

fn apply_ordering_str(lhs: &str, rhs: &str, terminator: Terminator) -> bool {
    match terminator {
        Terminator::Gt => lhs > rhs,
        Terminator::Gte => lhs >= rhs,
        Terminator::Lt => lhs < rhs,
        Terminator::Lte => lhs <= rhs,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{build_fields, Declared, FieldKind};
    use serde_json::json;

    fn fields() -> FieldMap {
        build_fields(
            vec![
                Declared::new("question", FieldKind::Text),
                Declared::new("votes", FieldKind::Integer),
                Declared::new("secret", FieldKind::Text).not_filterable(),
            ],
            None,
            &[],
            None,
        )
    }

    #[test]
    fn test_parse_strips_terminator_and_inversion() {
        let spec = parse("question__icontains__not", &fields()).unwrap();
        assert_eq!(spec.path, vec!["question"]);
        assert_eq!(spec.terminator, Terminator::IContains);
        assert!(spec.invert);
    }

    #[test]
    fn test_parse_rejects_unknown_field() {
        let err = parse("nope__gt", &fields()).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_parse_rejects_unfilterable_field() {
        let err = parse("secret", &fields()).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_unmatched_terminator_defaults_to_exact() {
        let spec = parse("question__whatever", &fields()).unwrap();
        // "whatever" is not a terminator; it stays a path segment
        assert_eq!(spec.path, vec!["question", "whatever"]);
        assert_eq!(spec.terminator, Terminator::Exact);
    }

    #[test]
    fn test_numeric_ordering() {
        let items = vec![json!({ "votes": 1 }), json!({ "votes": 5 }), json!({ "votes": 9 })];
        let kept = apply(items, &[("votes__gte".into(), "5".into())], &fields()).unwrap();
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_comma_values_are_or() {
        let items = vec![json!({ "votes": 1 }), json!({ "votes": 2 }), json!({ "votes": 3 })];
        let kept = apply(items, &[("votes".into(), "1,2".into())], &fields()).unwrap();
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_inversion_negates_combined_condition() {
        let items = vec![json!({ "votes": 1 }), json!({ "votes": 2 }), json!({ "votes": 3 })];
        let kept = apply(items, &[("votes__not".into(), "1,2".into())], &fields()).unwrap();
        assert_eq!(kept, vec![json!({ "votes": 3 })]);
    }
}
