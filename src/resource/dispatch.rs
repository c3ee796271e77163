use crate::api::Api;
use crate::auth::{run_chain, Principal};
use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::filter;
use crate::resource::core::{http_method_names, stringify, Operation, ResourceType};
use crate::resource::prepare::prepare_item;
use crate::transport::{HeaderVec, Request};
use http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a dispatch run hands back to the [`Api`] boundary: the prepared
/// payload (if any), the status, extra headers, and the negotiated encoder.
pub(crate) struct Outcome {
    pub payload: Option<Value>,
    pub status: u16,
    pub headers: HeaderVec,
    pub codec: Arc<dyn Codec>,
}

/// Per-request dispatch state.
///
/// One instance exists per inbound request (and one per traversal hop); it
/// is never shared across requests and dies when the response is produced.
pub struct Dispatch<'a> {
    api: &'a Api,
    ty: Arc<ResourceType>,
    request: &'a Request,
    method: Method,
    identifier: Option<String>,
    components: Vec<String>,
    scope: Vec<(String, String)>,
    format: Option<String>,
    principal: Option<Principal>,
    narrow: Option<String>,
    status: Option<u16>,
}

impl<'a> Dispatch<'a> {
    /// Build the dispatch state for a freshly parsed request target.
    pub(crate) fn new(
        api: &'a Api,
        ty: Arc<ResourceType>,
        request: &'a Request,
        identifier: Option<String>,
        components: Vec<String>,
        format: Option<String>,
    ) -> Self {
        Dispatch {
            api,
            ty,
            request,
            method: request.method.clone(),
            identifier,
            components,
            scope: Vec::new(),
            format,
            principal: None,
            narrow: None,
            status: None,
        }
    }

    /// Run the full state machine to an [`Outcome`] or a domain error.
    pub(crate) fn run(mut self) -> Result<Outcome> {
        self.authenticate()?;
        self.determine_method()?;
        self.check_accessible()?;
        self.traverse()
    }

    // ---- AUTHENTICATE ------------------------------------------------------

    fn authenticate(&mut self) -> Result<()> {
        let principal = run_chain(&self.ty.auth, self.request)?;
        self.principal = Some(principal);
        Ok(())
    }

    fn principal(&self) -> Result<&Principal> {
        self.principal
            .as_ref()
            .ok_or_else(|| Error::Internal(anyhow::anyhow!("dispatch ran without a principal")))
    }

    // ---- DETERMINE_METHOD --------------------------------------------------

    fn determine_method(&mut self) -> Result<()> {
        let mut method = self.request.method.clone();
        if let Some(token) = self.request.header("x-http-method-override") {
            debug!(override_method = %token, "Method override header present");
            method = token
                .trim()
                .to_ascii_uppercase()
                .parse::<Method>()
                .map_err(|_| Error::not_implemented(token.trim().to_string()))?;
        }
        if !http_method_names().contains(&method) {
            return Err(Error::not_implemented(method.to_string()));
        }
        self.method = method;
        // Granularity allow-lists belong to the terminal resource; a hop
        // that still has components to traverse only needs a recognized
        // verb. Relation hops re-check in the related resource's pipeline,
        // narrowing leaves re-check in traverse().
        if self.components.is_empty() {
            self.assert_http_allowed()?;
        }
        Ok(())
    }

    fn assert_http_allowed(&self) -> Result<()> {
        let allowed = if self.identifier.is_some() {
            &self.ty.http_detail_allowed
        } else {
            &self.ty.http_list_allowed
        };
        if !allowed.contains(&self.method) {
            return Err(Error::MethodNotAllowed {
                allow: allowed.clone(),
            });
        }
        Ok(())
    }

    // ---- CHECK_ACCESSIBLE --------------------------------------------------

    fn check_accessible(&self) -> Result<()> {
        let principal = self.principal()?;
        if !self.ty.policy.is_accessible(principal, &self.method) {
            warn!(
                resource = %self.ty.name,
                principal = %principal.id,
                method = %self.method,
                "Access rejected before load"
            );
            return Err(Error::Forbidden { detail: None });
        }
        Ok(())
    }

    // ---- TRAVERSE ----------------------------------------------------------

    fn traverse(mut self) -> Result<Outcome> {
        if self.components.is_empty() {
            return self.invoke();
        }
        let component = self.components.remove(0);

        // The URI field passes through as a plain narrowing leaf.
        if component == self.ty.uri_field {
            if !self.components.is_empty() {
                return Err(Error::NotFound);
            }
            self.assert_http_allowed()?;
            self.narrow = Some(component);
            return self.invoke();
        }

        // Pull everything we need off the field before self moves on.
        let (is_collection, target, scope_key, via_value) = {
            let field = self.ty.fields.get(&component).ok_or(Error::NotFound)?;
            match &field.relation {
                Some(relation) => {
                    let target = relation.target.resolve(self.api)?;
                    let scope_key = relation
                        .related_name
                        .clone()
                        .unwrap_or_else(|| self.ty.name.clone());
                    // To-one relations resolve the related identifier off
                    // the current item before descending.
                    let via_value = if field.collection {
                        None
                    } else {
                        let item = self.read_one()?;
                        let raw = match &relation.path {
                            Some(path) => path.resolve(&item).ok(),
                            None => field.value_of(&item),
                        };
                        Some(raw.filter(|v| !v.is_null()).ok_or(Error::NotFound)?)
                    };
                    (field.collection, target, scope_key, via_value)
                }
                None => {
                    // Non-relation field access terminates traversal and
                    // narrows the prepared response to that field.
                    if !self.components.is_empty() {
                        return Err(Error::NotFound);
                    }
                    self.assert_http_allowed()?;
                    self.narrow = Some(component);
                    return self.invoke();
                }
            }
        };

        let mut remaining = std::mem::take(&mut self.components);
        let (sub_identifier, child_scope) = if is_collection {
            let parent_id = self.identifier.clone().ok_or(Error::NotFound)?;
            let mut scope = self.scope.clone();
            scope.push((scope_key, parent_id));
            let sub_id = if remaining.is_empty() {
                None
            } else {
                Some(remaining.remove(0))
            };
            (sub_id, scope)
        } else {
            let related_id = match via_value {
                Some(Value::Object(map)) => map
                    .get(&target.id_field)
                    .map(stringify)
                    .ok_or(Error::NotFound)?,
                Some(Value::String(s)) if s.contains('/') => s
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or("")
                    .to_string(),
                Some(other) => stringify(&other),
                None => return Err(Error::NotFound),
            };
            (Some(related_id), self.scope.clone())
        };

        info!(
            parent = %self.ty.name,
            related = %target.name,
            component = %component,
            sub_identifier = ?sub_identifier,
            "Traversing into related resource"
        );

        let child = Dispatch {
            api: self.api,
            ty: target,
            request: self.request,
            method: self.request.method.clone(),
            identifier: sub_identifier,
            components: remaining,
            scope: child_scope,
            format: self.format.clone(),
            principal: None,
            narrow: None,
            status: None,
        };
        // The related resource runs its own full pipeline: its chain, its
        // policy, its allow-lists.
        child.run()
    }

    // ---- INVOKE ------------------------------------------------------------

    fn invoke(mut self) -> Result<Outcome> {
        let operation = operation_for(&self.method);
        self.assert_operation_allowed(operation)?;
        let codec = self.api.codecs().find_encoder(
            self.format.as_deref(),
            self.request.header("accept"),
            Some(&self.ty.default_format),
        )?;

        let (payload, status, headers) = match operation {
            Operation::Read => self.get()?,
            Operation::Create => self.post()?,
            Operation::Update => self.put()?,
            Operation::Destroy => self.delete()?,
        };

        Ok(Outcome {
            payload,
            status: self.status.unwrap_or(status),
            headers,
            codec,
        })
    }

    fn assert_operation_allowed(&self, operation: Operation) -> Result<()> {
        let allowed = if self.identifier.is_some() {
            &self.ty.ops_detail_allowed
        } else {
            &self.ty.ops_list_allowed
        };
        if !allowed.contains(&operation) {
            let names: Vec<&str> = allowed.iter().map(|o| o.as_str()).collect();
            return Err(Error::forbidden(format!(
                "operation {operation} not permitted (allowed: {})",
                names.join(", ")
            )));
        }
        Ok(())
    }

    fn get(&self) -> Result<(Option<Value>, u16, HeaderVec)> {
        let items = self.ty.store.read(&self.scope)?;
        if self.identifier.is_some() {
            let item = self.read_one_from(&items)?;
            let prepared = prepare_item(self.api, &self.ty, &item)?;
            return Ok((Some(self.narrowed(prepared)), 200, HeaderVec::new()));
        }
        let items = filter::apply(items, &self.request.query_params, &self.ty.fields)?;
        let principal = self.principal()?;
        let items = self.ty.policy.filter(principal, &self.method, items);
        let (window, headers) = self
            .ty
            .paginator
            .paginate(items, self.request.header("range"))?;
        let mut prepared = Vec::with_capacity(window.len());
        for item in &window {
            prepared.push(prepare_item(self.api, &self.ty, item)?);
        }
        Ok((Some(Value::Array(prepared)), 200, headers))
    }

    fn post(&mut self) -> Result<(Option<Value>, u16, HeaderVec)> {
        let data = self.decode_and_validate()?;

        // Editable non-collection-relation values are written with the
        // insert; collection-relation values attach afterwards.
        let mut record = Map::new();
        let mut deferred = Map::new();
        for field in self.ty.fields.iter() {
            let Some(value) = data.get(&field.name) else {
                continue;
            };
            if !field.editable {
                continue;
            }
            if field.collection && field.is_relation() {
                deferred.insert(field.name.clone(), value.clone());
            } else {
                record.insert(field.name.clone(), value.clone());
            }
        }
        // Scoping params: direct foreign keys before the save, indirect
        // (reverse/many) relations after it.
        for (key, value) in &self.scope {
            let local = self
                .ty
                .fields
                .get(key)
                .and_then(|f| f.relation.as_ref())
                .map_or(false, |r| r.local);
            let slot = if local { &mut record } else { &mut deferred };
            slot.insert(key.clone(), Value::String(value.clone()));
        }

        let created = self.ty.store.create(Value::Object(record))?;
        let created = if deferred.is_empty() {
            created
        } else {
            self.ty.store.update(created, Value::Object(deferred))?
        };

        info!(resource = %self.ty.name, "Item created");
        if !self.ty.return_data {
            self.status = Some(204);
            return Ok((None, 201, HeaderVec::new()));
        }
        let prepared = prepare_item(self.api, &self.ty, &created)?;
        Ok((Some(self.narrowed(prepared)), 201, HeaderVec::new()))
    }

    fn put(&mut self) -> Result<(Option<Value>, u16, HeaderVec)> {
        if self.identifier.is_none() {
            // List-granularity update has no single target item.
            return Err(Error::not_implemented("bulk update"));
        }
        let data = self.decode_and_validate()?;
        let current = self.read_one()?;
        self.check_authorized(&current)?;

        // Every editable field: incoming value, or cleared when omitted.
        let mut patch = Map::new();
        for field in self.ty.fields.iter() {
            if !field.editable {
                continue;
            }
            let value = data.get(&field.name).cloned().unwrap_or(Value::Null);
            patch.insert(field.name.clone(), value);
        }
        let updated = self.ty.store.update(current, Value::Object(patch))?;

        info!(resource = %self.ty.name, identifier = ?self.identifier, "Item updated");
        if !self.ty.return_data {
            self.status = Some(204);
            return Ok((None, 200, HeaderVec::new()));
        }
        let prepared = prepare_item(self.api, &self.ty, &updated)?;
        Ok((Some(self.narrowed(prepared)), 200, HeaderVec::new()))
    }

    fn delete(&mut self) -> Result<(Option<Value>, u16, HeaderVec)> {
        let current = self.read_one()?;
        self.check_authorized(&current)?;
        self.ty.store.destroy(current)?;
        info!(resource = %self.ty.name, identifier = ?self.identifier, "Item destroyed");
        Ok((None, 204, HeaderVec::new()))
    }

    // ---- DECODE_AND_VALIDATE -----------------------------------------------

    fn decode_and_validate(&self) -> Result<Map<String, Value>> {
        let mut data: Map<String, Value> = if self.request.has_body() {
            let content_type = self
                .request
                .header("content-type")
                .ok_or(Error::UnsupportedMediaType)?;
            let codec = self.api.codecs().find_decoder(content_type)?;
            match codec.decode(&self.request.body)? {
                Value::Object(map) => map,
                _ => return Err(Error::bad_request("request body must be an object")),
            }
        } else {
            Map::new()
        };

        // Relation values arrive as URIs or identifiers; resolve them to
        // the underlying related objects and keep their identifiers.
        for field in self.ty.fields.iter() {
            let Some(relation) = &field.relation else {
                continue;
            };
            let Some(value) = data.get(&field.name).cloned() else {
                continue;
            };
            let target = relation.target.resolve(self.api)?;
            let resolved = if field.collection {
                let elements = match value {
                    Value::Array(v) => v,
                    Value::Null => Vec::new(),
                    other => vec![other],
                };
                let mut ids = Vec::with_capacity(elements.len());
                for element in &elements {
                    let related = target.resolve_reference(element)?;
                    ids.push(related.get(&target.id_field).cloned().unwrap_or(Value::Null));
                }
                Value::Array(ids)
            } else if value.is_null() {
                Value::Null
            } else {
                let related = target.resolve_reference(&value)?;
                related.get(&target.id_field).cloned().unwrap_or(Value::Null)
            };
            data.insert(field.name.clone(), resolved);
        }

        // Field defaults for omitted fields.
        for field in self.ty.fields.iter() {
            if !data.contains_key(&field.name) {
                if let Some(default) = &field.default {
                    data.insert(field.name.clone(), default.produce());
                }
            }
        }

        // Partial update: backfill from the stored item for fields neither
        // supplied nor writable.
        if self.identifier.is_some() {
            let current = self.read_one()?;
            for field in self.ty.fields.iter() {
                if !data.contains_key(&field.name) && !field.editable {
                    if let Some(value) = field.value_of(&current) {
                        data.insert(field.name.clone(), value);
                    }
                }
            }
        }

        // Schema validation, with field-level error detail.
        if let Some(validator) = &self.ty.schema {
            let instance = Value::Object(data.clone());
            let mut errors: HashMap<String, Vec<String>> = HashMap::new();
            for violation in validator.iter_errors(&instance) {
                let path = violation.instance_path().to_string();
                let key = if path.is_empty() {
                    "detail".to_string()
                } else {
                    path.trim_start_matches('/').replace('/', ".")
                };
                errors.entry(key).or_default().push(violation.to_string());
            }
            if !errors.is_empty() {
                debug!(resource = %self.ty.name, error_count = errors.len(), "Body failed schema validation");
                let body: Map<String, Value> = errors
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect();
                return Err(Error::validation(Value::Object(body)));
            }
        }

        // Per-field clean hooks.
        let mut clean_errors: Map<String, Value> = Map::new();
        for field in self.ty.fields.iter() {
            let Some(clean) = &field.clean else { continue };
            let Some(value) = data.get(&field.name).cloned() else {
                continue;
            };
            match clean(&value) {
                Ok(cleaned) => {
                    data.insert(field.name.clone(), cleaned);
                }
                Err(err) => {
                    clean_errors.insert(field.name.clone(), Value::from(vec![err.to_string()]));
                }
            }
        }
        if !clean_errors.is_empty() {
            return Err(Error::validation(Value::Object(clean_errors)));
        }

        Ok(data)
    }

    // ---- CHECK_AUTHORIZED --------------------------------------------------

    fn check_authorized(&self, item: &Value) -> Result<()> {
        let principal = self.principal()?;
        if !self.ty.policy.is_authorized(principal, &self.method, item) {
            warn!(
                resource = %self.ty.name,
                principal = %principal.id,
                method = %self.method,
                "Per-object authorization rejected"
            );
            return Err(Error::Forbidden { detail: None });
        }
        Ok(())
    }

    // ---- helpers -----------------------------------------------------------

    fn read_one(&self) -> Result<Value> {
        let items = self.ty.store.read(&self.scope)?;
        self.read_one_from(&items)
    }

    fn read_one_from(&self, items: &[Value]) -> Result<Value> {
        let identifier = self.identifier.as_deref().ok_or(Error::NotFound)?;
        self.ty
            .find_by_id(items, identifier)
            .ok_or(Error::NotFound)
    }

    fn narrowed(&self, prepared: Value) -> Value {
        match &self.narrow {
            Some(name) => prepared.get(name).cloned().unwrap_or(Value::Null),
            None => prepared,
        }
    }
}

fn operation_for(method: &Method) -> Operation {
    if *method == Method::POST {
        Operation::Create
    } else if *method == Method::PUT || *method == Method::PATCH {
        Operation::Update
    } else if *method == Method::DELETE {
        Operation::Destroy
    } else {
        Operation::Read
    }
}
