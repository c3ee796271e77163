use crate::auth::{AllowAny, Authenticator};
use crate::authorize::{AllowAll, Authorizer};
use crate::error::{Error, Result};
use crate::field::{build_fields, Declared, FieldMap, ModelMeta};
use crate::paginate::Paginator;
use crate::store::Store;
use jsonschema::Validator;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// CRUD operation a verb resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Create,
    Update,
    Destroy,
}

impl Operation {
    /// Lowercase operation name, for error bodies and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The recognized verb set. Verbs outside this list are never exposed, even
/// when a resource lists them.
#[must_use]
pub fn http_method_names() -> [http::Method; 5] {
    [
        http::Method::GET,
        http::Method::POST,
        http::Method::PUT,
        http::Method::PATCH,
        http::Method::DELETE,
    ]
}

/// Fatal construction-time misconfiguration (`ImproperlyConfigured`-class).
#[derive(Debug)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "improperly configured: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Immutable, declarative definition of one resource.
///
/// Built once via [`ResourceType::builder`], registered with an
/// [`crate::api::Api`], and shared read-only across requests.
pub struct ResourceType {
    /// Resource name; the first URL path segment it answers to
    pub name: String,
    /// Verbs allowed against the collection (list granularity)
    pub http_list_allowed: Vec<http::Method>,
    /// Verbs allowed against an individual item (detail granularity)
    pub http_detail_allowed: Vec<http::Method>,
    /// Operations allowed at list granularity
    pub ops_list_allowed: Vec<Operation>,
    /// Operations allowed at detail granularity
    pub ops_detail_allowed: Vec<Operation>,
    /// Ordered field map; insertion order is exposure order
    pub fields: FieldMap,
    /// Ordered credential checkers
    pub auth: Vec<Arc<dyn Authenticator>>,
    /// Authorization policy
    pub policy: Arc<dyn Authorizer>,
    /// Format used when neither a suffix nor an Accept header decides
    pub default_format: String,
    /// Name of the synthesized URI field in prepared payloads
    pub uri_field: String,
    /// Name of the identifier field on stored items
    pub id_field: String,
    /// Backing store
    pub store: Arc<dyn Store>,
    /// Compiled request-body schema, when declared
    pub schema: Option<Arc<Validator>>,
    /// Collection windowing
    pub paginator: Paginator,
    /// When false, successful writes answer 204 with no body
    pub return_data: bool,
}

impl ResourceType {
    /// Start building a resource definition over the given store.
    #[must_use]
    pub fn builder(name: impl Into<String>, store: Arc<dyn Store>) -> ResourceBuilder {
        ResourceBuilder::new(name, store)
    }

    /// Resolve a URI-or-identifier reference to the underlying stored item.
    ///
    /// Accepts a full item object (passed through), a URI string (trailing
    /// segment is the identifier), or a bare identifier value. An
    /// unresolvable reference is the caller's bad input, not a 404.
    pub fn resolve_reference(&self, reference: &Value) -> Result<Value> {
        if reference.is_object() {
            return Ok(reference.clone());
        }
        let identifier = match reference {
            Value::String(s) if s.contains('/') => s
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or("")
                .to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let items = self.store.read(&[])?;
        self.find_by_id(&items, &identifier).ok_or_else(|| {
            Error::bad_request(format!(
                "cannot resolve `{reference}` to a {} item",
                self.name
            ))
        })
    }

    /// Find an item by its stringified identifier.
    #[must_use]
    pub fn find_by_id(&self, items: &[Value], identifier: &str) -> Option<Value> {
        items
            .iter()
            .find(|item| {
                item.get(&self.id_field)
                    .is_some_and(|v| stringify(v) == identifier)
            })
            .cloned()
    }
}

pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builder for [`ResourceType`]. Construction is the only place field sets
/// are computed and schemas compiled; everything after `build()` is frozen.
pub struct ResourceBuilder {
    name: String,
    store: Arc<dyn Store>,
    declared: Vec<Declared>,
    include: Option<Vec<String>>,
    exclude: Vec<String>,
    model: Option<ModelMeta>,
    http_list: Vec<http::Method>,
    http_detail: Vec<http::Method>,
    ops_list: Vec<Operation>,
    ops_detail: Vec<Operation>,
    auth: Vec<Arc<dyn Authenticator>>,
    policy: Arc<dyn Authorizer>,
    default_format: String,
    uri_field: String,
    id_field: String,
    schema: Option<Value>,
    paginator: Option<Paginator>,
    return_data: bool,
}

impl ResourceBuilder {
    fn new(name: impl Into<String>, store: Arc<dyn Store>) -> Self {
        ResourceBuilder {
            name: name.into(),
            store,
            declared: Vec::new(),
            include: None,
            exclude: Vec::new(),
            model: None,
            http_list: vec![http::Method::GET, http::Method::POST],
            http_detail: vec![
                http::Method::GET,
                http::Method::PUT,
                http::Method::PATCH,
                http::Method::DELETE,
            ],
            ops_list: vec![Operation::Read, Operation::Create],
            ops_detail: vec![Operation::Read, Operation::Update, Operation::Destroy],
            auth: Vec::new(),
            policy: Arc::new(AllowAll),
            default_format: "json".to_string(),
            uri_field: "resource_uri".to_string(),
            id_field: "id".to_string(),
            schema: None,
            paginator: None,
            return_data: true,
        }
    }

    /// Declare a field.
    #[must_use]
    pub fn declare(mut self, field: Declared) -> Self {
        self.declared.push(field);
        self
    }

    /// Restrict visibility to the named fields.
    #[must_use]
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Hide the named fields.
    #[must_use]
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    /// Supply backing-model metadata to scan for additional fields.
    #[must_use]
    pub fn model(mut self, model: ModelMeta) -> Self {
        self.model = Some(model);
        self
    }

    /// Verbs allowed at list granularity.
    #[must_use]
    pub fn http_list<I: IntoIterator<Item = http::Method>>(mut self, methods: I) -> Self {
        self.http_list = methods.into_iter().collect();
        self
    }

    /// Verbs allowed at detail granularity.
    #[must_use]
    pub fn http_detail<I: IntoIterator<Item = http::Method>>(mut self, methods: I) -> Self {
        self.http_detail = methods.into_iter().collect();
        self
    }

    /// Operations allowed at list granularity.
    #[must_use]
    pub fn ops_list<I: IntoIterator<Item = Operation>>(mut self, ops: I) -> Self {
        self.ops_list = ops.into_iter().collect();
        self
    }

    /// Operations allowed at detail granularity.
    #[must_use]
    pub fn ops_detail<I: IntoIterator<Item = Operation>>(mut self, ops: I) -> Self {
        self.ops_detail = ops.into_iter().collect();
        self
    }

    /// Append a credential checker to the chain.
    #[must_use]
    pub fn authenticator(mut self, checker: Arc<dyn Authenticator>) -> Self {
        self.auth.push(checker);
        self
    }

    /// Set the authorization policy.
    #[must_use]
    pub fn policy(mut self, policy: Arc<dyn Authorizer>) -> Self {
        self.policy = policy;
        self
    }

    /// Set the fallback response format.
    #[must_use]
    pub fn default_format(mut self, format: impl Into<String>) -> Self {
        self.default_format = format.into();
        self
    }

    /// Rename the synthesized URI field.
    #[must_use]
    pub fn uri_field(mut self, name: impl Into<String>) -> Self {
        self.uri_field = name.into();
        self
    }

    /// Rename the identifier field.
    #[must_use]
    pub fn id_field(mut self, name: impl Into<String>) -> Self {
        self.id_field = name.into();
        self
    }

    /// Declare a JSON Schema validated against write bodies.
    #[must_use]
    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Override the pagination word and default window length.
    #[must_use]
    pub fn paginator(mut self, paginator: Paginator) -> Self {
        self.paginator = Some(paginator);
        self
    }

    /// Answer successful writes with 204 and no body.
    #[must_use]
    pub fn no_return_data(mut self) -> Self {
        self.return_data = false;
        self
    }

    /// Freeze the definition.
    ///
    /// # Errors
    ///
    /// Fails when a declared field collides with the URI or identifier
    /// field name, or when the request schema does not compile.
    pub fn build(self) -> std::result::Result<Arc<ResourceType>, ConfigError> {
        let fields = build_fields(
            self.declared,
            self.include.as_deref(),
            &self.exclude,
            self.model.as_ref(),
        );

        for field in fields.iter() {
            if field.name == self.uri_field || field.name == self.id_field {
                return Err(ConfigError(format!(
                    "resource `{}` declares field `{}` colliding with a reserved field name",
                    self.name, field.name
                )));
            }
        }

        let recognized = http_method_names();
        let http_list: Vec<http::Method> = self
            .http_list
            .into_iter()
            .filter(|m| recognized.contains(m))
            .collect();
        let http_detail: Vec<http::Method> = self
            .http_detail
            .into_iter()
            .filter(|m| recognized.contains(m))
            .collect();

        let schema = match self.schema {
            Some(raw) => Some(Arc::new(jsonschema::validator_for(&raw).map_err(|e| {
                ConfigError(format!(
                    "resource `{}` schema does not compile: {e}",
                    self.name
                ))
            })?)),
            None => None,
        };

        let auth: Vec<Arc<dyn Authenticator>> = if self.auth.is_empty() {
            vec![Arc::new(AllowAny)]
        } else {
            self.auth
        };

        info!(
            resource = %self.name,
            field_count = fields.len(),
            has_schema = schema.is_some(),
            "Resource definition built"
        );

        Ok(Arc::new(ResourceType {
            name: self.name,
            http_list_allowed: http_list,
            http_detail_allowed: http_detail,
            ops_list_allowed: self.ops_list,
            ops_detail_allowed: self.ops_detail,
            fields,
            auth,
            policy: self.policy,
            default_format: self.default_format,
            uri_field: self.uri_field,
            id_field: self.id_field,
            store: self.store,
            schema,
            paginator: self.paginator.unwrap_or_default(),
            return_data: self.return_data,
        }))
    }
}
