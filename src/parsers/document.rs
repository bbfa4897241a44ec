use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Source dialect of a document. Everything below is dialect-normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    Swagger2,
    OpenApi30,
    OpenApi31,
}

impl Dialect {
    /// JSON pointer prefix under which named schemas live.
    pub fn schema_pointer_prefix(&self) -> &'static str {
        match self {
            Dialect::Swagger2 => "#/definitions/",
            Dialect::OpenApi30 | Dialect::OpenApi31 => "#/components/schemas/",
        }
    }
}

/// Uniform view of one API document: schemas, operations, security schemes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub dialect: Dialect,
    pub info: Info,
    pub base_url: Option<String>,

    /// Named schemas (`definitions` / `components.schemas`), in source order
    pub schemas: IndexMap<String, SchemaNode>,

    pub operations: Vec<OperationDescriptor>,

    pub security_schemes: IndexMap<String, SecurityScheme>,

    /// Document-level default security requirements
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,
}

impl Document {
    pub fn schema_location(&self, name: &str) -> String {
        format!("{}{}", self.dialect.schema_pointer_prefix(), name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

/// One schema, independent of dialect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub write_only: bool,
    pub default: Option<JsonValue>,
    #[serde(default)]
    pub constraints: Constraints,
    pub discriminator: Option<Discriminator>,
}

impl SchemaNode {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Self::new(SchemaKind::Ref(target.into()))
    }

    /// The referenced schema name when this is a bare `$ref`.
    pub fn ref_target(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::Ref(target) => Some(target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "spec")]
pub enum SchemaKind {
    /// No type information at all (open value)
    #[default]
    Any,
    /// Reference to a named schema (already reduced to the schema name)
    Ref(String),
    String,
    Number,
    Integer,
    Boolean,
    Array {
        items: Option<Box<SchemaNode>>,
    },
    Object {
        properties: IndexMap<String, SchemaNode>,
        #[serde(default)]
        required: Vec<String>,
        #[serde(default)]
        additional: AdditionalProperties,
    },
    AllOf(Vec<SchemaNode>),
    /// `oneOf`, and `anyOf` which is normalized into the same shape
    OneOf(Vec<SchemaNode>),
    Enum {
        base: EnumBase,
        values: Vec<JsonValue>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumBase {
    String,
    Integer,
    Number,
    Boolean,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalProperties {
    /// Keyword not present
    #[default]
    Absent,
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

impl AdditionalProperties {
    /// Whether the keyword explicitly admits undeclared properties.
    pub fn allows_undeclared(&self) -> bool {
        matches!(self, Self::Allowed(true) | Self::Schema(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    #[serde(default)]
    pub exclusive_minimum: bool,
    #[serde(default)]
    pub exclusive_maximum: bool,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    #[serde(default)]
    pub unique_items: bool,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Constraints::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminator {
    pub property_name: String,
    /// Discriminator value -> schema name, in declaration order
    #[serde(default)]
    pub mapping: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub operation_id: Option<String>,
    pub path: String,
    pub method: HttpMethod,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Path-item and operation parameters, already merged
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    pub request_body: Option<RequestBodyDescriptor>,
    /// Status code (`200`, `2XX`, `default`) -> response
    #[serde(default)]
    pub responses: IndexMap<String, ResponseDescriptor>,
    /// `None` inherits the document default; `Some(vec![])` means no auth
    pub security: Option<Vec<SecurityRequirement>>,
    #[serde(default)]
    pub deprecated: bool,
}

impl OperationDescriptor {
    pub fn location(&self) -> String {
        format!("#/paths/{}/{}", self.path.replace('/', "~1"), self.method.as_str().to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    pub schema: SchemaNode,
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBodyDescriptor {
    #[serde(default)]
    pub required: bool,
    pub description: Option<String>,
    /// Media type -> schema
    pub content: IndexMap<String, Option<SchemaNode>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    pub description: Option<String>,
    /// Media type -> schema
    #[serde(default)]
    pub content: IndexMap<String, Option<SchemaNode>>,
}

/// One alternative of a security requirement: every listed scheme must be
/// satisfied together. Scheme name -> required scopes.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityScheme {
    pub kind: SecuritySchemeKind,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SecuritySchemeKind {
    ApiKey {
        name: String,
        location: ApiKeyLocation,
    },
    Http {
        scheme: String,
        bearer_format: Option<String>,
    },
    OAuth2 {
        flows: Vec<OAuthFlow>,
    },
    OpenIdConnect {
        url: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthFlowKind {
    Implicit,
    Password,
    ClientCredentials,
    AuthorizationCode,
}

impl OAuthFlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthFlowKind::Implicit => "implicit",
            OAuthFlowKind::Password => "password",
            OAuthFlowKind::ClientCredentials => "clientCredentials",
            OAuthFlowKind::AuthorizationCode => "authorizationCode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthFlow {
    pub kind: OAuthFlowKind,
    pub authorization_url: Option<String>,
    pub token_url: Option<String>,
    pub refresh_url: Option<String>,
    /// Scope name -> description
    #[serde(default)]
    pub scopes: IndexMap<String, String>,
}
