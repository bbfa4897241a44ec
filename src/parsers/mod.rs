pub mod document;
pub mod openapi_parser;
pub mod schema_reader;
pub mod security;
pub mod swagger_parser;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

pub use document::*;
pub use openapi_parser::OpenApiParser;
pub use swagger_parser::SwaggerParser;

use crate::error::{Error, Result};

/// Input parser trait - turns one API description format into a [`Document`]
pub trait InputParser: Send + Sync {
    /// Name of the input format (e.g., "openapi", "swagger")
    fn format_name(&self) -> &str;

    /// Whether an already-loaded document looks like this format
    fn accepts(&self, raw: &JsonValue) -> bool;

    /// Parse a loaded document tree
    fn parse_value(&self, raw: JsonValue) -> Result<Document>;
}

/// Parser registry for managing available input parsers
pub struct ParserRegistry {
    parsers: IndexMap<String, Box<dyn InputParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            parsers: IndexMap::new(),
        };

        // Register built-in parsers
        registry.register(Box::new(OpenApiParser));
        registry.register(Box::new(SwaggerParser));

        registry
    }

    pub fn register(&mut self, parser: Box<dyn InputParser>) {
        self.parsers.insert(parser.format_name().to_string(), parser);
    }

    pub fn get(&self, format: &str) -> Option<&dyn InputParser> {
        self.parsers.get(format).map(|p| p.as_ref())
    }

    pub fn formats(&self) -> Vec<&str> {
        self.parsers.keys().map(String::as_str).collect()
    }

    /// Pick the parser whose format marker (`openapi: 3.x`, `swagger: "2.0"`) matches
    pub fn detect(&self, raw: &JsonValue) -> Option<&dyn InputParser> {
        self.parsers
            .values()
            .find(|p| p.accepts(raw))
            .map(|p| p.as_ref())
    }

    /// Parse a loaded tree with an explicit format, or auto-detect it.
    pub fn parse_value(&self, raw: JsonValue, format: Option<&str>) -> Result<Document> {
        let parser = match format {
            Some(name) => self
                .get(name)
                .ok_or_else(|| Error::config(format!("Unknown input format: {name}")))?,
            None => self.detect(&raw).ok_or_else(|| {
                Error::openapi("document has neither an 'openapi: 3.x' nor a 'swagger: 2.0' marker")
            })?,
        };
        tracing::debug!(format = parser.format_name(), "parsing input document");
        parser.parse_value(raw)
    }

    /// Read a `.json` or YAML file and parse it like [`Self::parse_value`].
    /// The format comes from the document marker unless `format` names one.
    pub fn parse_file(&self, source: &Path, format: Option<&str>) -> Result<Document> {
        if !source.exists() {
            return Err(Error::config(format!(
                "Input file not found: {}",
                source.display()
            )));
        }
        self.parse_value(load_value(source)?, format)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a JSON or YAML file into a JSON tree.
pub fn load_value(source: &Path) -> Result<JsonValue> {
    let content = fs::read_to_string(source)?;
    if source.extension().and_then(|s| s.to_str()) == Some("json") {
        Ok(serde_json::from_str(&content)?)
    } else {
        parse_yaml(&content)
    }
}

/// Parse YAML text into a JSON tree. Non-string mapping keys (unquoted
/// response codes like `200:`) become strings.
pub fn parse_yaml(content: &str) -> Result<JsonValue> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    Ok(yaml_to_json(yaml))
}

fn yaml_to_json(value: serde_yaml::Value) -> JsonValue {
    use serde_yaml::Value as Yaml;
    match value {
        Yaml::Null => JsonValue::Null,
        Yaml::Bool(b) => JsonValue::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::from(i)
            } else if let Some(u) = n.as_u64() {
                JsonValue::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            }
        }
        Yaml::String(s) => JsonValue::String(s),
        Yaml::Sequence(items) => JsonValue::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(map) => JsonValue::Object(
            map.into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_json::to_string(&yaml_to_json(other)).unwrap_or_default(),
    }
}

/// Merge path-level parameters with operation-level ones. An operation
/// parameter replaces a shared one with the same name and location; order is
/// first-declared.
pub fn merge_parameters(
    shared: Vec<ParameterDescriptor>,
    own: Vec<ParameterDescriptor>,
) -> Vec<ParameterDescriptor> {
    let mut merged = shared;
    for param in own {
        match merged
            .iter_mut()
            .find(|p| p.name == param.name && p.location == param.location)
        {
            Some(existing) => *existing = param,
            None => merged.push(param),
        }
    }
    merged
}
