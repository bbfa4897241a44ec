use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use super::document::{
    Dialect, Document, HttpMethod, Info, OperationDescriptor, ParameterDescriptor,
    ParameterLocation, RequestBodyDescriptor, ResponseDescriptor, SchemaKind, SchemaNode,
    SecurityRequirement,
};
use super::schema_reader::{ref_to_schema_name, SchemaReader};
use super::security::read_security_schemes;
use super::{merge_parameters, InputParser};
use crate::error::{Error, Result};

const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// Swagger 2.0 documents.
pub struct SwaggerParser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwaggerDoc {
    info: SwaggerInfo,
    host: Option<String>,
    base_path: Option<String>,
    #[serde(default)]
    schemes: Vec<String>,
    #[serde(default)]
    consumes: Vec<String>,
    #[serde(default)]
    produces: Vec<String>,
    #[serde(default)]
    paths: IndexMap<String, SwaggerPathItem>,
    #[serde(default)]
    definitions: IndexMap<String, JsonValue>,
    #[serde(default)]
    parameters: IndexMap<String, JsonValue>,
    #[serde(default)]
    responses: IndexMap<String, SwaggerResponse>,
    security: Option<Vec<SecurityRequirement>>,
}

#[derive(Debug, Deserialize)]
struct SwaggerInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    version: String,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SwaggerPathItem {
    get: Option<SwaggerOperation>,
    put: Option<SwaggerOperation>,
    post: Option<SwaggerOperation>,
    delete: Option<SwaggerOperation>,
    options: Option<SwaggerOperation>,
    head: Option<SwaggerOperation>,
    patch: Option<SwaggerOperation>,
    #[serde(default)]
    parameters: Vec<JsonValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwaggerOperation {
    operation_id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    consumes: Option<Vec<String>>,
    produces: Option<Vec<String>>,
    #[serde(default)]
    parameters: Vec<JsonValue>,
    #[serde(default)]
    responses: IndexMap<String, SwaggerResponse>,
    security: Option<Vec<SecurityRequirement>>,
    #[serde(default)]
    deprecated: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct SwaggerResponse {
    #[serde(rename = "$ref")]
    reference: Option<String>,
    description: Option<String>,
    schema: Option<JsonValue>,
}

impl InputParser for SwaggerParser {
    fn format_name(&self) -> &str {
        "swagger"
    }

    fn accepts(&self, raw: &JsonValue) -> bool {
        raw.get("swagger")
            .and_then(JsonValue::as_str)
            .is_some_and(|v| v.starts_with('2'))
    }

    fn parse_value(&self, raw: JsonValue) -> Result<Document> {
        let security_schemes = read_security_schemes(raw.get("securityDefinitions"));

        let doc: SwaggerDoc = serde_json::from_value(raw)
            .map_err(|e| Error::openapi(format!("invalid Swagger 2.0 document: {e}")))?;

        let extractor = Extractor {
            reader: SchemaReader::new(Dialect::Swagger2),
            doc: &doc,
        };

        let schemas: IndexMap<String, SchemaNode> = doc
            .definitions
            .iter()
            .map(|(name, schema)| (name.clone(), extractor.reader.read(schema)))
            .collect();

        let mut operations = Vec::new();
        for (path, item) in &doc.paths {
            extractor.operations_from_path(path, item, &mut operations);
        }

        tracing::debug!(
            schemas = schemas.len(),
            operations = operations.len(),
            "parsed Swagger 2.0 document"
        );

        Ok(Document {
            dialect: Dialect::Swagger2,
            info: Info {
                title: doc.info.title.clone(),
                version: doc.info.version.clone(),
                description: doc.info.description.clone(),
            },
            base_url: base_url(&doc),
            schemas,
            operations,
            security_schemes,
            security: doc.security.clone().unwrap_or_default(),
        })
    }
}

/// `scheme://host/basePath`, preferring https when several schemes are listed.
fn base_url(doc: &SwaggerDoc) -> Option<String> {
    let host = doc.host.as_deref()?;
    let scheme = if doc.schemes.is_empty() || doc.schemes.iter().any(|s| s == "https") {
        "https"
    } else {
        doc.schemes[0].as_str()
    };
    let base_path = doc.base_path.as_deref().unwrap_or("");
    Some(format!("{scheme}://{host}{base_path}"))
}

struct Extractor<'a> {
    reader: SchemaReader,
    doc: &'a SwaggerDoc,
}

/// Parameters split by how they travel: plain, body, and form fields.
#[derive(Default)]
struct SplitParameters {
    plain: Vec<ParameterDescriptor>,
    body: Option<(SchemaNode, bool, Option<String>)>,
    form: Vec<(String, JsonValue, bool)>,
}

impl Extractor<'_> {
    fn operations_from_path(
        &self,
        path: &str,
        item: &SwaggerPathItem,
        operations: &mut Vec<OperationDescriptor>,
    ) {
        let ops = [
            (&item.get, HttpMethod::Get),
            (&item.put, HttpMethod::Put),
            (&item.post, HttpMethod::Post),
            (&item.delete, HttpMethod::Delete),
            (&item.options, HttpMethod::Options),
            (&item.head, HttpMethod::Head),
            (&item.patch, HttpMethod::Patch),
        ];

        for (op_option, method) in ops {
            if let Some(operation) = op_option {
                // Operation-level parameters override path-level ones
                let mut raw_params = item.parameters.clone();
                raw_params.extend(operation.parameters.iter().cloned());
                operations.push(self.operation(path, method, operation, &raw_params));
            }
        }
    }

    fn operation(
        &self,
        path: &str,
        method: HttpMethod,
        operation: &SwaggerOperation,
        raw_params: &[JsonValue],
    ) -> OperationDescriptor {
        let split = self.split_parameters(raw_params);

        let consumes = operation
            .consumes
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.doc.consumes.clone());
        let produces = operation
            .produces
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.doc.produces.clone());

        let request_body = if let Some((schema, required, description)) = split.body {
            let media_types = non_empty_or_default(&consumes, DEFAULT_MEDIA_TYPE);
            Some(RequestBodyDescriptor {
                required,
                description,
                content: media_types
                    .into_iter()
                    .map(|m| (m, Some(schema.clone())))
                    .collect(),
            })
        } else if !split.form.is_empty() {
            Some(self.form_body(&split.form, &consumes))
        } else {
            None
        };

        let mut responses = IndexMap::new();
        for (status, response) in &operation.responses {
            let Some(response) = self.resolve_response(response) else {
                tracing::warn!(path = %path, status = %status, "skipping unresolvable response");
                continue;
            };
            let content = match &response.schema {
                Some(schema) => {
                    let node = self.reader.read(schema);
                    non_empty_or_default(&produces, DEFAULT_MEDIA_TYPE)
                        .into_iter()
                        .map(|m| (m, Some(node.clone())))
                        .collect()
                }
                None => IndexMap::new(),
            };
            responses.insert(
                status.clone(),
                ResponseDescriptor {
                    description: response.description.clone().filter(|d| !d.is_empty()),
                    content,
                },
            );
        }

        OperationDescriptor {
            operation_id: operation.operation_id.clone(),
            path: path.to_string(),
            method,
            summary: operation.summary.clone(),
            description: operation.description.clone(),
            tags: operation.tags.clone(),
            parameters: split.plain,
            request_body,
            responses,
            security: operation.security.clone(),
            deprecated: operation.deprecated,
        }
    }

    fn split_parameters(&self, raw_params: &[JsonValue]) -> SplitParameters {
        let mut split = SplitParameters::default();
        let mut plain = Vec::new();

        for raw in raw_params {
            let Some(param) = self.resolve_parameter(raw) else {
                tracing::warn!("skipping unresolvable parameter reference");
                continue;
            };
            let Some(name) = param.get("name").and_then(JsonValue::as_str) else {
                continue;
            };
            let required = param.get("required").and_then(JsonValue::as_bool).unwrap_or(false);
            let description = param
                .get("description")
                .and_then(JsonValue::as_str)
                .map(str::to_string);

            let location = match param.get("in").and_then(JsonValue::as_str) {
                Some("path") => ParameterLocation::Path,
                Some("query") => ParameterLocation::Query,
                Some("header") => ParameterLocation::Header,
                Some("body") => {
                    let schema = param
                        .get("schema")
                        .map(|s| self.reader.read(s))
                        .unwrap_or_default();
                    split.body = Some((schema, required, description));
                    continue;
                }
                Some("formData") => {
                    split
                        .form
                        .push((name.to_string(), JsonValue::Object(param.clone()), required));
                    continue;
                }
                other => {
                    tracing::warn!(parameter = %name, "unsupported parameter location {other:?}");
                    continue;
                }
            };

            // Non-body parameters carry their schema keywords inline
            plain.push(ParameterDescriptor {
                name: name.to_string(),
                location,
                required: required || location == ParameterLocation::Path,
                schema: self.reader.read(&JsonValue::Object(param.clone())),
                description,
                deprecated: false,
            });
        }

        split.plain = merge_parameters(Vec::new(), plain);
        split
    }

    /// Build an object schema out of `formData` parameters.
    fn form_body(&self, form: &[(String, JsonValue, bool)], consumes: &[String]) -> RequestBodyDescriptor {
        let has_file = form
            .iter()
            .any(|(_, p, _)| p.get("type").and_then(JsonValue::as_str) == Some("file"));
        let media_type = if has_file || consumes.iter().any(|c| c == "multipart/form-data") {
            "multipart/form-data"
        } else {
            "application/x-www-form-urlencoded"
        };

        let mut properties = IndexMap::new();
        let mut required = Vec::new();
        for (name, param, is_required) in form {
            properties.insert(name.clone(), self.reader.read(param));
            if *is_required {
                required.push(name.clone());
            }
        }

        let schema = SchemaNode::new(SchemaKind::Object {
            properties,
            required: required.clone(),
            additional: Default::default(),
        });

        RequestBodyDescriptor {
            required: !required.is_empty(),
            description: None,
            content: IndexMap::from([(media_type.to_string(), Some(schema))]),
        }
    }

    fn resolve_parameter<'b>(&'b self, raw: &'b JsonValue) -> Option<&'b Map<String, JsonValue>> {
        match raw.get("$ref").and_then(JsonValue::as_str) {
            Some(reference) => self
                .doc
                .parameters
                .get(&ref_to_schema_name(reference))?
                .as_object(),
            None => raw.as_object(),
        }
    }

    fn resolve_response<'b>(&'b self, response: &'b SwaggerResponse) -> Option<&'b SwaggerResponse> {
        match &response.reference {
            Some(reference) => self.doc.responses.get(&ref_to_schema_name(reference)),
            None => Some(response),
        }
    }
}

fn non_empty_or_default(media_types: &[String], default: &str) -> Vec<String> {
    if media_types.is_empty() {
        vec![default.to_string()]
    } else {
        media_types.to_vec()
    }
}
