use indexmap::IndexMap;
use openapiv3::{
    Components, OpenAPI, Operation, Parameter, ParameterSchemaOrContent, PathItem, ReferenceOr,
    RequestBody, Response, Schema, StatusCode,
};
use serde_json::{Map, Value as JsonValue};

use super::document::{
    Dialect, Document, HttpMethod, Info, OperationDescriptor, ParameterDescriptor,
    ParameterLocation, RequestBodyDescriptor, ResponseDescriptor, SchemaNode,
};
use super::schema_reader::{ref_to_schema_name, SchemaReader};
use super::security::read_security_schemes;
use super::{merge_parameters, InputParser};
use crate::error::{Error, Result};

/// OpenAPI 3.0 / 3.1 documents, deserialized through `openapiv3`.
pub struct OpenApiParser;

impl InputParser for OpenApiParser {
    fn format_name(&self) -> &str {
        "openapi"
    }

    fn accepts(&self, raw: &JsonValue) -> bool {
        raw.get("openapi")
            .and_then(JsonValue::as_str)
            .is_some_and(|v| v.starts_with("3."))
    }

    fn parse_value(&self, mut raw: JsonValue) -> Result<Document> {
        let version = raw
            .get("openapi")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::openapi("missing 'openapi' version field"))?
            .to_string();
        let dialect = if version.starts_with("3.1") {
            normalize_31(&mut raw);
            Dialect::OpenApi31
        } else {
            Dialect::OpenApi30
        };

        // Component schemas and security schemes are read from the raw tree so
        // both dialects share one reader and no keyword is lost in between
        let security_schemes = read_security_schemes(raw.pointer("/components/securitySchemes"));
        let reader = SchemaReader::new(dialect);
        let schemas: IndexMap<String, SchemaNode> = raw
            .pointer("/components/schemas")
            .and_then(JsonValue::as_object)
            .map(|m| {
                m.iter()
                    .map(|(name, schema)| (name.clone(), reader.read(schema)))
                    .collect()
            })
            .unwrap_or_default();

        let openapi: OpenAPI = serde_json::from_value(raw)
            .map_err(|e| Error::openapi(format!("invalid OpenAPI {version} document: {e}")))?;

        let extractor = Extractor {
            reader,
            components: openapi.components.as_ref(),
        };

        let operations = extractor.operations(&openapi)?;

        tracing::debug!(
            schemas = schemas.len(),
            operations = operations.len(),
            "parsed OpenAPI {version} document"
        );

        Ok(Document {
            dialect,
            info: Info {
                title: openapi.info.title.clone(),
                version: openapi.info.version.clone(),
                description: openapi.info.description.clone(),
            },
            base_url: openapi.servers.first().map(|s| s.url.clone()),
            schemas,
            operations,
            security_schemes,
            security: openapi.security.clone().unwrap_or_default(),
        })
    }
}

/// Rewrite the 3.1 constructs `openapiv3` cannot read into their 3.0 spelling.
///
/// - `type: [T, "null"]` becomes `type: T` plus `nullable: true`
/// - numeric `exclusiveMinimum`/`exclusiveMaximum` become a bound plus a flag
/// - `const: v` becomes `enum: [v]`
/// - a missing `paths` object is inserted (webhook-only documents)
pub fn normalize_31(raw: &mut JsonValue) {
    if let Some(root) = raw.as_object_mut() {
        root.entry("paths")
            .or_insert_with(|| JsonValue::Object(Map::new()));
    }
    normalize_node(raw);
}

fn normalize_node(value: &mut JsonValue) {
    match value {
        JsonValue::Object(obj) => {
            normalize_schema_keywords(obj);
            for child in obj.values_mut() {
                normalize_node(child);
            }
        }
        JsonValue::Array(items) => items.iter_mut().for_each(normalize_node),
        _ => {}
    }
}

fn normalize_schema_keywords(obj: &mut Map<String, JsonValue>) {
    if let Some(JsonValue::Array(types)) = obj.get("type").cloned() {
        if types.iter().all(JsonValue::is_string) {
            let mut non_null: Vec<JsonValue> =
                types.iter().filter(|t| t.as_str() != Some("null")).cloned().collect();
            let had_null = non_null.len() != types.len();
            match non_null.len() {
                0 => {
                    obj.remove("type");
                }
                1 => {
                    obj.insert("type".to_string(), non_null.remove(0));
                }
                _ => {
                    // Several concrete types: spell as oneOf of single-typed schemas
                    obj.remove("type");
                    let variants = non_null
                        .into_iter()
                        .map(|t| {
                            let mut variant = Map::new();
                            variant.insert("type".to_string(), t);
                            JsonValue::Object(variant)
                        })
                        .collect();
                    obj.entry("oneOf").or_insert(JsonValue::Array(variants));
                }
            }
            if had_null {
                obj.insert("nullable".to_string(), JsonValue::Bool(true));
            }
        }
    }

    for (bound, exclusive) in [("minimum", "exclusiveMinimum"), ("maximum", "exclusiveMaximum")] {
        if let Some(n @ JsonValue::Number(_)) = obj.get(exclusive).cloned() {
            obj.insert(bound.to_string(), n);
            obj.insert(exclusive.to_string(), JsonValue::Bool(true));
        }
    }

    if let Some(constant) = obj.remove("const") {
        obj.entry("enum")
            .or_insert_with(|| JsonValue::Array(vec![constant]));
    }
}

struct Extractor<'a> {
    reader: SchemaReader,
    components: Option<&'a Components>,
}

impl Extractor<'_> {
    fn schema(&self, schema: &ReferenceOr<Schema>) -> Result<SchemaNode> {
        match schema {
            ReferenceOr::Reference { reference } => {
                Ok(SchemaNode::reference(ref_to_schema_name(reference)))
            }
            ReferenceOr::Item(item) => Ok(self.reader.read(&serde_json::to_value(item)?)),
        }
    }

    fn operations(&self, openapi: &OpenAPI) -> Result<Vec<OperationDescriptor>> {
        let mut operations = Vec::new();

        for (path, path_item_ref) in &openapi.paths.paths {
            let ReferenceOr::Item(path_item) = path_item_ref else {
                tracing::warn!(path = %path, "skipping $ref path item");
                continue;
            };
            self.operations_from_path(path, path_item, &mut operations)?;
        }

        Ok(operations)
    }

    fn operations_from_path(
        &self,
        path: &str,
        path_item: &PathItem,
        operations: &mut Vec<OperationDescriptor>,
    ) -> Result<()> {
        let ops = [
            (&path_item.get, HttpMethod::Get),
            (&path_item.put, HttpMethod::Put),
            (&path_item.post, HttpMethod::Post),
            (&path_item.delete, HttpMethod::Delete),
            (&path_item.options, HttpMethod::Options),
            (&path_item.head, HttpMethod::Head),
            (&path_item.patch, HttpMethod::Patch),
            (&path_item.trace, HttpMethod::Trace),
        ];

        let shared = self.parameters(&path_item.parameters)?;

        for (op_option, method) in ops {
            if let Some(operation) = op_option {
                let own = self.parameters(&operation.parameters)?;
                let parameters = merge_parameters(shared.clone(), own);
                operations.push(self.operation(path, method, operation, parameters)?);
            }
        }

        Ok(())
    }

    fn operation(
        &self,
        path: &str,
        method: HttpMethod,
        operation: &Operation,
        parameters: Vec<ParameterDescriptor>,
    ) -> Result<OperationDescriptor> {
        let request_body = match &operation.request_body {
            Some(body) => self.request_body(body)?,
            None => None,
        };

        let mut responses = IndexMap::new();
        for (status, response) in &operation.responses.responses {
            let code = match status {
                StatusCode::Code(n) => n.to_string(),
                StatusCode::Range(n) => format!("{n}XX"),
            };
            if let Some(descriptor) = self.response(response)? {
                responses.insert(code, descriptor);
            }
        }
        if let Some(default) = &operation.responses.default {
            if let Some(descriptor) = self.response(default)? {
                responses.insert("default".to_string(), descriptor);
            }
        }

        Ok(OperationDescriptor {
            operation_id: operation.operation_id.clone(),
            path: path.to_string(),
            method,
            summary: operation.summary.clone(),
            description: operation.description.clone(),
            tags: operation.tags.clone(),
            parameters,
            request_body,
            responses,
            security: operation.security.clone(),
            deprecated: operation.deprecated,
        })
    }

    fn parameters(&self, params: &[ReferenceOr<Parameter>]) -> Result<Vec<ParameterDescriptor>> {
        let mut out = Vec::new();
        for param_ref in params {
            let Some(param) = self.resolve(param_ref, |c| &c.parameters) else {
                tracing::warn!("skipping unresolvable parameter reference");
                continue;
            };

            let location = match param {
                Parameter::Query { .. } => ParameterLocation::Query,
                Parameter::Header { .. } => ParameterLocation::Header,
                Parameter::Path { .. } => ParameterLocation::Path,
                Parameter::Cookie { .. } => ParameterLocation::Cookie,
            };
            let data = param.parameter_data_ref();

            let schema = match &data.format {
                ParameterSchemaOrContent::Schema(schema) => self.schema(schema)?,
                ParameterSchemaOrContent::Content(content) => match content
                    .values()
                    .next()
                    .and_then(|media| media.schema.as_ref())
                {
                    Some(schema) => self.schema(schema)?,
                    None => SchemaNode::default(),
                },
            };

            out.push(ParameterDescriptor {
                name: data.name.clone(),
                location,
                // Path parameters are always required
                required: data.required || location == ParameterLocation::Path,
                schema,
                description: data.description.clone(),
                deprecated: data.deprecated.unwrap_or(false),
            });
        }
        Ok(out)
    }

    fn request_body(
        &self,
        body_ref: &ReferenceOr<RequestBody>,
    ) -> Result<Option<RequestBodyDescriptor>> {
        let Some(body) = self.resolve(body_ref, |c| &c.request_bodies) else {
            tracing::warn!("skipping unresolvable request body reference");
            return Ok(None);
        };

        let mut content = IndexMap::new();
        for (media_type, media) in &body.content {
            let schema = match &media.schema {
                Some(schema) => Some(self.schema(schema)?),
                None => None,
            };
            content.insert(media_type.clone(), schema);
        }

        Ok(Some(RequestBodyDescriptor {
            required: body.required,
            description: body.description.clone(),
            content,
        }))
    }

    fn response(&self, response_ref: &ReferenceOr<Response>) -> Result<Option<ResponseDescriptor>> {
        let Some(response) = self.resolve(response_ref, |c| &c.responses) else {
            tracing::warn!("skipping unresolvable response reference");
            return Ok(None);
        };

        let mut content = IndexMap::new();
        for (media_type, media) in &response.content {
            let schema = match &media.schema {
                Some(schema) => Some(self.schema(schema)?),
                None => None,
            };
            content.insert(media_type.clone(), schema);
        }

        Ok(Some(ResponseDescriptor {
            description: Some(response.description.clone()).filter(|d| !d.is_empty()),
            content,
        }))
    }

    /// Follow `#/components/<section>/<name>` references, at most a few hops.
    fn resolve<'b, T>(
        &'b self,
        item: &'b ReferenceOr<T>,
        section: fn(&Components) -> &IndexMap<String, ReferenceOr<T>>,
    ) -> Option<&'b T> {
        let mut current = item;
        for _ in 0..8 {
            match current {
                ReferenceOr::Item(value) => return Some(value),
                ReferenceOr::Reference { reference } => {
                    let components = self.components?;
                    current = section(components).get(&ref_to_schema_name(reference))?;
                }
            }
        }
        None
    }
}
