//! Operation binding: how each operation surfaces as a client/server method.
//!
//! Path parameters become positional arguments in template order, the other
//! parameters are gathered into one `<Method>Params` struct, a JSON request
//! body becomes a typed argument and exactly one response shape is chosen.
//! Operations are bound in `(path, method)` order so allocated names do not
//! depend on document order.

pub mod path;

use indexmap::IndexMap;

use crate::context::GenerationContext;
use crate::diagnostics::IssueKind;
use crate::naming::{to_pascal_case, IdentCase, Scope};
use crate::parsers::{
    Document, HttpMethod, OperationDescriptor, ParameterDescriptor, ParameterLocation,
    RequestBodyDescriptor, ResponseDescriptor, SchemaKind, SchemaNode, SecurityRequirement,
};
use crate::schema_processor::{TypeKind, TypeId, TypeResolver};

/// Names the generated method bodies declare themselves: receivers,
/// fixed arguments and locals. Path arguments never take these.
pub const RESERVED_ARGUMENTS: &[&str] = &[
    "c",
    "ctx",
    "params",
    "body",
    "contentType",
    "reqEditors",
    "req",
    "resp",
    "err",
    "target",
    "query",
    "out",
    "w",
    "r",
    "h",
    "buf",
    "item",
    "values",
    "raw",
    "si",
    "mux",
    "bytes",
    "context",
    "fmt",
    "http",
    "io",
    "json",
    "url",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBinding {
    pub location: ParameterLocation,
    /// Name on the wire, verbatim
    pub original_name: String,
    pub identifier: String,
    pub required: bool,
    pub ty: TypeId,
    /// Optional parameter carried behind a pointer
    pub pointer: bool,
    /// Slice-typed; sent as one value per occurrence
    pub multi: bool,
    pub description: Option<String>,
    pub deprecated: bool,
}

/// Query, header and cookie parameters of one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamsStruct {
    pub identifier: String,
    pub fields: Vec<ParameterBinding>,
}

impl ParamsStruct {
    pub fn has_required(&self) -> bool {
        self.fields.iter().any(|f| f.required)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    /// Typed argument, encoded as JSON
    Json,
    /// Caller-provided bytes sent as-is
    Raw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyBinding {
    pub content_type: String,
    pub encoding: BodyEncoding,
    /// Set for [`BodyEncoding::Json`] only
    pub ty: Option<TypeId>,
    pub required: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBinding {
    /// Body decoded into `ty`
    Typed {
        status: String,
        content_type: String,
        ty: TypeId,
        /// Chosen from the `default` response, so it may describe an error
        from_default: bool,
    },
    /// No usable schema; the caller gets the transport response
    Transport,
}

impl ResponseBinding {
    pub fn ty(&self) -> Option<TypeId> {
        match self {
            ResponseBinding::Typed { ty, .. } => Some(*ty),
            ResponseBinding::Transport => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationBinding {
    pub method_name: String,
    pub operation_id: Option<String>,
    pub http_method: HttpMethod,
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Positional arguments, in path-template order
    pub path_params: Vec<ParameterBinding>,
    pub params: Option<ParamsStruct>,
    pub body: Option<BodyBinding>,
    pub response: ResponseBinding,
    /// Operation-level requirements; `None` inherits the document default
    pub security: Option<Vec<SecurityRequirement>>,
    pub deprecated: bool,
    pub location: String,
}

/// Bind every operation of the document. Inline parameter, body and
/// response schemas are resolved into `resolver`'s graph.
pub fn bind_operations(
    document: &Document,
    resolver: &mut TypeResolver<'_>,
    ctx: &mut GenerationContext,
) -> Vec<OperationBinding> {
    let mut operations: Vec<&OperationDescriptor> = document.operations.iter().collect();
    operations.sort_by(|a, b| (&a.path, a.method).cmp(&(&b.path, b.method)));

    let bindings: Vec<OperationBinding> = operations
        .into_iter()
        .map(|op| bind_operation(op, resolver, ctx))
        .collect();

    tracing::info!(operations = bindings.len(), "bound operations");
    bindings
}

fn bind_operation(
    op: &OperationDescriptor,
    resolver: &mut TypeResolver<'_>,
    ctx: &mut GenerationContext,
) -> OperationBinding {
    let location = op.location();
    let method_name = allocate_method_name(op, ctx);

    let arg_scope = Scope::Params(method_name.clone());
    ctx.allocator.reserve(&arg_scope, RESERVED_ARGUMENTS);

    let path_params = bind_path_params(op, &method_name, &arg_scope, resolver, ctx, &location);
    let params = bind_params_struct(op, &method_name, resolver, ctx, &location);
    let body = op
        .request_body
        .as_ref()
        .and_then(|body| bind_body(body, &method_name, resolver, ctx, &location));
    let response = bind_response(op, &method_name, resolver, ctx, &location);

    tracing::debug!(
        method = %method_name,
        path = %op.path,
        http_method = op.method.as_str(),
        "bound operation"
    );

    OperationBinding {
        method_name,
        operation_id: op.operation_id.clone(),
        http_method: op.method,
        path: op.path.clone(),
        summary: op.summary.clone(),
        description: op.description.clone(),
        tags: op.tags.clone(),
        path_params,
        params,
        body,
        response,
        security: op.security.clone(),
        deprecated: op.deprecated,
        location,
    }
}

fn allocate_method_name(op: &OperationDescriptor, ctx: &mut GenerationContext) -> String {
    match op.operation_id.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(id) => ctx
            .allocator
            .allocate(&Scope::Methods, id, IdentCase::Pascal, &mut ctx.diagnostics),
        None => {
            let derived = path::derive_method_name(op.method, &op.path);
            let original = format!("{} {}", op.method.as_str(), op.path);
            ctx.allocator
                .allocate_normalized(&Scope::Methods, derived, &original, &mut ctx.diagnostics)
        }
    }
}

fn bind_path_params(
    op: &OperationDescriptor,
    method_name: &str,
    scope: &Scope,
    resolver: &mut TypeResolver<'_>,
    ctx: &mut GenerationContext,
    location: &str,
) -> Vec<ParameterBinding> {
    let placeholders = path::placeholders(&op.path);

    for param in op
        .parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Path)
    {
        if !placeholders.contains(&param.name) {
            ctx.diagnostics.warning(
                IssueKind::StructuralError,
                location,
                format!(
                    "path parameter '{}' does not appear in '{}'; ignored",
                    param.name, op.path
                ),
            );
        }
    }

    let mut bound = Vec::with_capacity(placeholders.len());
    for name in placeholders {
        let declared = op
            .parameters
            .iter()
            .find(|p| p.location == ParameterLocation::Path && p.name == name);

        let undeclared;
        let param = match declared {
            Some(param) => param,
            None => {
                ctx.diagnostics.warning(
                    IssueKind::StructuralError,
                    location,
                    format!("placeholder '{{{name}}}' has no declared parameter; bound as a string"),
                );
                undeclared = ParameterDescriptor {
                    name: name.clone(),
                    location: ParameterLocation::Path,
                    required: true,
                    schema: SchemaNode::new(SchemaKind::String),
                    description: None,
                    deprecated: false,
                };
                &undeclared
            }
        };

        let identifier =
            ctx.allocator
                .allocate(scope, &param.name, IdentCase::Camel, &mut ctx.diagnostics);
        let ty = resolver.resolve_schema(
            ctx,
            &param.schema,
            &format!("{method_name}{}", to_pascal_case(&param.name)),
            &format!("{location}/parameters/{}", param.name),
        );

        bound.push(ParameterBinding {
            location: ParameterLocation::Path,
            original_name: param.name.clone(),
            identifier,
            required: true,
            ty,
            pointer: false,
            multi: false,
            description: param.description.clone(),
            deprecated: param.deprecated,
        });
    }
    bound
}

fn bind_params_struct(
    op: &OperationDescriptor,
    method_name: &str,
    resolver: &mut TypeResolver<'_>,
    ctx: &mut GenerationContext,
    location: &str,
) -> Option<ParamsStruct> {
    let declared: Vec<&ParameterDescriptor> = op
        .parameters
        .iter()
        .filter(|p| p.location != ParameterLocation::Path)
        .collect();
    if declared.is_empty() {
        return None;
    }

    let identifier = ctx.allocator.allocate_normalized(
        &Scope::Package,
        format!("{method_name}Params"),
        &format!("parameters of {method_name}"),
        &mut ctx.diagnostics,
    );
    let scope = Scope::Fields(identifier.clone());

    let mut fields = Vec::with_capacity(declared.len());
    for param in declared {
        let field_ident =
            ctx.allocator
                .allocate(&scope, &param.name, IdentCase::Pascal, &mut ctx.diagnostics);
        let ty = resolver.resolve_schema(
            ctx,
            &param.schema,
            &format!("{method_name}{field_ident}"),
            &format!("{location}/parameters/{}", param.name),
        );
        let graph = resolver.graph();
        let multi = matches!(graph.get(graph.resolve_alias(ty)).kind, TypeKind::Slice { .. });

        fields.push(ParameterBinding {
            location: param.location,
            original_name: param.name.clone(),
            identifier: field_ident,
            required: param.required,
            ty,
            pointer: !param.required && !graph.is_nilable(ty),
            multi,
            description: param.description.clone(),
            deprecated: param.deprecated,
        });
    }

    Some(ParamsStruct { identifier, fields })
}

fn bind_body(
    body: &RequestBodyDescriptor,
    method_name: &str,
    resolver: &mut TypeResolver<'_>,
    ctx: &mut GenerationContext,
    location: &str,
) -> Option<BodyBinding> {
    let json = body
        .content
        .iter()
        .find(|(media, _)| is_json_media_type(media));

    let binding = match json {
        Some((media, schema)) => {
            let open = SchemaNode::default();
            let ty = resolver.resolve_schema(
                ctx,
                schema.as_ref().unwrap_or(&open),
                &format!("{method_name}Body"),
                &format!("{location}/requestBody"),
            );
            BodyBinding {
                content_type: media.clone(),
                encoding: BodyEncoding::Json,
                ty: Some(ty),
                required: body.required,
                description: body.description.clone(),
            }
        }
        None => {
            let (media, _) = body.content.first()?;
            BodyBinding {
                content_type: media.clone(),
                encoding: BodyEncoding::Raw,
                ty: None,
                required: body.required,
                description: body.description.clone(),
            }
        }
    };
    Some(binding)
}

fn bind_response(
    op: &OperationDescriptor,
    method_name: &str,
    resolver: &mut TypeResolver<'_>,
    ctx: &mut GenerationContext,
    location: &str,
) -> ResponseBinding {
    let Some(selected) = select_response(&op.responses) else {
        return ResponseBinding::Transport;
    };

    let ty = resolver.resolve_schema(
        ctx,
        selected.schema,
        &format!("{method_name}Response"),
        &format!("{location}/responses/{}", selected.status),
    );
    ResponseBinding::Typed {
        status: selected.status.to_string(),
        content_type: selected.content_type.to_string(),
        ty,
        from_default: selected.status == "default",
    }
}

struct SelectedResponse<'a> {
    status: &'a str,
    content_type: &'a str,
    schema: &'a SchemaNode,
}

/// First 2xx response with a JSON schema (explicit codes ascending, then
/// `2XX`), else `default` with a JSON schema.
fn select_response(responses: &IndexMap<String, ResponseDescriptor>) -> Option<SelectedResponse<'_>> {
    let mut success: Vec<(&String, &ResponseDescriptor)> = responses
        .iter()
        .filter(|(status, _)| is_success_status(status))
        .collect();
    success.sort_by_key(|(status, _)| match status.parse::<u16>() {
        Ok(code) => (0, code),
        Err(_) => (1, 0),
    });

    success
        .into_iter()
        .find_map(|(status, response)| with_json_schema(status, response))
        .or_else(|| {
            responses
                .get_key_value("default")
                .and_then(|(status, response)| with_json_schema(status, response))
        })
}

fn with_json_schema<'a>(status: &'a str, response: &'a ResponseDescriptor) -> Option<SelectedResponse<'a>> {
    json_content(response).map(|(content_type, schema)| SelectedResponse {
        status,
        content_type,
        schema,
    })
}

fn json_content(response: &ResponseDescriptor) -> Option<(&str, &SchemaNode)> {
    response.content.iter().find_map(|(media, schema)| {
        match schema {
            Some(schema) if is_json_media_type(media) => Some((media.as_str(), schema)),
            _ => None,
        }
    })
}

fn is_success_status(status: &str) -> bool {
    match status.parse::<u16>() {
        Ok(code) => (200..300).contains(&code),
        Err(_) => status.eq_ignore_ascii_case("2XX"),
    }
}

/// `application/json`, `*/*+json` and `*/json`, parameters ignored.
pub fn is_json_media_type(media: &str) -> bool {
    let essence = media
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json") || essence.ends_with("/json")
}

#[cfg(test)]
mod tests;
