use serde_json::{json, Value as JsonValue};

use super::*;
use crate::config::GenerationConfig;
use crate::diagnostics::{Issue, Severity};
use crate::parsers::{InputParser, OpenApiParser};
use crate::schema_processor::{ScalarKind, TypeGraph};

fn document(paths: JsonValue, schemas: JsonValue) -> Document {
    OpenApiParser
        .parse_value(json!({
            "openapi": "3.0.3",
            "info": {"title": "t", "version": "1"},
            "paths": paths,
            "components": {"schemas": schemas}
        }))
        .unwrap()
}

fn bind(document: &Document) -> (Vec<OperationBinding>, TypeGraph, Vec<Issue>) {
    let config = GenerationConfig::new("api");
    let mut ctx = GenerationContext::new(&config);
    let mut resolver = TypeResolver::new(document);
    resolver.resolve_components(&mut ctx);
    let bindings = bind_operations(document, &mut resolver, &mut ctx);
    let graph = resolver.finish(&mut ctx);
    (bindings, graph, ctx.diagnostics.into_issues(true))
}

fn pet_schemas() -> JsonValue {
    json!({
        "Pet": {
            "type": "object",
            "required": ["name"],
            "properties": {
                "id": {"type": "integer", "format": "int64"},
                "name": {"type": "string"}
            }
        },
        "Error": {
            "type": "object",
            "properties": {"message": {"type": "string"}}
        }
    })
}

#[test]
fn path_argument_and_optional_query_pointer() {
    let doc = document(
        json!({
            "/pets/{petId}": {
                "get": {
                    "operationId": "getPetById",
                    "parameters": [
                        {"name": "petId", "in": "path", "required": true,
                         "schema": {"type": "integer", "format": "int64"}},
                        {"name": "limit", "in": "query",
                         "schema": {"type": "integer"}}
                    ],
                    "responses": {
                        "200": {
                            "description": "ok",
                            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}}
                        }
                    }
                }
            }
        }),
        pet_schemas(),
    );
    let (bindings, graph, issues) = bind(&doc);
    assert!(issues.is_empty(), "{issues:?}");

    let op = &bindings[0];
    assert_eq!(op.method_name, "GetPetById");

    assert_eq!(op.path_params.len(), 1);
    let pet_id = &op.path_params[0];
    assert_eq!(pet_id.identifier, "petId");
    assert_eq!(pet_id.original_name, "petId");
    assert!(!pet_id.pointer);
    assert_eq!(
        graph.get(pet_id.ty).kind,
        TypeKind::Scalar { scalar: ScalarKind::Int64 }
    );

    let params = op.params.as_ref().unwrap();
    assert_eq!(params.identifier, "GetPetByIdParams");
    assert!(!params.has_required());
    let limit = &params.fields[0];
    assert_eq!(limit.identifier, "Limit");
    assert_eq!(limit.original_name, "limit");
    assert!(limit.pointer);

    assert_eq!(op.response.ty(), graph.by_schema("Pet"));
}

#[test]
fn required_query_parameter_is_a_value() {
    let doc = document(
        json!({
            "/search": {
                "get": {
                    "parameters": [
                        {"name": "q", "in": "query", "required": true, "schema": {"type": "string"}},
                        {"name": "tag", "in": "query",
                         "schema": {"type": "array", "items": {"type": "string"}}},
                        {"name": "X-Request-Id", "in": "header", "schema": {"type": "string"}}
                    ],
                    "responses": {"200": {"description": "ok"}}
                }
            }
        }),
        json!({}),
    );
    let (bindings, _, _) = bind(&doc);
    let params = bindings[0].params.as_ref().unwrap();
    assert!(params.has_required());

    let q = &params.fields[0];
    assert!(q.required);
    assert!(!q.pointer);

    let tag = &params.fields[1];
    assert!(tag.multi);
    assert!(!tag.pointer, "slices are nil when absent");

    let header = &params.fields[2];
    assert_eq!(header.location, ParameterLocation::Header);
    assert_eq!(header.identifier, "XRequestId");
    assert_eq!(header.original_name, "X-Request-Id");
}

#[test]
fn derived_method_names_and_collisions() {
    let doc = document(
        json!({
            "/pets/{petId}/toys": {
                "get": {
                    "parameters": [{"name": "petId", "in": "path", "required": true, "schema": {"type": "string"}}],
                    "responses": {"200": {"description": "ok"}}
                }
            },
            "/b": {"get": {"operationId": "list", "responses": {"200": {"description": "ok"}}}},
            "/a": {"get": {"operationId": "list", "responses": {"200": {"description": "ok"}}}}
        }),
        json!({}),
    );
    let (bindings, _, issues) = bind(&doc);

    let names: Vec<(&str, &str)> = bindings
        .iter()
        .map(|b| (b.path.as_str(), b.method_name.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("/a", "List"),
            ("/b", "List2"),
            ("/pets/{petId}/toys", "GetPetsByPetIdToys"),
        ]
    );
    assert!(issues
        .iter()
        .any(|i| i.kind == IssueKind::NamingCollisionResolved && i.message.contains("List2")));
}

#[test]
fn path_arguments_avoid_reserved_names() {
    let doc = document(
        json!({
            "/items/{body}/{type}": {
                "put": {
                    "parameters": [
                        {"name": "body", "in": "path", "required": true, "schema": {"type": "string"}},
                        {"name": "type", "in": "path", "required": true, "schema": {"type": "string"}}
                    ],
                    "responses": {"204": {"description": "done"}}
                }
            }
        }),
        json!({}),
    );
    let (bindings, _, _) = bind(&doc);
    let idents: Vec<&str> = bindings[0]
        .path_params
        .iter()
        .map(|p| p.identifier.as_str())
        .collect();
    assert_eq!(idents, vec!["body2", "type_"]);
    assert_eq!(bindings[0].response, ResponseBinding::Transport);
}

#[test]
fn undeclared_placeholder_and_unused_parameter() {
    let doc = document(
        json!({
            "/orgs/{org}/repos/{repo}": {
                "get": {
                    "operationId": "getRepo",
                    "parameters": [
                        {"name": "repo", "in": "path", "required": true, "schema": {"type": "integer"}},
                        {"name": "stray", "in": "path", "required": true, "schema": {"type": "string"}}
                    ],
                    "responses": {"200": {"description": "ok"}}
                }
            }
        }),
        json!({}),
    );
    let (bindings, graph, issues) = bind(&doc);

    let args: Vec<&str> = bindings[0]
        .path_params
        .iter()
        .map(|p| p.original_name.as_str())
        .collect();
    assert_eq!(args, vec!["org", "repo"]);
    assert_eq!(
        graph.get(bindings[0].path_params[0].ty).kind,
        TypeKind::Scalar { scalar: ScalarKind::String }
    );

    let warnings: Vec<&Issue> = issues
        .iter()
        .filter(|i| i.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().any(|i| i.message.contains("{org}")));
    assert!(warnings.iter().any(|i| i.message.contains("stray")));
}

#[test]
fn json_body_is_typed_other_bodies_are_raw() {
    let doc = document(
        json!({
            "/pets": {
                "post": {
                    "operationId": "createPet",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/xml": {"schema": {"$ref": "#/components/schemas/Pet"}},
                            "application/json; charset=utf-8": {"schema": {"$ref": "#/components/schemas/Pet"}}
                        }
                    },
                    "responses": {"201": {"description": "created"}}
                }
            },
            "/upload": {
                "post": {
                    "operationId": "upload",
                    "requestBody": {
                        "content": {"application/octet-stream": {"schema": {"type": "string", "format": "binary"}}}
                    },
                    "responses": {"200": {"description": "ok"}}
                }
            }
        }),
        pet_schemas(),
    );
    let (bindings, graph, _) = bind(&doc);

    let create = bindings.iter().find(|b| b.method_name == "CreatePet").unwrap();
    let body = create.body.as_ref().unwrap();
    assert_eq!(body.encoding, BodyEncoding::Json);
    assert_eq!(body.content_type, "application/json; charset=utf-8");
    assert_eq!(body.ty, graph.by_schema("Pet"));
    assert!(body.required);

    let upload = bindings.iter().find(|b| b.method_name == "Upload").unwrap();
    let body = upload.body.as_ref().unwrap();
    assert_eq!(body.encoding, BodyEncoding::Raw);
    assert_eq!(body.ty, None);
}

#[test]
fn inline_body_schema_is_named_after_the_method() {
    let doc = document(
        json!({
            "/login": {
                "post": {
                    "operationId": "login",
                    "requestBody": {
                        "content": {"application/json": {"schema": {
                            "type": "object",
                            "properties": {"user": {"type": "string"}}
                        }}}
                    },
                    "responses": {"200": {
                        "description": "ok",
                        "content": {"application/vnd.session+json": {"schema": {
                            "type": "object",
                            "properties": {"token": {"type": "string"}}
                        }}}
                    }}
                }
            }
        }),
        json!({}),
    );
    let (bindings, graph, _) = bind(&doc);
    let op = &bindings[0];

    let body_ty = op.body.as_ref().unwrap().ty.unwrap();
    assert_eq!(graph.get(body_ty).name.as_deref(), Some("LoginBody"));

    let ResponseBinding::Typed { ty, content_type, .. } = &op.response else {
        panic!("expected a typed response");
    };
    assert_eq!(content_type, "application/vnd.session+json");
    assert_eq!(graph.get(*ty).name.as_deref(), Some("LoginResponse"));
}

#[test]
fn response_selection_order() {
    let doc = document(
        json!({
            "/a": {"get": {"operationId": "lowestSuccess", "responses": {
                "201": {"description": "c", "content": {"application/json": {"schema": {"type": "string"}}}},
                "200": {"description": "o", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}}},
                "default": {"description": "e", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Error"}}}}
            }}},
            "/b": {"get": {"operationId": "defaultOnly", "responses": {
                "204": {"description": "none"},
                "default": {"description": "e", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Error"}}}}
            }}},
            "/c": {"get": {"operationId": "rangeOnly", "responses": {
                "2XX": {"description": "any", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}}}
            }}},
            "/d": {"get": {"operationId": "textOnly", "responses": {
                "200": {"description": "text", "content": {"text/plain": {"schema": {"type": "string"}}}}
            }}}
        }),
        pet_schemas(),
    );
    let (bindings, graph, _) = bind(&doc);
    let by_name = |name: &str| bindings.iter().find(|b| b.method_name == name).unwrap();

    let ResponseBinding::Typed { status, ty, from_default, .. } = &by_name("LowestSuccess").response
    else {
        panic!("expected typed");
    };
    assert_eq!(status, "200");
    assert_eq!(Some(*ty), graph.by_schema("Pet"));
    assert!(!from_default);

    let ResponseBinding::Typed { status, ty, from_default, .. } = &by_name("DefaultOnly").response
    else {
        panic!("expected typed");
    };
    assert_eq!(status, "default");
    assert_eq!(Some(*ty), graph.by_schema("Error"));
    assert!(from_default);

    let ResponseBinding::Typed { status, .. } = &by_name("RangeOnly").response else {
        panic!("expected typed");
    };
    assert_eq!(status, "2XX");

    assert_eq!(by_name("TextOnly").response, ResponseBinding::Transport);
}

#[test]
fn deprecated_and_docs_are_kept() {
    let doc = document(
        json!({
            "/old": {"get": {
                "operationId": "oldThing",
                "summary": "Old thing",
                "deprecated": true,
                "tags": ["legacy"],
                "security": [],
                "responses": {"200": {"description": "ok"}}
            }}
        }),
        json!({}),
    );
    let (bindings, _, _) = bind(&doc);
    let op = &bindings[0];
    assert!(op.deprecated);
    assert_eq!(op.summary.as_deref(), Some("Old thing"));
    assert_eq!(op.tags, vec!["legacy"]);
    assert_eq!(op.security, Some(vec![]));
}

#[test]
fn params_struct_name_avoids_schema_names() {
    let doc = document(
        json!({
            "/things": {"get": {
                "operationId": "list",
                "parameters": [{"name": "page", "in": "query", "schema": {"type": "integer"}}],
                "responses": {"200": {"description": "ok"}}
            }}
        }),
        json!({"ListParams": {"type": "object", "properties": {"x": {"type": "string"}}}}),
    );
    let (bindings, _, _) = bind(&doc);
    assert_eq!(bindings[0].params.as_ref().unwrap().identifier, "ListParams2");
}

#[test]
fn json_media_types() {
    assert!(is_json_media_type("application/json"));
    assert!(is_json_media_type("Application/JSON; charset=utf-8"));
    assert!(is_json_media_type("application/problem+json"));
    assert!(is_json_media_type("text/json"));
    assert!(!is_json_media_type("application/xml"));
    assert!(!is_json_media_type("multipart/form-data"));
}
