use serde_json::{json, Value as JsonValue};

use super::*;
use crate::config::GenerationConfig;
use crate::diagnostics::Severity;
use crate::parsers::{InputParser, OpenApiParser, SwaggerParser};

fn oas3(schemas: JsonValue) -> Document {
    OpenApiParser
        .parse_value(json!({
            "openapi": "3.0.3",
            "info": {"title": "t", "version": "1"},
            "paths": {},
            "components": {"schemas": schemas}
        }))
        .unwrap()
}

fn resolve_with(document: &Document, config: &GenerationConfig) -> (TypeGraph, Vec<crate::diagnostics::Issue>) {
    let mut ctx = GenerationContext::new(config);
    let graph = resolve_types(document, &mut ctx);
    (graph, ctx.diagnostics.into_issues(true))
}

fn resolve(document: &Document) -> (TypeGraph, Vec<crate::diagnostics::Issue>) {
    resolve_with(document, &GenerationConfig::new("api"))
}

fn struct_of<'g>(graph: &'g TypeGraph, schema: &str) -> &'g StructType {
    let id = graph.by_schema(schema).unwrap();
    graph.struct_type(id).unwrap()
}

#[test]
fn pet_struct_fields() {
    let doc = oas3(json!({
        "Pet": {
            "type": "object",
            "required": ["name"],
            "properties": {
                "id": {"type": "integer", "format": "int64"},
                "name": {"type": "string"}
            }
        }
    }));
    let (graph, issues) = resolve(&doc);
    assert!(issues.is_empty());

    let pet = struct_of(&graph, "Pet");
    assert_eq!(pet.fields.len(), 2);

    let id = &pet.fields[0];
    assert_eq!(id.identifier, "Id");
    assert_eq!(id.wire_name, "id");
    assert_eq!(
        graph.get(id.ty).kind,
        TypeKind::Scalar { scalar: ScalarKind::Int64 }
    );
    assert!(graph.field_is_pointer(id, true));

    let name = &pet.fields[1];
    assert!(name.required);
    assert!(!graph.field_is_pointer(name, true));
}

#[test]
fn string_enum_constants() {
    let doc = oas3(json!({
        "Status": {"type": "string", "enum": ["available", "pending", "sold"]}
    }));
    let (graph, _) = resolve(&doc);
    let node = graph.get(graph.by_schema("Status").unwrap());
    let TypeKind::Enum(e) = &node.kind else {
        panic!("expected enum");
    };
    let idents: Vec<&str> = e.variants.iter().map(|v| v.identifier.as_str()).collect();
    assert_eq!(idents, vec!["StatusAvailable", "StatusPending", "StatusSold"]);
    assert_eq!(e.base, ScalarKind::String);
}

#[test]
fn enum_values_outside_the_base_type_are_dropped() {
    let doc = SwaggerParser
        .parse_value(json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": "1"},
            "paths": {},
            "definitions": {
                "Code": {"type": "string", "enum": ["a", 1, null, "b"]},
                "Size": {"type": "integer", "enum": [1, 2.5, "3"]}
            }
        }))
        .unwrap();
    let (graph, issues) = resolve(&doc);

    let values = |schema: &str| -> Vec<JsonValue> {
        let TypeKind::Enum(e) = &graph.get(graph.by_schema(schema).unwrap()).kind else {
            panic!("expected enum");
        };
        e.variants.iter().map(|v| v.value.clone()).collect()
    };
    assert_eq!(values("Code"), vec![json!("a"), json!("b")]);
    assert_eq!(values("Size"), vec![json!(1)]);
    assert_eq!(
        issues
            .iter()
            .filter(|i| i.kind == IssueKind::StructuralError && i.message.contains("dropped"))
            .count(),
        3
    );
}

#[test]
fn colliding_property_names_keep_wire_names() {
    let doc = oas3(json!({
        "Thing": {
            "type": "object",
            "properties": {
                "@id": {"type": "string"},
                "id": {"type": "string"}
            }
        }
    }));
    let (graph, issues) = resolve(&doc);
    let thing = struct_of(&graph, "Thing");

    let pairs: Vec<(&str, &str)> = thing
        .fields
        .iter()
        .map(|f| (f.identifier.as_str(), f.wire_name.as_str()))
        .collect();
    assert_eq!(pairs, vec![("Id", "@id"), ("Id2", "id")]);
    assert_eq!(
        issues
            .iter()
            .filter(|i| i.kind == IssueKind::NamingCollisionResolved)
            .count(),
        1
    );
}

#[test]
fn all_of_collects_every_member_field() {
    let doc = oas3(json!({
        "A": {"type": "object", "properties": {"x": {"type": "string"}}},
        "B": {"type": "object", "properties": {"y": {"type": "string"}}},
        "C": {
            "allOf": [
                {"$ref": "#/components/schemas/A"},
                {"$ref": "#/components/schemas/B"},
                {"type": "object", "properties": {"z": {"type": "string"}}}
            ]
        }
    }));
    let (graph, _) = resolve(&doc);
    let c = graph.by_schema("C").unwrap();

    let mut wires: Vec<&str> = graph
        .flattened_fields(c)
        .iter()
        .map(|f| f.wire_name.as_str())
        .collect();
    wires.sort();
    assert_eq!(wires, vec!["x", "y", "z"]);

    // Disjoint members are embedded
    let own = struct_of(&graph, "C");
    assert_eq!(own.fields.iter().filter(|f| f.embedded).count(), 2);
}

#[test]
fn all_of_flattens_on_wire_collision() {
    let doc = oas3(json!({
        "A": {"type": "object", "properties": {"id": {"type": "string"}}},
        "B": {"type": "object", "properties": {"id": {"type": "integer"}, "y": {"type": "string"}}},
        "C": {"allOf": [{"$ref": "#/components/schemas/A"}, {"$ref": "#/components/schemas/B"}]}
    }));
    let (graph, issues) = resolve(&doc);
    let c = struct_of(&graph, "C");

    assert!(c.fields.iter().all(|f| !f.embedded));
    let wires: Vec<&str> = c.fields.iter().map(|f| f.wire_name.as_str()).collect();
    assert_eq!(wires, vec!["id", "y"]);
    // First definition wins
    assert_eq!(
        graph.get(c.fields[0].ty).kind,
        TypeKind::Scalar { scalar: ScalarKind::String }
    );
    assert!(issues
        .iter()
        .any(|i| i.severity == Severity::Info && i.message.contains("'id'")));
}

#[test]
fn all_of_required_list_tightens_member_fields() {
    let doc = oas3(json!({
        "Base": {"type": "object", "properties": {"name": {"type": "string"}}},
        "Named": {
            "allOf": [{"$ref": "#/components/schemas/Base"}],
            "required": ["name"]
        }
    }));
    let (graph, _) = resolve(&doc);
    let named = struct_of(&graph, "Named");
    assert_eq!(named.fields.len(), 1);
    assert!(!named.fields[0].embedded);
    assert!(named.fields[0].required);
}

#[test]
fn recursive_children_terminate() {
    let doc = oas3(json!({
        "Node": {
            "type": "object",
            "properties": {
                "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
            }
        }
    }));
    let (graph, issues) = resolve(&doc);
    assert!(issues.is_empty());

    let node = graph.by_schema("Node").unwrap();
    let field = &struct_of(&graph, "Node").fields[0];
    assert_eq!(graph.get(field.ty).kind, TypeKind::Slice { item: node });
    assert!(!field.indirect);
}

#[test]
fn required_self_reference_is_indirect() {
    let doc = oas3(json!({
        "Link": {
            "type": "object",
            "required": ["next"],
            "properties": {"next": {"$ref": "#/components/schemas/Link"}}
        }
    }));
    let (graph, _) = resolve(&doc);
    let field = &struct_of(&graph, "Link").fields[0];
    assert!(field.required);
    assert!(field.indirect);
    assert!(graph.field_is_pointer(field, true));
}

#[test]
fn self_reference_through_all_of_is_indirect() {
    let doc = oas3(json!({
        "Tree": {
            "allOf": [
                {"$ref": "#/components/schemas/Tree"},
                {"type": "object", "properties": {"label": {"type": "string"}}}
            ]
        }
    }));
    let (graph, _) = resolve(&doc);
    let tree = struct_of(&graph, "Tree");
    let embed = tree.fields.iter().find(|f| f.embedded).unwrap();
    assert!(embed.indirect);
}

#[test]
fn dangling_ref_is_critical_and_open() {
    let doc = oas3(json!({
        "Holder": {
            "type": "object",
            "properties": {"thing": {"$ref": "#/components/schemas/Missing"}}
        }
    }));
    let (graph, issues) = resolve(&doc);

    let critical: Vec<_> = issues
        .iter()
        .filter(|i| i.severity == Severity::Critical)
        .collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].kind, IssueKind::StructuralError);
    assert!(critical[0].location.ends_with("/properties/thing"));

    let field = &struct_of(&graph, "Holder").fields[0];
    assert_eq!(
        graph.get(field.ty).kind,
        TypeKind::Scalar { scalar: ScalarKind::Any }
    );
}

#[test]
fn discriminated_union_dispatch() {
    let doc = oas3(json!({
        "Cat": {"type": "object", "properties": {"kind": {"type": "string"}, "meows": {"type": "boolean"}}},
        "Dog": {"type": "object", "properties": {"kind": {"type": "string"}, "barks": {"type": "boolean"}}},
        "Lizard": {"type": "object", "properties": {"kind": {"type": "string"}}},
        "Pet": {
            "oneOf": [
                {"$ref": "#/components/schemas/Cat"},
                {"$ref": "#/components/schemas/Dog"},
                {"$ref": "#/components/schemas/Lizard"}
            ],
            "discriminator": {
                "propertyName": "kind",
                "mapping": {"cat": "#/components/schemas/Cat", "dog": "#/components/schemas/Dog"}
            }
        }
    }));
    let (graph, _) = resolve(&doc);
    let pet = graph.get(graph.by_schema("Pet").unwrap());
    let TypeKind::Union(union) = &pet.kind else {
        panic!("expected union");
    };
    let table = union.discriminator.as_ref().unwrap();
    assert_eq!(table.values().collect::<Vec<_>>(), vec!["cat", "dog", "Lizard"]);

    let cat = graph.by_schema("Cat").unwrap();
    let dog = graph.by_schema("Dog").unwrap();
    let lizard = graph.by_schema("Lizard").unwrap();
    assert_eq!(table.dispatch(&json!({"kind": "cat"})), Ok(cat));
    assert_eq!(table.dispatch(&json!({"kind": "dog"})), Ok(dog));
    assert_eq!(table.dispatch(&json!({"kind": "Lizard"})), Ok(lizard));
    // Explicit mapping replaces the implicit name
    assert!(matches!(
        table.dispatch(&json!({"kind": "Cat"})),
        Err(DecodeError::UnknownDiscriminator(_))
    ));
    assert!(matches!(
        table.dispatch(&json!({})),
        Err(DecodeError::MissingDiscriminator(_))
    ));
}

#[test]
fn inline_union_variant_without_mapping_warns() {
    let doc = oas3(json!({
        "Shape": {
            "oneOf": [
                {"type": "object", "properties": {"radius": {"type": "number"}}}
            ],
            "discriminator": {"propertyName": "type"}
        }
    }));
    let (graph, issues) = resolve(&doc);
    assert!(graph.by_name("ShapeVariant1").is_some());
    assert!(issues
        .iter()
        .any(|i| i.severity == Severity::Warning && i.kind == IssueKind::UnsupportedFeature));
}

#[test]
fn additional_properties_shapes() {
    let doc = oas3(json!({
        "Labels": {"type": "object", "additionalProperties": {"type": "string"}},
        "Open": {"type": "object", "additionalProperties": true},
        "Extensible": {
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "additionalProperties": {"type": "integer"}
        },
        "Closed": {
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "additionalProperties": false
        }
    }));
    let (graph, _) = resolve(&doc);

    let labels = graph.resolve_alias(graph.by_schema("Labels").unwrap());
    let TypeKind::Map { value } = graph.get(labels).kind else {
        panic!("expected map");
    };
    assert_eq!(graph.get(value).kind, TypeKind::Scalar { scalar: ScalarKind::String });

    let open = graph.resolve_alias(graph.by_schema("Open").unwrap());
    let TypeKind::Map { value } = graph.get(open).kind else {
        panic!("expected map");
    };
    assert_eq!(graph.get(value).kind, TypeKind::Scalar { scalar: ScalarKind::Any });

    let extensible = struct_of(&graph, "Extensible");
    let catch_all = extensible.additional.unwrap();
    assert_eq!(graph.get(catch_all).kind, TypeKind::Scalar { scalar: ScalarKind::Int });

    assert!(struct_of(&graph, "Closed").additional.is_none());
}

#[test]
fn catch_all_name_is_reserved() {
    let doc = oas3(json!({
        "Odd": {
            "type": "object",
            "properties": {"additionalProperties": {"type": "string"}},
            "additionalProperties": true
        }
    }));
    let (graph, _) = resolve(&doc);
    let odd = struct_of(&graph, "Odd");
    assert_eq!(odd.fields[0].identifier, "AdditionalProperties2");
    assert_eq!(odd.fields[0].wire_name, "additionalProperties");
}

#[test]
fn catch_all_methods_are_reserved() {
    let doc = oas3(json!({
        "Bag": {
            "type": "object",
            "properties": {
                "get": {"type": "string"},
                "set": {"type": "string"},
                "marshalJSON": {"type": "string"},
                "count": {"type": "integer"}
            },
            "additionalProperties": true
        },
        "Plain": {
            "type": "object",
            "properties": {"get": {"type": "string"}}
        }
    }));
    let (graph, _) = resolve(&doc);

    let idents: Vec<&str> = struct_of(&graph, "Bag")
        .fields
        .iter()
        .map(|f| f.identifier.as_str())
        .collect();
    assert_eq!(idents, vec!["Get2", "Set2", "MarshalJSON2", "Count"]);
    assert_eq!(struct_of(&graph, "Plain").fields[0].identifier, "Get");
}

#[test]
fn cyclic_all_of_drops_catch_all_with_warning() {
    let doc = oas3(json!({
        "Tree": {
            "allOf": [
                {"$ref": "#/components/schemas/Tree"},
                {
                    "type": "object",
                    "properties": {"label": {"type": "string"}},
                    "additionalProperties": true
                }
            ]
        }
    }));
    let (graph, issues) = resolve(&doc);

    let tree = struct_of(&graph, "Tree");
    assert!(tree.additional.is_none());
    assert!(tree.fields.iter().any(|f| f.embedded && f.indirect));
    assert!(issues.iter().any(|i| i.severity == Severity::Warning
        && i.kind == IssueKind::UnsupportedFeature
        && i.message.contains("additionalProperties ignored")));
}

#[test]
fn inline_closed_object_matches_named_form() {
    let doc = oas3(json!({
        "Empty": {"type": "object", "additionalProperties": false},
        "Holder": {
            "type": "object",
            "properties": {
                "marker": {"type": "object", "additionalProperties": false}
            }
        }
    }));
    let (graph, _) = resolve(&doc);

    assert_eq!(struct_of(&graph, "Empty").fields.len(), 0);
    let marker = &struct_of(&graph, "Holder").fields[0];
    let marker_struct = graph.struct_type(marker.ty).unwrap();
    assert!(marker_struct.fields.is_empty());
    assert!(marker_struct.additional.is_none());
}

#[test]
fn nullable_type_array_is_pointer_even_when_required() {
    let doc = OpenApiParser
        .parse_value(json!({
            "openapi": "3.1.0",
            "info": {"title": "t", "version": "1"},
            "components": {"schemas": {
                "Person": {
                    "type": "object",
                    "required": ["nickname"],
                    "properties": {"nickname": {"type": ["string", "null"]}}
                }
            }}
        }))
        .unwrap();
    let (graph, _) = resolve(&doc);
    let field = &struct_of(&graph, "Person").fields[0];
    assert!(field.required);
    assert!(field.nullable);
    assert!(graph.field_is_pointer(field, true));
}

#[test]
fn inline_objects_are_named_after_parent() {
    let doc = oas3(json!({
        "Order": {
            "type": "object",
            "properties": {
                "shipping": {
                    "type": "object",
                    "properties": {"street": {"type": "string"}}
                },
                "state": {"type": "string", "enum": ["open", "closed"]}
            }
        }
    }));
    let (graph, _) = resolve(&doc);
    assert!(graph.by_name("OrderShipping").is_some());
    let state = graph.by_name("OrderState").unwrap();
    let TypeKind::Enum(e) = &state.kind else {
        panic!("expected enum");
    };
    assert_eq!(e.variants[0].identifier, "OrderStateOpen");
}

#[test]
fn non_string_enum_policy() {
    let doc = oas3(json!({
        "Level": {"type": "integer", "enum": [1, 2, -1]}
    }));

    let (graph, issues) = resolve(&doc);
    let TypeKind::Enum(e) = &graph.get(graph.by_schema("Level").unwrap()).kind else {
        panic!("expected enum");
    };
    let idents: Vec<&str> = e.variants.iter().map(|v| v.identifier.as_str()).collect();
    assert_eq!(idents, vec!["Level1", "Level2", "LevelMinus1"]);
    assert!(issues.iter().any(|i| i.severity == Severity::Warning));

    let config = GenerationConfig {
        non_string_enums: crate::config::NonStringEnumPolicy::Scalar,
        ..Default::default()
    };
    let (graph, issues) = resolve_with(&doc, &config);
    let level = graph.resolve_alias(graph.by_schema("Level").unwrap());
    assert_eq!(graph.get(level).kind, TypeKind::Scalar { scalar: ScalarKind::Int });
    assert!(issues.iter().any(|i| i.severity == Severity::Warning));
}

#[test]
fn type_mapping_overrides_formats() {
    let doc = oas3(json!({
        "Event": {
            "type": "object",
            "properties": {
                "at": {"type": "string", "format": "date-time"},
                "id": {"type": "string", "format": "uuid"}
            }
        }
    }));
    let mut config = GenerationConfig::new("api");
    config
        .type_mapping
        .insert("uuid".to_string(), "uuid.UUID".to_string());
    let (graph, _) = resolve_with(&doc, &config);
    let event = struct_of(&graph, "Event");
    assert_eq!(
        graph.get(event.fields[0].ty).kind,
        TypeKind::Scalar { scalar: ScalarKind::DateTime }
    );
    assert_eq!(
        graph.get(event.fields[1].ty).kind,
        TypeKind::Scalar { scalar: ScalarKind::Mapped("uuid.UUID".into()) }
    );
}

#[test]
fn swagger_polymorphic_base_gets_union() {
    let doc = SwaggerParser
        .parse_value(json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": "1"},
            "paths": {},
            "definitions": {
                "Pet": {
                    "type": "object",
                    "discriminator": "petType",
                    "required": ["petType"],
                    "properties": {"petType": {"type": "string"}, "name": {"type": "string"}}
                },
                "Cat": {
                    "allOf": [
                        {"$ref": "#/definitions/Pet"},
                        {"type": "object", "properties": {"huntingSkill": {"type": "string"}}}
                    ]
                },
                "Dog": {
                    "allOf": [
                        {"$ref": "#/definitions/Pet"},
                        {"type": "object", "properties": {"packSize": {"type": "integer"}}}
                    ]
                }
            }
        }))
        .unwrap();
    let (graph, _) = resolve(&doc);

    let union = graph.by_name("PetUnion").unwrap();
    let TypeKind::Union(u) = &union.kind else {
        panic!("expected union");
    };
    let table = u.discriminator.as_ref().unwrap();
    assert_eq!(table.property_name, "petType");
    assert_eq!(table.values().collect::<Vec<_>>(), vec!["Cat", "Dog"]);
    assert_eq!(
        table.dispatch(&json!({"petType": "Dog"})),
        Ok(graph.by_schema("Dog").unwrap())
    );

    // Children still carry the base's fields
    let cat = graph.by_schema("Cat").unwrap();
    let wires: Vec<&str> = graph
        .flattened_fields(cat)
        .iter()
        .map(|f| f.wire_name.as_str())
        .collect();
    assert_eq!(wires, vec!["petType", "name", "huntingSkill"]);
}

#[test]
fn resolution_is_deterministic() {
    let schemas = json!({
        "b_thing": {"type": "object", "properties": {"x": {"type": "string"}}},
        "BThing": {"type": "object", "properties": {"y": {"type": "string"}}},
        "a": {"type": "string"}
    });
    let doc = oas3(schemas);
    let (g1, i1) = resolve(&doc);
    let (g2, i2) = resolve(&doc);
    assert_eq!(g1.nodes(), g2.nodes());
    assert_eq!(i1, i2);

    // Sorted schema names: "BThing" < "a" < "b_thing"
    assert_eq!(g1.get(g1.by_schema("BThing").unwrap()).name.as_deref(), Some("BThing"));
    assert_eq!(g1.get(g1.by_schema("b_thing").unwrap()).name.as_deref(), Some("BThing2"));
}
