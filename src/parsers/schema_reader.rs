//! Reads raw JSON-Schema-flavoured schema objects into [`SchemaNode`]s.
//!
//! Swagger 2.0, OpenAPI 3.0 and OpenAPI 3.1 schema objects differ only in a
//! handful of keywords (`x-nullable` vs `nullable` vs type arrays, string vs
//! object discriminators, boolean vs numeric exclusive bounds), so a single
//! reader serves every dialect.

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

use super::document::{
    AdditionalProperties, Constraints, Dialect, Discriminator, EnumBase, SchemaKind, SchemaNode,
};

/// Reduce a `$ref` string to the referenced schema name.
///
/// `#/definitions/Pet`, `#/components/schemas/Pet` and `other.yaml#/Pet` all
/// become `Pet`. JSON pointer escapes (`~1`, `~0`) are decoded.
pub fn ref_to_schema_name(reference: &str) -> String {
    let tail = reference.rsplit('/').next().unwrap_or(reference);
    tail.replace("~1", "/").replace("~0", "~")
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaReader {
    dialect: Dialect,
}

impl SchemaReader {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn read(&self, value: &JsonValue) -> SchemaNode {
        let Some(obj) = value.as_object() else {
            // `true` / `{}` style schemas accept anything
            return SchemaNode::new(SchemaKind::Any);
        };

        let mut node = SchemaNode {
            title: string_field(obj, "title"),
            description: string_field(obj, "description"),
            format: string_field(obj, "format"),
            nullable: self.read_nullable(obj),
            deprecated: bool_field(obj, "deprecated"),
            read_only: bool_field(obj, "readOnly"),
            write_only: bool_field(obj, "writeOnly"),
            default: obj.get("default").cloned(),
            constraints: read_constraints(obj),
            discriminator: self.read_discriminator(obj),
            ..SchemaNode::default()
        };

        if let Some(reference) = obj.get("$ref").and_then(JsonValue::as_str) {
            node.kind = SchemaKind::Ref(ref_to_schema_name(reference));
            return node;
        }

        let (types, type_nullable) = read_types(obj);
        node.nullable |= type_nullable;
        node.kind = self.read_kind(obj, &types, &mut node.nullable);
        node
    }

    fn read_nullable(&self, obj: &Map<String, JsonValue>) -> bool {
        match self.dialect {
            Dialect::Swagger2 => bool_field(obj, "x-nullable"),
            Dialect::OpenApi30 | Dialect::OpenApi31 => {
                bool_field(obj, "nullable") || bool_field(obj, "x-nullable")
            }
        }
    }

    fn read_discriminator(&self, obj: &Map<String, JsonValue>) -> Option<Discriminator> {
        match obj.get("discriminator")? {
            // Swagger 2.0: just the property name
            JsonValue::String(property_name) => Some(Discriminator {
                property_name: property_name.clone(),
                mapping: IndexMap::new(),
            }),
            JsonValue::Object(d) => {
                let property_name = d.get("propertyName")?.as_str()?.to_string();
                let mapping = d
                    .get("mapping")
                    .and_then(JsonValue::as_object)
                    .map(|m| {
                        m.iter()
                            .filter_map(|(value, target)| {
                                target
                                    .as_str()
                                    .map(|t| (value.clone(), mapping_target_name(t)))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Some(Discriminator {
                    property_name,
                    mapping,
                })
            }
            _ => None,
        }
    }

    fn read_kind(
        &self,
        obj: &Map<String, JsonValue>,
        types: &[String],
        nullable: &mut bool,
    ) -> SchemaKind {
        if let Some(constant) = obj.get("const") {
            return SchemaKind::Enum {
                base: enum_base(types, std::slice::from_ref(constant)),
                values: vec![constant.clone()],
            };
        }

        if let Some(values) = obj.get("enum").and_then(JsonValue::as_array) {
            if values.iter().any(JsonValue::is_null) {
                *nullable = true;
            }
            let values: Vec<JsonValue> = values.iter().filter(|v| !v.is_null()).cloned().collect();
            return SchemaKind::Enum {
                base: enum_base(types, &values),
                values,
            };
        }

        if let Some(members) = obj.get("allOf").and_then(JsonValue::as_array) {
            let mut members: Vec<SchemaNode> = members.iter().map(|m| self.read(m)).collect();
            // Sibling properties or required lists next to allOf act as one more inline member
            if obj.contains_key("properties") || obj.contains_key("required") {
                members.push(SchemaNode::new(self.read_object(obj)));
            }
            return SchemaKind::AllOf(members);
        }

        if let Some(variants) = obj
            .get("oneOf")
            .or_else(|| obj.get("anyOf"))
            .and_then(JsonValue::as_array)
        {
            return SchemaKind::OneOf(variants.iter().map(|v| self.read(v)).collect());
        }

        match types {
            [] => {
                if obj.contains_key("properties")
                    || obj.contains_key("additionalProperties")
                    || obj.contains_key("required")
                {
                    self.read_object(obj)
                } else if obj.contains_key("items") {
                    self.read_array(obj)
                } else {
                    SchemaKind::Any
                }
            }
            [single] => self.kind_for_type(single, obj),
            many => {
                // A type array with several non-null members is a union of scalars
                let variants = many
                    .iter()
                    .map(|t| SchemaNode::new(self.kind_for_type(t, obj)))
                    .collect();
                SchemaKind::OneOf(variants)
            }
        }
    }

    fn kind_for_type(&self, ty: &str, obj: &Map<String, JsonValue>) -> SchemaKind {
        match ty {
            "string" => SchemaKind::String,
            "integer" => SchemaKind::Integer,
            "number" => SchemaKind::Number,
            "boolean" => SchemaKind::Boolean,
            "array" => self.read_array(obj),
            "object" => self.read_object(obj),
            // Swagger 2.0 formData uploads
            "file" => SchemaKind::String,
            _ => SchemaKind::Any,
        }
    }

    fn read_array(&self, obj: &Map<String, JsonValue>) -> SchemaKind {
        SchemaKind::Array {
            items: obj.get("items").map(|items| Box::new(self.read(items))),
        }
    }

    fn read_object(&self, obj: &Map<String, JsonValue>) -> SchemaKind {
        let properties = obj
            .get("properties")
            .and_then(JsonValue::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, schema)| (name.clone(), self.read(schema)))
                    .collect()
            })
            .unwrap_or_default();

        let required = obj
            .get("required")
            .and_then(JsonValue::as_array)
            .map(|r| {
                r.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let additional = match obj.get("additionalProperties") {
            None => AdditionalProperties::Absent,
            Some(JsonValue::Bool(allowed)) => AdditionalProperties::Allowed(*allowed),
            Some(JsonValue::Object(o)) if o.is_empty() => AdditionalProperties::Allowed(true),
            Some(schema) => AdditionalProperties::Schema(Box::new(self.read(schema))),
        };

        SchemaKind::Object {
            properties,
            required,
            additional,
        }
    }
}

/// Mapping values may be full refs or bare schema names.
fn mapping_target_name(target: &str) -> String {
    if target.contains('/') {
        ref_to_schema_name(target)
    } else {
        target.to_string()
    }
}

/// Returns the declared non-null types and whether `null` was among them.
fn read_types(obj: &Map<String, JsonValue>) -> (Vec<String>, bool) {
    match obj.get("type") {
        Some(JsonValue::String(t)) if t == "null" => (Vec::new(), true),
        Some(JsonValue::String(t)) => (vec![t.clone()], false),
        Some(JsonValue::Array(ts)) => {
            let mut nullable = false;
            let mut types = Vec::new();
            for t in ts.iter().filter_map(JsonValue::as_str) {
                if t == "null" {
                    nullable = true;
                } else {
                    types.push(t.to_string());
                }
            }
            (types, nullable)
        }
        _ => (Vec::new(), false),
    }
}

fn enum_base(types: &[String], values: &[JsonValue]) -> EnumBase {
    match types.first().map(String::as_str) {
        Some("integer") => EnumBase::Integer,
        Some("number") => EnumBase::Number,
        Some("boolean") => EnumBase::Boolean,
        Some(_) => EnumBase::String,
        None => match values.first() {
            Some(JsonValue::Number(n)) if n.is_i64() || n.is_u64() => EnumBase::Integer,
            Some(JsonValue::Number(_)) => EnumBase::Number,
            Some(JsonValue::Bool(_)) => EnumBase::Boolean,
            _ => EnumBase::String,
        },
    }
}

fn read_constraints(obj: &Map<String, JsonValue>) -> Constraints {
    let mut c = Constraints {
        minimum: obj.get("minimum").and_then(JsonValue::as_f64),
        maximum: obj.get("maximum").and_then(JsonValue::as_f64),
        min_length: obj.get("minLength").and_then(JsonValue::as_u64),
        max_length: obj.get("maxLength").and_then(JsonValue::as_u64),
        pattern: string_field(obj, "pattern"),
        min_items: obj.get("minItems").and_then(JsonValue::as_u64),
        max_items: obj.get("maxItems").and_then(JsonValue::as_u64),
        unique_items: bool_field(obj, "uniqueItems"),
        ..Constraints::default()
    };

    // 3.0 uses boolean flags next to minimum/maximum; 3.1 puts the bound itself here
    match obj.get("exclusiveMinimum") {
        Some(JsonValue::Bool(b)) => c.exclusive_minimum = *b,
        Some(JsonValue::Number(n)) => {
            c.minimum = n.as_f64();
            c.exclusive_minimum = true;
        }
        _ => {}
    }
    match obj.get("exclusiveMaximum") {
        Some(JsonValue::Bool(b)) => c.exclusive_maximum = *b,
        Some(JsonValue::Number(n)) => {
            c.maximum = n.as_f64();
            c.exclusive_maximum = true;
        }
        _ => {}
    }
    c
}

fn string_field(obj: &Map<String, JsonValue>, key: &str) -> Option<String> {
    obj.get(key).and_then(JsonValue::as_str).map(str::to_string)
}

fn bool_field(obj: &Map<String, JsonValue>, key: &str) -> bool {
    obj.get(key).and_then(JsonValue::as_bool).unwrap_or(false)
}
