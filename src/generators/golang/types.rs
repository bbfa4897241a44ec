//! Go declarations for the type graph.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::parsers::Constraints;
use crate::schema_processor::{
    FieldNode, ScalarKind, StructType, TypeGraph, TypeId, TypeKind, UnionType, CATCH_ALL_FIELD,
};

/// Go type expression for a node. Declared nodes are referred to by name.
pub fn go_type(graph: &TypeGraph, id: TypeId) -> String {
    let node = graph.get(id);
    match &node.name {
        Some(name) => name.clone(),
        None => kind_type(graph, &node.kind),
    }
}

/// Go type expression for a node's structure, ignoring its name.
fn kind_type(graph: &TypeGraph, kind: &TypeKind) -> String {
    match kind {
        TypeKind::Scalar { scalar } => scalar_type(scalar),
        TypeKind::Slice { item } => format!("[]{}", go_type(graph, *item)),
        TypeKind::Map { value } => format!("map[string]{}", go_type(graph, *value)),
        TypeKind::Alias { target } => go_type(graph, *target),
        _ => "interface{}".to_string(),
    }
}

pub fn scalar_type(scalar: &ScalarKind) -> String {
    match scalar {
        ScalarKind::String => "string".into(),
        ScalarKind::Bytes => "[]byte".into(),
        ScalarKind::DateTime => "time.Time".into(),
        ScalarKind::Int => "int".into(),
        ScalarKind::Int32 => "int32".into(),
        ScalarKind::Int64 => "int64".into(),
        ScalarKind::Float32 => "float32".into(),
        ScalarKind::Float64 => "float64".into(),
        ScalarKind::Bool => "bool".into(),
        ScalarKind::Any => "interface{}".into(),
        ScalarKind::Mapped(spec) => mapped_type(spec).0,
    }
}

/// `github.com/google/uuid.UUID` -> (`uuid.UUID`, import path). Values
/// without a `/` are used verbatim.
pub fn mapped_type(spec: &str) -> (String, Option<String>) {
    match spec.rsplit_once('.') {
        Some((path, name)) if path.contains('/') => {
            let qualifier = path.rsplit('/').next().unwrap_or(path);
            (format!("{qualifier}.{name}"), Some(path.to_string()))
        }
        _ => (spec.to_string(), None),
    }
}

/// Go interpreted string literal.
pub fn go_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}

/// Go literal for a JSON scalar (enum values).
pub fn go_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => go_string(s),
        JsonValue::Null => "nil".to_string(),
        other => other.to_string(),
    }
}

/// `// Name text...` lines, with a trailing `Deprecated:` paragraph.
pub fn doc_lines(name: &str, text: Option<&str>, deprecated: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let text = text.map(str::trim).filter(|t| !t.is_empty());
    if let Some(text) = text {
        for (i, line) in text.lines().enumerate() {
            let line = line.trim_end();
            match (i, line.is_empty()) {
                (0, _) => lines.push(format!("// {name} {line}")),
                (_, true) => lines.push("//".to_string()),
                (_, false) => lines.push(format!("// {line}")),
            }
        }
    }
    if deprecated {
        if !lines.is_empty() {
            lines.push("//".to_string());
        }
        lines.push(format!("// Deprecated: {name} is marked deprecated by the API description."));
    }
    lines
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclView {
    Struct(StructView),
    Enum(EnumView),
    Alias(AliasView),
    Union(UnionView),
}

#[derive(Debug, Serialize)]
pub struct StructView {
    pub name: String,
    pub doc: Vec<String>,
    pub fields: Vec<FieldView>,
    pub catch_all: Option<CatchAllView>,
}

#[derive(Debug, Serialize)]
pub struct FieldView {
    pub doc: Vec<String>,
    /// Complete field line: identifier, type and tag
    pub declaration: String,
}

#[derive(Debug, Serialize)]
pub struct CatchAllView {
    pub value_type: String,
    pub unmarshal: Vec<String>,
    pub marshal: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EnumView {
    pub name: String,
    pub doc: Vec<String>,
    pub base_type: String,
    pub constants: Vec<ConstView>,
}

#[derive(Debug, Serialize)]
pub struct ConstView {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct AliasView {
    pub name: String,
    pub doc: Vec<String>,
    /// Everything after the type name: `= Other` or a type expression
    pub definition: String,
}

#[derive(Debug, Serialize)]
pub struct UnionView {
    pub name: String,
    pub doc: Vec<String>,
    /// Go literal of the discriminator property name
    pub property: Option<String>,
    pub variants: Vec<VariantView>,
    pub cases: Vec<CaseView>,
}

#[derive(Debug, Serialize)]
pub struct VariantView {
    pub identifier: String,
    pub go_type: String,
    /// Value written by `From<Variant>` when exactly one maps to it
    pub discriminator_value: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CaseView {
    pub value: String,
    pub variant: String,
}

pub struct TypeRenderer<'g> {
    graph: &'g TypeGraph,
    optional_pointers: bool,
    emit_validation: bool,
}

impl<'g> TypeRenderer<'g> {
    pub fn new(graph: &'g TypeGraph, optional_pointers: bool, emit_validation: bool) -> Self {
        Self {
            graph,
            optional_pointers,
            emit_validation,
        }
    }

    pub fn decl(&self, id: TypeId) -> Option<DeclView> {
        let node = self.graph.get(id);
        let name = node.name.clone()?;
        let doc = doc_lines(&name, node.description.as_deref(), node.deprecated);

        let view = match &node.kind {
            TypeKind::Struct(s) => DeclView::Struct(self.struct_view(name, doc, s)),
            TypeKind::Enum(e) => DeclView::Enum(EnumView {
                base_type: scalar_type(&e.base),
                constants: e
                    .variants
                    .iter()
                    .map(|v| ConstView {
                        name: v.identifier.clone(),
                        value: go_literal(&v.value),
                    })
                    .collect(),
                name,
                doc,
            }),
            TypeKind::Union(u) => DeclView::Union(self.union_view(name, doc, u)),
            TypeKind::Alias { target } => DeclView::Alias(AliasView {
                definition: self.alias_definition(*target),
                name,
                doc,
            }),
            TypeKind::Scalar { .. } | TypeKind::Slice { .. } | TypeKind::Map { .. } => {
                DeclView::Alias(AliasView {
                    definition: kind_type(self.graph, &node.kind),
                    name,
                    doc,
                })
            }
        };
        Some(view)
    }

    fn alias_definition(&self, target: TypeId) -> String {
        let target_node = self.graph.get(target);
        if target_node.name.is_some() {
            format!("= {}", go_type(self.graph, target))
        } else {
            go_type(self.graph, target)
        }
    }

    /// Field type as declared, pointer included.
    pub fn field_type(&self, field: &FieldNode) -> String {
        let ty = go_type(self.graph, field.ty);
        if self.graph.field_is_pointer(field, self.optional_pointers) {
            format!("*{ty}")
        } else {
            ty
        }
    }

    fn struct_view(&self, name: String, doc: Vec<String>, s: &StructType) -> StructView {
        let mut fields: Vec<FieldView> = s
            .fields
            .iter()
            .map(|field| {
                if field.embedded {
                    let ty = go_type(self.graph, field.ty);
                    let declaration = if field.indirect { format!("*{ty}") } else { ty };
                    return FieldView {
                        doc: Vec::new(),
                        declaration,
                    };
                }
                let mut doc = doc_lines(
                    &field.identifier,
                    field.description.as_deref(),
                    field.deprecated,
                );
                if field.read_only {
                    doc.push(format!("// {} is read-only; servers ignore it in requests.", field.identifier));
                } else if field.write_only {
                    doc.push(format!("// {} is write-only; servers never return it.", field.identifier));
                }
                FieldView {
                    doc,
                    declaration: format!(
                        "{} {} `{}`",
                        field.identifier,
                        self.field_type(field),
                        self.field_tag(field)
                    ),
                }
            })
            .collect();

        let catch_all = s.additional.map(|value| {
            let value_type = go_type(self.graph, value);
            fields.push(FieldView {
                doc: Vec::new(),
                declaration: format!("{CATCH_ALL_FIELD} map[string]{value_type} `json:\"-\"`"),
            });
            CatchAllView {
                unmarshal: self.unmarshal_lines(s, &value_type),
                marshal: self.marshal_lines(s),
                value_type,
            }
        });

        StructView {
            name,
            doc,
            fields,
            catch_all,
        }
    }

    pub fn field_tag(&self, field: &FieldNode) -> String {
        let mut json = field.wire_name.clone();
        if !field.required {
            json.push_str(",omitempty");
        }
        let mut tag = format!("json:\"{json}\"");

        if self.emit_validation {
            let rules = self.validation_rules(field);
            if !rules.is_empty() {
                tag.push_str(&format!(" validate:\"{}\"", rules.join(",")));
            }
        }
        tag
    }

    fn validation_rules(&self, field: &FieldNode) -> Vec<String> {
        let mut rules = Vec::new();
        if field.required && !field.nullable {
            // `required` rejects zero values, so value types (false, 0, "")
            // only get their constraints
            if self.graph.field_is_pointer(field, self.optional_pointers)
                || self.graph.is_nilable(field.ty)
            {
                rules.push("required".to_string());
            }
        } else if !field.constraints.is_empty() {
            rules.push("omitempty".to_string());
        }

        let is_slice = matches!(
            self.graph.get(self.graph.resolve_alias(field.ty)).kind,
            TypeKind::Slice { .. }
        );
        rules.extend(constraint_rules(&field.constraints, is_slice));
        rules
    }

    fn unmarshal_lines(&self, s: &StructType, value_type: &str) -> Vec<String> {
        let mut lines = vec![
            "object := make(map[string]json.RawMessage)".to_string(),
            "if err := json.Unmarshal(b, &object); err != nil {".to_string(),
            "\treturn err".to_string(),
            "}".to_string(),
        ];
        for field in s.fields.iter().filter(|f| !f.embedded) {
            let wire = go_string(&field.wire_name);
            lines.extend([
                format!("if raw, found := object[{wire}]; found {{"),
                format!("\tif err := json.Unmarshal(raw, &a.{}); err != nil {{", field.identifier),
                format!("\t\treturn fmt.Errorf(\"reading '%s': %w\", {wire}, err)"),
                "\t}".to_string(),
                format!("\tdelete(object, {wire})"),
                "}".to_string(),
            ]);
        }
        lines.extend([
            "if len(object) != 0 {".to_string(),
            format!("\ta.{CATCH_ALL_FIELD} = make(map[string]{value_type}, len(object))"),
            "\tfor name, raw := range object {".to_string(),
            format!("\t\tvar value {value_type}"),
            "\t\tif err := json.Unmarshal(raw, &value); err != nil {".to_string(),
            "\t\t\treturn fmt.Errorf(\"reading '%s': %w\", name, err)".to_string(),
            "\t\t}".to_string(),
            format!("\t\ta.{CATCH_ALL_FIELD}[name] = value"),
            "\t}".to_string(),
            "}".to_string(),
            "return nil".to_string(),
        ]);
        lines
    }

    fn marshal_lines(&self, s: &StructType) -> Vec<String> {
        let mut lines = vec![
            "var err error".to_string(),
            "object := make(map[string]json.RawMessage)".to_string(),
        ];
        for field in s.fields.iter().filter(|f| !f.embedded) {
            let wire = go_string(&field.wire_name);
            let assign = [
                format!("object[{wire}], err = json.Marshal(a.{})", field.identifier),
                "if err != nil {".to_string(),
                format!("\treturn nil, fmt.Errorf(\"writing '%s': %w\", {wire}, err)"),
                "}".to_string(),
            ];
            let skippable = !field.required
                && (self.graph.field_is_pointer(field, self.optional_pointers)
                    || self.graph.is_nilable(field.ty));
            if skippable {
                lines.push(format!("if a.{} != nil {{", field.identifier));
                lines.extend(assign.iter().map(|l| format!("\t{l}")));
                lines.push("}".to_string());
            } else {
                lines.extend(assign);
            }
        }
        lines.extend([
            format!("for name, value := range a.{CATCH_ALL_FIELD} {{"),
            "\tobject[name], err = json.Marshal(value)".to_string(),
            "\tif err != nil {".to_string(),
            "\t\treturn nil, fmt.Errorf(\"writing '%s': %w\", name, err)".to_string(),
            "\t}".to_string(),
            "}".to_string(),
            "return json.Marshal(object)".to_string(),
        ]);
        lines
    }

    fn union_view(&self, name: String, doc: Vec<String>, u: &UnionType) -> UnionView {
        let table = u.discriminator.as_ref();
        let variants = u
            .variants
            .iter()
            .map(|variant| {
                let values: Vec<&str> = table
                    .map(|t| {
                        t.entries
                            .iter()
                            .filter(|e| e.variant == variant.ty)
                            .map(|e| e.value.as_str())
                            .collect()
                    })
                    .unwrap_or_default();
                VariantView {
                    identifier: variant.identifier.clone(),
                    go_type: go_type(self.graph, variant.ty),
                    discriminator_value: match values.as_slice() {
                        [single] => Some(go_string(single)),
                        _ => None,
                    },
                }
            })
            .collect();

        let cases = table
            .map(|t| {
                t.entries
                    .iter()
                    .filter_map(|entry| {
                        u.variants
                            .iter()
                            .find(|v| v.ty == entry.variant)
                            .map(|v| CaseView {
                                value: go_string(&entry.value),
                                variant: v.identifier.clone(),
                            })
                    })
                    .collect()
            })
            .unwrap_or_default();

        UnionView {
            name,
            doc,
            property: table.map(|t| go_string(&t.property_name)),
            variants,
            cases,
        }
    }
}

/// go-playground/validator rules for schema constraints.
pub fn constraint_rules(constraints: &Constraints, is_slice: bool) -> Vec<String> {
    let mut rules = Vec::new();
    if let Some(min) = constraints.minimum {
        let op = if constraints.exclusive_minimum { "gt" } else { "gte" };
        rules.push(format!("{op}={min}"));
    }
    if let Some(max) = constraints.maximum {
        let op = if constraints.exclusive_maximum { "lt" } else { "lte" };
        rules.push(format!("{op}={max}"));
    }
    let (min_len, max_len) = if is_slice {
        (constraints.min_items, constraints.max_items)
    } else {
        (constraints.min_length, constraints.max_length)
    };
    if let Some(min) = min_len {
        rules.push(format!("min={min}"));
    }
    if let Some(max) = max_len {
        rules.push(format!("max={max}"));
    }
    if is_slice && constraints.unique_items {
        rules.push("unique".to_string());
    }
    rules
}
