//! Schema resolution: document schemas -> canonical [`TypeGraph`].
//!
//! Resolution runs in two phases. First every component schema gets its
//! type identifier, in sorted schema-name order, and a placeholder node in
//! the arena. Then each component is resolved; `$ref`s become plain
//! [`TypeId`] links to the pre-declared nodes, so references never recurse
//! and cyclic schemas terminate. Only `allOf` needs a referenced member to be
//! resolved first, and a member that is still in progress is composed through
//! a pointer instead.

mod compose;
pub mod cycles;
pub mod graph;

use std::collections::{HashMap, HashSet};

use serde_json::Value as JsonValue;

pub use graph::*;

use crate::config::NonStringEnumPolicy;
use crate::context::GenerationContext;
use crate::diagnostics::IssueKind;
use crate::naming::{to_pascal_case, IdentCase, Scope};
use crate::parsers::{
    AdditionalProperties, Discriminator, Document, EnumBase, SchemaKind, SchemaNode,
};

/// Identifier of the catch-all field holding undeclared properties.
pub const CATCH_ALL_FIELD: &str = "AdditionalProperties";

/// Members the emitter declares on a struct with a catch-all. Go fields and
/// methods share one namespace per type.
const CATCH_ALL_MEMBERS: [&str; 5] = [CATCH_ALL_FIELD, "Get", "Set", "MarshalJSON", "UnmarshalJSON"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolveState {
    InProgress,
    Done,
}

pub struct TypeResolver<'d> {
    document: &'d Document,
    graph: TypeGraph,
    state: HashMap<String, ResolveState>,
}

impl<'d> TypeResolver<'d> {
    pub fn new(document: &'d Document) -> Self {
        Self {
            document,
            graph: TypeGraph::new(),
            state: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Declare and resolve every component schema.
    pub fn resolve_components(&mut self, ctx: &mut GenerationContext) {
        let document = self.document;
        let mut names: Vec<&String> = document.schemas.keys().collect();
        names.sort();

        for name in &names {
            let ident = ctx.allocator.allocate(
                &Scope::Package,
                name,
                IdentCase::Pascal,
                &mut ctx.diagnostics,
            );
            self.graph.declare(ident, Some((*name).clone()));
        }

        for name in names {
            self.ensure_resolved(ctx, name);
        }

        self.build_polymorphic_unions(ctx);

        tracing::debug!(
            components = document.schemas.len(),
            types = self.graph.len(),
            "resolved component schemas"
        );
    }

    /// Resolve an inline schema (property, parameter, body, response).
    /// Shapes that need a declaration are named after `hint`.
    pub fn resolve_schema(
        &mut self,
        ctx: &mut GenerationContext,
        schema: &SchemaNode,
        hint: &str,
        location: &str,
    ) -> TypeId {
        match &schema.kind {
            SchemaKind::Ref(target) => self.ref_type(ctx, target, location),
            SchemaKind::Any => self.graph.scalar(ScalarKind::Any),
            SchemaKind::String | SchemaKind::Integer | SchemaKind::Number | SchemaKind::Boolean => {
                self.scalar_for(ctx, schema)
            }
            SchemaKind::Array { items } => {
                let item = match items {
                    Some(items) => self.resolve_schema(
                        ctx,
                        items,
                        &format!("{hint}Item"),
                        &format!("{location}/items"),
                    ),
                    None => self.graph.scalar(ScalarKind::Any),
                };
                self.graph.slice(item)
            }
            SchemaKind::Object {
                properties,
                additional,
                ..
            } if properties.is_empty() && *additional != AdditionalProperties::Allowed(false) => {
                self.map_for(ctx, additional, hint, location)
            }
            SchemaKind::AllOf(members)
                if members.len() == 1 && members[0].ref_target().is_some() =>
            {
                self.resolve_schema(ctx, &members[0], hint, location)
            }
            SchemaKind::Enum { base, .. }
                if *base != EnumBase::String
                    && ctx.config.non_string_enums == NonStringEnumPolicy::Scalar =>
            {
                ctx.diagnostics.warning(
                    IssueKind::UnsupportedFeature,
                    location,
                    "non-string enum emitted as its plain scalar type; allowed values are documented only",
                );
                self.scalar_for(ctx, schema)
            }
            _ => {
                let ident = ctx.allocator.allocate(
                    &Scope::Package,
                    hint,
                    IdentCase::Pascal,
                    &mut ctx.diagnostics,
                );
                let id = self.graph.declare(ident.clone(), None);
                let kind = self.build_kind(ctx, &ident, schema, location);
                let node = self.graph.get_mut(id);
                node.kind = kind;
                node.description = schema.description.clone().or_else(|| schema.title.clone());
                node.deprecated = schema.deprecated;
                node.nullable = schema.nullable;
                id
            }
        }
    }

    /// Post-process the graph and hand it over. Alias loops are broken and
    /// by-value containment cycles get their closing edge made indirect.
    pub fn finish(mut self, ctx: &mut GenerationContext) -> TypeGraph {
        for id in cycles::break_alias_loops(&mut self.graph) {
            let node = self.graph.get(id);
            let location = node
                .schema_name
                .as_deref()
                .map(|n| self.document.schema_location(n))
                .unwrap_or_else(|| node.name.clone().unwrap_or_default());
            ctx.diagnostics.critical(
                IssueKind::StructuralError,
                location,
                "schema only refers to itself through $ref; using an open placeholder type",
            );
        }

        let marked = cycles::mark_indirections(&mut self.graph, ctx.config.optional_pointers);
        if marked > 0 {
            tracing::debug!(fields = marked, "broke containment cycles through pointers");
        }
        self.graph
    }

    /// Returns the state the schema was in *before* this call, `None` for an
    /// unknown name.
    fn ensure_resolved(
        &mut self,
        ctx: &mut GenerationContext,
        name: &str,
    ) -> Option<ResolveState> {
        if let Some(state) = self.state.get(name) {
            return Some(*state);
        }
        let document = self.document;
        let schema = document.schemas.get(name)?;
        let id = self.graph.by_schema(name)?;

        self.state.insert(name.to_string(), ResolveState::InProgress);

        let location = document.schema_location(name);
        let owner = self.graph.get(id).name.clone().unwrap_or_default();
        let kind = self.build_kind(ctx, &owner, schema, &location);

        let node = self.graph.get_mut(id);
        node.kind = kind;
        node.description = schema.description.clone().or_else(|| schema.title.clone());
        node.deprecated = schema.deprecated;
        node.nullable = schema.nullable;

        self.state.insert(name.to_string(), ResolveState::Done);
        Some(ResolveState::Done)
    }

    /// Kind of a declared (named) type.
    fn build_kind(
        &mut self,
        ctx: &mut GenerationContext,
        owner: &str,
        schema: &SchemaNode,
        location: &str,
    ) -> TypeKind {
        match &schema.kind {
            SchemaKind::Ref(target) => TypeKind::Alias {
                target: self.ref_type(ctx, target, location),
            },
            SchemaKind::Any => TypeKind::Alias {
                target: self.graph.scalar(ScalarKind::Any),
            },
            SchemaKind::String | SchemaKind::Integer | SchemaKind::Number | SchemaKind::Boolean => {
                TypeKind::Alias {
                    target: self.scalar_for(ctx, schema),
                }
            }
            SchemaKind::Array { .. } => TypeKind::Alias {
                target: self.resolve_schema(ctx, schema, owner, location),
            },
            SchemaKind::Object {
                properties,
                additional,
                ..
            } if properties.is_empty() => match additional {
                // Closed object without properties
                AdditionalProperties::Allowed(false) => TypeKind::Struct(StructType::default()),
                _ => TypeKind::Alias {
                    target: self.map_for(ctx, additional, owner, location),
                },
            },
            SchemaKind::Object {
                properties,
                required,
                additional,
            } => {
                let scope = Scope::Fields(owner.to_string());
                let catch_all = self.catch_all(ctx, &scope, additional, owner, location);
                let mut fields = Vec::with_capacity(properties.len());
                for (wire, prop) in properties {
                    fields.push(self.build_field(
                        ctx,
                        &scope,
                        owner,
                        wire,
                        prop,
                        required.contains(wire),
                        &property_location(location, wire),
                    ));
                }
                TypeKind::Struct(StructType {
                    fields,
                    additional: catch_all,
                })
            }
            SchemaKind::AllOf(members) => self.build_all_of(ctx, owner, members, location),
            SchemaKind::OneOf(variants) => TypeKind::Union(self.build_union(
                ctx,
                owner,
                variants,
                schema.discriminator.as_ref(),
                location,
            )),
            SchemaKind::Enum { base, values } => {
                self.build_enum(ctx, owner, *base, values, schema, location)
            }
        }
    }

    fn ref_type(&mut self, ctx: &mut GenerationContext, target: &str, location: &str) -> TypeId {
        match self.graph.by_schema(target) {
            Some(id) => id,
            None => {
                ctx.diagnostics.critical(
                    IssueKind::StructuralError,
                    location,
                    format!("dangling $ref '{target}'; using an open placeholder type"),
                );
                self.graph.scalar(ScalarKind::Any)
            }
        }
    }

    fn scalar_kind(ctx: &GenerationContext, kind: &SchemaKind, format: Option<&str>) -> ScalarKind {
        let type_name = match kind {
            SchemaKind::String => "string",
            SchemaKind::Integer => "integer",
            SchemaKind::Number => "number",
            SchemaKind::Boolean => "boolean",
            _ => return ScalarKind::Any,
        };
        let mapping = &ctx.config.type_mapping;
        if let Some(mapped) = format
            .and_then(|f| mapping.get(f))
            .or_else(|| mapping.get(type_name))
        {
            return ScalarKind::Mapped(mapped.clone());
        }

        match (kind, format) {
            (SchemaKind::String, Some("byte" | "binary")) => ScalarKind::Bytes,
            (SchemaKind::String, Some("date-time")) => ScalarKind::DateTime,
            (SchemaKind::String, _) => ScalarKind::String,
            (SchemaKind::Integer, Some("int32")) => ScalarKind::Int32,
            (SchemaKind::Integer, Some("int64")) => ScalarKind::Int64,
            (SchemaKind::Integer, _) => ScalarKind::Int,
            (SchemaKind::Number, Some("float")) => ScalarKind::Float32,
            (SchemaKind::Number, _) => ScalarKind::Float64,
            _ => ScalarKind::Bool,
        }
    }

    fn scalar_for(&mut self, ctx: &GenerationContext, schema: &SchemaNode) -> TypeId {
        let kind = match &schema.kind {
            SchemaKind::Enum { base, .. } => enum_base_kind(*base),
            other => other.clone(),
        };
        let scalar = Self::scalar_kind(ctx, &kind, schema.format.as_deref());
        self.graph.scalar(scalar)
    }

    fn map_for(
        &mut self,
        ctx: &mut GenerationContext,
        additional: &AdditionalProperties,
        hint: &str,
        location: &str,
    ) -> TypeId {
        let value = match additional {
            AdditionalProperties::Schema(schema) => self.resolve_schema(
                ctx,
                schema,
                &format!("{hint}Value"),
                &format!("{location}/additionalProperties"),
            ),
            _ => self.graph.scalar(ScalarKind::Any),
        };
        self.graph.map(value)
    }

    /// Catch-all value type for a struct with declared properties. Only an
    /// explicit `additionalProperties` produces one.
    fn catch_all(
        &mut self,
        ctx: &mut GenerationContext,
        scope: &Scope,
        additional: &AdditionalProperties,
        owner: &str,
        location: &str,
    ) -> Option<TypeId> {
        let value = match additional {
            AdditionalProperties::Absent | AdditionalProperties::Allowed(false) => return None,
            AdditionalProperties::Allowed(true) => self.graph.scalar(ScalarKind::Any),
            AdditionalProperties::Schema(schema) => self.resolve_schema(
                ctx,
                schema,
                &format!("{owner}AdditionalProperty"),
                &format!("{location}/additionalProperties"),
            ),
        };
        ctx.allocator.reserve(scope, CATCH_ALL_MEMBERS);
        Some(value)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_field(
        &mut self,
        ctx: &mut GenerationContext,
        scope: &Scope,
        owner: &str,
        wire: &str,
        prop: &SchemaNode,
        required: bool,
        location: &str,
    ) -> FieldNode {
        let identifier =
            ctx.allocator
                .allocate(scope, wire, IdentCase::Pascal, &mut ctx.diagnostics);
        let ty = self.resolve_schema(ctx, prop, &format!("{owner}{identifier}"), location);
        if wire.contains(['"', '`', ',']) {
            ctx.diagnostics.warning(
                IssueKind::UnsupportedFeature,
                location,
                format!("property name {wire:?} cannot be expressed in a Go struct tag verbatim"),
            );
        }

        let mut field = FieldNode::new(wire, identifier, ty);
        field.required = required;
        field.nullable = prop.nullable || self.ref_is_nullable(prop);
        field.read_only = prop.read_only;
        field.write_only = prop.write_only;
        field.deprecated = prop.deprecated;
        field.description = prop.description.clone().or_else(|| prop.title.clone());
        field.constraints = prop.constraints.clone();
        field
    }

    fn ref_is_nullable(&self, schema: &SchemaNode) -> bool {
        schema
            .ref_target()
            .and_then(|t| self.document.schemas.get(t))
            .is_some_and(|s| s.nullable)
    }

    fn build_enum(
        &mut self,
        ctx: &mut GenerationContext,
        owner: &str,
        base: EnumBase,
        values: &[JsonValue],
        schema: &SchemaNode,
        location: &str,
    ) -> TypeKind {
        let scalar = match base {
            EnumBase::String => ScalarKind::String,
            other => Self::scalar_kind(ctx, &enum_base_kind(other), schema.format.as_deref()),
        };

        if base != EnumBase::String {
            match ctx.config.non_string_enums {
                NonStringEnumPolicy::Scalar => {
                    ctx.diagnostics.warning(
                        IssueKind::UnsupportedFeature,
                        location,
                        "non-string enum emitted as its plain scalar type; allowed values are documented only",
                    );
                    return TypeKind::Alias {
                        target: self.graph.scalar(scalar),
                    };
                }
                NonStringEnumPolicy::Constants => ctx.diagnostics.warning(
                    IssueKind::UnsupportedFeature,
                    location,
                    format!(
                        "non-string enum base; emitting {} named constants of a {} type",
                        values.len(),
                        scalar.label()
                    ),
                ),
            }
        }

        let mut seen = HashSet::new();
        let mut variants = Vec::with_capacity(values.len());
        for value in values {
            if value.is_null() {
                continue;
            }
            if !enum_value_fits(base, value) {
                ctx.diagnostics.warning(
                    IssueKind::StructuralError,
                    location,
                    format!("enum value {value} does not match the {} base type; dropped", scalar.label()),
                );
                continue;
            }
            let label = enum_value_label(value);
            if !seen.insert(value.to_string()) {
                ctx.diagnostics.warning(
                    IssueKind::StructuralError,
                    location,
                    format!("duplicate enum value {value}; emitted once"),
                );
                continue;
            }
            let mut suffix = to_pascal_case(&label);
            if suffix.is_empty() {
                suffix = "Empty".to_string();
            }
            let identifier = ctx.allocator.allocate_normalized(
                &Scope::Package,
                format!("{owner}{suffix}"),
                &label,
                &mut ctx.diagnostics,
            );
            variants.push(EnumVariant {
                identifier,
                value: value.clone(),
            });
        }

        TypeKind::Enum(EnumType {
            base: scalar,
            variants,
        })
    }

    fn build_union(
        &mut self,
        ctx: &mut GenerationContext,
        owner: &str,
        variants: &[SchemaNode],
        discriminator: Option<&Discriminator>,
        location: &str,
    ) -> UnionType {
        let scope = Scope::Fields(owner.to_string());
        let mut out = Vec::with_capacity(variants.len());
        let mut schema_names = Vec::with_capacity(variants.len());

        for (i, variant) in variants.iter().enumerate() {
            let ty = self.resolve_schema(
                ctx,
                variant,
                &format!("{owner}Variant{}", i + 1),
                &format!("{location}/oneOf/{i}"),
            );
            let label = self.type_label(ty);
            let identifier =
                ctx.allocator
                    .allocate(&scope, &label, IdentCase::Pascal, &mut ctx.diagnostics);
            out.push(UnionVariant { identifier, ty });
            schema_names.push(variant.ref_target().map(str::to_string));
        }

        let discriminator = discriminator.map(|d| {
            self.build_discriminator(ctx, &scope, d, &mut out, &schema_names, location)
        });

        UnionType {
            variants: out,
            discriminator,
        }
    }

    /// Explicit mapping entries first, then implicit schema-name values for
    /// variants the mapping does not cover.
    fn build_discriminator(
        &mut self,
        ctx: &mut GenerationContext,
        scope: &Scope,
        discriminator: &Discriminator,
        variants: &mut Vec<UnionVariant>,
        schema_names: &[Option<String>],
        location: &str,
    ) -> DiscriminatorTable {
        let mut entries = Vec::new();
        let mut values = HashSet::new();
        let mut covered = HashSet::new();

        for (value, target) in &discriminator.mapping {
            let Some(ty) = self.graph.by_schema(target) else {
                ctx.diagnostics.error(
                    IssueKind::UndefinedReference,
                    location,
                    format!("discriminator value '{value}' maps to unknown schema '{target}'"),
                );
                continue;
            };
            if !variants.iter().any(|v| v.ty == ty) {
                let label = self.type_label(ty);
                let identifier =
                    ctx.allocator
                        .allocate(scope, &label, IdentCase::Pascal, &mut ctx.diagnostics);
                variants.push(UnionVariant { identifier, ty });
            }
            values.insert(value.clone());
            covered.insert(ty);
            entries.push(DiscriminatorEntry {
                value: value.clone(),
                variant: ty,
            });
        }

        for (variant, schema_name) in variants.iter().zip(schema_names) {
            if covered.contains(&variant.ty) {
                continue;
            }
            match schema_name {
                Some(name) if values.contains(name) => ctx.diagnostics.warning(
                    IssueKind::StructuralError,
                    location,
                    format!(
                        "implicit discriminator value '{name}' is already mapped to another variant; {} is not selectable",
                        variant.identifier
                    ),
                ),
                Some(name) => {
                    values.insert(name.clone());
                    covered.insert(variant.ty);
                    entries.push(DiscriminatorEntry {
                        value: name.clone(),
                        variant: variant.ty,
                    });
                }
                None => ctx.diagnostics.warning(
                    IssueKind::UnsupportedFeature,
                    location,
                    format!(
                        "inline variant {} has neither a schema name nor a mapping entry; the discriminator never selects it",
                        variant.identifier
                    ),
                ),
            }
        }

        DiscriminatorTable {
            property_name: discriminator.property_name.clone(),
            entries,
        }
    }

    /// `<Base>Union` for schemas that declare a discriminator without
    /// `oneOf` and are extended by other schemas through `allOf`.
    fn build_polymorphic_unions(&mut self, ctx: &mut GenerationContext) {
        let document = self.document;
        let mut bases: Vec<(&String, &SchemaNode)> = document
            .schemas
            .iter()
            .filter(|(_, s)| s.discriminator.is_some() && !matches!(s.kind, SchemaKind::OneOf(_)))
            .collect();
        bases.sort_by(|a, b| a.0.cmp(b.0));

        for (base_name, base_schema) in bases {
            let Some(discriminator) = &base_schema.discriminator else {
                continue;
            };
            let mut children: Vec<&String> = document
                .schemas
                .iter()
                .filter(|(_, s)| match &s.kind {
                    SchemaKind::AllOf(members) => members
                        .iter()
                        .any(|m| m.ref_target() == Some(base_name.as_str())),
                    _ => false,
                })
                .map(|(name, _)| name)
                .collect();
            children.sort();
            if children.is_empty() {
                continue;
            }

            let Some(base_id) = self.graph.by_schema(base_name) else {
                continue;
            };
            let base_ident = self.graph.get(base_id).name.clone().unwrap_or_default();
            let union_ident = ctx.allocator.allocate(
                &Scope::Package,
                &format!("{base_ident}Union"),
                IdentCase::Pascal,
                &mut ctx.diagnostics,
            );
            let union_id = self.graph.declare(union_ident.clone(), None);

            let scope = Scope::Fields(union_ident.clone());
            let mut variants = Vec::new();
            let mut schema_names = Vec::new();
            for child in children {
                let Some(ty) = self.graph.by_schema(child) else {
                    continue;
                };
                let label = self.type_label(ty);
                let identifier =
                    ctx.allocator
                        .allocate(&scope, &label, IdentCase::Pascal, &mut ctx.diagnostics);
                variants.push(UnionVariant { identifier, ty });
                schema_names.push(Some(child.clone()));
            }

            let location = document.schema_location(base_name);
            let table = self.build_discriminator(
                ctx,
                &scope,
                discriminator,
                &mut variants,
                &schema_names,
                &location,
            );

            let node = self.graph.get_mut(union_id);
            node.description = Some(format!(
                "{union_ident} holds one of the schemas extending {base_ident}, selected by '{}'.",
                discriminator.property_name
            ));
            node.kind = TypeKind::Union(UnionType {
                variants,
                discriminator: Some(table),
            });
        }
    }

    /// Name used for a variant field: the type identifier, or a label for
    /// anonymous types.
    fn type_label(&self, id: TypeId) -> String {
        let node = self.graph.get(id);
        if let Some(name) = &node.name {
            return name.clone();
        }
        match &node.kind {
            TypeKind::Scalar { scalar } => scalar.label().to_string(),
            TypeKind::Slice { item } => format!("{}List", self.type_label(*item)),
            TypeKind::Map { value } => format!("{}Map", self.type_label(*value)),
            _ => "Value".to_string(),
        }
    }
}

fn enum_base_kind(base: EnumBase) -> SchemaKind {
    match base {
        EnumBase::String => SchemaKind::String,
        EnumBase::Integer => SchemaKind::Integer,
        EnumBase::Number => SchemaKind::Number,
        EnumBase::Boolean => SchemaKind::Boolean,
    }
}

/// Whether a listed enum value is expressible as a constant of the base type.
fn enum_value_fits(base: EnumBase, value: &JsonValue) -> bool {
    match base {
        EnumBase::String => value.is_string(),
        EnumBase::Integer => value.is_i64() || value.is_u64(),
        EnumBase::Number => value.is_number(),
        EnumBase::Boolean => value.is_boolean(),
    }
}

/// Text an enum constant is named after. Signs and decimal points of
/// numbers are spelled out so `-1` and `1` stay distinct.
fn enum_value_label(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n
            .to_string()
            .replace('-', "Minus")
            .replace('.', "Point"),
        other => other.to_string(),
    }
}

fn property_location(location: &str, wire: &str) -> String {
    format!(
        "{location}/properties/{}",
        wire.replace('~', "~0").replace('/', "~1")
    )
}

/// Resolve all component schemas of a document into a finished graph.
/// Convenience for callers that do not bind operations.
pub fn resolve_types(document: &Document, ctx: &mut GenerationContext) -> TypeGraph {
    let mut resolver = TypeResolver::new(document);
    resolver.resolve_components(ctx);
    resolver.finish(ctx)
}

#[cfg(test)]
mod tests;
