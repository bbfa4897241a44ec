//! `allOf` composition.
//!
//! Pure `$ref` members that are structs are embedded when that is lossless:
//! no duplicate wire names, no identifier clashes, no catch-all and no
//! `required` list that tightens a member's fields. Otherwise every member's
//! fields are copied into the composite, each keeping its wire name and
//! getting a fresh identifier in the composite's field scope.

use std::collections::HashSet;

use indexmap::IndexMap;

use super::graph::{FieldNode, StructType, TypeId, TypeKind};
use super::{property_location, ResolveState, TypeResolver};
use crate::context::GenerationContext;
use crate::diagnostics::IssueKind;
use crate::naming::{normalize_identifier, IdentCase, Scope};
use crate::parsers::{AdditionalProperties, SchemaKind, SchemaNode};

enum Part<'s> {
    /// Referenced struct, resolved
    Member {
        schema_name: String,
        ty: TypeId,
        fields: Vec<FieldNode>,
        has_catch_all: bool,
    },
    /// Referenced schema still being resolved (composition cycle)
    Cyclic { schema_name: String, ty: TypeId },
    /// Struct produced from a nested inline composition; always flattened
    Nested { fields: Vec<FieldNode> },
    /// Inline properties
    Inline {
        properties: &'s IndexMap<String, SchemaNode>,
        location: String,
    },
}

impl TypeResolver<'_> {
    pub(super) fn build_all_of(
        &mut self,
        ctx: &mut GenerationContext,
        owner: &str,
        members: &[SchemaNode],
        location: &str,
    ) -> TypeKind {
        if let [single] = members {
            if let Some(target) = single.ref_target() {
                return TypeKind::Alias {
                    target: self.ref_type(ctx, target, location),
                };
            }
        }

        let mut parts = Vec::with_capacity(members.len());
        let mut required: HashSet<String> = HashSet::new();
        let mut additional = AdditionalProperties::Absent;

        for (i, member) in members.iter().enumerate() {
            let member_location = format!("{location}/allOf/{i}");
            match &member.kind {
                SchemaKind::Ref(target) => {
                    let Some(ty) = self.graph.by_schema(target) else {
                        self.ref_type(ctx, target, &member_location);
                        continue;
                    };
                    match self.ensure_resolved(ctx, target) {
                        Some(ResolveState::InProgress) => parts.push(Part::Cyclic {
                            schema_name: target.clone(),
                            ty,
                        }),
                        _ => match self.graph.struct_type(ty) {
                            Some(s) => parts.push(Part::Member {
                                schema_name: target.clone(),
                                ty,
                                has_catch_all: s.additional.is_some(),
                                fields: self
                                    .graph
                                    .flattened_fields(ty)
                                    .into_iter()
                                    .cloned()
                                    .collect(),
                            }),
                            None => ctx.diagnostics.warning(
                                IssueKind::UnsupportedFeature,
                                &member_location,
                                format!(
                                    "allOf member '{target}' is not an object; it contributes no fields"
                                ),
                            ),
                        },
                    }
                }
                SchemaKind::Object {
                    properties,
                    required: member_required,
                    additional: member_additional,
                } => {
                    required.extend(member_required.iter().cloned());
                    if *member_additional != AdditionalProperties::Absent {
                        additional = member_additional.clone();
                    }
                    parts.push(Part::Inline {
                        properties,
                        location: member_location,
                    });
                }
                SchemaKind::Any => {}
                _ => {
                    let ty = self.resolve_schema(
                        ctx,
                        member,
                        &format!("{owner}Part{}", i + 1),
                        &member_location,
                    );
                    if self.graph.struct_type(ty).is_some() {
                        let fields = self
                            .graph
                            .flattened_fields(ty)
                            .into_iter()
                            .cloned()
                            .collect();
                        parts.push(Part::Nested { fields });
                    } else {
                        ctx.diagnostics.warning(
                            IssueKind::UnsupportedFeature,
                            &member_location,
                            "allOf member is not an object; it contributes no fields",
                        );
                    }
                }
            }
        }

        let scope = Scope::Fields(owner.to_string());
        let cyclic = parts.iter().any(|p| matches!(p, Part::Cyclic { .. }));
        let catch_all = if cyclic && additional.allows_undeclared() {
            // The member is still unresolved, so its keys cannot be routed
            // past the catch-all decoder
            ctx.diagnostics.warning(
                IssueKind::UnsupportedFeature,
                location,
                "additionalProperties ignored: an allOf member refers back to this schema",
            );
            None
        } else {
            self.catch_all(ctx, &scope, &additional, owner, location)
        };
        let embed = catch_all.is_none() && can_embed(&parts, &required);

        // Embedded members are named after their type; claim those first so
        // properties with the same name get suffixed instead
        for part in &parts {
            match part {
                Part::Cyclic { ty, .. } => {
                    let name = self.graph.get(*ty).name.clone().unwrap_or_default();
                    ctx.allocator.claim(&scope, &name);
                }
                Part::Member { ty, .. } if embed => {
                    let name = self.graph.get(*ty).name.clone().unwrap_or_default();
                    ctx.allocator.claim(&scope, &name);
                }
                _ => {}
            }
        }

        let mut fields = Vec::new();
        let mut seen_wire: HashSet<String> = HashSet::new();

        for part in parts {
            match part {
                Part::Cyclic { schema_name, ty } => {
                    fields.push(self.embedded_field(schema_name, ty, true));
                }
                Part::Member {
                    schema_name, ty, ..
                } if embed => {
                    fields.push(self.embedded_field(schema_name, ty, false));
                }
                Part::Member {
                    fields: member_fields,
                    ..
                }
                | Part::Nested {
                    fields: member_fields,
                } => {
                    for field in member_fields {
                        if !seen_wire.insert(field.wire_name.clone()) {
                            report_duplicate(ctx, owner, &field.wire_name, location);
                            continue;
                        }
                        let identifier = ctx.allocator.allocate(
                            &scope,
                            &field.wire_name,
                            IdentCase::Pascal,
                            &mut ctx.diagnostics,
                        );
                        let is_required = field.required || required.contains(&field.wire_name);
                        fields.push(FieldNode {
                            identifier,
                            required: is_required,
                            indirect: false,
                            ..field
                        });
                    }
                }
                Part::Inline {
                    properties,
                    location: member_location,
                } => {
                    for (wire, prop) in properties {
                        if !seen_wire.insert(wire.clone()) {
                            report_duplicate(ctx, owner, wire, location);
                            continue;
                        }
                        fields.push(self.build_field(
                            ctx,
                            &scope,
                            owner,
                            wire,
                            prop,
                            required.contains(wire),
                            &property_location(&member_location, wire),
                        ));
                    }
                }
            }
        }

        TypeKind::Struct(StructType {
            fields,
            additional: catch_all,
        })
    }

    fn embedded_field(&self, schema_name: String, ty: TypeId, indirect: bool) -> FieldNode {
        let identifier = self.graph.get(ty).name.clone().unwrap_or_default();
        let mut field = FieldNode::new(schema_name, identifier, ty);
        field.embedded = true;
        field.required = true;
        field.indirect = indirect;
        field
    }
}

/// Embedding is only used when it loses nothing.
fn can_embed(parts: &[Part<'_>], required: &HashSet<String>) -> bool {
    let mut wires = HashSet::new();
    let mut idents = HashSet::new();

    for part in parts {
        let (names, ok): (Vec<&str>, bool) = match part {
            Part::Member {
                fields,
                has_catch_all,
                ..
            } => {
                let tightened = fields
                    .iter()
                    .any(|f| !f.required && required.contains(&f.wire_name));
                (
                    fields.iter().map(|f| f.wire_name.as_str()).collect(),
                    !has_catch_all && !tightened,
                )
            }
            Part::Nested { fields } => (fields.iter().map(|f| f.wire_name.as_str()).collect(), true),
            Part::Inline { properties, .. } => {
                (properties.keys().map(String::as_str).collect(), true)
            }
            Part::Cyclic { .. } => (Vec::new(), true),
        };
        if !ok {
            return false;
        }
        for name in names {
            if !wires.insert(name.to_string())
                || !idents.insert(normalize_identifier(name, IdentCase::Pascal))
            {
                return false;
            }
        }
    }
    true
}

fn report_duplicate(ctx: &mut GenerationContext, owner: &str, wire: &str, location: &str) {
    ctx.diagnostics.info(
        IssueKind::NamingCollisionResolved,
        location,
        format!("property '{wire}' is declared by several allOf members of {owner}; keeping the first"),
    );
}
