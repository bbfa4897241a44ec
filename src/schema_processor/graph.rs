//! Arena-backed type graph.
//!
//! Every type the resolver produces lives in one `Vec` and is addressed by
//! [`TypeId`]. References between types, including back-references that close
//! a cycle, are plain indices, so cyclic schemas never need shared mutable
//! pointers.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::parsers::Constraints;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TypeId(pub usize);

/// Leaf types. The emitter decides how each is spelled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    String,
    /// `format: byte` or `binary`
    Bytes,
    /// `format: date-time`
    DateTime,
    Int,
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    /// Open value: no type information, or a placeholder after an error
    Any,
    /// User-supplied `type_mapping` target, emitted verbatim
    Mapped(String),
}

impl ScalarKind {
    /// Label used when an anonymous scalar needs a name (union variants).
    pub fn label(&self) -> &str {
        match self {
            ScalarKind::String => "String",
            ScalarKind::Bytes => "Bytes",
            ScalarKind::DateTime => "DateTime",
            ScalarKind::Int => "Int",
            ScalarKind::Int32 => "Int32",
            ScalarKind::Int64 => "Int64",
            ScalarKind::Float32 => "Float32",
            ScalarKind::Float64 => "Float64",
            ScalarKind::Bool => "Bool",
            ScalarKind::Any => "Any",
            ScalarKind::Mapped(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeNode {
    pub id: TypeId,
    /// Emitted identifier; `None` for anonymous scalars, slices and maps
    pub name: Option<String>,
    /// Component schema this type was declared as, if any
    pub schema_name: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    /// The schema itself is declared nullable
    pub nullable: bool,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TypeKind {
    Scalar { scalar: ScalarKind },
    Slice { item: TypeId },
    /// String-keyed map
    Map { value: TypeId },
    /// Named type that stands for another one
    Alias { target: TypeId },
    Struct(StructType),
    Enum(EnumType),
    Union(UnionType),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructType {
    pub fields: Vec<FieldNode>,
    /// Value type of the catch-all for undeclared properties
    pub additional: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldNode {
    /// Property name on the wire, never altered
    pub wire_name: String,
    pub identifier: String,
    pub ty: TypeId,
    pub required: bool,
    pub nullable: bool,
    /// Composed `allOf` member, emitted as an embedded struct
    pub embedded: bool,
    /// Closes a by-value containment cycle; must be held through a pointer
    pub indirect: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub deprecated: bool,
    pub description: Option<String>,
    pub constraints: Constraints,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumType {
    pub base: ScalarKind,
    pub variants: Vec<EnumVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumVariant {
    pub identifier: String,
    pub value: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionType {
    pub variants: Vec<UnionVariant>,
    pub discriminator: Option<DiscriminatorTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionVariant {
    /// Field identifier of this variant inside the union
    pub identifier: String,
    pub ty: TypeId,
}

/// Closed value -> variant table with total decode semantics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscriminatorTable {
    pub property_name: String,
    pub entries: Vec<DiscriminatorEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscriminatorEntry {
    pub value: String,
    pub variant: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("discriminator property '{0}' is missing")]
    MissingDiscriminator(String),
    #[error("unknown discriminator value {0}")]
    UnknownDiscriminator(String),
}

impl DiscriminatorTable {
    /// Select the variant for a payload.
    ///
    /// Absent property (or a payload that is not an object) is
    /// `MissingDiscriminator`; any value not in the table, including
    /// non-string values, is `UnknownDiscriminator`.
    pub fn dispatch(&self, payload: &JsonValue) -> Result<TypeId, DecodeError> {
        let Some(raw) = payload.as_object().and_then(|o| o.get(&self.property_name)) else {
            return Err(DecodeError::MissingDiscriminator(self.property_name.clone()));
        };
        let Some(value) = raw.as_str() else {
            return Err(DecodeError::UnknownDiscriminator(raw.to_string()));
        };
        self.entries
            .iter()
            .find(|e| e.value == value)
            .map(|e| e.variant)
            .ok_or_else(|| DecodeError::UnknownDiscriminator(format!("{value:?}")))
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.value.as_str())
    }
}

impl FieldNode {
    pub fn new(wire_name: impl Into<String>, identifier: impl Into<String>, ty: TypeId) -> Self {
        Self {
            wire_name: wire_name.into(),
            identifier: identifier.into(),
            ty,
            required: false,
            nullable: false,
            embedded: false,
            indirect: false,
            read_only: false,
            write_only: false,
            deprecated: false,
            description: None,
            constraints: Constraints::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InternKey {
    Scalar(ScalarKind),
    Slice(TypeId),
    Map(TypeId),
}

#[derive(Debug, Default, Clone)]
pub struct TypeGraph {
    nodes: Vec<TypeNode>,
    /// Component schema name -> type, in allocation (sorted) order
    by_schema: IndexMap<String, TypeId>,
    interned: HashMap<InternKey, TypeId>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeNode {
        &mut self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[TypeNode] {
        &self.nodes
    }

    pub fn by_schema(&self, schema_name: &str) -> Option<TypeId> {
        self.by_schema.get(schema_name).copied()
    }

    pub fn schema_types(&self) -> impl Iterator<Item = (&str, TypeId)> {
        self.by_schema.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Find a named type by its emitted identifier.
    pub fn by_name(&self, name: &str) -> Option<&TypeNode> {
        self.nodes.iter().find(|n| n.name.as_deref() == Some(name))
    }

    /// Named types sorted by identifier, the order they are emitted in.
    pub fn named(&self) -> Vec<&TypeNode> {
        let mut named: Vec<&TypeNode> = self.nodes.iter().filter(|n| n.name.is_some()).collect();
        named.sort_by(|a, b| a.name.cmp(&b.name));
        named
    }

    /// Add a named node with a placeholder kind; the caller fills it in.
    pub fn declare(&mut self, name: String, schema_name: Option<String>) -> TypeId {
        let id = TypeId(self.nodes.len());
        if let Some(schema) = &schema_name {
            self.by_schema.insert(schema.clone(), id);
        }
        self.nodes.push(TypeNode {
            id,
            name: Some(name),
            schema_name,
            description: None,
            deprecated: false,
            nullable: false,
            kind: TypeKind::Scalar {
                scalar: ScalarKind::Any,
            },
        });
        id
    }

    fn intern(&mut self, key: InternKey, kind: TypeKind) -> TypeId {
        if let Some(id) = self.interned.get(&key) {
            return *id;
        }
        let id = TypeId(self.nodes.len());
        self.nodes.push(TypeNode {
            id,
            name: None,
            schema_name: None,
            description: None,
            deprecated: false,
            nullable: false,
            kind,
        });
        self.interned.insert(key, id);
        id
    }

    pub fn scalar(&mut self, scalar: ScalarKind) -> TypeId {
        self.intern(
            InternKey::Scalar(scalar.clone()),
            TypeKind::Scalar { scalar },
        )
    }

    pub fn slice(&mut self, item: TypeId) -> TypeId {
        self.intern(InternKey::Slice(item), TypeKind::Slice { item })
    }

    pub fn map(&mut self, value: TypeId) -> TypeId {
        self.intern(InternKey::Map(value), TypeKind::Map { value })
    }

    /// Follow alias links to the underlying type. Alias loops stop at the
    /// first repeated node.
    pub fn resolve_alias(&self, id: TypeId) -> TypeId {
        let mut current = id;
        let mut seen = HashSet::new();
        while let TypeKind::Alias { target } = &self.get(current).kind {
            if !seen.insert(current) {
                break;
            }
            current = *target;
        }
        current
    }

    pub fn struct_type(&self, id: TypeId) -> Option<&StructType> {
        match &self.get(self.resolve_alias(id)).kind {
            TypeKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Whether a zero value of this type already encodes "absent" (`nil`),
    /// so optional fields of it need no pointer.
    pub fn is_nilable(&self, id: TypeId) -> bool {
        matches!(
            self.get(self.resolve_alias(id)).kind,
            TypeKind::Slice { .. }
                | TypeKind::Map { .. }
                | TypeKind::Scalar {
                    scalar: ScalarKind::Any | ScalarKind::Bytes
                }
        )
    }

    /// Fields of a struct with embedded members expanded, in declaration order.
    pub fn flattened_fields(&self, id: TypeId) -> Vec<&FieldNode> {
        let mut out = Vec::new();
        let mut visiting = HashSet::new();
        self.collect_fields(id, &mut out, &mut visiting);
        out
    }

    fn collect_fields<'a>(
        &'a self,
        id: TypeId,
        out: &mut Vec<&'a FieldNode>,
        visiting: &mut HashSet<TypeId>,
    ) {
        let id = self.resolve_alias(id);
        if !visiting.insert(id) {
            return;
        }
        if let TypeKind::Struct(s) = &self.get(id).kind {
            for field in &s.fields {
                if field.embedded {
                    self.collect_fields(field.ty, out, visiting);
                } else {
                    out.push(field);
                }
            }
        }
        visiting.remove(&id);
    }

    /// Whether a field is held through a pointer in emitted code.
    ///
    /// Nullable and cycle-closing fields always are; optional ones are when
    /// `optional_pointers` is on. Slices, maps and open values use `nil`.
    pub fn field_is_pointer(&self, field: &FieldNode, optional_pointers: bool) -> bool {
        if field.indirect {
            return true;
        }
        if self.is_nilable(field.ty) {
            return false;
        }
        field.nullable || (!field.required && optional_pointers)
    }
}
