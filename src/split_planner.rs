//! Output unit planning.
//!
//! Everything lands in one `types` and one `client` unit unless a configured
//! threshold is exceeded. Split client units are grouped by tag when every
//! operation is tagged, else by the first path segment, else chunked in
//! order. The base `client` unit always keeps the shared declarations.

use indexmap::IndexMap;

use crate::config::SplitConfig;
use crate::naming::to_snake_case;
use crate::operation_processor::OperationBinding;
use crate::schema_processor::{TypeGraph, TypeId, TypeKind};

pub const TYPES_ARTIFACT: &str = "types";
pub const CLIENT_ARTIFACT: &str = "client";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypesUnit {
    pub artifact: String,
    pub types: Vec<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientUnit {
    pub artifact: String,
    /// Indices into the bound operations
    pub operations: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    pub types: Vec<TypesUnit>,
    /// Operations kept in the base `client` unit; empty once split
    pub base_operations: Vec<usize>,
    pub client_units: Vec<ClientUnit>,
}

impl SplitPlan {
    pub fn is_client_split(&self) -> bool {
        !self.client_units.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Tag,
    PathPrefix,
    Sequential,
}

struct Limits {
    lines: Option<usize>,
    types: Option<usize>,
    operations: Option<usize>,
}

/// Plan output units for the named types of `graph` and `operations`.
pub fn plan_split(
    graph: &TypeGraph,
    operations: &[OperationBinding],
    config: &SplitConfig,
) -> SplitPlan {
    let (lines, types, ops) = config.limits();
    let limits = Limits {
        lines,
        types,
        operations: ops,
    };

    let type_ids: Vec<TypeId> = graph.named().iter().map(|node| node.id).collect();
    let types = plan_types(graph, &type_ids, &limits);

    let op_lines: usize = operations.iter().map(estimate_operation_lines).sum();
    let too_many_ops = limits.operations.is_some_and(|max| operations.len() > max);
    let too_long = limits.lines.is_some_and(|max| op_lines > max);

    let plan = if too_many_ops || too_long {
        let grouping = choose_grouping(operations, config);
        SplitPlan {
            types,
            base_operations: Vec::new(),
            client_units: plan_client_units(operations, grouping, &limits),
        }
    } else {
        SplitPlan {
            types,
            base_operations: (0..operations.len()).collect(),
            client_units: Vec::new(),
        }
    };

    tracing::info!(
        type_units = plan.types.len(),
        client_units = plan.client_units.len(),
        "planned output units"
    );
    plan
}

pub fn choose_grouping(operations: &[OperationBinding], config: &SplitConfig) -> Grouping {
    if config.by_tag && !operations.is_empty() && operations.iter().all(|op| !op.tags.is_empty()) {
        Grouping::Tag
    } else if config.by_path_prefix {
        Grouping::PathPrefix
    } else {
        Grouping::Sequential
    }
}

fn plan_types(graph: &TypeGraph, ids: &[TypeId], limits: &Limits) -> Vec<TypesUnit> {
    let total_lines: usize = ids.iter().map(|id| estimate_type_lines(graph, *id)).sum();
    let over_count = limits.types.is_some_and(|max| ids.len() > max);
    let over_lines = limits.lines.is_some_and(|max| total_lines > max);

    if !over_count && !over_lines {
        return vec![TypesUnit {
            artifact: TYPES_ARTIFACT.to_string(),
            types: ids.to_vec(),
        }];
    }

    let chunks = chunk(ids, limits.types, limits.lines, |id| estimate_type_lines(graph, *id));
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, types)| TypesUnit {
            artifact: numbered(TYPES_ARTIFACT, i),
            types,
        })
        .collect()
}

fn plan_client_units(
    operations: &[OperationBinding],
    grouping: Grouping,
    limits: &Limits,
) -> Vec<ClientUnit> {
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (index, op) in operations.iter().enumerate() {
        let key = match grouping {
            Grouping::Tag => op.tags.first().map(|t| to_snake_case(t)).unwrap_or_default(),
            Grouping::PathPrefix => path_prefix(&op.path),
            Grouping::Sequential => String::new(),
        };
        groups.entry(key).or_default().push(index);
    }
    groups.sort_keys();

    let mut units = Vec::new();
    let mut taken = std::collections::HashSet::new();
    for (group, members) in groups {
        let stem = if group.is_empty() {
            CLIENT_ARTIFACT.to_string()
        } else {
            format!("{CLIENT_ARTIFACT}_{group}")
        };
        let chunks = chunk(&members, limits.operations, limits.lines, |i| {
            estimate_operation_lines(&operations[*i])
        });
        for (i, operations) in chunks.into_iter().enumerate() {
            let mut artifact = if group.is_empty() {
                format!("{stem}_{}", i + 1)
            } else {
                numbered(&stem, i)
            };
            let mut n = 2;
            while !taken.insert(artifact.clone()) {
                artifact = format!("{stem}_{n}");
                n += 1;
            }
            units.push(ClientUnit {
                artifact,
                operations,
            });
        }
    }
    units
}

/// Greedy in-order chunking under a count and a line limit. A single item
/// over the line limit still gets its own chunk.
fn chunk<T: Clone>(
    items: &[T],
    max_count: Option<usize>,
    max_lines: Option<usize>,
    lines_of: impl Fn(&T) -> usize,
) -> Vec<Vec<T>> {
    let mut chunks: Vec<Vec<T>> = Vec::new();
    let mut current: Vec<T> = Vec::new();
    let mut current_lines = 0;

    for item in items {
        let lines = lines_of(item);
        let full_count = max_count.is_some_and(|max| current.len() >= max);
        let full_lines = max_lines.is_some_and(|max| current_lines + lines > max);
        if !current.is_empty() && (full_count || full_lines) {
            chunks.push(std::mem::take(&mut current));
            current_lines = 0;
        }
        current.push(item.clone());
        current_lines += lines;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// `types`, `types_2`, `types_3`, ...
fn numbered(stem: &str, index: usize) -> String {
    if index == 0 {
        stem.to_string()
    } else {
        format!("{stem}_{}", index + 1)
    }
}

/// First literal path segment in snake case, `root` for `/`.
pub fn path_prefix(path: &str) -> String {
    let segment = path
        .split('/')
        .find(|s| !s.is_empty() && !s.starts_with('{'))
        .map(to_snake_case)
        .unwrap_or_default();
    if segment.is_empty() {
        "root".to_string()
    } else {
        segment
    }
}

/// Rough emitted line count of one client method.
pub fn estimate_operation_lines(op: &OperationBinding) -> usize {
    let params = op.params.as_ref().map_or(0, |p| 4 + p.fields.len() * 6);
    let body = if op.body.is_some() { 8 } else { 0 };
    30 + op.path_params.len() * 2 + params + body
}

/// Rough emitted line count of one declared type.
pub fn estimate_type_lines(graph: &TypeGraph, id: TypeId) -> usize {
    match &graph.get(id).kind {
        TypeKind::Struct(s) => {
            let accessors = if s.additional.is_some() { 60 } else { 0 };
            4 + s.fields.len() * 2 + accessors
        }
        TypeKind::Enum(e) => 12 + e.variants.len(),
        TypeKind::Union(u) => {
            let dispatch = u.discriminator.as_ref().map_or(0, |d| 20 + d.entries.len() * 2);
            20 + u.variants.len() * 12 + dispatch
        }
        _ => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation_processor::ResponseBinding;
    use crate::parsers::HttpMethod;
    use crate::schema_processor::{ScalarKind, StructType};

    fn op(path: &str, tags: &[&str]) -> OperationBinding {
        OperationBinding {
            method_name: format!("Get{}", path.replace('/', "_")),
            operation_id: None,
            http_method: HttpMethod::Get,
            path: path.to_string(),
            summary: None,
            description: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            path_params: Vec::new(),
            params: None,
            body: None,
            response: ResponseBinding::Transport,
            security: None,
            deprecated: false,
            location: String::new(),
        }
    }

    fn graph_with(n: usize) -> TypeGraph {
        let mut graph = TypeGraph::new();
        for i in 0..n {
            let id = graph.declare(format!("T{i:02}"), Some(format!("T{i:02}")));
            graph.get_mut(id).kind = TypeKind::Struct(StructType::default());
        }
        let _ = graph.scalar(ScalarKind::String);
        graph
    }

    fn split(max_lines: i64, max_types: i64, max_operations: i64) -> SplitConfig {
        SplitConfig {
            max_lines,
            max_types,
            max_operations,
            ..SplitConfig::default()
        }
    }

    #[test]
    fn unlimited_keeps_single_units() {
        let graph = graph_with(5);
        let ops = vec![op("/a", &[]), op("/b", &[])];
        let plan = plan_split(&graph, &ops, &SplitConfig::default());

        assert_eq!(plan.types.len(), 1);
        assert_eq!(plan.types[0].artifact, "types");
        assert_eq!(plan.types[0].types.len(), 5);
        assert_eq!(plan.base_operations, vec![0, 1]);
        assert!(!plan.is_client_split());
    }

    #[test]
    fn types_chunk_by_count() {
        let graph = graph_with(5);
        let plan = plan_split(&graph, &[], &split(0, 2, 0));
        let names: Vec<&str> = plan.types.iter().map(|u| u.artifact.as_str()).collect();
        assert_eq!(names, vec!["types", "types_2", "types_3"]);
        assert_eq!(plan.types[2].types.len(), 1);
    }

    #[test]
    fn tagged_operations_group_by_tag() {
        let graph = graph_with(0);
        let ops = vec![
            op("/pets", &["Pets"]),
            op("/store", &["store"]),
            op("/pets/{id}", &["Pets"]),
        ];
        let plan = plan_split(&graph, &ops, &split(0, 0, 2));

        assert!(plan.base_operations.is_empty());
        let units: Vec<(&str, &[usize])> = plan
            .client_units
            .iter()
            .map(|u| (u.artifact.as_str(), u.operations.as_slice()))
            .collect();
        assert_eq!(
            units,
            vec![("client_pets", &[0, 2][..]), ("client_store", &[1][..])]
        );
    }

    #[test]
    fn partially_tagged_falls_back_to_path_prefix() {
        let graph = graph_with(0);
        let ops = vec![
            op("/users/{id}", &["users"]),
            op("/orders", &[]),
            op("/users", &[]),
            op("/", &[]),
        ];
        let plan = plan_split(&graph, &ops, &split(0, 0, 1));
        let names: Vec<&str> = plan
            .client_units
            .iter()
            .map(|u| u.artifact.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["client_orders", "client_root", "client_users", "client_users_2"]
        );
    }

    #[test]
    fn sequential_chunking_without_grouping() {
        let graph = graph_with(0);
        let ops: Vec<OperationBinding> = (0..5).map(|i| op(&format!("/x{i}"), &[])).collect();
        let config = SplitConfig {
            max_operations: 2,
            by_tag: false,
            by_path_prefix: false,
            ..SplitConfig::default()
        };
        let plan = plan_split(&graph, &ops, &config);
        let names: Vec<&str> = plan
            .client_units
            .iter()
            .map(|u| u.artifact.as_str())
            .collect();
        assert_eq!(names, vec!["client_1", "client_2", "client_3"]);
    }

    #[test]
    fn line_threshold_splits_operations() {
        let graph = graph_with(0);
        let ops = vec![op("/a", &[]), op("/b", &[]), op("/c", &[])];
        // Each bare operation is estimated at 30 lines
        let plan = plan_split(&graph, &ops, &split(70, 0, 0));
        assert!(plan.is_client_split());
        let total: usize = plan.client_units.iter().map(|u| u.operations.len()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_path_prefix() {
        assert_eq!(path_prefix("/user-profiles/{id}"), "user_profiles");
        assert_eq!(path_prefix("/{tenant}/items"), "items");
        assert_eq!(path_prefix("/"), "root");
    }
}
