//! Graph post-processing: alias loops and by-value containment cycles.

use super::graph::{ScalarKind, TypeGraph, TypeId, TypeKind};

/// Replace aliases that lead back to themselves (`A: $ref B`, `B: $ref A`)
/// with an open type. Returns the nodes that were rewritten.
pub fn break_alias_loops(graph: &mut TypeGraph) -> Vec<TypeId> {
    let mut broken = Vec::new();
    for index in 0..graph.len() {
        let start = TypeId(index);
        let mut current = start;
        let mut steps = 0;
        while let TypeKind::Alias { target } = graph.get(current).kind {
            if target == start {
                broken.push(start);
                break;
            }
            current = target;
            steps += 1;
            if steps > graph.len() {
                // Loop that does not pass through `start`; handled when its members come up
                break;
            }
        }
    }

    let any = graph.scalar(ScalarKind::Any);
    for id in &broken {
        graph.get_mut(*id).kind = TypeKind::Alias { target: any };
    }
    broken
}

/// Mark the closing field of every by-value containment cycle as indirect.
///
/// An edge runs from a struct to the struct type of each of its fields that
/// would be emitted by value. Depth-first search finds a back edge in every
/// cycle; making that field a pointer breaks the cycle. Returns the number of
/// fields marked.
pub fn mark_indirections(graph: &mut TypeGraph, optional_pointers: bool) -> usize {
    let edges: Vec<Vec<(usize, TypeId)>> = graph
        .nodes()
        .iter()
        .map(|node| match &node.kind {
            TypeKind::Struct(s) => s
                .fields
                .iter()
                .enumerate()
                .filter(|(_, f)| !graph.field_is_pointer(f, optional_pointers))
                .filter_map(|(i, f)| {
                    let target = graph.resolve_alias(f.ty);
                    matches!(graph.get(target).kind, TypeKind::Struct(_)).then_some((i, target))
                })
                .collect(),
            _ => Vec::new(),
        })
        .collect();

    let mut color = vec![Color::White; graph.len()];
    let mut back_edges = Vec::new();
    for start in 0..graph.len() {
        if color[start] == Color::White {
            visit(start, &edges, &mut color, &mut back_edges);
        }
    }

    for (node, field) in &back_edges {
        if let TypeKind::Struct(s) = &mut graph.get_mut(TypeId(*node)).kind {
            s.fields[*field].indirect = true;
        }
    }
    back_edges.len()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

fn visit(
    node: usize,
    edges: &[Vec<(usize, TypeId)>],
    color: &mut [Color],
    back_edges: &mut Vec<(usize, usize)>,
) {
    color[node] = Color::Gray;
    for (field, target) in &edges[node] {
        match color[target.0] {
            Color::Gray => back_edges.push((node, *field)),
            Color::White => visit(target.0, edges, color, back_edges),
            Color::Black => {}
        }
    }
    color[node] = Color::Black;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_processor::graph::{FieldNode, StructType};

    fn required_field(wire: &str, ty: TypeId) -> FieldNode {
        let mut field = FieldNode::new(wire, wire.to_uppercase(), ty);
        field.required = true;
        field
    }

    #[test]
    fn required_self_reference_becomes_indirect() {
        let mut graph = TypeGraph::new();
        let node = graph.declare("Node".into(), Some("Node".into()));
        graph.get_mut(node).kind = TypeKind::Struct(StructType {
            fields: vec![required_field("next", node)],
            additional: None,
        });

        assert_eq!(mark_indirections(&mut graph, true), 1);
        let s = graph.struct_type(node).unwrap();
        assert!(s.fields[0].indirect);
    }

    #[test]
    fn slices_break_cycles_on_their_own() {
        let mut graph = TypeGraph::new();
        let node = graph.declare("Node".into(), Some("Node".into()));
        let children = graph.slice(node);
        graph.get_mut(node).kind = TypeKind::Struct(StructType {
            fields: vec![required_field("children", children)],
            additional: None,
        });

        assert_eq!(mark_indirections(&mut graph, true), 0);
    }

    #[test]
    fn mutual_cycle_gets_one_pointer() {
        let mut graph = TypeGraph::new();
        let a = graph.declare("A".into(), Some("A".into()));
        let b = graph.declare("B".into(), Some("B".into()));
        graph.get_mut(a).kind = TypeKind::Struct(StructType {
            fields: vec![required_field("b", b)],
            additional: None,
        });
        graph.get_mut(b).kind = TypeKind::Struct(StructType {
            fields: vec![required_field("a", a)],
            additional: None,
        });

        assert_eq!(mark_indirections(&mut graph, false), 1);
        assert!(graph.struct_type(b).unwrap().fields[0].indirect);
        assert!(!graph.struct_type(a).unwrap().fields[0].indirect);
    }

    #[test]
    fn alias_loop_is_broken() {
        let mut graph = TypeGraph::new();
        let a = graph.declare("A".into(), Some("A".into()));
        let b = graph.declare("B".into(), Some("B".into()));
        graph.get_mut(a).kind = TypeKind::Alias { target: b };
        graph.get_mut(b).kind = TypeKind::Alias { target: a };

        let broken = break_alias_loops(&mut graph);
        assert_eq!(broken, vec![a, b]);
        assert!(matches!(
            graph.get(graph.resolve_alias(a)).kind,
            TypeKind::Scalar { scalar: ScalarKind::Any }
        ));
    }
}
