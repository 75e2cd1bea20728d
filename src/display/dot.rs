//! Graphviz export. Edges point from parent to child, the direction in which
//! invalidation travels.
use crate::store::registry::Registry;
use crate::store::types::{Kind, QuantityId};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};

/// Edge weights are empty labels; `Dot` needs them to be displayable.
pub type QuantityGraph = DiGraph<String, &'static str>;

/// Mirrors the registry as a petgraph graph. Node `i` is quantity `i`.
pub fn to_graph(registry: &Registry) -> QuantityGraph {
    let mut graph = DiGraph::with_capacity(registry.count(), registry.edge_count());
    for (_, q) in registry.iter() {
        graph.add_node(q.name().to_string());
    }
    for (parent, child) in registry.edges() {
        graph.add_edge(NodeIndex::new(parent.index()), NodeIndex::new(child.index()), "");
    }
    graph
}

pub fn to_dot(registry: &Registry) -> String {
    let graph = to_graph(registry);
    let edge_attrs = |_: &QuantityGraph, _: EdgeReference<'_, &'static str>| String::new();
    let node_attrs = |_: &QuantityGraph, (idx, _): (NodeIndex, &String)| {
        let q = registry.get(QuantityId::new(idx.index()));
        let shape = match q.kind() {
            Kind::Value => "box",
            Kind::Mask => "ellipse",
            Kind::Field => "doubleoctagon",
        };
        let style = if q.updater().is_some() { "" } else { ", style=filled, fillcolor=lightgrey" };
        format!("label=\"{}\", shape={shape}{style}", q.name())
    };
    let dot = Dot::with_attr_getters(
        &graph,
        &[Config::NodeNoLabel, Config::EdgeNoLabel, Config::GraphContentOnly],
        &edge_attrs,
        &node_attrs,
    );
    format!("digraph Physics {{\n    rankdir=LR;\n{dot}}}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{QuantityMetadata, Unit};

    #[test]
    fn test_edges_point_parent_to_child() {
        let mut reg = Registry::new();
        let t = reg.add(QuantityMetadata::new("t", Unit::default()), 1, Kind::Value, None).unwrap();
        let b = reg.add(QuantityMetadata::new("B_ext", Unit::default()), 3, Kind::Value, None).unwrap();
        reg.depends(b, t).unwrap();

        let graph = to_graph(&reg);
        assert_eq!(graph.node_count(), 2);
        assert!(graph.find_edge(NodeIndex::new(0), NodeIndex::new(1)).is_some());
        assert!(graph.find_edge(NodeIndex::new(1), NodeIndex::new(0)).is_none());

        let dot = to_dot(&reg);
        assert!(dot.starts_with("digraph Physics {"));
        assert!(dot.contains("0 -> 1"));
        assert!(dot.contains("label=\"B_ext\""));
    }
}
