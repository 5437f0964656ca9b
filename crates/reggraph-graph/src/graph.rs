use std::collections::HashMap;
use std::sync::Arc;

use reggraph_core::{ImpactEdge, NodeRef};

/// A tenant's active edges indexed both ways. Immutable once built; readers
/// share it through an `Arc` without locks, and a stale copy is replaced
/// wholesale by the next build.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    outgoing: HashMap<NodeRef, Vec<Arc<ImpactEdge>>>,
    incoming: HashMap<NodeRef, Vec<Arc<ImpactEdge>>>,
    edges: Vec<Arc<ImpactEdge>>,
}

impl DependencyGraph {
    /// Buckets `edges` into both adjacency maps. Inactive edges are skipped,
    /// so a graph built from a raw edge dump still only describes the live
    /// topology. Adjacency order follows the input order per source.
    pub fn from_edges(edges: Vec<ImpactEdge>) -> Self {
        let mut graph = Self::default();
        for edge in edges {
            if !edge.active {
                continue;
            }
            let edge = Arc::new(edge);
            graph
                .outgoing
                .entry(edge.source)
                .or_default()
                .push(edge.clone());
            graph
                .incoming
                .entry(edge.target)
                .or_default()
                .push(edge.clone());
            graph.edges.push(edge);
        }
        graph
    }

    /// Edges whose source is `node`.
    pub fn outgoing(&self, node: &NodeRef) -> &[Arc<ImpactEdge>] {
        self.outgoing.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Edges whose target is `node`.
    pub fn incoming(&self, node: &NodeRef) -> &[Arc<ImpactEdge>] {
        self.incoming.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edges(&self) -> &[Arc<ImpactEdge>] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of distinct nodes that appear on either end of an edge.
    pub fn node_count(&self) -> usize {
        let mut nodes: std::collections::HashSet<NodeRef> =
            self.outgoing.keys().copied().collect();
        nodes.extend(self.incoming.keys().copied());
        nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
