//! Layered search graph.
//!
//! For a target length `L` the graph has `L` layers, one per sequence
//! position. A node is an (item, position) pair, so the same track appears
//! once per layer and the graph is acyclic by construction. Edges run from
//! every node in layer `p` to every node in layer `p + 1` with a different
//! item; they are implicit and scored through the shared compatibility matrix.

use crate::compatibility::CompatibilityMatrix;

/// One (item, position) node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphNode {
    /// Index into the deduplicated track pool
    pub item: usize,
    pub position: usize,
}

#[derive(Debug)]
pub struct PlaylistGraph {
    layers: Vec<Vec<GraphNode>>,
}

impl PlaylistGraph {
    /// Build `length` layers over every item in `matrix`.
    ///
    /// Layer 0 holds only `start` when given; the start item is then left
    /// out of every later layer.
    pub fn build(matrix: &CompatibilityMatrix, length: usize, start: Option<usize>) -> Self {
        let node = |item: usize, position: usize| GraphNode { item, position };

        let layers: Vec<Vec<GraphNode>> = (0..length)
            .map(|position| match (position, start) {
                (0, Some(start)) => vec![node(start, 0)],
                (_, Some(start)) => (0..matrix.len())
                    .filter(|&item| item != start)
                    .map(|item| node(item, position))
                    .collect(),
                (_, None) => (0..matrix.len()).map(|item| node(item, position)).collect(),
            })
            .collect();

        log::trace!(
            "Built search graph: {} layers, {} nodes",
            layers.len(),
            layers.iter().map(Vec::len).sum::<usize>()
        );
        Self { layers }
    }

    /// Number of layers (the effective target length)
    pub fn length(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.first().map_or(true, Vec::is_empty)
    }

    pub fn layer(&self, position: usize) -> &[GraphNode] {
        self.layers.get(position).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// Nodes in the next layer reachable from `node` (any different item)
    pub fn successors(&self, node: GraphNode) -> impl Iterator<Item = &GraphNode> + '_ {
        self.layer(node.position + 1)
            .iter()
            .filter(move |next| next.item != node.item)
    }

    /// Every layer is populated and each later layer can still supply a
    /// distinct item for each remaining position
    pub fn validate(&self) -> bool {
        let Some(first) = self.layers.first() else {
            return true;
        };
        !first.is_empty()
            && self
                .layers
                .iter()
                .skip(1)
                .all(|layer| layer.len() + 1 >= self.layers.len())
    }
}
