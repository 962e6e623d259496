//! A small fixed-order directed graph used to represent strategy transition structure.

use std::collections::HashMap;

use petgraph::graphmap::DiGraphMap;

/// A directed graph over a fixed set of vertices `0..order`, without self-parallel edges (a link
/// is either present or absent between any ordered pair of vertices).
///
/// This is deliberately a thin, general-purpose graph type — the 16-vertex
/// [intra-transition graph](crate::Strategy::itg) and its noise-augmented variants used by the
/// topological checks are built on top of it, but nothing here is specific to strategies with
/// 16 states.
#[derive(Clone, Debug)]
pub struct DirectedGraph {
    order: usize,
    edges: DiGraphMap<u32, ()>,
}

impl DirectedGraph {
    /// Construct an edgeless graph on `order` vertices, numbered `0..order`.
    pub fn new(order: usize) -> Self {
        let mut edges = DiGraphMap::new();
        for v in 0..order as u32 {
            edges.add_node(v);
        }
        DirectedGraph { order, edges }
    }

    /// The number of vertices in the graph.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Add a directed link from `from` to `to`. Idempotent: adding a link that already exists is
    /// a no-op.
    pub fn add_link(&mut self, from: usize, to: usize) {
        self.edges.add_edge(from as u32, to as u32, ());
    }

    /// Is there a direct link from `from` to `to`?
    pub fn has_link(&self, from: usize, to: usize) -> bool {
        self.edges.contains_edge(from as u32, to as u32)
    }

    /// Is `to` reachable from `from` by a directed walk of length at least 1?
    ///
    /// In particular, `reachable(u, u)` is true iff `u` lies on a cycle (including a self-loop),
    /// not trivially true for every vertex — this is the convention adopted to resolve the open
    /// question in the source specification, matching how the topological efficiency and
    /// distinguishability checks use this query.
    pub fn reachable(&self, from: usize, to: usize) -> bool {
        let target = to as u32;
        let mut stack: Vec<u32> = self.edges.neighbors(from as u32).collect();
        let mut visited: Vec<bool> = vec![false; self.order];
        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            let idx = node as usize;
            if !visited[idx] {
                visited[idx] = true;
                stack.extend(self.edges.neighbors(node));
            }
        }
        false
    }

    /// The strongly connected components that are sinks in the condensation DAG, i.e. those with
    /// no edge leaving the component. Returned as a list of vertex-index sets; the order of both
    /// the outer list and each inner set is unspecified but deterministic for a given graph.
    pub fn sink_sccs(&self) -> Vec<Vec<usize>> {
        let components = petgraph::algo::tarjan_scc(&self.edges);

        let mut component_of: HashMap<u32, usize> = HashMap::new();
        for (idx, component) in components.iter().enumerate() {
            for &node in component {
                component_of.insert(node, idx);
            }
        }

        let mut is_sink = vec![true; components.len()];
        for (idx, component) in components.iter().enumerate() {
            for &node in component {
                for neighbor in self.edges.neighbors(node) {
                    if component_of[&neighbor] != idx {
                        is_sink[idx] = false;
                    }
                }
            }
        }

        components
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| is_sink[*idx])
            .map(|(_, component)| component.into_iter().map(|n| n as usize).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_link_reflects_additions() {
        let mut g = DirectedGraph::new(4);
        assert!(!g.has_link(0, 1));
        g.add_link(0, 1);
        assert!(g.has_link(0, 1));
        assert!(!g.has_link(1, 0));
    }

    #[test]
    fn add_link_is_idempotent() {
        let mut g = DirectedGraph::new(3);
        g.add_link(0, 1);
        g.add_link(0, 1);
        assert!(g.has_link(0, 1));
    }

    #[test]
    fn reachable_requires_nonzero_length() {
        let mut g = DirectedGraph::new(3);
        g.add_link(0, 1);
        g.add_link(1, 2);
        assert!(!g.reachable(0, 0));
        assert!(g.reachable(0, 1));
        assert!(g.reachable(0, 2));
        assert!(!g.reachable(2, 0));
    }

    #[test]
    fn reachable_true_at_self_loop_or_cycle() {
        let mut g = DirectedGraph::new(2);
        g.add_link(0, 1);
        g.add_link(1, 0);
        assert!(g.reachable(0, 0));
        assert!(g.reachable(1, 1));
    }

    #[test]
    fn sink_sccs_excludes_components_with_outgoing_edges() {
        let mut g = DirectedGraph::new(4);
        // 0 -> 1 -> 0 is a cycle with an edge out to the 2 -> 3 -> 2 cycle.
        g.add_link(0, 1);
        g.add_link(1, 0);
        g.add_link(1, 2);
        g.add_link(2, 3);
        g.add_link(3, 2);

        let sinks = g.sink_sccs();
        assert_eq!(sinks.len(), 1);
        let mut sink = sinks[0].clone();
        sink.sort();
        assert_eq!(sink, vec![2, 3]);
    }

    #[test]
    fn functional_graph_has_one_sink_per_orbit() {
        // Every vertex has out-degree 1, forming a rho-shape: a tail into a 2-cycle.
        let mut g = DirectedGraph::new(4);
        g.add_link(0, 1);
        g.add_link(1, 2);
        g.add_link(2, 3);
        g.add_link(3, 2);

        let sinks = g.sink_sccs();
        assert_eq!(sinks.len(), 1);
        let mut sink = sinks[0].clone();
        sink.sort();
        assert_eq!(sink, vec![2, 3]);
    }
}
