//! Cycle Detector
//!
//! Depth-first traversal from every unvisited wallet, tracking the current
//! recursion stack. Reaching a successor that is still on the stack closes a
//! cycle: the path slice from that successor to the current wallet. Every
//! cycle met during the single pass is reported, without deduplication by
//! rotation or edge set.
//!
//! The traversal keeps its frames on the heap so deep chains cannot overflow
//! the call stack.

use super::graph_builder::TransactionGraph;
use petgraph::graph::NodeIndex;
use tracing::debug;

/// A DFS frame: the wallet and the next successor to explore
struct Frame {
    node: NodeIndex,
    successors: Vec<NodeIndex>,
    next: usize,
}

/// Cycle detector over a transaction graph
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleDetector;

impl CycleDetector {
    pub fn new() -> Self {
        Self
    }

    /// Find cycles as sequences of node indices
    pub fn detect(&self, graph: &TransactionGraph) -> Vec<Vec<NodeIndex>> {
        let n = graph.node_count();
        let mut visited = vec![false; n];
        // Position on the current path, if the node is on the recursion stack
        let mut path_position: Vec<Option<usize>> = vec![None; n];
        let mut path: Vec<NodeIndex> = Vec::new();
        let mut cycles = Vec::new();

        for root in graph.node_indices() {
            if visited[root.index()] {
                continue;
            }

            let mut stack = vec![self.enter(graph, root, &mut visited, &mut path_position, &mut path)];

            while let Some(frame) = stack.last_mut() {
                if frame.next < frame.successors.len() {
                    let succ = frame.successors[frame.next];
                    frame.next += 1;

                    if !visited[succ.index()] {
                        let child = self.enter(graph, succ, &mut visited, &mut path_position, &mut path);
                        stack.push(child);
                    } else if let Some(start) = path_position[succ.index()] {
                        // Self loops would give a one-wallet cycle
                        if path.len() - start >= 2 {
                            cycles.push(path[start..].to_vec());
                        }
                    }
                } else {
                    path_position[frame.node.index()] = None;
                    path.pop();
                    stack.pop();
                }
            }
        }

        debug!("Found {} cycles", cycles.len());
        cycles
    }

    /// Find cycles as sequences of wallet addresses
    pub fn detect_addresses(&self, graph: &TransactionGraph) -> Vec<Vec<String>> {
        self.detect(graph)
            .into_iter()
            .map(|cycle| cycle.into_iter().map(|n| graph.address(n).to_string()).collect())
            .collect()
    }

    fn enter(
        &self,
        graph: &TransactionGraph,
        node: NodeIndex,
        visited: &mut [bool],
        path_position: &mut [Option<usize>],
        path: &mut Vec<NodeIndex>,
    ) -> Frame {
        visited[node.index()] = true;
        path_position[node.index()] = Some(path.len());
        path.push(node);
        Frame {
            node,
            successors: graph.successors(node),
            next: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::types::Transaction;
    use chrono::Utc;

    fn graph(edges: &[(&str, &str)]) -> TransactionGraph {
        let txs: Vec<_> = edges
            .iter()
            .map(|(a, b)| Transaction::new(a, b, 1.0, Utc::now()))
            .collect();
        TransactionGraph::from_transactions(&txs)
    }

    fn assert_closed(graph: &TransactionGraph, cycle: &[NodeIndex]) {
        assert!(cycle.len() >= 2);
        for i in 0..cycle.len() {
            let from = cycle[i];
            let to = cycle[(i + 1) % cycle.len()];
            assert!(graph.has_edge(from, to), "missing edge in reported cycle");
        }
    }

    #[test]
    fn test_triangle() {
        let g = graph(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let cycles = CycleDetector::new().detect_addresses(&g);

        assert_eq!(cycles, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_acyclic_graph() {
        let g = graph(&[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(CycleDetector::new().detect(&g).is_empty());
    }

    #[test]
    fn test_self_loop_not_reported() {
        let g = graph(&[("a", "a"), ("a", "b")]);
        assert!(CycleDetector::new().detect(&g).is_empty());
    }

    #[test]
    fn test_reciprocal_pair() {
        let g = graph(&[("a", "b"), ("b", "a"), ("b", "a")]);
        let cycles = CycleDetector::new().detect_addresses(&g);
        assert_eq!(cycles, vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_overlapping_cycles_all_closed() {
        let g = graph(&[
            ("a", "b"),
            ("b", "c"),
            ("c", "a"),
            ("c", "d"),
            ("d", "b"),
            ("d", "e"),
            ("e", "a"),
        ]);
        let cycles = CycleDetector::new().detect(&g);

        assert!(cycles.len() >= 2);
        for cycle in &cycles {
            assert_closed(&g, cycle);
        }
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let names: Vec<String> = (0..50_000).map(|i| format!("w{}", i)).collect();
        let mut txs: Vec<Transaction> = names
            .windows(2)
            .map(|w| Transaction::new(&w[0], &w[1], 1.0, Utc::now()))
            .collect();
        txs.push(Transaction::new(&names[names.len() - 1], &names[0], 1.0, Utc::now()));
        let g = TransactionGraph::from_transactions(&txs);

        let cycles = CycleDetector::new().detect(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 50_000);
    }
}
