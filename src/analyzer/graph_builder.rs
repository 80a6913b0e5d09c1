//! Transaction Graph Builder
//!
//! Constructs a directed multigraph from validated transaction records.
//! Every transaction becomes its own edge, so parallel transfers between the
//! same pair of wallets are kept side by side in petgraph's edge arena.

use super::types::*;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;
use tracing::{debug, warn};

/// Transaction graph structure
#[derive(Debug, Clone, Default)]
pub struct TransactionGraph {
    /// The underlying directed graph
    graph: DiGraph<WalletAddress, TransactionEdge>,
    /// Map from wallet address to node index
    wallet_to_node: HashMap<WalletAddress, NodeIndex>,
    /// Node statistics, indexed like the graph nodes
    node_stats: Vec<NodeStats>,
    /// Transactions dropped for a missing endpoint
    skipped: usize,
}

impl TransactionGraph {
    /// Create a new empty transaction graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from an ordered list of transactions
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let start = Instant::now();
        let mut graph = Self::new();

        for tx in transactions {
            graph.add_transaction(tx);
        }

        if graph.skipped > 0 {
            warn!(
                "Skipped {} transactions with a missing endpoint",
                graph.skipped
            );
        }
        debug!(
            "Graph built in {}ms: {} nodes, {} edges",
            start.elapsed().as_millis(),
            graph.node_count(),
            graph.edge_count()
        );

        graph
    }

    /// Get or create a node for a wallet address
    fn get_or_create_node(&mut self, wallet: &str) -> NodeIndex {
        if let Some(&idx) = self.wallet_to_node.get(wallet) {
            return idx;
        }

        let idx = self.graph.add_node(wallet.to_string());
        self.wallet_to_node.insert(wallet.to_string(), idx);
        self.node_stats.push(NodeStats::default());
        idx
    }

    /// Add a transaction edge to the graph.
    ///
    /// Returns the new edge, or `None` when the transaction lacks an endpoint
    /// and was skipped.
    pub fn add_transaction(&mut self, tx: &Transaction) -> Option<EdgeIndex> {
        let from = normalize_address(&tx.from);
        let to = normalize_address(&tx.to);
        if from.is_empty() || to.is_empty() {
            self.skipped += 1;
            return None;
        }

        let from_idx = self.get_or_create_node(&from);
        let to_idx = self.get_or_create_node(&to);
        let edge = self.graph.add_edge(from_idx, to_idx, TransactionEdge::from(tx));

        let sender = &mut self.node_stats[from_idx.index()];
        sender.out_degree += 1;
        sender.total_sent += tx.value;
        sender.observe(tx.timestamp);

        let recipient = &mut self.node_stats[to_idx.index()];
        recipient.in_degree += 1;
        recipient.total_received += tx.value;
        recipient.observe(tx.timestamp);

        Some(edge)
    }

    /// Number of wallets
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of transactions
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph holds no wallets
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Transactions skipped during building
    pub fn skipped_transactions(&self) -> usize {
        self.skipped
    }

    /// Node indices in insertion order
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Wallet addresses in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_weights().map(String::as_str)
    }

    /// Look up the node for a wallet
    pub fn node_index(&self, wallet: &str) -> Option<NodeIndex> {
        self.wallet_to_node.get(&normalize_address(wallet)).copied()
    }

    /// Address of a node
    pub fn address(&self, node: NodeIndex) -> &str {
        &self.graph[node]
    }

    /// Get node statistics for a wallet
    pub fn get_node_stats(&self, wallet: &str) -> Option<&NodeStats> {
        self.node_index(wallet).map(|idx| &self.node_stats[idx.index()])
    }

    /// Statistics of a node
    pub fn stats(&self, node: NodeIndex) -> &NodeStats {
        &self.node_stats[node.index()]
    }

    /// Outgoing transaction count
    pub fn out_degree(&self, node: NodeIndex) -> usize {
        self.node_stats[node.index()].out_degree
    }

    /// Incoming transaction count
    pub fn in_degree(&self, node: NodeIndex) -> usize {
        self.node_stats[node.index()].in_degree
    }

    /// Distinct successors, in insertion order
    pub fn successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.distinct_neighbors(node, Direction::Outgoing)
    }

    /// Distinct predecessors, in insertion order
    pub fn predecessors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.distinct_neighbors(node, Direction::Incoming)
    }

    fn distinct_neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let set: BTreeSet<NodeIndex> = self.graph.neighbors_directed(node, direction).collect();
        set.into_iter().collect()
    }

    /// Whether at least one transaction goes from `from` to `to`
    pub fn has_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.graph.contains_edge(from, to)
    }

    /// Outgoing transactions of a node as `(target, edge)` pairs
    pub fn outgoing(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, &TransactionEdge)> {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
    }

    /// Incoming transactions of a node as `(source, edge)` pairs
    pub fn incoming(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, &TransactionEdge)> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
    }

    /// Every transaction as `(source, target, edge)`, in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &TransactionEdge)> {
        self.graph
            .edge_references()
            .map(|e| (e.source(), e.target(), e.weight()))
    }

    /// Get edges from a specific wallet
    pub fn get_edges_from(&self, wallet: &str) -> Vec<&TransactionEdge> {
        match self.node_index(wallet) {
            Some(idx) => self.outgoing(idx).map(|(_, edge)| edge).collect(),
            None => Vec::new(),
        }
    }

    /// Get the internal graph (for petgraph algorithms)
    #[cfg(test)]
    pub(crate) fn graph(&self) -> &DiGraph<WalletAddress, TransactionEdge> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tx(from: &str, to: &str, value: f64) -> Transaction {
        Transaction::new(from, to, value, Utc::now())
    }

    #[test]
    fn test_graph_creation() {
        let graph = TransactionGraph::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_add_transaction() {
        let mut graph = TransactionGraph::new();
        assert!(graph.add_transaction(&tx("wallet1", "wallet2", 10.0)).is_some());

        assert_eq!(graph.nodes().count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_parallel_edges_are_kept() {
        let graph = TransactionGraph::from_transactions(&[
            tx("a", "b", 1.0),
            tx("a", "b", 2.0),
            tx("A", "B", 3.0),
        ]);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 3);

        let a = graph.node_index("a").unwrap();
        let b = graph.node_index("b").unwrap();
        assert_eq!(graph.out_degree(a), 3);
        assert_eq!(graph.in_degree(b), 3);
        assert_eq!(graph.successors(a), vec![b]);
        assert_eq!(graph.get_edges_from("a").len(), 3);
    }

    #[test]
    fn test_missing_endpoint_is_skipped() {
        let mut bad = tx("a", "b", 1.0);
        bad.to = String::new();
        let graph = TransactionGraph::from_transactions(&[bad, tx("c", "d", 1.0)]);

        assert_eq!(graph.skipped_transactions(), 1);
        assert_eq!(graph.node_count(), 2);
        assert!(graph.node_index("a").is_none());
    }

    #[test]
    fn test_node_stats() {
        let graph = TransactionGraph::from_transactions(&[tx("wallet1", "wallet2", 1000.0)]);

        let stats = graph.get_node_stats("wallet1").unwrap();
        assert_eq!(stats.out_degree, 1);
        assert_eq!(stats.total_sent, 1000.0);

        let stats = graph.get_node_stats("WALLET2").unwrap();
        assert_eq!(stats.in_degree, 1);
        assert_eq!(stats.total_received, 1000.0);
    }

    #[test]
    fn test_neighbors() {
        let graph = TransactionGraph::from_transactions(&[
            tx("w1", "w2", 100.0),
            tx("w2", "w3", 200.0),
            tx("w3", "w1", 300.0),
        ]);

        let w1 = graph.node_index("w1").unwrap();
        let w3 = graph.node_index("w3").unwrap();
        assert_eq!(graph.predecessors(w1), vec![w3]);
        assert!(graph.has_edge(w3, w1));
        assert!(!graph.has_edge(w1, w3));
    }
}
