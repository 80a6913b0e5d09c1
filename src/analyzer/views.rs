//! Read-only projections of an analysis run for rendering and tabular export.

use super::graph_builder::TransactionGraph;
use super::types::*;
use chrono::{DateTime, Utc};
use petgraph::graph::NodeIndex;
use serde::Serialize;

/// Addresses longer than this are shortened in view labels
const LABEL_MAX_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewNode {
    pub id: WalletAddress,
    /// Shortened address for display
    pub label: String,
    pub risk: f64,
    pub pagerank: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewEdge {
    pub source: WalletAddress,
    pub target: WalletAddress,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Graph for visualization: one node per wallet, one edge per transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphView {
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
}

impl GraphView {
    /// `metrics` must be indexed by node index
    pub fn build(graph: &TransactionGraph, metrics: &[NodeMetrics]) -> Self {
        let nodes = metrics
            .iter()
            .map(|m| ViewNode {
                id: m.address.clone(),
                label: short_label(&m.address),
                risk: m.risk_score,
                pagerank: m.pagerank,
            })
            .collect();

        let edges = graph
            .edges()
            .map(|(s, t, edge)| ViewEdge {
                source: graph.address(s).to_string(),
                target: graph.address(t).to_string(),
                value: edge.value,
                timestamp: edge.timestamp,
            })
            .collect();

        Self { nodes, edges }
    }
}

/// One row of the per-wallet metrics table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedMetrics {
    pub wallet_address: WalletAddress,
    pub degree: usize,
    pub in_degree: usize,
    pub out_degree: usize,
    pub pagerank: f64,
    pub tx_entropy: f64,
    pub micro_score: f64,
    pub tx_freq: f64,
    /// Distinct senders to this wallet
    pub in_neighbors: Vec<WalletAddress>,
    /// Distinct recipients of this wallet
    pub out_neighbors: Vec<WalletAddress>,
}

impl DetailedMetrics {
    /// One row per wallet, in graph order
    pub fn rows(graph: &TransactionGraph, metrics: &[NodeMetrics]) -> Vec<Self> {
        graph
            .node_indices()
            .filter_map(|idx| {
                let m = metrics.get(idx.index())?;
                let addresses = |nodes: Vec<NodeIndex>| {
                    nodes
                        .into_iter()
                        .map(|n| graph.address(n).to_string())
                        .collect::<Vec<_>>()
                };

                Some(DetailedMetrics {
                    wallet_address: m.address.clone(),
                    degree: m.degree(),
                    in_degree: m.in_degree,
                    out_degree: m.out_degree,
                    pagerank: m.pagerank,
                    tx_entropy: m.entropy,
                    micro_score: m.risk_score,
                    tx_freq: m.tx_frequency,
                    in_neighbors: addresses(graph.predecessors(idx)),
                    out_neighbors: addresses(graph.successors(idx)),
                })
            })
            .collect()
    }
}

/// `0x1234...abcd` style label
pub fn short_label(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= LABEL_MAX_LEN {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_label() {
        assert_eq!(short_label("alice"), "alice");
        assert_eq!(
            short_label("0x52908400098527886e0f7030069857d2e4169ee7"),
            "0x5290...9ee7"
        );
    }

    #[test]
    fn test_views() {
        let txs = vec![
            Transaction::new("a", "b", 5.0, Utc::now()),
            Transaction::new("a", "b", 7.0, Utc::now()),
            Transaction::new("c", "a", 1.0, Utc::now()),
        ];
        let graph = TransactionGraph::from_transactions(&txs);
        let metrics: Vec<NodeMetrics> = graph
            .node_indices()
            .map(|idx| NodeMetrics {
                address: graph.address(idx).to_string(),
                in_degree: graph.in_degree(idx),
                out_degree: graph.out_degree(idx),
                pagerank: 0.0,
                entropy: 0.0,
                risk_score: 0.0,
                tx_frequency: 0.0,
                in_cycle: false,
            })
            .collect();

        let view = GraphView::build(&graph, &metrics);
        assert_eq!(view.nodes.len(), 3);
        assert_eq!(view.edges.len(), 3);
        assert_eq!(view.edges[1].value, 7.0);

        let rows = DetailedMetrics::rows(&graph, &metrics);
        assert_eq!(rows[0].wallet_address, "a");
        assert_eq!(rows[0].degree, 3);
        assert_eq!(rows[0].out_neighbors, vec!["b"]);
        assert_eq!(rows[0].in_neighbors, vec!["c"]);

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert!(json.get("wallet_address").is_some());
        assert!(json.get("tx_entropy").is_some());
    }
}
