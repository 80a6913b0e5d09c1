//! Feature-Graph Export
//!
//! Projects the flagged wallets (optionally with their one-hop neighbors)
//! into a feature-bearing graph for an external learner, plus the hybrid
//! labelling and the matrix views such a learner consumes. Read-only over
//! already computed metrics.

use super::graph_builder::TransactionGraph;
use super::types::*;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Micro score multiple of the threshold labelled as fraud
const FRAUD_LABEL_MULTIPLIER: f64 = 1.6;
/// Micro score multiple of the threshold labelled as clean
const CLEAN_LABEL_MULTIPLIER: f64 = 0.8;
/// Highest degree a threshold-labelled clean wallet may have
const CLEAN_LABEL_MAX_DEGREE: usize = 2;

/// Per-wallet feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFeatures {
    pub degree: usize,
    pub in_degree: usize,
    pub out_degree: usize,
    pub pagerank: f64,
    pub tx_entropy: f64,
    pub micro_score: f64,
    pub tx_freq: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureNode {
    pub id: WalletAddress,
    pub features: NodeFeatures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEdge {
    pub source: WalletAddress,
    pub target: WalletAddress,
    /// Transaction value
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGraphMetadata {
    pub total_suspicious_nodes: usize,
    pub risk_threshold: f64,
    pub include_neighbors: bool,
}

/// Risk-labelled subgraph with per-node features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGraph {
    pub nodes: Vec<FeatureNode>,
    pub edges: Vec<FeatureEdge>,
    pub metadata: FeatureGraphMetadata,
}

/// Training label of a wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeLabel {
    Fraud,
    Clean,
    Unknown,
}

/// Wallets of a feature graph split by label, each in node order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HybridLabels {
    pub fraud: Vec<WalletAddress>,
    pub clean: Vec<WalletAddress>,
    pub unknown: Vec<WalletAddress>,
}

impl HybridLabels {
    /// Label of a wallet, if it belongs to the labelled graph
    pub fn label_of(&self, wallet: &str) -> Option<NodeLabel> {
        let wallet = normalize_address(wallet);
        if self.fraud.contains(&wallet) {
            Some(NodeLabel::Fraud)
        } else if self.clean.contains(&wallet) {
            Some(NodeLabel::Clean)
        } else if self.unknown.contains(&wallet) {
            Some(NodeLabel::Unknown)
        } else {
            None
        }
    }

    /// Wallets carrying a training label
    pub fn labelled_count(&self) -> usize {
        self.fraud.len() + self.clean.len()
    }
}

impl FeatureGraph {
    /// Build the projection around `flagged` wallets.
    ///
    /// `metrics` must be indexed by node index. Unknown wallets in `flagged`
    /// are ignored.
    pub fn build(
        graph: &TransactionGraph,
        metrics: &[NodeMetrics],
        flagged: &[WalletAddress],
        risk_threshold: f64,
        include_neighbors: bool,
    ) -> Self {
        let mut selected: BTreeSet<NodeIndex> =
            flagged.iter().filter_map(|w| graph.node_index(w)).collect();

        if include_neighbors {
            let neighbors: Vec<NodeIndex> = selected
                .iter()
                .flat_map(|&idx| {
                    graph
                        .predecessors(idx)
                        .into_iter()
                        .chain(graph.successors(idx))
                })
                .collect();
            selected.extend(neighbors);
        }

        let nodes = selected
            .iter()
            .filter_map(|idx| metrics.get(idx.index()))
            .map(|m| FeatureNode {
                id: m.address.clone(),
                features: NodeFeatures {
                    degree: m.degree(),
                    in_degree: m.in_degree,
                    out_degree: m.out_degree,
                    pagerank: m.pagerank,
                    tx_entropy: m.entropy,
                    micro_score: m.risk_score,
                    tx_freq: m.tx_frequency,
                },
            })
            .collect();

        let edges = graph
            .edges()
            .filter(|(s, t, _)| selected.contains(s) && selected.contains(t))
            .map(|(s, t, edge)| FeatureEdge {
                source: graph.address(s).to_string(),
                target: graph.address(t).to_string(),
                weight: edge.value,
                timestamp: edge.timestamp,
            })
            .collect();

        Self {
            nodes,
            edges,
            metadata: FeatureGraphMetadata {
                total_suspicious_nodes: flagged.len(),
                risk_threshold,
                include_neighbors,
            },
        }
    }

    /// Split nodes into fraud / clean / unknown.
    ///
    /// Manual lists win over the score rules, and a wallet on both manual
    /// lists is labelled fraud. Only wallets present in the graph are labelled.
    pub fn hybrid_labels(&self, manual_fraud: &[&str], manual_clean: &[&str]) -> HybridLabels {
        let manual_fraud: HashSet<WalletAddress> =
            manual_fraud.iter().map(|w| normalize_address(w)).collect();
        let manual_clean: HashSet<WalletAddress> =
            manual_clean.iter().map(|w| normalize_address(w)).collect();

        let threshold = self.metadata.risk_threshold;
        let mut labels = HybridLabels::default();

        for node in &self.nodes {
            let f = &node.features;
            let label = if manual_fraud.contains(&node.id) {
                NodeLabel::Fraud
            } else if manual_clean.contains(&node.id) {
                NodeLabel::Clean
            } else if f.micro_score >= threshold * FRAUD_LABEL_MULTIPLIER {
                NodeLabel::Fraud
            } else if f.micro_score <= threshold * CLEAN_LABEL_MULTIPLIER
                && f.degree <= CLEAN_LABEL_MAX_DEGREE
            {
                NodeLabel::Clean
            } else {
                NodeLabel::Unknown
            };

            let bucket = match label {
                NodeLabel::Fraud => &mut labels.fraud,
                NodeLabel::Clean => &mut labels.clean,
                NodeLabel::Unknown => &mut labels.unknown,
            };
            bucket.push(node.id.clone());
        }

        labels
    }

    /// Rows of `[degree, in_degree, out_degree, pagerank, tx_entropy, micro_score]`
    pub fn feature_matrix(&self) -> Vec<[f64; 6]> {
        self.nodes
            .iter()
            .map(|n| {
                let f = &n.features;
                [
                    f.degree as f64,
                    f.in_degree as f64,
                    f.out_degree as f64,
                    f.pagerank,
                    f.tx_entropy,
                    f.micro_score,
                ]
            })
            .collect()
    }

    /// Edges as `(source, target)` positions into `nodes`
    pub fn edge_index(&self) -> Vec<(usize, usize)> {
        let position: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        self.edges
            .iter()
            .filter_map(|e| {
                let s = position.get(e.source.as_str())?;
                let t = position.get(e.target.as_str())?;
                Some((*s, *t))
            })
            .collect()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize feature graph")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn metric(address: &str, in_degree: usize, out_degree: usize, risk: f64) -> NodeMetrics {
        NodeMetrics {
            address: address.to_string(),
            in_degree,
            out_degree,
            pagerank: 0.1,
            entropy: 0.0,
            risk_score: risk,
            tx_frequency: 1.0,
            in_cycle: false,
        }
    }

    /// a -> b -> c -> d, with b flagged
    fn chain() -> (TransactionGraph, Vec<NodeMetrics>) {
        let txs = vec![
            Transaction::new("a", "b", 1.0, Utc::now()),
            Transaction::new("b", "c", 2.0, Utc::now()),
            Transaction::new("c", "d", 3.0, Utc::now()),
        ];
        let graph = TransactionGraph::from_transactions(&txs);
        let metrics = vec![
            metric("a", 0, 1, 0.1),
            metric("b", 1, 1, 0.9),
            metric("c", 1, 1, 0.5),
            metric("d", 1, 0, 0.1),
        ];
        (graph, metrics)
    }

    #[test]
    fn test_suspicious_only() {
        let (graph, metrics) = chain();
        let fg = FeatureGraph::build(&graph, &metrics, &["b".to_string()], 0.4, false);

        assert_eq!(fg.nodes.len(), 1);
        assert_eq!(fg.nodes[0].id, "b");
        assert_eq!(fg.nodes[0].features.degree, 2);
        assert!(fg.edges.is_empty());
        assert_eq!(fg.metadata.total_suspicious_nodes, 1);
        assert!(!fg.metadata.include_neighbors);
    }

    #[test]
    fn test_with_neighbors() {
        let (graph, metrics) = chain();
        let fg = FeatureGraph::build(&graph, &metrics, &["b".to_string()], 0.4, true);

        let ids: Vec<&str> = fg.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(fg.edges.len(), 2);
        assert_eq!(fg.edges[1].weight, 2.0);
        assert_eq!(fg.edge_index(), vec![(0, 1), (1, 2)]);
        assert_eq!(fg.metadata.total_suspicious_nodes, 1);
    }

    #[test]
    fn test_hybrid_labels() {
        let (graph, metrics) = chain();
        let all: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let fg = FeatureGraph::build(&graph, &metrics, &all, 0.4, false);

        let labels = fg.hybrid_labels(&["D"], &[]);
        // b: 0.9 >= 0.64; a: 0.1 <= 0.32 with degree 1; c: in between; d: manual
        assert_eq!(labels.fraud, vec!["b", "d"]);
        assert_eq!(labels.clean, vec!["a"]);
        assert_eq!(labels.unknown, vec!["c"]);
        assert_eq!(labels.label_of("D"), Some(NodeLabel::Fraud));
        assert_eq!(labels.label_of("zzz"), None);
        assert_eq!(labels.labelled_count(), 3);

        let manual_clean = fg.hybrid_labels(&[], &["b"]);
        assert_eq!(manual_clean.label_of("b"), Some(NodeLabel::Clean));
    }

    #[test]
    fn test_feature_matrix_and_json() {
        let (graph, metrics) = chain();
        let fg = FeatureGraph::build(&graph, &metrics, &["c".to_string()], 0.4, false);

        assert_eq!(fg.feature_matrix(), vec![[2.0, 1.0, 1.0, 0.1, 0.0, 0.5]]);

        let json: serde_json::Value = serde_json::from_str(&fg.to_json_pretty().unwrap()).unwrap();
        assert!(json["nodes"][0]["features"]["micro_score"].is_number());
        assert!(json["nodes"][0]["features"]["tx_freq"].is_number());
        assert_eq!(json["metadata"]["total_suspicious_nodes"], 1);
        assert_eq!(json["metadata"]["include_neighbors"], false);
    }
}
