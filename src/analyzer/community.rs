//! Community Detection
//!
//! Louvain modularity optimization over the undirected projection of the
//! transaction graph, followed by ring-suspicion scoring of each community.
//!
//! Nodes are visited in a fixed order and ties keep the lower community id,
//! so the partition is deterministic for a given input.

use super::graph_builder::TransactionGraph;
use super::types::*;
use crate::config::CommunityConfig;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Suspicion tier of a community, ordered from least to most suspicious
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuspicionLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SuspicionLevel {
    /// Tier for a community's internal ratio and average risk
    pub fn classify(internal_tx_ratio: f64, avg_risk: f64) -> Self {
        if internal_tx_ratio > 0.8 && avg_risk > 0.6 {
            SuspicionLevel::Critical
        } else if internal_tx_ratio > 0.7 && avg_risk > 0.5 {
            SuspicionLevel::High
        } else if internal_tx_ratio > 0.6 || avg_risk > 0.4 {
            SuspicionLevel::Medium
        } else {
            SuspicionLevel::Low
        }
    }
}

/// Aggregate statistics for one community
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityStats {
    /// Community id (stable within a run)
    pub id: usize,
    /// Member wallets, in graph order
    pub members: Vec<WalletAddress>,
    /// Number of members
    pub size: usize,
    /// Mean member risk score
    pub avg_risk: f64,
    /// Transactions inside the community / transactions touching it
    pub internal_tx_ratio: f64,
    /// Value of every transaction touching the community
    pub total_volume: f64,
    /// Ring suspicion tier
    pub suspicion_level: SuspicionLevel,
}

/// Community detection output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityResult {
    /// Communities of two or more wallets, most suspicious first
    pub communities: Vec<CommunityStats>,
    /// Communities at `high` or `critical` suspicion
    pub suspicious_communities: Vec<CommunityStats>,
    /// Number of partition classes, singletons included
    pub total_communities: usize,
    /// Modularity of the partition
    pub modularity: f64,
}

/// Weighted undirected graph used by the Louvain levels
#[derive(Debug, Clone)]
struct WeightedGraph {
    /// Neighbor weights, excluding self loops
    adjacency: Vec<BTreeMap<usize, f64>>,
    /// Self-loop weight per node
    self_loops: Vec<f64>,
}

impl WeightedGraph {
    fn from_transactions(graph: &TransactionGraph) -> Self {
        let n = graph.node_count();
        let mut adjacency = vec![BTreeMap::new(); n];
        let mut self_loops = vec![0.0; n];

        for (s, t, edge) in graph.edges() {
            let (s, t) = (s.index(), t.index());
            let w = edge.weight();
            if s == t {
                self_loops[s] += w;
            } else {
                *adjacency[s].entry(t).or_insert(0.0) += w;
                *adjacency[t].entry(s).or_insert(0.0) += w;
            }
        }

        Self {
            adjacency,
            self_loops,
        }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    fn degree(&self, node: usize) -> f64 {
        self.adjacency[node].values().sum::<f64>() + 2.0 * self.self_loops[node]
    }

    fn total_weight(&self) -> f64 {
        (0..self.len()).map(|i| self.degree(i)).sum::<f64>() / 2.0
    }

    /// Collapse each community into a single node
    fn aggregate(&self, communities: &[usize], count: usize) -> Self {
        let mut adjacency = vec![BTreeMap::new(); count];
        let mut self_loops = vec![0.0; count];

        for node in 0..self.len() {
            let c = communities[node];
            self_loops[c] += self.self_loops[node];
            for (&other, &w) in &self.adjacency[node] {
                if other < node {
                    continue;
                }
                let d = communities[other];
                if c == d {
                    self_loops[c] += w;
                } else {
                    *adjacency[c].entry(d).or_insert(0.0) += w;
                    *adjacency[d].entry(c).or_insert(0.0) += w;
                }
            }
        }

        Self {
            adjacency,
            self_loops,
        }
    }
}

/// Louvain community detector
#[derive(Debug, Clone)]
pub struct CommunityDetector {
    config: CommunityConfig,
}

impl CommunityDetector {
    /// Create a new community detector
    pub fn new(config: CommunityConfig) -> Self {
        Self { config }
    }

    /// Community id per node index
    pub fn partition(&self, graph: &TransactionGraph) -> Vec<usize> {
        let base = WeightedGraph::from_transactions(graph);
        let mut assignment: Vec<usize> = (0..base.len()).collect();
        if base.total_weight() == 0.0 {
            return assignment;
        }

        let mut level = base;
        loop {
            let (communities, count) = self.local_moving(&level);
            if count == level.len() {
                break;
            }
            for c in assignment.iter_mut() {
                *c = communities[*c];
            }
            level = level.aggregate(&communities, count);
        }

        assignment
    }

    /// One Louvain level: move nodes greedily, then renumber communities
    /// contiguously in order of first appearance
    fn local_moving(&self, graph: &WeightedGraph) -> (Vec<usize>, usize) {
        let n = graph.len();
        let m2 = 2.0 * graph.total_weight();
        let gamma = self.config.resolution;

        let degrees: Vec<f64> = (0..n).map(|i| graph.degree(i)).collect();
        let mut community: Vec<usize> = (0..n).collect();
        let mut totals = degrees.clone();

        for _ in 0..self.config.max_passes {
            let mut moved = false;

            for node in 0..n {
                let current = community[node];
                let k = degrees[node];

                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for (&other, &w) in &graph.adjacency[node] {
                    *links.entry(community[other]).or_insert(0.0) += w;
                }

                totals[current] -= k;
                let gain = |c: usize, w: f64| w - gamma * totals[c] * k / m2;

                let mut best = current;
                let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
                for (&c, &w) in &links {
                    let g = gain(c, w);
                    if g > best_gain + 1e-12 {
                        best = c;
                        best_gain = g;
                    }
                }

                totals[best] += k;
                if best != current {
                    community[node] = best;
                    moved = true;
                }
            }

            if !moved {
                break;
            }
        }

        let mut renumber: BTreeMap<usize, usize> = BTreeMap::new();
        let mut next = 0;
        let mut order = Vec::with_capacity(n);
        for &c in &community {
            let id = *renumber.entry(c).or_insert_with(|| {
                let id = next;
                next += 1;
                id
            });
            order.push(id);
        }

        (order, next)
    }

    /// Modularity of a partition of the undirected projection
    pub fn modularity(&self, graph: &TransactionGraph, assignment: &[usize]) -> f64 {
        let projected = WeightedGraph::from_transactions(graph);
        let m = projected.total_weight();
        if m == 0.0 {
            return 0.0;
        }

        let count = assignment.iter().copied().max().map_or(0, |c| c + 1);
        let mut internal = vec![0.0; count];
        let mut degree = vec![0.0; count];

        for node in 0..projected.len() {
            let c = assignment[node];
            degree[c] += projected.degree(node);
            internal[c] += projected.self_loops[node];
            for (&other, &w) in &projected.adjacency[node] {
                if other > node && assignment[other] == c {
                    internal[c] += w;
                }
            }
        }

        let gamma = self.config.resolution;
        (0..count)
            .map(|c| internal[c] / m - gamma * (degree[c] / (2.0 * m)).powi(2))
            .sum()
    }

    /// Detect communities and score each one for ring behaviour.
    ///
    /// `metrics` must be indexed by node index.
    pub fn detect(&self, graph: &TransactionGraph, metrics: &[NodeMetrics]) -> CommunityResult {
        if graph.is_empty() {
            return CommunityResult::default();
        }

        let assignment = self.partition(graph);
        let total_communities = assignment.iter().collect::<HashSet<_>>().len();
        let modularity = self.modularity(graph, &assignment);

        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (node, &c) in assignment.iter().enumerate() {
            groups.entry(c).or_default().push(node);
        }

        let mut communities: Vec<CommunityStats> = groups
            .into_iter()
            .filter(|(_, members)| members.len() >= 2)
            .map(|(id, members)| self.community_stats(id, &members, graph, metrics, &assignment))
            .collect();

        communities.sort_by(|a, b| {
            b.suspicion_level
                .cmp(&a.suspicion_level)
                .then_with(|| b.size.cmp(&a.size))
                .then_with(|| a.id.cmp(&b.id))
        });

        let suspicious_communities: Vec<CommunityStats> = communities
            .iter()
            .filter(|c| c.suspicion_level >= SuspicionLevel::High)
            .cloned()
            .collect();

        debug!(
            "Detected {} communities ({} reportable, {} suspicious), modularity {:.4}",
            total_communities,
            communities.len(),
            suspicious_communities.len(),
            modularity
        );

        CommunityResult {
            communities,
            suspicious_communities,
            total_communities,
            modularity,
        }
    }

    fn community_stats(
        &self,
        id: usize,
        members: &[usize],
        graph: &TransactionGraph,
        metrics: &[NodeMetrics],
        assignment: &[usize],
    ) -> CommunityStats {
        let avg_risk = members
            .iter()
            .map(|&i| metrics.get(i).map_or(0.0, |m| m.risk_score))
            .sum::<f64>()
            / members.len() as f64;

        let mut internal = 0usize;
        let mut touching = 0usize;
        let mut total_volume = 0.0;
        for (s, t, edge) in graph.edges() {
            let s_in = assignment[s.index()] == id;
            let t_in = assignment[t.index()] == id;
            if s_in || t_in {
                touching += 1;
                total_volume += edge.value;
                if s_in && t_in {
                    internal += 1;
                }
            }
        }

        let internal_tx_ratio = if touching > 0 {
            internal as f64 / touching as f64
        } else {
            0.0
        };

        CommunityStats {
            id,
            members: members
                .iter()
                .map(|&i| graph.address(petgraph::graph::NodeIndex::new(i)).to_string())
                .collect(),
            size: members.len(),
            avg_risk,
            internal_tx_ratio,
            total_volume,
            suspicion_level: SuspicionLevel::classify(internal_tx_ratio, avg_risk),
        }
    }
}
