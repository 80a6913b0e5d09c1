//! Risk Scorer
//!
//! Combines degree, PageRank, flow imbalance and cycle membership into a
//! bounded composite score per wallet:
//!
//! | weight | term                                              |
//! |--------|---------------------------------------------------|
//! | 0.3    | `(in + out) / max total degree`                   |
//! | 0.3    | `pagerank / max pagerank`                         |
//! | 0.2    | `|in - out| / (in + out)`                         |
//! | 0.2    | flat bonus for membership in any detected cycle   |
//!
//! The dynamic threshold is the mean score of the run. Reason codes only
//! explain a score; they never change it.

use super::graph_builder::TransactionGraph;
use super::types::*;
use petgraph::graph::NodeIndex;
use std::cmp::Ordering;
use tracing::debug;

const DEGREE_WEIGHT: f64 = 0.3;
const PAGERANK_WEIGHT: f64 = 0.3;
const IMBALANCE_WEIGHT: f64 = 0.2;
const CYCLE_WEIGHT: f64 = 0.2;

const REASON_DEGREE: usize = 5;
const REASON_PAGERANK: f64 = 0.02;
const REASON_IMBALANCE: usize = 3;
const REASON_THRESHOLD_MULTIPLIER: f64 = 1.5;

/// Scores for every wallet of one run
#[derive(Debug, Clone, Default)]
pub struct RiskAssessment {
    /// Metrics indexed by node index
    pub metrics: Vec<NodeMetrics>,
    /// Mean risk score (the dynamic threshold)
    pub threshold: f64,
    /// Wallets at or above the threshold, by risk descending
    pub high_risk: Vec<HighRiskNode>,
}

/// Risk scorer
#[derive(Debug, Default, Clone, Copy)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score every wallet.
    ///
    /// `pagerank` is indexed by node index; `cycles` are the detector's output.
    pub fn assess(
        &self,
        graph: &TransactionGraph,
        pagerank: &[f64],
        cycles: &[Vec<NodeIndex>],
    ) -> RiskAssessment {
        let n = graph.node_count();
        if n == 0 {
            return RiskAssessment::default();
        }

        let mut in_cycle = vec![false; n];
        for node in cycles.iter().flatten() {
            in_cycle[node.index()] = true;
        }

        let max_degree = graph
            .node_indices()
            .map(|idx| graph.in_degree(idx) + graph.out_degree(idx))
            .max()
            .unwrap_or(0);
        let max_pagerank = pagerank.iter().copied().fold(0.0_f64, f64::max);

        let metrics: Vec<NodeMetrics> = graph
            .node_indices()
            .map(|idx| {
                let in_degree = graph.in_degree(idx);
                let out_degree = graph.out_degree(idx);
                let pr = pagerank.get(idx.index()).copied().unwrap_or(0.0);
                let cyclic = in_cycle[idx.index()];

                NodeMetrics {
                    address: graph.address(idx).to_string(),
                    in_degree,
                    out_degree,
                    pagerank: pr,
                    entropy: Self::value_entropy(graph, idx),
                    risk_score: Self::composite_score(
                        in_degree,
                        out_degree,
                        max_degree,
                        pr,
                        max_pagerank,
                        cyclic,
                    ),
                    tx_frequency: graph.stats(idx).tx_frequency(),
                    in_cycle: cyclic,
                }
            })
            .collect();

        let threshold = metrics.iter().map(|m| m.risk_score).sum::<f64>() / n as f64;

        let mut high_risk: Vec<HighRiskNode> = metrics
            .iter()
            .filter(|m| m.risk_score >= threshold)
            .map(|m| {
                let reasons = Self::reasons(m, threshold);
                let reason = if reasons.is_empty() {
                    "Above dynamic risk threshold".to_string()
                } else {
                    reasons
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")
                };
                HighRiskNode {
                    address: m.address.clone(),
                    risk: m.risk_score,
                    reason,
                    reasons,
                }
            })
            .collect();

        high_risk.sort_by(|a, b| match b.risk.total_cmp(&a.risk) {
            Ordering::Equal => a.address.cmp(&b.address),
            other => other,
        });

        debug!(
            "Risk threshold {:.4}: {} of {} wallets flagged",
            threshold,
            high_risk.len(),
            n
        );

        RiskAssessment {
            metrics,
            threshold,
            high_risk,
        }
    }

    /// Weighted composite score, clamped to [0, 1]
    pub fn composite_score(
        in_degree: usize,
        out_degree: usize,
        max_degree: usize,
        pagerank: f64,
        max_pagerank: f64,
        in_cycle: bool,
    ) -> f64 {
        let total = in_degree + out_degree;

        let degree_term = if max_degree > 0 {
            total as f64 / max_degree as f64
        } else {
            0.0
        };
        let pagerank_term = if max_pagerank > 0.0 {
            pagerank / max_pagerank
        } else {
            0.0
        };
        let imbalance_term = if total > 0 {
            in_degree.abs_diff(out_degree) as f64 / total as f64
        } else {
            0.0
        };
        let cycle_term = if in_cycle { 1.0 } else { 0.0 };

        let score = DEGREE_WEIGHT * degree_term
            + PAGERANK_WEIGHT * pagerank_term
            + IMBALANCE_WEIGHT * imbalance_term
            + CYCLE_WEIGHT * cycle_term;

        score.clamp(0.0, 1.0)
    }

    /// Shannon entropy (bits) of the values of every incident transaction
    pub fn value_entropy(graph: &TransactionGraph, node: NodeIndex) -> f64 {
        let values: Vec<f64> = graph
            .incoming(node)
            .chain(graph.outgoing(node))
            .map(|(_, edge)| edge.value)
            .collect();
        shannon_entropy(&values)
    }

    fn reasons(metrics: &NodeMetrics, threshold: f64) -> Vec<RiskReason> {
        let mut reasons = Vec::new();

        if metrics.degree() > REASON_DEGREE {
            reasons.push(RiskReason::HighVolume(metrics.degree()));
        }
        if metrics.pagerank > REASON_PAGERANK {
            reasons.push(RiskReason::HighInfluence(metrics.pagerank));
        }
        if metrics.in_cycle {
            reasons.push(RiskReason::CircularFlow);
        }
        if metrics.in_degree.abs_diff(metrics.out_degree) > REASON_IMBALANCE {
            reasons.push(RiskReason::ImbalancedFlow {
                inbound: metrics.in_degree,
                outbound: metrics.out_degree,
            });
        }
        if threshold > 0.0 && metrics.risk_score >= threshold * REASON_THRESHOLD_MULTIPLIER {
            reasons.push(RiskReason::FarAboveThreshold);
        }

        reasons
    }
}

/// `-Σ p·log2(p)` over values normalized by their sum; 0 for empty or
/// all-zero input
pub fn shannon_entropy(values: &[f64]) -> f64 {
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    if total <= 0.0 {
        return 0.0;
    }

    let entropy: f64 = values
        .iter()
        .filter(|v| **v > 0.0)
        .map(|v| {
            let p = v / total;
            -p * p.log2()
        })
        .sum();

    entropy.max(0.0)
}
