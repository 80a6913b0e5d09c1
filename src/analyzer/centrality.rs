//! PageRank centrality
//!
//! Power iteration with teleportation over the transaction multigraph.
//! Parallel edges add their weights, dangling wallets redistribute their
//! rank uniformly. When the iteration fails to converge (or produces a
//! non-finite value) the result falls back to the uniform distribution and
//! is marked as degraded rather than failing the analysis.

use super::graph_builder::TransactionGraph;
use crate::config::PageRankConfig;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Why PageRank fell back to the uniform distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DegradedReason {
    /// Iteration budget exhausted before reaching the tolerance
    NotConverged { iterations: u32 },
    /// A score became NaN or infinite
    NonFinite { iteration: u32 },
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradedReason::NotConverged { iterations } => {
                write!(f, "did not converge within {} iterations", iterations)
            }
            DegradedReason::NonFinite { iteration } => {
                write!(f, "non-finite score at iteration {}", iteration)
            }
        }
    }
}

/// Outcome of a PageRank computation; scores are indexed by node index
#[derive(Debug, Clone, PartialEq)]
pub enum PageRankOutcome {
    /// Power iteration reached the tolerance
    Converged { scores: Vec<f64>, iterations: u32 },
    /// Uniform `1/|V|` fallback
    Degraded {
        scores: Vec<f64>,
        reason: DegradedReason,
    },
}

impl PageRankOutcome {
    /// Scores regardless of how they were obtained
    pub fn scores(&self) -> &[f64] {
        match self {
            PageRankOutcome::Converged { scores, .. } => scores,
            PageRankOutcome::Degraded { scores, .. } => scores,
        }
    }

    /// Whether the fallback path was taken
    pub fn is_degraded(&self) -> bool {
        matches!(self, PageRankOutcome::Degraded { .. })
    }

    /// Status summary without the scores
    pub fn status(&self) -> PageRankStatus {
        match self {
            PageRankOutcome::Converged { iterations, .. } => PageRankStatus::Converged {
                iterations: *iterations,
            },
            PageRankOutcome::Degraded { reason, .. } => PageRankStatus::Degraded { reason: *reason },
        }
    }
}

/// Serializable summary of a PageRank outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PageRankStatus {
    /// Converged after the given number of iterations
    Converged { iterations: u32 },
    /// Fell back to uniform scores
    Degraded { reason: DegradedReason },
}

/// PageRank calculator
#[derive(Debug, Clone)]
pub struct PageRank {
    config: PageRankConfig,
}

impl PageRank {
    /// Create a new PageRank calculator
    pub fn new(config: PageRankConfig) -> Self {
        Self { config }
    }

    /// Compute PageRank for every node of the graph
    pub fn compute(&self, graph: &TransactionGraph) -> PageRankOutcome {
        let n = graph.node_count();
        if n == 0 {
            return PageRankOutcome::Converged {
                scores: Vec::new(),
                iterations: 0,
            };
        }

        let nf = n as f64;
        let damping = self.config.damping;

        let mut out_weight = vec![0.0f64; n];
        let edges: Vec<(usize, usize, f64)> = graph
            .edges()
            .map(|(s, t, e)| (s.index(), t.index(), e.weight()))
            .collect();
        for &(s, _, w) in &edges {
            out_weight[s] += w;
        }
        let dangling: Vec<usize> = (0..n).filter(|&i| out_weight[i] == 0.0).collect();

        let mut scores = vec![1.0 / nf; n];
        let mut next = vec![0.0f64; n];

        for iteration in 1..=self.config.max_iterations {
            next.iter_mut().for_each(|x| *x = 0.0);

            let dangling_sum: f64 = dangling.iter().map(|&i| scores[i]).sum();
            let base = (1.0 - damping) / nf + damping * dangling_sum / nf;

            for &(s, t, w) in &edges {
                next[t] += damping * scores[s] * w / out_weight[s];
            }
            next.iter_mut().for_each(|x| *x += base);

            if next.iter().any(|x| !x.is_finite()) {
                return self.fallback(n, DegradedReason::NonFinite { iteration });
            }

            let movement: f64 = next
                .iter()
                .zip(scores.iter())
                .map(|(a, b)| (a - b).abs())
                .sum();
            std::mem::swap(&mut scores, &mut next);

            if movement < nf * self.config.tolerance {
                debug!("PageRank converged after {} iterations", iteration);
                return PageRankOutcome::Converged {
                    scores,
                    iterations: iteration,
                };
            }
        }

        self.fallback(
            n,
            DegradedReason::NotConverged {
                iterations: self.config.max_iterations,
            },
        )
    }

    fn fallback(&self, n: usize, reason: DegradedReason) -> PageRankOutcome {
        warn!("PageRank {}; using uniform scores", reason);
        PageRankOutcome::Degraded {
            scores: vec![1.0 / n as f64; n],
            reason,
        }
    }
}
