//! Transaction Graph Analyzer
//!
//! Derives fraud-risk signals from a batch of wallet-to-wallet transactions.
//!
//! # Features
//!
//! - Directed multigraph construction (one edge per transaction)
//! - PageRank influence ranking with an explicit degraded outcome
//! - Cycle detection and strongly connected components
//! - Composite per-wallet risk score with a dynamic threshold
//! - Louvain community detection and fraud-ring suspicion tiers
//! - Temporal signals: bursts, dormant wakeups, time of day, velocity
//! - Feature-graph export for an external learner
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use fraud_graph::{EngineConfig, FraudAnalyzer, Transaction};
//!
//! let analyzer = FraudAnalyzer::new(EngineConfig::default());
//! let report = analyzer.analyze(&[
//!     Transaction::new("0xaaa", "0xbbb", 1.5, Utc::now()),
//!     Transaction::new("0xbbb", "0xaaa", 1.5, Utc::now()),
//! ]);
//!
//! println!("{}", report.summary());
//! ```
//!
//! The analysis is synchronous and never fails: degenerate input yields a
//! structurally valid, possibly empty, report.

pub mod centrality;
pub mod community;
pub mod components;
pub mod cycle_detector;
pub mod feature_export;
pub mod graph_builder;
pub mod risk_scorer;
pub mod temporal;
pub mod types;
pub mod views;

use crate::config::EngineConfig;
pub use centrality::{DegradedReason, PageRank, PageRankOutcome, PageRankStatus};
pub use community::{CommunityDetector, CommunityResult, CommunityStats, SuspicionLevel};
pub use components::ComponentAnalyzer;
pub use cycle_detector::CycleDetector;
pub use feature_export::{FeatureGraph, HybridLabels, NodeFeatures, NodeLabel};
pub use graph_builder::TransactionGraph;
pub use risk_scorer::{RiskAssessment, RiskScorer};
pub use temporal::{TemporalAnalyzer, TemporalResult};
pub use types::*;
pub use views::{DetailedMetrics, GraphView};

use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{info, instrument};

/// Fraud analysis engine
#[derive(Debug, Clone, Default)]
pub struct FraudAnalyzer {
    config: EngineConfig,
}

/// Everything one analysis run produced
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Graph snapshot the metrics were computed from
    pub graph: TransactionGraph,
    /// Metrics indexed by node index
    pub metrics: Vec<NodeMetrics>,
    /// Aggregate result for the caller
    pub result: AnalysisResult,
    pub communities: CommunityResult,
    pub temporal: TemporalResult,
    /// Whether PageRank converged or fell back
    pub pagerank_status: PageRankStatus,
}

/// Counts of what a run flagged
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub skipped_transactions: usize,
    pub cycles: usize,
    pub strongly_connected_components: usize,
    pub high_risk_nodes: usize,
    pub suspicious_communities: usize,
    pub temporal_signals: usize,
    pub risk_threshold: f64,
    pub pagerank: PageRankStatus,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pagerank = match &self.pagerank {
            PageRankStatus::Converged { iterations } => {
                format!("converged in {} iterations", iterations)
            }
            PageRankStatus::Degraded { reason } => format!("degraded ({})", reason),
        };
        write!(
            f,
            "{} wallets, {} transactions: {} high-risk (threshold {:.4}), {} cycles, {} SCCs, \
             {} suspicious communities, {} temporal signals; PageRank {}",
            self.total_nodes,
            self.total_edges,
            self.high_risk_nodes,
            self.risk_threshold,
            self.cycles,
            self.strongly_connected_components,
            self.suspicious_communities,
            self.temporal_signals,
            pagerank
        )
    }
}

impl FraudAnalyzer {
    /// Create a new analyzer
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze a batch of transactions
    #[instrument(skip(self, transactions), fields(transactions = transactions.len()))]
    pub fn analyze(&self, transactions: &[Transaction]) -> AnalysisReport {
        let start = Instant::now();

        let graph = TransactionGraph::from_transactions(transactions);

        let pagerank = PageRank::new(self.config.pagerank.clone()).compute(&graph);
        let pagerank_status = pagerank.status();

        let cycles = CycleDetector::new().detect(&graph);
        let components = ComponentAnalyzer::new().strongly_connected(&graph);
        let assessment = RiskScorer::new().assess(&graph, pagerank.scores(), &cycles);

        let communities =
            CommunityDetector::new(self.config.community.clone()).detect(&graph, &assessment.metrics);
        let temporal = TemporalAnalyzer::new(self.config.temporal.clone()).analyze(transactions);

        let result = Self::build_result(&graph, &assessment, pagerank.scores(), &cycles, &components);

        info!(
            "Analysis finished in {}ms: {} wallets, {} transactions, {} high-risk, {} cycles, {} SCCs",
            start.elapsed().as_millis(),
            result.stats.total_nodes,
            result.stats.total_edges,
            result.stats.suspicious_nodes,
            result.cycles.len(),
            result.strongly_connected_components.len()
        );

        AnalysisReport {
            graph,
            metrics: assessment.metrics,
            result,
            communities,
            temporal,
            pagerank_status,
        }
    }

    fn build_result(
        graph: &TransactionGraph,
        assessment: &RiskAssessment,
        pagerank: &[f64],
        cycles: &[Vec<NodeIndex>],
        components: &[Vec<NodeIndex>],
    ) -> AnalysisResult {
        let to_addresses = |nodes: &Vec<NodeIndex>| -> Vec<WalletAddress> {
            nodes.iter().map(|&n| graph.address(n).to_string()).collect()
        };

        let page_rank_scores = graph
            .node_indices()
            .map(|idx| {
                let score = pagerank.get(idx.index()).copied().unwrap_or(0.0);
                (graph.address(idx).to_string(), score)
            })
            .collect();

        AnalysisResult {
            strongly_connected_components: components.iter().map(to_addresses).collect(),
            cycles: cycles.iter().map(to_addresses).collect(),
            high_risk_nodes: assessment.high_risk.clone(),
            page_rank_scores,
            stats: AnalysisStats {
                total_nodes: graph.node_count(),
                total_edges: graph.edge_count(),
                suspicious_nodes: assessment.high_risk.len(),
                risk_score: assessment.threshold,
                risk_threshold: assessment.threshold,
            },
        }
    }
}

impl AnalysisReport {
    /// Metrics for a wallet
    pub fn node_metrics(&self, wallet: &str) -> Option<&NodeMetrics> {
        self.graph
            .node_index(wallet)
            .and_then(|idx| self.metrics.get(idx.index()))
    }

    /// Graph for visualization
    pub fn graph_view(&self) -> GraphView {
        GraphView::build(&self.graph, &self.metrics)
    }

    /// Per-wallet metrics table
    pub fn detailed_metrics(&self) -> Vec<DetailedMetrics> {
        DetailedMetrics::rows(&self.graph, &self.metrics)
    }

    /// Feature graph around the high-risk wallets
    pub fn feature_graph(&self, include_neighbors: bool) -> FeatureGraph {
        let flagged: Vec<WalletAddress> = self
            .result
            .high_risk_nodes
            .iter()
            .map(|n| n.address.clone())
            .collect();

        FeatureGraph::build(
            &self.graph,
            &self.metrics,
            &flagged,
            self.result.stats.risk_threshold,
            include_neighbors,
        )
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total_nodes: self.result.stats.total_nodes,
            total_edges: self.result.stats.total_edges,
            skipped_transactions: self.graph.skipped_transactions(),
            cycles: self.result.cycles.len(),
            strongly_connected_components: self.result.strongly_connected_components.len(),
            high_risk_nodes: self.result.high_risk_nodes.len(),
            suspicious_communities: self.communities.suspicious_communities.len(),
            temporal_signals: self.temporal.signal_count(),
            risk_threshold: self.result.stats.risk_threshold,
            pagerank: self.pagerank_status,
        }
    }
}
