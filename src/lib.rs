//! fraud-graph - transaction graph analytics for fraud investigation
//!
//! This crate turns a batch of wallet-to-wallet transactions into risk
//! signals: per-wallet risk scores, circular flows, strongly connected
//! clusters, influence ranking, suspected fraud rings and time-based
//! anomalies, with projections for visualization, tabular and ML export.

pub mod analyzer;
pub mod config;
pub mod observability;

// Re-export main types for convenience
pub use analyzer::{
    AnalysisReport, AnalysisResult, CommunityResult, DetailedMetrics, FeatureGraph, FraudAnalyzer,
    GraphView, NodeMetrics, PageRankOutcome, PageRankStatus, RunSummary, TemporalResult,
    Transaction, TransactionGraph, WalletAddress,
};
pub use config::EngineConfig;
