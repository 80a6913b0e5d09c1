//! Types for transaction graph fraud analysis
//!
//! This module defines the core data structures shared by every analysis
//! stage: the ingested transaction record, the per-edge payload stored in the
//! graph, per-wallet statistics and the derived node metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Represents a wallet address in the transaction graph (always lower-cased)
pub type WalletAddress = String;

/// Normalize a raw address for use as a node identifier
pub fn normalize_address(raw: &str) -> WalletAddress {
    raw.trim().to_lowercase()
}

/// A validated transfer between two wallets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Sender address
    pub from: WalletAddress,
    /// Recipient address
    pub to: WalletAddress,
    /// Transferred value (non-negative)
    pub value: f64,
    /// Time the transaction was mined
    pub timestamp: DateTime<Utc>,
    /// Transaction hash, when known
    #[serde(default)]
    pub hash: Option<String>,
    /// Block number, when known
    #[serde(default)]
    pub block_number: Option<u64>,
}

impl Transaction {
    /// Create a transaction with case-normalized endpoints
    pub fn new(from: &str, to: &str, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            from: normalize_address(from),
            to: normalize_address(to),
            value: value.max(0.0),
            timestamp,
            hash: None,
            block_number: None,
        }
    }

    /// Attach a transaction hash
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Attach a block number
    pub fn with_block_number(mut self, block_number: u64) -> Self {
        self.block_number = Some(block_number);
        self
    }

    /// Whether both endpoints are present
    pub fn has_endpoints(&self) -> bool {
        !self.from.trim().is_empty() && !self.to.trim().is_empty()
    }
}

/// Transaction edge in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEdge {
    /// Transferred value
    pub value: f64,
    /// Timestamp of transaction
    pub timestamp: DateTime<Utc>,
    /// Transaction hash
    pub hash: Option<String>,
    /// Block number
    pub block_number: Option<u64>,
}

impl TransactionEdge {
    /// Weight used by centrality; transactions carry no explicit weight
    pub fn weight(&self) -> f64 {
        1.0
    }
}

impl From<&Transaction> for TransactionEdge {
    fn from(tx: &Transaction) -> Self {
        Self {
            value: tx.value,
            timestamp: tx.timestamp,
            hash: tx.hash.clone(),
            block_number: tx.block_number,
        }
    }
}

/// Node statistics maintained while the graph is built
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeStats {
    /// Total incoming transaction count
    pub in_degree: usize,
    /// Total outgoing transaction count
    pub out_degree: usize,
    /// Total volume received
    pub total_received: f64,
    /// Total volume sent
    pub total_sent: f64,
    /// Earliest transaction timestamp
    pub first_seen: Option<DateTime<Utc>>,
    /// Latest transaction timestamp
    pub last_seen: Option<DateTime<Utc>>,
}

impl NodeStats {
    pub(crate) fn observe(&mut self, timestamp: DateTime<Utc>) {
        self.first_seen = Some(self.first_seen.map_or(timestamp, |t| t.min(timestamp)));
        self.last_seen = Some(self.last_seen.map_or(timestamp, |t| t.max(timestamp)));
    }

    /// Transactions per day over the active span, or the raw count when the
    /// wallet was active for less than a day
    pub fn tx_frequency(&self) -> f64 {
        let count = (self.in_degree + self.out_degree) as f64;
        match (self.first_seen, self.last_seen) {
            (Some(first), Some(last)) => {
                let days = (last - first).num_seconds() as f64 / 86_400.0;
                if days < 1.0 {
                    count
                } else {
                    count / days
                }
            }
            _ => 0.0,
        }
    }
}

/// Derived metrics for one wallet, computed once per analysis pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMetrics {
    /// Wallet address
    pub address: WalletAddress,
    /// Incoming transaction count
    pub in_degree: usize,
    /// Outgoing transaction count
    pub out_degree: usize,
    /// PageRank score
    pub pagerank: f64,
    /// Shannon entropy of incident transaction values
    pub entropy: f64,
    /// Composite risk score in [0, 1]
    pub risk_score: f64,
    /// Transactions per day
    pub tx_frequency: f64,
    /// Whether the wallet sits on a detected cycle
    pub in_cycle: bool,
}

impl NodeMetrics {
    /// Total degree (in + out)
    pub fn degree(&self) -> usize {
        self.in_degree + self.out_degree
    }
}

/// Human-readable explanation attached to a high-risk wallet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RiskReason {
    /// More than five transactions
    HighVolume(usize),
    /// PageRank above 0.02
    HighInfluence(f64),
    /// Member of a circular transaction pattern
    CircularFlow,
    /// In/out degree differ by more than three
    ImbalancedFlow { inbound: usize, outbound: usize },
    /// Score at least 1.5x the dynamic threshold
    FarAboveThreshold,
}

impl fmt::Display for RiskReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskReason::HighVolume(count) => write!(f, "High transaction volume ({} txs)", count),
            RiskReason::HighInfluence(pr) => write!(f, "High influence (PageRank: {:.4})", pr),
            RiskReason::CircularFlow => write!(f, "Part of circular transaction pattern"),
            RiskReason::ImbalancedFlow { inbound, outbound } => {
                write!(f, "Imbalanced flow (in: {}, out: {})", inbound, outbound)
            }
            RiskReason::FarAboveThreshold => write!(f, "Risk significantly above average"),
        }
    }
}

/// Wallet whose score reached the dynamic threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighRiskNode {
    /// Wallet address
    pub address: WalletAddress,
    /// Composite risk score
    pub risk: f64,
    /// Joined explanation text
    pub reason: String,
    /// Structured explanation
    #[serde(skip)]
    pub reasons: Vec<RiskReason>,
}

/// Aggregate statistics of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    /// Number of wallets
    pub total_nodes: usize,
    /// Number of transactions (parallel edges counted individually)
    pub total_edges: usize,
    /// Number of wallets at or above the threshold
    pub suspicious_nodes: usize,
    /// Mean risk over all wallets
    pub risk_score: f64,
    /// Dynamic risk threshold (equal to the mean risk)
    pub risk_threshold: f64,
}

/// Root result of the graph algorithms
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Non-trivial strongly connected components
    pub strongly_connected_components: Vec<Vec<WalletAddress>>,
    /// Cycles found by depth-first traversal
    pub cycles: Vec<Vec<WalletAddress>>,
    /// High-risk wallets ranked by risk descending
    pub high_risk_nodes: Vec<HighRiskNode>,
    /// PageRank per wallet
    pub page_rank_scores: BTreeMap<WalletAddress, f64>,
    /// Aggregate statistics
    pub stats: AnalysisStats,
}
