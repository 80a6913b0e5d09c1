//! Demo: Fraud Graph Analyzer
//!
//! Builds a synthetic batch of Ethereum transfers containing a laundering
//! ring, a fan-out distributor and a dormant wallet that suddenly wakes up,
//! then prints what the engine flags.
//!
//! Pass a TOML config path as the first argument to override the defaults.

use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};
use fraud_graph::observability::init_logging;
use fraud_graph::{EngineConfig, FraudAnalyzer, Transaction};

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };
    init_logging(&config.logging)?;

    println!("=== Fraud Graph Analyzer Demo ===\n");

    let start = Utc
        .with_ymd_and_hms(2024, 3, 1, 8, 0, 0)
        .single()
        .context("Invalid demo start time")?;
    let mut txs = Vec::new();

    // Demo 1: laundering ring passing the same funds around
    let ring = ["0xring01", "0xring02", "0xring03", "0xring04"];
    for round in 0..5 {
        for i in 0..ring.len() {
            let ts = start + Duration::minutes(round * 10 + i as i64);
            txs.push(
                Transaction::new(ring[i], ring[(i + 1) % ring.len()], 12.5, ts)
                    .with_hash(format!("0xring_{}_{}", round, i)),
            );
        }
    }
    println!("Demo 1: 4-wallet ring, 5 rounds of 12.5 ETH");

    // Demo 2: distributor fanning out to fresh wallets
    for i in 0..15 {
        txs.push(Transaction::new(
            "0xdistributor",
            &format!("0xfresh{:02}", i),
            0.3,
            start + Duration::hours(2) + Duration::seconds(i * 20),
        ));
    }
    txs.push(Transaction::new("0xring02", "0xdistributor", 40.0, start + Duration::hours(1)));
    println!("Demo 2: distributor funded by the ring, paying 15 fresh wallets");

    // Demo 3: a wallet dormant for four months
    txs.push(Transaction::new("0xsleeper", "0xexchange", 3.0, start - Duration::days(120)));
    txs.push(Transaction::new("0xsleeper", "0xring01", 3.0, start + Duration::hours(3)));
    println!("Demo 3: dormant wallet reactivating into the ring\n");

    let analyzer = FraudAnalyzer::new(config);
    let report = analyzer.analyze(&txs);

    println!("Summary: {}\n", report.summary());

    println!("High-risk wallets (threshold {:.4}):", report.result.stats.risk_threshold);
    for node in report.result.high_risk_nodes.iter().take(10) {
        println!("  {} risk={:.3} - {}", node.address, node.risk, node.reason);
    }

    println!("\nStrongly connected components:");
    for component in &report.result.strongly_connected_components {
        println!("  {:?}", component);
    }

    println!("\nCommunities (modularity {:.3}):", report.communities.modularity);
    for community in &report.communities.communities {
        println!(
            "  #{} size={} avg_risk={:.3} internal={:.2} volume={:.1} level={:?}",
            community.id,
            community.size,
            community.avg_risk,
            community.internal_tx_ratio,
            community.total_volume,
            community.suspicion_level
        );
    }

    println!("\nTemporal signals:");
    for burst in &report.temporal.burst_activity {
        println!(
            "  burst at {} x{:.1} ({} txs, {:?})",
            burst.timestamp, burst.multiplier, burst.transaction_count, burst.severity
        );
    }
    for wakeup in &report.temporal.dormant_wakeups {
        println!(
            "  {} woke after {} days ({:?})",
            wakeup.address, wakeup.dormant_days, wakeup.severity
        );
    }

    let feature_graph = report.feature_graph(true);
    let labels = feature_graph.hybrid_labels(&["0xring01"], &[]);
    println!(
        "\nFeature graph: {} nodes, {} edges; labels: {} fraud, {} clean, {} unknown",
        feature_graph.nodes.len(),
        feature_graph.edges.len(),
        labels.fraud.len(),
        labels.clean.len(),
        labels.unknown.len()
    );
    println!("{}", feature_graph.to_json_pretty()?);

    Ok(())
}
