//! Temporal Analysis
//!
//! Time-based signals computed straight from the transaction list, without
//! the graph:
//! - Burst activity: window-over-window transaction count spikes
//! - Dormant wakeups: wallets sending again after a long silence
//! - Time-of-day pattern: bot-like uniform or off-hours activity
//! - Velocity anomalies: wallets whose recent rate far exceeds their history

use super::types::*;
use crate::config::TemporalConfig;
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Hours treated as off-hours automation when busy
const OFF_HOURS: std::ops::RangeInclusive<u32> = 2..=5;
/// Off-hours count multiple of the hourly mean that flags an hour
const OFF_HOURS_MULTIPLIER: f64 = 1.5;
/// Hourly std/mean ratio under which activity counts as uniform
const UNIFORM_CV: f64 = 0.3;
/// Shortest span used when computing a transaction rate
const MIN_RATE_SPAN_SECS: i64 = 60;
const SECS_PER_DAY: f64 = 86_400.0;

/// Severity tier of a temporal signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A window whose transaction count spiked against the previous window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurstActivity {
    /// Start of the burst window
    pub timestamp: DateTime<Utc>,
    /// Count ratio against the previous non-empty window
    pub multiplier: f64,
    /// Transactions inside the window
    pub transaction_count: usize,
    /// Wallets involved, in order of appearance
    pub addresses: Vec<WalletAddress>,
    pub severity: Severity,
}

/// A wallet that sent again after a long gap
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DormantWakeup {
    pub address: WalletAddress,
    /// Whole days between the two outgoing transactions
    pub dormant_days: i64,
    pub last_active: DateTime<Utc>,
    pub reactivated_at: DateTime<Utc>,
    pub severity: Severity,
}

/// 24-hour activity histogram
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDayPattern {
    /// Transaction count per UTC hour
    pub hourly_distribution: Vec<u64>,
    pub mean: f64,
    pub std_dev: f64,
    /// Standard deviation under 30% of the mean
    pub uniform_activity: bool,
    /// Off-hours (02:00-05:59) with more than 1.5x the mean
    pub suspicious_hours: Vec<u32>,
    pub is_suspicious: bool,
}

/// A wallet whose recent transaction rate outpaces its history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityAnomaly {
    pub address: WalletAddress,
    /// Transactions per day over the whole active span
    pub historical_rate: f64,
    /// Transactions per day over the most recent slice
    pub recent_rate: f64,
    /// `recent_rate / historical_rate`
    pub anomaly_score: f64,
    pub transaction_count: usize,
}

/// Temporal analysis output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalResult {
    pub burst_activity: Vec<BurstActivity>,
    pub dormant_wakeups: Vec<DormantWakeup>,
    pub time_of_day_patterns: TimeOfDayPattern,
    pub velocity_anomalies: Vec<VelocityAnomaly>,
}

impl TemporalResult {
    /// Number of individual signals raised
    pub fn signal_count(&self) -> usize {
        self.burst_activity.len()
            + self.dormant_wakeups.len()
            + self.velocity_anomalies.len()
            + usize::from(self.time_of_day_patterns.is_suspicious)
    }
}

/// Temporal analyzer
#[derive(Debug, Clone)]
pub struct TemporalAnalyzer {
    config: TemporalConfig,
}

impl TemporalAnalyzer {
    /// Create a new temporal analyzer
    pub fn new(config: TemporalConfig) -> Self {
        Self { config }
    }

    /// Run every temporal check
    pub fn analyze(&self, transactions: &[Transaction]) -> TemporalResult {
        let result = TemporalResult {
            burst_activity: self.detect_bursts(transactions),
            dormant_wakeups: self.detect_dormant_wakeups(transactions),
            time_of_day_patterns: self.time_of_day(transactions),
            velocity_anomalies: self.detect_velocity_anomalies(transactions),
        };

        debug!(
            "Temporal analysis: {} bursts, {} dormant wakeups, {} velocity anomalies, off-hours suspicious: {}",
            result.burst_activity.len(),
            result.dormant_wakeups.len(),
            result.velocity_anomalies.len(),
            result.time_of_day_patterns.is_suspicious
        );

        result
    }

    /// Compare each non-empty window with the previous non-empty one
    pub fn detect_bursts(&self, transactions: &[Transaction]) -> Vec<BurstActivity> {
        let window = self.config.burst_window_secs.max(1);

        let mut windows: BTreeMap<i64, Vec<&Transaction>> = BTreeMap::new();
        for tx in transactions.iter().filter(|tx| tx.has_endpoints()) {
            windows
                .entry(tx.timestamp.timestamp().div_euclid(window))
                .or_default()
                .push(tx);
        }

        let mut bursts = Vec::new();
        let mut previous: Option<usize> = None;

        for (key, txs) in &windows {
            let count = txs.len();
            if let Some(prev) = previous {
                let multiplier = count as f64 / prev as f64;
                if multiplier >= self.config.burst_ratio {
                    bursts.push(BurstActivity {
                        timestamp: DateTime::from_timestamp(key * window, 0)
                            .unwrap_or(txs[0].timestamp),
                        multiplier,
                        transaction_count: count,
                        addresses: self.involved_addresses(txs),
                        severity: burst_severity(multiplier),
                    });
                }
            }
            previous = Some(count);
        }

        bursts
    }

    fn involved_addresses(&self, txs: &[&Transaction]) -> Vec<WalletAddress> {
        let mut seen = HashSet::new();
        let mut addresses = Vec::new();
        for tx in txs {
            for address in [&tx.from, &tx.to] {
                if addresses.len() >= self.config.max_burst_addresses {
                    return addresses;
                }
                let address = normalize_address(address);
                if seen.insert(address.clone()) {
                    addresses.push(address);
                }
            }
        }
        addresses
    }

    /// Gaps between consecutive outgoing transactions of the same wallet
    pub fn detect_dormant_wakeups(&self, transactions: &[Transaction]) -> Vec<DormantWakeup> {
        let mut sent: BTreeMap<WalletAddress, Vec<DateTime<Utc>>> = BTreeMap::new();
        for tx in transactions.iter().filter(|tx| tx.has_endpoints()) {
            sent.entry(normalize_address(&tx.from))
                .or_default()
                .push(tx.timestamp);
        }

        let mut wakeups = Vec::new();
        for (address, mut times) in sent {
            times.sort();
            for pair in times.windows(2) {
                let days = (pair[1] - pair[0]).num_days();
                if days >= self.config.dormant_min_days {
                    wakeups.push(DormantWakeup {
                        address: address.clone(),
                        dormant_days: days,
                        last_active: pair[0],
                        reactivated_at: pair[1],
                        severity: dormancy_severity(days),
                    });
                }
            }
        }

        wakeups.sort_by(|a, b| {
            b.dormant_days
                .cmp(&a.dormant_days)
                .then_with(|| a.address.cmp(&b.address))
                .then_with(|| a.reactivated_at.cmp(&b.reactivated_at))
        });
        wakeups
    }

    /// Hourly histogram and its uniformity / off-hours flags
    pub fn time_of_day(&self, transactions: &[Transaction]) -> TimeOfDayPattern {
        let mut hourly = vec![0u64; 24];
        for tx in transactions.iter().filter(|tx| tx.has_endpoints()) {
            hourly[tx.timestamp.hour() as usize] += 1;
        }

        let mean = hourly.iter().sum::<u64>() as f64 / 24.0;
        let variance = hourly
            .iter()
            .map(|&c| (c as f64 - mean).powi(2))
            .sum::<f64>()
            / 24.0;
        let std_dev = variance.sqrt();

        let uniform_activity = mean > 0.0 && std_dev < UNIFORM_CV * mean;
        let suspicious_hours: Vec<u32> = OFF_HOURS
            .filter(|&h| mean > 0.0 && hourly[h as usize] as f64 > OFF_HOURS_MULTIPLIER * mean)
            .collect();
        let is_suspicious = uniform_activity || !suspicious_hours.is_empty();

        TimeOfDayPattern {
            hourly_distribution: hourly,
            mean,
            std_dev,
            uniform_activity,
            suspicious_hours,
            is_suspicious,
        }
    }

    /// Wallets whose most recent transactions arrive much faster than usual
    pub fn detect_velocity_anomalies(&self, transactions: &[Transaction]) -> Vec<VelocityAnomaly> {
        let mut activity: BTreeMap<WalletAddress, Vec<DateTime<Utc>>> = BTreeMap::new();
        for tx in transactions.iter().filter(|tx| tx.has_endpoints()) {
            let from = normalize_address(&tx.from);
            let to = normalize_address(&tx.to);
            if to != from {
                activity.entry(to).or_default().push(tx.timestamp);
            }
            activity.entry(from).or_default().push(tx.timestamp);
        }

        let mut anomalies: Vec<VelocityAnomaly> = activity
            .into_iter()
            .filter(|(_, times)| times.len() >= self.config.velocity_min_transactions.max(2))
            .filter_map(|(address, mut times)| {
                times.sort();
                self.velocity(&address, &times)
            })
            .filter(|a| a.anomaly_score > self.config.velocity_ratio)
            .collect();

        anomalies.sort_by(|a, b| {
            b.anomaly_score
                .total_cmp(&a.anomaly_score)
                .then_with(|| a.address.cmp(&b.address))
        });
        anomalies.truncate(self.config.velocity_top_n);
        anomalies
    }

    /// Rates for one wallet; `times` must be sorted
    fn velocity(&self, address: &str, times: &[DateTime<Utc>]) -> Option<VelocityAnomaly> {
        let n = times.len();
        let first = *times.first()?;
        let last = *times.last()?;

        let recent_count = ((n as f64 * self.config.velocity_recent_fraction).ceil() as usize)
            .max(2)
            .min(n);
        let recent_start = times[n - recent_count];

        let historical_rate = n as f64 / span_days(last - first);
        let recent_rate = recent_count as f64 / span_days(last - recent_start);
        if historical_rate <= 0.0 {
            return None;
        }

        Some(VelocityAnomaly {
            address: address.to_string(),
            historical_rate,
            recent_rate,
            anomaly_score: recent_rate / historical_rate,
            transaction_count: n,
        })
    }
}

/// Span in days, floored at one minute
fn span_days(span: Duration) -> f64 {
    span.num_seconds().max(MIN_RATE_SPAN_SECS) as f64 / SECS_PER_DAY
}

fn burst_severity(multiplier: f64) -> Severity {
    if multiplier >= 20.0 {
        Severity::Critical
    } else if multiplier >= 10.0 {
        Severity::High
    } else if multiplier >= 7.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn dormancy_severity(days: i64) -> Severity {
    if days >= 180 {
        Severity::High
    } else if days >= 90 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn analyzer() -> TemporalAnalyzer {
        TemporalAnalyzer::new(TemporalConfig::default())
    }

    #[test]
    fn test_burst_detection() {
        // Window 0: one tx, window 1: twelve txs from distinct senders
        let base = 1_700_000_000 / 3600 * 3600 - 1_700_000_000;
        let mut txs = vec![Transaction::new("a", "b", 1.0, at(base + 10))];
        for i in 0..12 {
            txs.push(Transaction::new(&format!("s{}", i), "sink", 1.0, at(base + 3600 + i)));
        }

        let bursts = analyzer().detect_bursts(&txs);
        assert_eq!(bursts.len(), 1);
        assert_eq!(bursts[0].transaction_count, 12);
        assert!((bursts[0].multiplier - 12.0).abs() < 1e-12);
        assert_eq!(bursts[0].severity, Severity::High);
        assert_eq!(bursts[0].addresses.len(), 10);
        assert_eq!(bursts[0].addresses[..2], ["s0".to_string(), "sink".to_string()]);
        assert_eq!(bursts[0].timestamp.timestamp() % 3600, 0);
    }

    #[test]
    fn test_steady_traffic_has_no_bursts() {
        let txs: Vec<_> = (0..48)
            .map(|i| Transaction::new("a", "b", 1.0, at(i * 3600)))
            .collect();
        assert!(analyzer().detect_bursts(&txs).is_empty());
    }

    #[test]
    fn test_severity_tiers() {
        assert_eq!(burst_severity(25.0), Severity::Critical);
        assert_eq!(burst_severity(10.0), Severity::High);
        assert_eq!(burst_severity(7.5), Severity::Medium);
        assert_eq!(burst_severity(5.0), Severity::Low);
        assert_eq!(dormancy_severity(200), Severity::High);
        assert_eq!(dormancy_severity(90), Severity::Medium);
        assert_eq!(dormancy_severity(30), Severity::Low);
    }

    #[test]
    fn test_dormant_wakeup() {
        let day = 86_400;
        let txs = vec![
            Transaction::new("sleeper", "x", 1.0, at(0)),
            Transaction::new("sleeper", "x", 1.0, at(100 * day)),
            Transaction::new("busy", "x", 1.0, at(0)),
            Transaction::new("busy", "x", 1.0, at(day)),
            // incoming transactions never count as activity
            Transaction::new("x", "busy", 1.0, at(60 * day)),
        ];

        let wakeups = analyzer().detect_dormant_wakeups(&txs);
        assert_eq!(wakeups.len(), 1);
        assert_eq!(wakeups[0].address, "sleeper");
        assert_eq!(wakeups[0].dormant_days, 100);
        assert_eq!(wakeups[0].severity, Severity::Medium);
    }

    #[test]
    fn test_off_hours_activity() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut txs: Vec<_> = (0..10)
            .map(|i| {
                let ts = midnight + Duration::hours(3) + Duration::minutes(i);
                Transaction::new("bot", "x", 1.0, ts)
            })
            .collect();
        txs.push(Transaction::new("a", "b", 1.0, midnight + Duration::hours(14)));

        let pattern = analyzer().time_of_day(&txs);
        assert_eq!(pattern.hourly_distribution[3], 10);
        assert_eq!(pattern.suspicious_hours, vec![3]);
        assert!(!pattern.uniform_activity);
        assert!(pattern.is_suspicious);
    }

    #[test]
    fn test_uniform_activity() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let txs: Vec<_> = (0..48)
            .map(|i| Transaction::new("a", "b", 1.0, midnight + Duration::minutes(30 * i)))
            .collect();

        let pattern = analyzer().time_of_day(&txs);
        assert_eq!(pattern.std_dev, 0.0);
        assert!(pattern.uniform_activity);
        assert!(pattern.suspicious_hours.is_empty());

        let empty = analyzer().time_of_day(&[]);
        assert!(!empty.is_suspicious);
    }

    #[test]
    fn test_transactions_without_endpoints_are_ignored() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap();
        let mut invalid = Transaction::new("a", "b", 1.0, ts);
        invalid.to = String::new();
        let valid = Transaction::new("a", "b", 1.0, ts + Duration::hours(11));

        let with_invalid = analyzer().time_of_day(&[invalid.clone(), valid.clone()]);
        assert_eq!(with_invalid, analyzer().time_of_day(&[valid]));
        assert_eq!(with_invalid.hourly_distribution[3], 0);

        let only_invalid = analyzer().time_of_day(&[invalid]);
        assert!(only_invalid.suspicious_hours.is_empty());
        assert!(!only_invalid.is_suspicious);
    }

    /// Eight daily transactions, then four spaced `spacing` seconds apart
    fn spiking_wallet(wallet: &str, spacing: i64) -> Vec<Transaction> {
        let day = 86_400;
        let mut txs: Vec<_> = (0..8)
            .map(|i| Transaction::new(wallet, &format!("{}_peer{}", wallet, i), 1.0, at(i * day)))
            .collect();
        for i in 1..=4 {
            let peer = format!("{}_burst{}", wallet, i);
            txs.push(Transaction::new(wallet, &peer, 1.0, at(7 * day + i * spacing)));
        }
        txs
    }

    #[test]
    fn test_velocity_keeps_top_twenty_by_score() {
        let mut txs = Vec::new();
        for k in 0..25 {
            txs.extend(spiking_wallet(&format!("w{:02}", k), 600 + k * 60));
        }
        // Identical schedules, fastest of all
        txs.extend(spiking_wallet("tie_b", 300));
        txs.extend(spiking_wallet("tie_a", 300));

        let anomalies = analyzer().detect_velocity_anomalies(&txs);
        assert_eq!(anomalies.len(), 20);
        assert!(anomalies
            .windows(2)
            .all(|w| w[0].anomaly_score >= w[1].anomaly_score));

        assert_eq!(anomalies[0].address, "tie_a");
        assert_eq!(anomalies[1].address, "tie_b");
        assert_eq!(anomalies[0].anomaly_score, anomalies[1].anomaly_score);

        let kept: Vec<&str> = anomalies[2..].iter().map(|a| a.address.as_str()).collect();
        let expected: Vec<String> = (0..18).map(|k| format!("w{:02}", k)).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn test_velocity_spike() {
        let mut txs: Vec<_> = (0..40)
            .map(|i| Transaction::new("fast", &format!("c{}", i), 1.0, at(i * 12 * 3600)))
            .collect();
        let last = 39 * 12 * 3600;
        for i in 1..=10 {
            txs.push(Transaction::new("fast", &format!("d{}", i), 1.0, at(last + i * 600)));
        }

        let anomalies = analyzer().detect_velocity_anomalies(&txs);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].address, "fast");
        assert_eq!(anomalies[0].transaction_count, 50);
        assert!(anomalies[0].anomaly_score > 3.0);
    }

    #[test]
    fn test_steady_wallet_has_no_velocity_anomaly() {
        let txs: Vec<_> = (0..20)
            .map(|i| Transaction::new("steady", "sink", 1.0, at(i * 3600)))
            .collect();
        assert!(analyzer().detect_velocity_anomalies(&txs).is_empty());
    }
}
