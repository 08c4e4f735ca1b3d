//! Run statistics for the risk pipeline.

use crate::types::assessment::LabelDistribution;
use crate::types::evaluation::{Rule, ScoredTransaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;
use uuid::Uuid;

const SCORE_BUCKETS: usize = 10;

/// Metrics collector for one pipeline run.
///
/// Counters are atomic so rayon workers may record concurrently.
pub struct PipelineMetrics {
    run_id: Uuid,
    /// Total transactions evaluated
    pub transactions_evaluated: AtomicU64,
    /// Customers emitted by the aggregator
    pub customers_aggregated: AtomicU64,
    /// Fire count per rule, indexed like `Rule::ALL`
    rule_fires: [AtomicU64; 5],
    /// Rule score histogram over [0, max score]
    score_buckets: RwLock<[u64; SCORE_BUCKETS]>,
    labels: RwLock<Option<(LabelDistribution, f64)>>,
    /// Stage durations in microseconds
    stage_times: RwLock<BTreeMap<String, u64>>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            transactions_evaluated: AtomicU64::new(0),
            customers_aggregated: AtomicU64::new(0),
            rule_fires: Default::default(),
            score_buckets: RwLock::new([0; SCORE_BUCKETS]),
            labels: RwLock::new(None),
            stage_times: RwLock::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Record a batch of evaluated transactions.
    pub fn record_evaluations(&self, scored: &[ScoredTransaction], max_score: f64) {
        self.transactions_evaluated
            .fetch_add(scored.len() as u64, Ordering::Relaxed);

        let mut buckets = [0u64; SCORE_BUCKETS];
        let mut fires = [0u64; 5];
        for tx in scored {
            for rule in Rule::ALL {
                fires[rule.index()] += u64::from(tx.evaluation.fired(rule));
            }
            buckets[score_bucket(tx.evaluation.rule_score, max_score)] += 1;
        }

        for (counter, n) in self.rule_fires.iter().zip(fires) {
            counter.fetch_add(n, Ordering::Relaxed);
        }
        if let Ok(mut shared) = self.score_buckets.write() {
            for (slot, n) in shared.iter_mut().zip(buckets) {
                *slot += n;
            }
        }
    }

    pub fn record_customers(&self, count: usize) {
        self.customers_aggregated
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_labels(&self, distribution: LabelDistribution, cutoff: f64) {
        if let Ok(mut labels) = self.labels.write() {
            *labels = Some((distribution, cutoff));
        }
    }

    pub fn record_stage(&self, stage: &str, duration: Duration) {
        if let Ok(mut times) = self.stage_times.write() {
            *times.entry(stage.to_string()).or_insert(0) += duration.as_micros() as u64;
        }
    }

    pub fn rule_fire_count(&self, rule: Rule) -> u64 {
        self.rule_fires[rule.index()].load(Ordering::Relaxed)
    }

    pub fn get_score_distribution(&self) -> [u64; SCORE_BUCKETS] {
        self.score_buckets.read().map(|b| *b).unwrap_or_default()
    }

    /// Snapshot of everything recorded so far.
    pub fn report(&self) -> RunReport {
        let labels = self.labels.read().ok().and_then(|l| *l);
        RunReport {
            run_id: self.run_id.to_string(),
            transactions_evaluated: self.transactions_evaluated.load(Ordering::Relaxed),
            customers_aggregated: self.customers_aggregated.load(Ordering::Relaxed),
            rule_fires: Rule::ALL
                .iter()
                .map(|r| (r.name().to_string(), self.rule_fire_count(*r)))
                .collect(),
            score_distribution: self.get_score_distribution().to_vec(),
            label_distribution: labels.map(|(d, _)| d),
            cutoff: labels.map(|(_, c)| c),
            stage_times_us: self
                .stage_times
                .read()
                .map(|t| t.clone())
                .unwrap_or_default(),
            elapsed_ms: self.start_time.elapsed().as_millis() as u64,
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let report = self.report();
        let tx_count = report.transactions_evaluated;

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            TRANSACTION RISK PIPELINE - RUN SUMMARY           ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Transactions Evaluated: {:>8}  │  Customers: {:>8}      ║",
            tx_count, report.customers_aggregated
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Rule Fire Rates:                                             ║");
        for (rule, count) in &report.rule_fires {
            let pct = percent(*count, tx_count);
            info!("║   {:20}: {:>8} ({:>5.1}%)                     ║", rule, count, pct);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Rule Score Distribution (fraction of max score):             ║");
        let total: u64 = report.score_distribution.iter().sum();
        for (i, &count) in report.score_distribution.iter().enumerate() {
            let pct = percent(count, total);
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>8} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        if let (Some(dist), Some(cutoff)) = (report.label_distribution, report.cutoff) {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!(
                "║ Labels: high risk {:>6} ({:>5.1}%)  low risk {:>6}  cutoff {:.4} ║",
                dist.positives,
                dist.positive_rate() * 100.0,
                dist.negatives,
                cutoff
            );
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        for (stage, us) in &report.stage_times_us {
            info!("║   {:12}: {:>10} μs", stage, us);
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn score_bucket(score: f64, max_score: f64) -> usize {
    if max_score <= 0.0 {
        return 0;
    }
    ((score / max_score * SCORE_BUCKETS as f64) as usize).min(SCORE_BUCKETS - 1)
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}

/// Serializable snapshot of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub transactions_evaluated: u64,
    pub customers_aggregated: u64,
    pub rule_fires: BTreeMap<String, u64>,
    pub score_distribution: Vec<u64>,
    pub label_distribution: Option<LabelDistribution>,
    pub cutoff: Option<f64>,
    pub stage_times_us: BTreeMap<String, u64>,
    pub elapsed_ms: u64,
}
