//! End-to-end risk pipeline: rules -> per-customer features -> labels.

use crate::config::AppConfig;
use crate::error::Result;
use crate::features::FeatureAggregator;
use crate::labeling::RiskLabelGenerator;
use crate::metrics::PipelineMetrics;
use crate::rules_engine::RulesEngine;
use crate::types::assessment::LabeledPopulation;
use crate::types::features::CustomerFeatureVector;
use crate::types::transaction::Transaction;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Wires the three stages together and records run metrics.
pub struct RiskPipeline {
    rules: RulesEngine,
    aggregator: FeatureAggregator,
    labeler: RiskLabelGenerator,
    parallel: bool,
    metrics: Arc<PipelineMetrics>,
}

impl RiskPipeline {
    /// Build a pipeline from configuration; invalid configuration is rejected here.
    pub fn new(config: &AppConfig) -> Result<Self> {
        Self::with_metrics(config, Arc::new(PipelineMetrics::new()))
    }

    pub fn with_metrics(config: &AppConfig, metrics: Arc<PipelineMetrics>) -> Result<Self> {
        let rules = RulesEngine::new(config.rules.clone())?;
        let labeler = RiskLabelGenerator::new(config.labeling.clone())?;

        info!(
            rules = ?rules.rule_names(),
            max_rule_score = rules.max_score(),
            cutoff_quantile = config.labeling.cutoff_quantile,
            parallel = config.pipeline.parallel,
            "Risk pipeline initialized"
        );

        Ok(Self {
            rules,
            aggregator: FeatureAggregator::new(config.pipeline.parallel),
            labeler,
            parallel: config.pipeline.parallel,
            metrics,
        })
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Evaluate rules and aggregate per customer.
    pub fn build_features(&self, transactions: &[Transaction]) -> Result<Vec<CustomerFeatureVector>> {
        let start = Instant::now();
        let scored = self
            .rules
            .evaluate_all(transactions, self.parallel)
            .map_err(|e| {
                error!(error = %e, "Rule evaluation aborted");
                e
            })?;
        self.metrics.record_stage("rules", start.elapsed());
        self.metrics
            .record_evaluations(&scored, self.rules.max_score());

        let start = Instant::now();
        let features = self.aggregator.aggregate(&scored);
        self.metrics.record_stage("aggregate", start.elapsed());
        self.metrics.record_customers(features.len());

        info!(
            transactions = scored.len(),
            customers = features.len(),
            "Customer features built"
        );
        Ok(features)
    }

    /// Score and label a feature population.
    pub fn label(&self, features: Vec<CustomerFeatureVector>) -> Result<LabeledPopulation> {
        let start = Instant::now();
        let labeled = self.labeler.generate(features).map_err(|e| {
            error!(error = %e, "Risk labeling failed");
            e
        })?;
        self.metrics.record_stage("label", start.elapsed());
        self.metrics
            .record_labels(labeled.distribution, labeled.cutoff);

        info!(
            high_risk = labeled.distribution.positives,
            low_risk = labeled.distribution.negatives,
            cutoff = labeled.cutoff,
            "Label distribution"
        );
        Ok(labeled)
    }

    /// Run every stage.
    pub fn run(&self, transactions: &[Transaction]) -> Result<LabeledPopulation> {
        let features = self.build_features(transactions)?;
        self.label(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabelingConfig;
    use crate::error::RiskError;
    use crate::types::transaction::parse_timestamp;

    /// Deterministic mixed population: some customers lean risky.
    fn transactions() -> Vec<Transaction> {
        let countries = ["US", "UK", "NG", "DE", "RU", "SG"];
        let merchants = ["grocery", "crypto", "travel", "gambling", "electronics"];
        (0..600)
            .map(|i: usize| {
                let customer = i % 40;
                let amount = if customer % 9 == 0 && i % 5 == 0 {
                    2500.0 + i as f64
                } else {
                    (i * 53 % 700) as f64 + 0.25
                };
                let ts = format!("2024-01-{:02} {:02}:{:02}:00", 1 + i % 28, i * 7 % 24, i % 60);
                Transaction::new(customer.to_string(), parse_timestamp(&ts).unwrap(), amount)
                    .with_country(countries[(i + customer) % countries.len()])
                    .with_merchant_category(merchants[i * 3 % merchants.len()])
                    .with_chargeback(customer % 7 == 0 && i % 3 == 0)
                    .with_txn_id(format!("t{}", i))
            })
            .collect()
    }

    #[test]
    fn test_run_end_to_end() {
        let pipeline = RiskPipeline::new(&AppConfig::default()).unwrap();
        let labeled = pipeline.run(&transactions()).unwrap();

        assert_eq!(labeled.customers.len(), 40);
        assert!(!labeled.distribution.is_degenerate());
        assert!(labeled.distribution.positives >= 8);

        let report = pipeline.metrics().report();
        assert_eq!(report.transactions_evaluated, 600);
        assert_eq!(report.customers_aggregated, 40);
        assert!(report.label_distribution.is_some());
    }

    #[test]
    fn test_run_is_idempotent_and_mode_independent() {
        let txns = transactions();
        let mut sequential = AppConfig::default();
        sequential.pipeline.parallel = false;

        let a = RiskPipeline::new(&AppConfig::default()).unwrap().run(&txns).unwrap();
        let b = RiskPipeline::new(&AppConfig::default()).unwrap().run(&txns).unwrap();
        let c = RiskPipeline::new(&sequential).unwrap().run(&txns).unwrap();

        assert_eq!(a, b);
        assert_eq!(a, c);

        let mut out_a = Vec::new();
        let mut out_b = Vec::new();
        crate::writer::write_labeled(&mut out_a, &a).unwrap();
        crate::writer::write_labeled(&mut out_b, &b).unwrap();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn test_raising_amount_never_lowers_mean_rule_score() {
        let pipeline = RiskPipeline::new(&AppConfig::default()).unwrap();
        let mut txns = transactions();
        let before = pipeline.build_features(&txns).unwrap();

        for tx in txns.iter_mut().filter(|t| t.customer_id.as_deref() == Some("3")) {
            tx.amount = Some(2500.0);
        }
        let after = pipeline.build_features(&txns).unwrap();

        let score = |fvs: &[CustomerFeatureVector]| {
            fvs.iter()
                .find(|f| f.customer_id == "3")
                .map(|f| f.mean_rule_score)
                .unwrap()
        };
        assert!(score(&after) >= score(&before));
    }

    #[test]
    fn test_lower_cutoff_labels_at_least_as_many() {
        let features = RiskPipeline::new(&AppConfig::default())
            .unwrap()
            .build_features(&transactions())
            .unwrap();

        let mut loose = AppConfig::default();
        loose.labeling = LabelingConfig {
            cutoff_quantile: 0.5,
            ..LabelingConfig::default()
        };

        let strict = RiskPipeline::new(&AppConfig::default())
            .unwrap()
            .label(features.clone())
            .unwrap();
        let relaxed = RiskPipeline::new(&loose).unwrap().label(features).unwrap();
        assert!(relaxed.distribution.positives >= strict.distribution.positives);
    }

    #[test]
    fn test_empty_input_is_degenerate() {
        let pipeline = RiskPipeline::new(&AppConfig::default()).unwrap();
        assert!(pipeline.build_features(&[]).unwrap().is_empty());
        assert!(matches!(
            pipeline.run(&[]),
            Err(RiskError::DegenerateLabeling { population: 0, .. })
        ));
    }

    #[test]
    fn test_missing_field_aborts_run() {
        let pipeline = RiskPipeline::new(&AppConfig::default()).unwrap();
        let mut txns = transactions();
        txns[42].txn_ts = None;
        assert_eq!(
            pipeline.run(&txns).unwrap_err(),
            RiskError::MissingField {
                field: "txn_ts",
                position: 42,
                txn_id: Some("t42".to_string()),
            }
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.labeling.rules_weight = 0.5;
        assert!(matches!(
            RiskPipeline::new(&config),
            Err(RiskError::InvalidConfiguration(_))
        ));
    }
}
