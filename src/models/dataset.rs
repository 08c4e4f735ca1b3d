//! Training data handed to the external classifier and anomaly detector.

use crate::error::{Result, RiskError};
use crate::types::assessment::{LabelDistribution, LabeledPopulation};
use crate::types::features::FEATURE_NAMES;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Supervised risk classifier implemented outside this crate.
pub trait RiskClassifier {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[u8]) -> anyhow::Result<()>;

    /// Probability of the high-risk class for one feature row.
    fn predict_proba(&self, features: &[f64]) -> anyhow::Result<f64>;
}

/// Unsupervised anomaly detector implemented outside this crate.
pub trait AnomalyDetector {
    fn fit(&mut self, features: &[Vec<f64>]) -> anyhow::Result<()>;

    /// Higher means more anomalous.
    fn anomaly_score(&self, features: &[f64]) -> anyhow::Result<f64>;
}

/// Row-major feature matrix with binary labels.
///
/// `customer_id`, `risk_score` and `risk_label` are not features: the score
/// is what the label was derived from and would leak it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub feature_names: Vec<String>,
    pub customer_ids: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

/// One customer ranked by an anomaly detector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCustomer {
    pub customer_id: String,
    pub anomaly_score: f64,
    pub risk_label: u8,
}

impl TrainingSet {
    pub fn from_population(population: &LabeledPopulation) -> Self {
        let mut customer_ids = Vec::with_capacity(population.customers.len());
        let mut features = Vec::with_capacity(population.customers.len());
        let mut labels = Vec::with_capacity(population.customers.len());

        for row in &population.customers {
            customer_ids.push(row.features.customer_id.clone());
            features.push(row.features.values());
            labels.push(u8::from(row.risk_label));
        }

        Self {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            customer_ids,
            features,
            labels,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn class_counts(&self) -> LabelDistribution {
        LabelDistribution::from_labels(self.labels.iter().map(|&l| l == 1))
    }

    /// A binary classifier cannot be fit on fewer than two classes.
    pub fn ensure_both_classes(&self) -> Result<()> {
        let counts = self.class_counts();
        if counts.is_degenerate() {
            return Err(RiskError::DegenerateLabeling {
                population: self.len(),
                positives: counts.positives,
                negatives: counts.negatives,
            });
        }
        Ok(())
    }

    /// Fit a classifier after checking class balance.
    pub fn fit_classifier<C: RiskClassifier>(&self, classifier: &mut C) -> anyhow::Result<()> {
        self.ensure_both_classes()?;
        classifier.fit(&self.features, &self.labels)
    }

    /// The `n` most anomalous customers, highest score first.
    pub fn top_anomalies<D: AnomalyDetector>(
        &self,
        detector: &D,
        n: usize,
    ) -> anyhow::Result<Vec<RankedCustomer>> {
        let mut ranked = Vec::with_capacity(self.len());
        for ((customer_id, row), label) in self.customer_ids.iter().zip(&self.features).zip(&self.labels) {
            ranked.push(RankedCustomer {
                customer_id: customer_id.clone(),
                anomaly_score: detector.anomaly_score(row)?,
                risk_label: *label,
            });
        }
        ranked.sort_by(|a, b| {
            b.anomaly_score
                .partial_cmp(&a.anomaly_score)
                .unwrap_or(Ordering::Equal)
        });
        ranked.truncate(n);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::assessment::LabeledCustomer;
    use crate::types::features::CustomerFeatureVector;

    fn population() -> LabeledPopulation {
        let customers: Vec<LabeledCustomer> = (0..6)
            .map(|i| LabeledCustomer {
                features: CustomerFeatureVector {
                    customer_id: i.to_string(),
                    transaction_count: 3 + i as u64,
                    total_amount: 100.0 * i as f64,
                    max_amount: 60.0 * i as f64,
                    mean_amount: 100.0 * i as f64 / (3 + i) as f64,
                    mean_rule_score: i as f64 * 0.5,
                    night_txn_ratio: 0.0,
                    high_risk_merchant_ratio: 0.0,
                    suspicious_country_ratio: 0.0,
                    chargeback_rate: 0.0,
                },
                risk_score: i as f64 / 6.0,
                risk_label: i == 5,
            })
            .collect();
        LabeledPopulation {
            distribution: LabelDistribution::from_labels(customers.iter().map(|c| c.risk_label)),
            customers,
            cutoff: 5.0 / 6.0,
        }
    }

    /// Scores rows by their mean rule score.
    struct RuleScoreDetector;

    impl AnomalyDetector for RuleScoreDetector {
        fn fit(&mut self, _features: &[Vec<f64>]) -> anyhow::Result<()> {
            Ok(())
        }

        fn anomaly_score(&self, features: &[f64]) -> anyhow::Result<f64> {
            Ok(features[4])
        }
    }

    /// Remembers how many rows it was fit on.
    #[derive(Default)]
    struct CountingClassifier {
        rows: usize,
    }

    impl RiskClassifier for CountingClassifier {
        fn fit(&mut self, features: &[Vec<f64>], labels: &[u8]) -> anyhow::Result<()> {
            assert_eq!(features.len(), labels.len());
            self.rows = features.len();
            Ok(())
        }

        fn predict_proba(&self, _features: &[f64]) -> anyhow::Result<f64> {
            Ok(0.5)
        }
    }

    #[test]
    fn test_training_set_shape() {
        let set = TrainingSet::from_population(&population());
        assert_eq!(set.len(), 6);
        assert_eq!(set.feature_names.len(), 9);
        assert!(!set.feature_names.iter().any(|n| n == "risk_score" || n == "customer_id"));
        assert!(set.features.iter().all(|row| row.len() == 9));
        assert_eq!(set.labels, vec![0, 0, 0, 0, 0, 1]);
        assert_eq!(set.class_counts().positives, 1);
    }

    #[test]
    fn test_fit_classifier_requires_both_classes() {
        let mut set = TrainingSet::from_population(&population());
        let mut clf = CountingClassifier::default();
        set.fit_classifier(&mut clf).unwrap();
        assert_eq!(clf.rows, 6);

        set.labels = vec![0; 6];
        assert!(set.ensure_both_classes().is_err());
        assert!(set.fit_classifier(&mut CountingClassifier::default()).is_err());
    }

    #[test]
    fn test_top_anomalies() {
        let set = TrainingSet::from_population(&population());
        let top = set.top_anomalies(&RuleScoreDetector, 2).unwrap();
        let ids: Vec<&str> = top.iter().map(|r| r.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["5", "4"]);
        assert_eq!(top[0].risk_label, 1);
    }
}
