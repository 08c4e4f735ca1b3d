//! Per-customer feature vector

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Feature column names in the order produced by [`CustomerFeatureVector::values`].
pub const FEATURE_NAMES: [&str; 9] = [
    "transaction_count",
    "total_amount",
    "max_amount",
    "mean_amount",
    "mean_rule_score",
    "night_txn_ratio",
    "high_risk_merchant_ratio",
    "suspicious_country_ratio",
    "chargeback_rate",
];

/// Aggregated behavior of one customer over all of their transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerFeatureVector {
    pub customer_id: String,
    pub transaction_count: u64,
    pub total_amount: f64,
    pub max_amount: f64,
    pub mean_amount: f64,
    pub mean_rule_score: f64,
    pub night_txn_ratio: f64,
    pub high_risk_merchant_ratio: f64,
    pub suspicious_country_ratio: f64,
    pub chargeback_rate: f64,
}

impl CustomerFeatureVector {
    /// Feature values in [`FEATURE_NAMES`] order.
    pub fn values(&self) -> Vec<f64> {
        vec![
            self.transaction_count as f64,
            self.total_amount,
            self.max_amount,
            self.mean_amount,
            self.mean_rule_score,
            self.night_txn_ratio,
            self.high_risk_merchant_ratio,
            self.suspicious_country_ratio,
            self.chargeback_rate,
        ]
    }

    pub fn ratios(&self) -> [f64; 4] {
        [
            self.night_txn_ratio,
            self.high_risk_merchant_ratio,
            self.suspicious_country_ratio,
            self.chargeback_rate,
        ]
    }
}

/// Order customer ids: integer ids numerically, then everything else
/// lexicographically.
pub fn compare_customer_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
