//! Per-customer reduction of scored transactions

use crate::types::evaluation::ScoredTransaction;
use crate::types::features::{compare_customer_ids, CustomerFeatureVector};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Running totals for one customer.
#[derive(Debug, Clone, Default)]
struct CustomerAccumulator {
    count: u64,
    total_amount: f64,
    max_amount: f64,
    rule_score_sum: f64,
    night_txns: u64,
    high_risk_merchant_txns: u64,
    suspicious_country_txns: u64,
    chargebacks: u64,
}

impl CustomerAccumulator {
    fn push(&mut self, tx: &ScoredTransaction) {
        let eval = &tx.evaluation;
        if self.count == 0 || tx.amount > self.max_amount {
            self.max_amount = tx.amount;
        }
        self.count += 1;
        self.total_amount += tx.amount;
        self.rule_score_sum += eval.rule_score;
        self.night_txns += u64::from(eval.night_txn);
        self.high_risk_merchant_txns += u64::from(eval.high_risk_merchant);
        self.suspicious_country_txns += u64::from(eval.suspicious_country);
        self.chargebacks += u64::from(tx.is_chargeback);
    }

    /// Only called for customers with at least one transaction.
    fn finish(self, customer_id: String) -> CustomerFeatureVector {
        let n = self.count as f64;
        CustomerFeatureVector {
            customer_id,
            transaction_count: self.count,
            total_amount: self.total_amount,
            max_amount: self.max_amount,
            mean_amount: self.total_amount / n,
            mean_rule_score: self.rule_score_sum / n,
            night_txn_ratio: self.night_txns as f64 / n,
            high_risk_merchant_ratio: self.high_risk_merchant_txns as f64 / n,
            suspicious_country_ratio: self.suspicious_country_txns as f64 / n,
            chargeback_rate: self.chargebacks as f64 / n,
        }
    }
}

/// Groups scored transactions by customer and reduces each group into a
/// feature vector.
///
/// Only customers that appear in the input are emitted. Output is ordered by
/// customer id so repeated runs produce identical output.
#[derive(Debug, Clone)]
pub struct FeatureAggregator {
    parallel: bool,
}

impl FeatureAggregator {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    pub fn aggregate(&self, transactions: &[ScoredTransaction]) -> Vec<CustomerFeatureVector> {
        // Map: customer id -> rows, keeping input order inside each group
        let mut groups: HashMap<&str, Vec<&ScoredTransaction>> = HashMap::new();
        for tx in transactions {
            groups.entry(tx.customer_id.as_str()).or_default().push(tx);
        }

        let mut groups: Vec<(&str, Vec<&ScoredTransaction>)> = groups.into_iter().collect();
        groups.sort_by(|a, b| compare_customer_ids(a.0, b.0));

        // Reduce
        let reduce = |(customer_id, rows): &(&str, Vec<&ScoredTransaction>)| {
            let mut acc = CustomerAccumulator::default();
            for tx in rows {
                acc.push(tx);
            }
            acc.finish(customer_id.to_string())
        };

        let vectors: Vec<CustomerFeatureVector> = if self.parallel {
            groups.par_iter().map(reduce).collect()
        } else {
            groups.iter().map(reduce).collect()
        };

        debug!(
            transactions = transactions.len(),
            customers = vectors.len(),
            "Feature aggregation complete"
        );
        vectors
    }
}

impl Default for FeatureAggregator {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::rules_engine::RulesEngine;
    use crate::types::transaction::{parse_timestamp, Transaction};

    fn scored(rows: &[Transaction]) -> Vec<ScoredTransaction> {
        RulesEngine::new(RulesConfig::default())
            .unwrap()
            .evaluate_all(rows, false)
            .unwrap()
    }

    fn tx(customer: &str, amount: f64, ts: &str) -> Transaction {
        Transaction::new(customer, parse_timestamp(ts).unwrap(), amount)
    }

    #[test]
    fn test_scenario_customer() {
        let rows = vec![
            tx("1", 100.0, "2024-01-01 14:00:00").with_country("US"),
            tx("1", 3000.0, "2024-01-02 02:00:00")
                .with_country("NG")
                .with_merchant_category("crypto"),
        ];

        let vectors = FeatureAggregator::new(false).aggregate(&scored(&rows));
        assert_eq!(vectors.len(), 1);

        let fv = &vectors[0];
        assert_eq!(fv.transaction_count, 2);
        assert_eq!(fv.total_amount, 3100.0);
        assert_eq!(fv.max_amount, 3000.0);
        assert_eq!(fv.mean_amount, 1550.0);
        assert_eq!(fv.mean_rule_score, 3.5);
        assert_eq!(fv.night_txn_ratio, 0.5);
        assert_eq!(fv.suspicious_country_ratio, 0.5);
        assert_eq!(fv.high_risk_merchant_ratio, 0.5);
        assert_eq!(fv.chargeback_rate, 0.0);
    }

    #[test]
    fn test_single_transaction_customer() {
        let rows = vec![tx("7", 42.5, "2024-01-01 04:00:00").with_chargeback(true)];
        let vectors = FeatureAggregator::new(false).aggregate(&scored(&rows));

        let fv = &vectors[0];
        assert_eq!(fv.max_amount, 42.5);
        assert_eq!(fv.mean_amount, 42.5);
        assert_eq!(fv.night_txn_ratio, 1.0);
        assert_eq!(fv.chargeback_rate, 1.0);
        assert_eq!(fv.suspicious_country_ratio, 0.0);
    }

    #[test]
    fn test_counts_and_ratio_bounds() {
        let rows: Vec<Transaction> = (0..300)
            .map(|i| {
                tx(
                    &format!("{}", i % 7),
                    (i * 37 % 2500) as f64,
                    &format!("2024-01-01 {:02}:00:00", i % 24),
                )
                .with_country(if i % 5 == 0 { "PK" } else { "UK" })
                .with_merchant_category(if i % 4 == 0 { "gambling" } else { "travel" })
                .with_chargeback(i % 11 == 0)
            })
            .collect();

        let vectors = FeatureAggregator::new(true).aggregate(&scored(&rows));
        assert_eq!(vectors.len(), 7);

        for fv in &vectors {
            let expected = rows
                .iter()
                .filter(|t| t.customer_id.as_deref() == Some(fv.customer_id.as_str()))
                .count() as u64;
            assert_eq!(fv.transaction_count, expected);
            for ratio in fv.ratios() {
                assert!((0.0..=1.0).contains(&ratio));
            }
            assert!(fv.max_amount >= fv.mean_amount);
        }
        let total: u64 = vectors.iter().map(|fv| fv.transaction_count).sum();
        assert_eq!(total, 300);
    }

    #[test]
    fn test_ratio_equals_fraction_of_fired_rows() {
        // 1 of 3 rows is at night: mean of [1, 0, 0] must be exactly 1/3
        let rows = vec![
            tx("a", 1.0, "2024-01-01 01:00:00"),
            tx("a", 1.0, "2024-01-01 11:00:00"),
            tx("a", 1.0, "2024-01-01 21:00:00"),
        ];
        let fv = &FeatureAggregator::new(false).aggregate(&scored(&rows))[0];
        assert_eq!(fv.night_txn_ratio, 1.0 / 3.0);
    }

    #[test]
    fn test_output_ordered_and_unique() {
        let rows = vec![
            tx("10", 1.0, "2024-01-01 12:00:00"),
            tx("2", 1.0, "2024-01-01 12:00:00"),
            tx("10", 1.0, "2024-01-01 12:00:00"),
            tx("1", 1.0, "2024-01-01 12:00:00"),
        ];
        let vectors = FeatureAggregator::new(true).aggregate(&scored(&rows));
        let ids: Vec<&str> = vectors.iter().map(|fv| fv.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "10"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(FeatureAggregator::default().aggregate(&[]).is_empty());
    }
}
