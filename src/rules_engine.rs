//! Row-wise rule evaluation.
//!
//! Each transaction is checked independently against the configured rules
//! and receives a weighted rule score. Evaluation has no side effects, so a
//! batch may be evaluated on the rayon pool without changing the result.

use crate::config::RulesConfig;
use crate::error::{Result, RiskError};
use crate::types::evaluation::{Rule, RuleEvaluation, ScoredTransaction};
use crate::types::transaction::Transaction;
use chrono::Timelike;
use rayon::prelude::*;
use tracing::debug;

/// Evaluates the fixed risk rules against single transactions.
#[derive(Debug, Clone)]
pub struct RulesEngine {
    config: RulesConfig,
}

impl RulesEngine {
    /// Create a rules engine, rejecting an invalid configuration.
    pub fn new(config: RulesConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Evaluate one transaction.
    ///
    /// `position` is the 0-based row of the transaction in its batch and is
    /// only used to identify the record in a [`RiskError::MissingField`].
    /// Required fields are checked in the order customer_id, txn_ts, amount.
    pub fn evaluate(&self, position: usize, tx: &Transaction) -> Result<ScoredTransaction> {
        let missing = |field: &'static str| RiskError::MissingField {
            field,
            position,
            txn_id: tx.txn_id.clone(),
        };

        let customer_id = tx
            .customer_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| missing("customer_id"))?;
        let txn_ts = tx.txn_ts.ok_or_else(|| missing("txn_ts"))?;
        // Negative amounts (refunds, reversals) are scored as-is
        let amount = tx
            .amount
            .filter(|a| a.is_finite())
            .ok_or_else(|| missing("amount"))?;

        let evaluation = self.evaluate_fields(
            amount,
            tx.country.as_deref(),
            tx.merchant_category.as_deref(),
            txn_ts.hour(),
        );

        Ok(ScoredTransaction {
            customer_id: customer_id.to_string(),
            amount,
            is_chargeback: tx.is_chargeback,
            evaluation,
        })
    }

    /// Evaluate the rules on already-extracted fields.
    ///
    /// Absent country or merchant category never fires its rule.
    pub fn evaluate_fields(
        &self,
        amount: f64,
        country: Option<&str>,
        merchant_category: Option<&str>,
        hour: u32,
    ) -> RuleEvaluation {
        let cfg = &self.config;

        let mut evaluation = RuleEvaluation {
            large_amount: amount > cfg.large_amount_threshold,
            very_large_amount: amount > cfg.very_large_amount_threshold,
            suspicious_country: country
                .map(|c| cfg.suspicious_countries.contains(c))
                .unwrap_or(false),
            high_risk_merchant: merchant_category
                .map(|m| cfg.high_risk_categories.contains(m))
                .unwrap_or(false),
            night_txn: (cfg.night_start_hour..=cfg.night_end_hour).contains(&hour),
            hour,
            rule_score: 0.0,
        };
        evaluation.rule_score = self.score(&evaluation);
        evaluation
    }

    /// Weighted sum of the fired rules.
    pub fn score(&self, evaluation: &RuleEvaluation) -> f64 {
        Rule::ALL
            .iter()
            .map(|rule| self.config.weight(*rule) * evaluation.indicator(*rule))
            .sum()
    }

    /// Highest score a single transaction can reach.
    pub fn max_score(&self) -> f64 {
        Rule::ALL.iter().map(|rule| self.config.weight(*rule)).sum()
    }

    /// Evaluate a whole batch.
    ///
    /// The first malformed record (lowest position) aborts the batch; no
    /// partial output is returned.
    pub fn evaluate_all(
        &self,
        transactions: &[Transaction],
        parallel: bool,
    ) -> Result<Vec<ScoredTransaction>> {
        let results: Vec<Result<ScoredTransaction>> = if parallel {
            transactions
                .par_iter()
                .enumerate()
                .map(|(position, tx)| self.evaluate(position, tx))
                .collect()
        } else {
            transactions
                .iter()
                .enumerate()
                .map(|(position, tx)| self.evaluate(position, tx))
                .collect()
        };

        let scored = results.into_iter().collect::<Result<Vec<_>>>()?;
        debug!(
            transactions = scored.len(),
            parallel = parallel,
            "Rule evaluation complete"
        );
        Ok(scored)
    }

    /// Names of the rules in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        Rule::ALL.iter().map(Rule::name).collect()
    }
}
