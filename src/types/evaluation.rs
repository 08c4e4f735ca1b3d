//! Per-transaction rule outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of transaction risk rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    LargeAmount,
    VeryLargeAmount,
    SuspiciousCountry,
    HighRiskMerchant,
    NightTxn,
}

impl Rule {
    /// All rules in evaluation order.
    pub const ALL: [Rule; 5] = [
        Rule::LargeAmount,
        Rule::VeryLargeAmount,
        Rule::SuspiciousCountry,
        Rule::HighRiskMerchant,
        Rule::NightTxn,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Rule::LargeAmount => "large_amount",
            Rule::VeryLargeAmount => "very_large_amount",
            Rule::SuspiciousCountry => "suspicious_country",
            Rule::HighRiskMerchant => "high_risk_merchant",
            Rule::NightTxn => "night_txn",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Rule::LargeAmount => 0,
            Rule::VeryLargeAmount => 1,
            Rule::SuspiciousCountry => 2,
            Rule::HighRiskMerchant => 3,
            Rule::NightTxn => 4,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of all rules against one transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleEvaluation {
    pub large_amount: bool,
    pub very_large_amount: bool,
    pub suspicious_country: bool,
    pub high_risk_merchant: bool,
    pub night_txn: bool,
    /// Hour of day (0-23) taken from the naive timestamp
    pub hour: u32,
    /// Weighted sum of the fired rules
    pub rule_score: f64,
}

impl RuleEvaluation {
    /// Whether `rule` fired.
    pub fn fired(&self, rule: Rule) -> bool {
        match rule {
            Rule::LargeAmount => self.large_amount,
            Rule::VeryLargeAmount => self.very_large_amount,
            Rule::SuspiciousCountry => self.suspicious_country,
            Rule::HighRiskMerchant => self.high_risk_merchant,
            Rule::NightTxn => self.night_txn,
        }
    }

    /// 0/1 indicator for `rule`.
    pub fn indicator(&self, rule: Rule) -> f64 {
        if self.fired(rule) {
            1.0
        } else {
            0.0
        }
    }

    pub fn fired_rules(&self) -> Vec<Rule> {
        Rule::ALL.into_iter().filter(|r| self.fired(*r)).collect()
    }
}

/// A validated transaction together with its rule evaluation.
///
/// Carries only what aggregation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTransaction {
    pub customer_id: String,
    pub amount: f64,
    pub is_chargeback: bool,
    pub evaluation: RuleEvaluation,
}
