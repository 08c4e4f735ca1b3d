//! Risk scores and labels

use crate::types::features::CustomerFeatureVector;
use serde::{Deserialize, Serialize};

/// Population-relative risk of one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub customer_id: String,
    /// Blend of percentile ranks (0.0 - 1.0)
    pub risk_score: f64,
    /// True when the score reaches the population cutoff
    pub risk_label: bool,
}

/// Feature vector joined with its assessment; one output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledCustomer {
    pub features: CustomerFeatureVector,
    pub risk_score: f64,
    pub risk_label: bool,
}

/// Count of each label class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDistribution {
    pub positives: usize,
    pub negatives: usize,
}

impl LabelDistribution {
    pub fn from_labels<I: IntoIterator<Item = bool>>(labels: I) -> Self {
        labels.into_iter().fold(Self::default(), |mut acc, label| {
            if label {
                acc.positives += 1;
            } else {
                acc.negatives += 1;
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.positives + self.negatives
    }

    /// Fewer than two classes present.
    pub fn is_degenerate(&self) -> bool {
        self.positives == 0 || self.negatives == 0
    }

    pub fn positive_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.positives as f64 / self.total() as f64
        }
    }
}

/// Labeled customers plus the cutoff that produced the labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPopulation {
    pub customers: Vec<LabeledCustomer>,
    pub cutoff: f64,
    pub distribution: LabelDistribution,
}
