//! Population-relative risk labels

use crate::config::LabelingConfig;
use crate::error::{Result, RiskError};
use crate::labeling::percentile::{percentile_ranks, quantile};
use crate::types::assessment::{
    LabelDistribution, LabeledCustomer, LabeledPopulation, RiskAssessment,
};
use crate::types::features::CustomerFeatureVector;
use tracing::{debug, warn};

/// Risk scores for a population together with the cutoff applied to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessments {
    pub cutoff: f64,
    pub assessments: Vec<RiskAssessment>,
}

impl Assessments {
    pub fn distribution(&self) -> LabelDistribution {
        LabelDistribution::from_labels(self.assessments.iter().map(|a| a.risk_label))
    }
}

/// Blends the percentile ranks of chargeback rate and mean rule score into
/// a risk score and labels the top of the population as high risk.
///
/// The cutoff is recomputed from the population on every call, so the same
/// customer may be labeled differently when scored among different peers.
#[derive(Debug, Clone)]
pub struct RiskLabelGenerator {
    config: LabelingConfig,
}

impl RiskLabelGenerator {
    /// Create a generator, rejecting an invalid configuration.
    pub fn new(config: LabelingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Score and label a population without checking class balance.
    ///
    /// An empty population has nothing to rank and is rejected as
    /// degenerate.
    pub fn assess(&self, population: &[CustomerFeatureVector]) -> Result<Assessments> {
        if population.is_empty() {
            return Err(RiskError::DegenerateLabeling {
                population: 0,
                positives: 0,
                negatives: 0,
            });
        }

        let chargeback_rates: Vec<f64> = population.iter().map(|c| c.chargeback_rate).collect();
        let rule_scores: Vec<f64> = population.iter().map(|c| c.mean_rule_score).collect();
        let cb_ranks = percentile_ranks(&chargeback_rates);
        let rules_ranks = percentile_ranks(&rule_scores);

        let risk_scores: Vec<f64> = cb_ranks
            .iter()
            .zip(&rules_ranks)
            .map(|(cb, rules)| self.config.chargeback_weight * cb + self.config.rules_weight * rules)
            .collect();

        let cutoff = quantile(&risk_scores, self.config.cutoff_quantile)
            .ok_or(RiskError::DegenerateLabeling {
                population: 0,
                positives: 0,
                negatives: 0,
            })?;

        let assessments = population
            .iter()
            .zip(risk_scores)
            .map(|(customer, risk_score)| RiskAssessment {
                customer_id: customer.customer_id.clone(),
                risk_score,
                risk_label: risk_score >= cutoff,
            })
            .collect();

        debug!(
            customers = population.len(),
            cutoff = cutoff,
            quantile = self.config.cutoff_quantile,
            "Risk scores computed"
        );

        Ok(Assessments { cutoff, assessments })
    }

    /// Score and label a population for a supervised consumer.
    ///
    /// Fails with [`RiskError::DegenerateLabeling`] when the labels contain
    /// a single class, which includes every single-customer population.
    pub fn generate(&self, population: Vec<CustomerFeatureVector>) -> Result<LabeledPopulation> {
        let Assessments {
            cutoff,
            assessments,
        } = self.assess(&population)?;

        let distribution = LabelDistribution::from_labels(assessments.iter().map(|a| a.risk_label));
        if distribution.is_degenerate() {
            warn!(
                customers = population.len(),
                positives = distribution.positives,
                negatives = distribution.negatives,
                cutoff = cutoff,
                "Risk labels contain a single class"
            );
            return Err(RiskError::DegenerateLabeling {
                population: population.len(),
                positives: distribution.positives,
                negatives: distribution.negatives,
            });
        }

        let customers = population
            .into_iter()
            .zip(assessments)
            .map(|(features, assessment)| LabeledCustomer {
                features,
                risk_score: assessment.risk_score,
                risk_label: assessment.risk_label,
            })
            .collect();

        Ok(LabeledPopulation {
            customers,
            cutoff,
            distribution,
        })
    }
}

impl Default for RiskLabelGenerator {
    fn default() -> Self {
        Self {
            config: LabelingConfig::default(),
        }
    }
}
