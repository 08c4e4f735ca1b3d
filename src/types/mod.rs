//! Type definitions for the risk pipeline

pub mod assessment;
pub mod evaluation;
pub mod features;
pub mod transaction;

pub use assessment::{LabelDistribution, LabeledCustomer, LabeledPopulation, RiskAssessment};
pub use evaluation::{Rule, RuleEvaluation, ScoredTransaction};
pub use features::{CustomerFeatureVector, FEATURE_NAMES};
pub use transaction::Transaction;
