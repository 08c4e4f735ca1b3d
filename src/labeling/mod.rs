//! Risk score and label generation

pub mod generator;
pub mod percentile;

pub use generator::{Assessments, RiskLabelGenerator};
pub use percentile::{percentile_ranks, quantile};
