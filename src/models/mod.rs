//! Hand-over contract for the external model trainer/scorer

pub mod dataset;

pub use dataset::{AnomalyDetector, RankedCustomer, RiskClassifier, TrainingSet};
