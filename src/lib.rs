//! Transaction Risk Analyzer Library
//!
//! Scores financial transactions with deterministic risk rules, aggregates
//! them into per-customer feature vectors and derives population-relative
//! risk labels for downstream classification and anomaly detection.

pub mod config;
pub mod error;
pub mod features;
pub mod labeling;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod reader;
pub mod rules_engine;
pub mod types;
pub mod writer;

pub use config::AppConfig;
pub use error::{Result, RiskError};
pub use features::FeatureAggregator;
pub use labeling::RiskLabelGenerator;
pub use models::TrainingSet;
pub use pipeline::RiskPipeline;
pub use reader::TransactionReader;
pub use rules_engine::RulesEngine;
pub use types::{CustomerFeatureVector, LabeledPopulation, RiskAssessment, Transaction};
