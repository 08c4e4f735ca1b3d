//! Customer feature aggregation

pub mod aggregator;

pub use aggregator::FeatureAggregator;
