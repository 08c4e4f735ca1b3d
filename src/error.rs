//! Error taxonomy for the risk pipeline.
//!
//! Every variant is terminal for the invocation that raised it. Nothing in
//! the pipeline retries or recovers locally.

use thiserror::Error;

/// A specialized `Result` type for pipeline operations.
pub type Result<T> = std::result::Result<T, RiskError>;

/// Errors raised by the rules engine, the feature aggregator and the
/// risk label generator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    /// A transaction record lacks a field the rules engine requires.
    #[error("Missing field `{field}` in transaction at position {position}{}", describe_txn(.txn_id))]
    MissingField {
        field: &'static str,
        position: usize,
        txn_id: Option<String>,
    },

    /// Configuration values are out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The labeled population contains a single class only.
    #[error(
        "Degenerate labeling: {positives} positive / {negatives} negative labels across {population} customers"
    )]
    DegenerateLabeling {
        population: usize,
        positives: usize,
        negatives: usize,
    },
}

fn describe_txn(txn_id: &Option<String>) -> String {
    match txn_id {
        Some(id) => format!(" (txn_id {})", id),
        None => String::new(),
    }
}

impl RiskError {
    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        RiskError::InvalidConfiguration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = RiskError::MissingField {
            field: "amount",
            position: 7,
            txn_id: Some("t-7".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Missing field `amount` in transaction at position 7 (txn_id t-7)"
        );

        let err = RiskError::MissingField {
            field: "txn_ts",
            position: 0,
            txn_id: None,
        };
        assert_eq!(
            err.to_string(),
            "Missing field `txn_ts` in transaction at position 0"
        );
    }

    #[test]
    fn test_degenerate_message() {
        let err = RiskError::DegenerateLabeling {
            population: 0,
            positives: 0,
            negatives: 0,
        };
        assert!(err.to_string().contains("across 0 customers"));
    }
}
