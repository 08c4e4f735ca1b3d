//! Output writers for feature vectors, labels and run artifacts

use crate::types::assessment::LabeledPopulation;
use crate::types::features::CustomerFeatureVector;
use crate::types::transaction::bool_as_int;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// One row of the labeled output table.
#[derive(Serialize)]
struct LabeledRow<'a> {
    customer_id: &'a str,
    transaction_count: u64,
    total_amount: f64,
    max_amount: f64,
    mean_amount: f64,
    mean_rule_score: f64,
    night_txn_ratio: f64,
    high_risk_merchant_ratio: f64,
    suspicious_country_ratio: f64,
    chargeback_rate: f64,
    risk_score: f64,
    #[serde(serialize_with = "bool_as_int")]
    risk_label: bool,
}

/// Write the labeled population as CSV.
pub fn write_labeled<W: Write>(sink: W, population: &LabeledPopulation) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(sink);
    for row in &population.customers {
        let f = &row.features;
        wtr.serialize(LabeledRow {
            customer_id: &f.customer_id,
            transaction_count: f.transaction_count,
            total_amount: f.total_amount,
            max_amount: f.max_amount,
            mean_amount: f.mean_amount,
            mean_rule_score: f.mean_rule_score,
            night_txn_ratio: f.night_txn_ratio,
            high_risk_merchant_ratio: f.high_risk_merchant_ratio,
            suspicious_country_ratio: f.suspicious_country_ratio,
            chargeback_rate: f.chargeback_rate,
            risk_score: row.risk_score,
            risk_label: row.risk_label,
        })?;
    }
    wtr.flush()?;
    debug!(rows = population.customers.len(), "Labeled rows written");
    Ok(())
}

/// Write feature vectors (no score or label) as CSV.
pub fn write_features<W: Write>(sink: W, features: &[CustomerFeatureVector]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(sink);
    for fv in features {
        wtr.serialize(fv)?;
    }
    wtr.flush()?;
    debug!(rows = features.len(), "Feature rows written");
    Ok(())
}

/// Write any serializable value as pretty JSON.
pub fn write_json<W: Write, T: Serialize>(mut sink: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut sink, value)?;
    sink.write_all(b"\n")?;
    sink.flush()?;
    Ok(())
}

/// Create `path` and hand a buffered writer to `write`.
pub fn write_file<P, F>(path: P, what: &str, write: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(BufWriter<File>) -> Result<()>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create {} file {}", what, path.display()))?;
    write(BufWriter::new(file))
        .with_context(|| format!("Failed to write {} file {}", what, path.display()))?;
    info!(path = %path.display(), kind = what, "Output written");
    Ok(())
}
