//! Transaction log reader

use crate::types::transaction::Transaction;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

/// Reads transactions from a CSV transaction log.
///
/// Columns are matched by header name; unknown columns are ignored and
/// optional columns may be absent entirely.
pub struct TransactionReader {
    path: PathBuf,
}

impl TransactionReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read every record of the log.
    pub fn read_all(&self) -> Result<Vec<Transaction>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open transaction log {}", self.path.display()))?;
        let transactions = read_transactions(file)
            .with_context(|| format!("Failed to read transaction log {}", self.path.display()))?;
        info!(
            path = %self.path.display(),
            transactions = transactions.len(),
            "Transaction log loaded"
        );
        Ok(transactions)
    }
}

/// Decode CSV transactions from any reader.
pub fn read_transactions<R: Read>(source: R) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    rdr.deserialize::<Transaction>()
        .enumerate()
        .map(|(position, record)| {
            record.with_context(|| format!("Malformed transaction at position {}", position))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_read_full_schema() {
        let data = "\
customer_id,txn_ts,amount,currency,merchant_cat,channel,country,is_chargeback,txn_id
1,2024-01-01 14:00:00,100.0,USD,grocery,pos,US,False,t1
1,2024-01-02 02:00:00,3000.0,USD,crypto,online,NG,True,t2
";
        let txns = read_transactions(data.as_bytes()).unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].customer_id.as_deref(), Some("1"));
        assert_eq!(txns[0].amount, Some(100.0));
        assert_eq!(txns[0].merchant_category.as_deref(), Some("grocery"));
        assert!(!txns[0].is_chargeback);
        assert_eq!(txns[1].txn_ts.unwrap().hour(), 2);
        assert!(txns[1].is_chargeback);
        assert_eq!(txns[1].txn_id.as_deref(), Some("t2"));
    }

    #[test]
    fn test_optional_columns_may_be_absent() {
        let data = "customer_id,txn_ts,amount,merchant_cat,country\n7,2024-03-01,12.5,travel,DE\n";
        let txns = read_transactions(data.as_bytes()).unwrap();
        assert_eq!(txns.len(), 1);
        assert!(!txns[0].is_chargeback);
        assert!(txns[0].txn_id.is_none());
        assert!(txns[0].currency.is_none());
    }

    #[test]
    fn test_empty_required_cells_become_absent() {
        let data = "customer_id,txn_ts,amount,merchant_cat,country,is_chargeback\n,2024-03-01 10:00:00,,travel,DE,\n";
        let txns = read_transactions(data.as_bytes()).unwrap();
        assert!(txns[0].customer_id.is_none());
        assert!(txns[0].amount.is_none());
        assert!(txns[0].txn_ts.is_some());
        assert!(!txns[0].is_chargeback);
    }

    #[test]
    fn test_chargeback_spellings() {
        let data = "customer_id,txn_ts,amount,is_chargeback\n1,2024-01-01,1,1\n1,2024-01-01,1,0\n1,2024-01-01,1,true\n1,2024-01-01,1,FALSE\n";
        let flags: Vec<bool> = read_transactions(data.as_bytes())
            .unwrap()
            .iter()
            .map(|t| t.is_chargeback)
            .collect();
        assert_eq!(flags, vec![true, false, true, false]);
    }

    #[test]
    fn test_bad_timestamp_is_an_error() {
        let data = "customer_id,txn_ts,amount\n1,not-a-date,10\n";
        let err = read_transactions(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("position 0"));
    }

    #[test]
    fn test_missing_file() {
        let reader = TransactionReader::new("/nonexistent/transactions.csv");
        assert!(reader.read_all().is_err());
    }
}
