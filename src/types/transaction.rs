//! Transaction log record

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Timestamp layout used when writing transaction logs.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A raw transaction as read from the transaction log.
///
/// `customer_id`, `txn_ts` and `amount` are required by the rules engine but
/// are kept optional here so that an incomplete row can be reported with its
/// position instead of failing deep inside the CSV decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Customer the transaction belongs to
    #[serde(default)]
    pub customer_id: Option<String>,

    /// Wall-clock timestamp (naive, no time zone)
    #[serde(default, with = "timestamp")]
    pub txn_ts: Option<NaiveDateTime>,

    /// Transaction amount
    #[serde(default)]
    pub amount: Option<f64>,

    /// Currency code (not used for scoring)
    #[serde(default)]
    pub currency: Option<String>,

    /// Merchant category, e.g. "grocery" or "crypto"
    #[serde(default, rename = "merchant_cat", alias = "merchant_category")]
    pub merchant_category: Option<String>,

    /// Channel: online, pos, atm (not used for scoring)
    #[serde(default)]
    pub channel: Option<String>,

    /// ISO-style country code
    #[serde(default)]
    pub country: Option<String>,

    /// Reversed/disputed transaction
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_chargeback: bool,

    /// Optional transaction identifier
    #[serde(default)]
    pub txn_id: Option<String>,
}

impl Transaction {
    /// Create a transaction with the required fields set.
    pub fn new(customer_id: impl Into<String>, txn_ts: NaiveDateTime, amount: f64) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
            txn_ts: Some(txn_ts),
            amount: Some(amount),
            currency: None,
            merchant_category: None,
            channel: None,
            country: None,
            is_chargeback: false,
            txn_id: None,
        }
    }

    pub fn with_merchant_category(mut self, category: impl Into<String>) -> Self {
        self.merchant_category = Some(category.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_chargeback(mut self, is_chargeback: bool) -> Self {
        self.is_chargeback = is_chargeback;
        self
    }

    pub fn with_txn_id(mut self, txn_id: impl Into<String>) -> Self {
        self.txn_id = Some(txn_id.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>, currency: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self.currency = Some(currency.into());
        self
    }
}

/// Parse a transaction timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM:SS[.f]`, the same with a `T` separator,
/// RFC 3339 (the wall-clock time of the given offset is kept) and a bare
/// date, which maps to midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

mod timestamp {
    use super::{parse_timestamp, TIMESTAMP_FORMAT};
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => parse_timestamp(text)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("unparseable timestamp `{}`", text))),
        }
    }
}

fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    use serde::de::Error;

    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(text) => match text.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "t" => Ok(true),
            "false" | "0" | "no" | "n" | "f" => Ok(false),
            other => Err(D::Error::custom(format!("invalid boolean `{}`", other))),
        },
    }
}

/// Serialize a flag as `1`/`0`.
pub(crate) fn bool_as_int<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}
