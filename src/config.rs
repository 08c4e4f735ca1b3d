//! Configuration management for the risk pipeline

use crate::error::{Result as RiskResult, RiskError};
use crate::types::evaluation::Rule;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment overrides, e.g. `RISK__LABELING__CUTOFF_QUANTILE`
pub const ENV_PREFIX: &str = "RISK";

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub labeling: LabelingConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Thresholds, category sets and weights of the transaction rules
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RulesConfig {
    /// Amount strictly above this fires `large_amount`
    #[serde(default = "default_large_amount_threshold")]
    pub large_amount_threshold: f64,
    /// Amount strictly above this fires `very_large_amount`
    #[serde(default = "default_very_large_amount_threshold")]
    pub very_large_amount_threshold: f64,
    #[serde(default = "default_suspicious_countries")]
    pub suspicious_countries: BTreeSet<String>,
    #[serde(default = "default_high_risk_categories")]
    pub high_risk_categories: BTreeSet<String>,
    /// First hour (inclusive) counted as night
    #[serde(default)]
    pub night_start_hour: u32,
    /// Last hour (inclusive) counted as night
    #[serde(default = "default_night_end_hour")]
    pub night_end_hour: u32,
    /// Weight per rule in the rule score. Rules left out weigh nothing.
    #[serde(default = "default_rule_weights")]
    pub rule_weights: BTreeMap<Rule, f64>,
}

fn default_large_amount_threshold() -> f64 {
    500.0
}

fn default_very_large_amount_threshold() -> f64 {
    2000.0
}

fn default_suspicious_countries() -> BTreeSet<String> {
    ["NG", "RU", "PK"].iter().map(|s| s.to_string()).collect()
}

fn default_high_risk_categories() -> BTreeSet<String> {
    ["gambling", "crypto"].iter().map(|s| s.to_string()).collect()
}

fn default_night_end_hour() -> u32 {
    5
}

fn default_rule_weights() -> BTreeMap<Rule, f64> {
    let mut weights = BTreeMap::new();
    weights.insert(Rule::LargeAmount, 1.0);
    weights.insert(Rule::VeryLargeAmount, 2.0);
    weights.insert(Rule::SuspiciousCountry, 1.5);
    weights.insert(Rule::HighRiskMerchant, 1.5);
    weights.insert(Rule::NightTxn, 1.0);
    weights
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            large_amount_threshold: default_large_amount_threshold(),
            very_large_amount_threshold: default_very_large_amount_threshold(),
            suspicious_countries: default_suspicious_countries(),
            high_risk_categories: default_high_risk_categories(),
            night_start_hour: 0,
            night_end_hour: default_night_end_hour(),
            rule_weights: default_rule_weights(),
        }
    }
}

impl RulesConfig {
    /// Weight of `rule`, zero when the map leaves it out.
    pub fn weight(&self, rule: Rule) -> f64 {
        self.rule_weights.get(&rule).copied().unwrap_or(0.0)
    }

    pub fn validate(&self) -> RiskResult<()> {
        if self.rule_weights.is_empty() {
            return Err(RiskError::invalid_config("rule weight set is empty"));
        }
        for (rule, weight) in &self.rule_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(RiskError::invalid_config(format!(
                    "rule weight for {} must be a finite non-negative number, got {}",
                    rule, weight
                )));
            }
        }
        for (name, threshold) in [
            ("large_amount_threshold", self.large_amount_threshold),
            ("very_large_amount_threshold", self.very_large_amount_threshold),
        ] {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(RiskError::invalid_config(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, threshold
                )));
            }
        }
        if self.night_start_hour > 23 || self.night_end_hour > 23 {
            return Err(RiskError::invalid_config(format!(
                "night hours must lie in 0..=23, got {}..={}",
                self.night_start_hour, self.night_end_hour
            )));
        }
        if self.night_start_hour > self.night_end_hour {
            return Err(RiskError::invalid_config(format!(
                "night_start_hour {} is after night_end_hour {}",
                self.night_start_hour, self.night_end_hour
            )));
        }
        Ok(())
    }
}

/// Risk label blend weights and cutoff
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LabelingConfig {
    /// Weight of the chargeback-rate percentile rank
    #[serde(default = "default_chargeback_weight")]
    pub chargeback_weight: f64,
    /// Weight of the mean-rule-score percentile rank
    #[serde(default = "default_rules_weight")]
    pub rules_weight: f64,
    /// Population quantile of the risk score at which labels turn positive
    #[serde(default = "default_cutoff_quantile")]
    pub cutoff_quantile: f64,
}

fn default_chargeback_weight() -> f64 {
    0.6
}

fn default_rules_weight() -> f64 {
    0.4
}

fn default_cutoff_quantile() -> f64 {
    0.80
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            chargeback_weight: default_chargeback_weight(),
            rules_weight: default_rules_weight(),
            cutoff_quantile: default_cutoff_quantile(),
        }
    }
}

impl LabelingConfig {
    pub fn validate(&self) -> RiskResult<()> {
        let weights = [self.chargeback_weight, self.rules_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RiskError::invalid_config(format!(
                "label blend weights must be finite and non-negative, got {} / {}",
                self.chargeback_weight, self.rules_weight
            )));
        }
        let sum = self.chargeback_weight + self.rules_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RiskError::invalid_config(format!(
                "label blend weights must sum to 1.0, got {}",
                sum
            )));
        }
        if !(self.cutoff_quantile > 0.0 && self.cutoff_quantile < 1.0) {
            return Err(RiskError::invalid_config(format!(
                "cutoff quantile must lie strictly between 0 and 1, got {}",
                self.cutoff_quantile
            )));
        }
        Ok(())
    }
}

/// Pipeline execution configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PipelineConfig {
    /// Evaluate rules and reduce customer groups on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific path plus environment overrides.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("rules.suspicious_countries")
                    .with_list_parse_key("rules.high_risk_categories"),
            )
            .build()
            .context("Failed to build configuration")?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app.validate()?;
        Ok(app)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let app: AppConfig = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> RiskResult<()> {
        self.rules.validate()?;
        self.labeling.validate()
    }
}
