//! Synthetic Transaction Simulator
//!
//! Generates a customer table and a transaction log with injected
//! high-risk behavior, for exercising the risk pipeline.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;
use transaction_risk_analyzer::Transaction;

const CUSTOMER_COUNTRIES: [&str; 5] = ["US", "UK", "IN", "DE", "SG"];
const TXN_COUNTRIES: [&str; 7] = ["US", "UK", "IN", "DE", "SG", "NG", "RU"];
const MERCHANT_CATEGORIES: [&str; 6] = [
    "grocery",
    "electronics",
    "entertainment",
    "gambling",
    "crypto",
    "travel",
];
const CHANNELS: [&str; 3] = ["online", "pos", "atm"];

/// Largest mean handed to a single Knuth draw; exp(-mean) stays a normal f64.
const POISSON_CHUNK: f64 = 500.0;

#[derive(Parser, Debug)]
#[command(name = "simulate-transactions", about = "Generate synthetic customers and transactions")]
struct Args {
    /// Directory receiving customers.csv and transactions.csv
    #[arg(short, long, default_value = "data")]
    out_dir: PathBuf,

    #[arg(short, long, default_value_t = 1000)]
    customers: u32,

    /// Mean transactions per customer (Poisson)
    #[arg(long, default_value_t = 80.0, value_parser = parse_positive_mean)]
    avg_txn_per_customer: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
enum RiskSegment {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
struct Customer {
    customer_id: u32,
    created_at: NaiveDate,
    country: &'static str,
    risk_segment: RiskSegment,
}

/// Seeded generator for customers and their transactions
struct TransactionSimulator {
    rng: StdRng,
    transaction_counter: u64,
}

impl TransactionSimulator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            transaction_counter: 0,
        }
    }

    fn generate_customers(&mut self, count: u32) -> Vec<Customer> {
        let epoch = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();
        (1..=count)
            .map(|customer_id| {
                let segment_draw: f64 = self.rng.gen();
                let risk_segment = if segment_draw < 0.6 {
                    RiskSegment::Low
                } else if segment_draw < 0.9 {
                    RiskSegment::Medium
                } else {
                    RiskSegment::High
                };
                Customer {
                    customer_id,
                    created_at: epoch + Duration::days(self.rng.gen_range(0..365)),
                    country: self.random_choice(&CUSTOMER_COUNTRIES),
                    risk_segment,
                }
            })
            .collect()
    }

    fn generate_transactions(&mut self, customer: &Customer, avg_txn: f64) -> Vec<Transaction> {
        let base_time = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();

        let n_txn = self.poisson(avg_txn);
        (0..n_txn)
            .map(|_| self.generate_one(customer, base_time))
            .collect()
    }

    fn generate_one(&mut self, customer: &Customer, base_time: NaiveDateTime) -> Transaction {
        self.transaction_counter += 1;

        let day_offset = self.exponential(5.0) as i64;
        let second_of_day = self.rng.gen_range(0..86_400);
        let txn_ts = base_time + Duration::days(day_offset) + Duration::seconds(second_of_day);

        let mut amount = self.gamma_shape2(50.0);
        let mut merchant = self.random_choice(&MERCHANT_CATEGORIES);
        let channel = self.random_choice(&CHANNELS);
        let mut country = self.random_choice(&TXN_COUNTRIES);

        // Inject suspicious patterns for the high-risk segment
        if customer.risk_segment == RiskSegment::High {
            if self.rng.gen_bool(0.2) {
                amount *= self.rng.gen_range(3.0..10.0);
            }
            if self.rng.gen_bool(0.2) {
                merchant = "crypto";
            }
            if self.rng.gen_bool(0.2) {
                country = "NG";
            }
        }

        let is_chargeback = self.rng.gen_bool(0.02);

        Transaction::new(
            customer.customer_id.to_string(),
            txn_ts,
            (amount * 100.0).round() / 100.0,
        )
        .with_merchant_category(merchant)
        .with_country(country)
        .with_channel(channel, "USD")
        .with_chargeback(is_chargeback)
        .with_txn_id(format!("tx_{:012}", self.transaction_counter))
    }

    /// Poisson draw for any finite positive mean.
    ///
    /// Sums independent draws over chunks of at most [`POISSON_CHUNK`]; a
    /// non-finite or non-positive mean yields 0.
    fn poisson(&mut self, lambda: f64) -> u32 {
        if !(lambda.is_finite() && lambda > 0.0) {
            return 0;
        }
        let mut remaining = lambda;
        let mut total = 0;
        while remaining > 0.0 {
            let step = remaining.min(POISSON_CHUNK);
            total += self.poisson_knuth(step);
            remaining -= step;
        }
        total
    }

    /// Knuth's method; `lambda` must not exceed [`POISSON_CHUNK`].
    fn poisson_knuth(&mut self, lambda: f64) -> u32 {
        let limit = (-lambda).exp();
        let mut k = 0;
        let mut p = 1.0;
        loop {
            p *= self.rng.gen::<f64>();
            if p <= limit {
                return k;
            }
            k += 1;
        }
    }

    fn exponential(&mut self, scale: f64) -> f64 {
        // 1 - U lies in (0, 1], keeping ln finite
        -(1.0 - self.rng.gen::<f64>()).ln() * scale
    }

    /// Gamma(2, scale) as the sum of two exponentials.
    fn gamma_shape2(&mut self, scale: f64) -> f64 {
        self.exponential(scale) + self.exponential(scale)
    }

    fn random_choice(&mut self, choices: &[&'static str]) -> &'static str {
        choices.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

fn parse_positive_mean(s: &str) -> std::result::Result<f64, String> {
    let mean: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if mean.is_finite() && mean > 0.0 {
        Ok(mean)
    } else {
        Err(format!("mean must be a finite number greater than 0, got {}", s))
    }
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simulate_transactions=info".parse()?),
        )
        .init();

    let args = Args::parse();
    info!(
        customers = args.customers,
        avg_txn_per_customer = args.avg_txn_per_customer,
        seed = args.seed,
        out_dir = %args.out_dir.display(),
        "Starting transaction simulator"
    );

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    let mut simulator = TransactionSimulator::new(args.seed);
    let customers = simulator.generate_customers(args.customers);

    let mut transactions = Vec::new();
    for customer in &customers {
        let batch = simulator.generate_transactions(customer, args.avg_txn_per_customer);
        transactions.extend(batch);
    }

    let high_risk = customers
        .iter()
        .filter(|c| c.risk_segment == RiskSegment::High)
        .count();

    write_csv(&args.out_dir.join("customers.csv"), &customers)?;
    write_csv(&args.out_dir.join("transactions.csv"), &transactions)?;

    info!(
        customers = customers.len(),
        high_risk_customers = high_risk,
        transactions = transactions.len(),
        "Completed simulation"
    );
    Ok(())
}
