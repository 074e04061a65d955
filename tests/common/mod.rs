#![allow(dead_code)]

use chrono::{NaiveDate, TimeDelta};
use kashela::application::lifecycle::{LifecycleConfig, PaymentLifecycle};
use kashela::domain::money::Amount;
use kashela::domain::payment::{BankDetails, PaymentRequest};
use kashela::domain::transaction::{TransactionRecord, TransactionType};
use kashela::infrastructure::clock::VirtualClock;
use kashela::infrastructure::simulated::SimulatedGateway;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::sync::Arc;

const CATEGORIES: [&str; 5] = ["Food", "Transport", "Salary", "Utilities", ""];

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

pub fn record(
    id: &str,
    r#type: TransactionType,
    amount: Decimal,
    category: &str,
    on: &str,
) -> TransactionRecord {
    TransactionRecord::new(id, r#type, Amount::new(amount).unwrap(), category, date(on))
}

/// Records with random types, categories, cent amounts and dates across 2024.
pub fn random_records(count: usize, seed: u64) -> Vec<TransactionRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = date("2024-01-01");

    (0..count)
        .map(|i| {
            let r#type = if rng.gen_bool(0.4) {
                TransactionType::Income
            } else {
                TransactionType::Expense
            };
            let cents: i64 = rng.gen_range(0..500_000);
            let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
            let day = start + TimeDelta::days(rng.gen_range(0..366));
            TransactionRecord::new(
                format!("r{i}"),
                r#type,
                Amount::new(Decimal::new(cents, 2)).unwrap(),
                category,
                day,
            )
        })
        .collect()
}

pub fn mpesa_request(amount: Decimal, phone_number: &str) -> PaymentRequest {
    PaymentRequest::Mpesa {
        amount: Amount::new(amount).unwrap(),
        phone_number: phone_number.to_string(),
    }
}

pub fn bank_request(amount: Decimal) -> PaymentRequest {
    PaymentRequest::Bank {
        amount: Amount::new(amount).unwrap(),
        details: BankDetails {
            bank_name: "Equity Bank".to_string(),
            account_number: "0123456789".to_string(),
            account_name: "Jane Wanjiru".to_string(),
        },
    }
}

/// A lifecycle on simulated time with the default protocol budget.
pub fn instant_lifecycle(gateway: &SimulatedGateway) -> (PaymentLifecycle, Arc<VirtualClock>) {
    let clock = Arc::new(VirtualClock::default());
    let lifecycle = PaymentLifecycle::new(
        Arc::new(gateway.clone()),
        clock.clone(),
        LifecycleConfig::default(),
    );
    (lifecycle, clock)
}
