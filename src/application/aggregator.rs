//! Pure aggregation over transaction records.
//!
//! Nothing in here keeps state or fails on well-formed input: empty input gives
//! zero totals and empty groupings. Records are assumed valid, which the
//! constructors of [`TransactionRecord`] and [`Amount`](crate::domain::money::Amount)
//! already enforce.

use crate::domain::transaction::{TransactionRecord, TransactionType};
use crate::error::{PaymentError, Result};
use crate::interfaces::csv::report_writer::ReportWriter;
use crate::interfaces::csv::transaction_reader::TransactionReader;
use chrono::{Datelike, NaiveDate, TimeDelta};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Default)]
pub struct Totals {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_balance: Decimal,
    /// Net balance as a percentage of income, `0` when there is no income.
    pub profit_margin: Decimal,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AggregationBucket {
    pub period_key: String,
    pub income: Decimal,
    pub expenses: Decimal,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    /// First day of the bucket `date` falls in.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Daily => date,
            Period::Weekly => {
                date - TimeDelta::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Period::Monthly => date - TimeDelta::days(i64::from(date.day0())),
        }
    }

    pub fn period_key(&self, date: NaiveDate) -> String {
        let start = self.bucket_start(date);
        match self {
            Period::Daily | Period::Weekly => start.format("%Y-%m-%d").to_string(),
            Period::Monthly => start.format("%Y-%m").to_string(),
        }
    }
}

impl FromStr for Period {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            other => Err(PaymentError::ValidationError(format!(
                "Unknown period '{other}', expected daily, weekly or monthly"
            ))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Daily => f.write_str("daily"),
            Period::Weekly => f.write_str("weekly"),
            Period::Monthly => f.write_str("monthly"),
        }
    }
}

fn sum_of(records: &[TransactionRecord], r#type: TransactionType) -> Decimal {
    records
        .iter()
        .filter(|r| r.r#type == r#type)
        .map(|r| r.amount.value())
        .sum()
}

pub fn totals(records: &[TransactionRecord]) -> Totals {
    let total_income = sum_of(records, TransactionType::Income);
    let total_expenses = sum_of(records, TransactionType::Expense);
    let net_balance = total_income - total_expenses;
    let profit_margin = if total_income > Decimal::ZERO {
        net_balance / total_income * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    Totals {
        total_income,
        total_expenses,
        net_balance,
        profit_margin,
    }
}

/// Sums the amounts of records of `r#type` per category.
pub fn group_by_category(
    records: &[TransactionRecord],
    r#type: TransactionType,
) -> HashMap<String, Decimal> {
    let mut groups = HashMap::new();

    for record in records.iter().filter(|r| r.r#type == r#type) {
        *groups
            .entry(record.category_key().to_string())
            .or_insert(Decimal::ZERO) += record.amount.value();
    }

    groups
}

/// Buckets every record by `period`, oldest bucket first.
pub fn group_by_time_period(
    records: &[TransactionRecord],
    period: Period,
) -> Vec<AggregationBucket> {
    let mut buckets: BTreeMap<NaiveDate, AggregationBucket> = BTreeMap::new();

    for record in records {
        let start = period.bucket_start(record.date);
        let bucket = buckets.entry(start).or_insert_with(|| AggregationBucket {
            period_key: period.period_key(start),
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
        });
        match record.r#type {
            TransactionType::Income => bucket.income += record.amount.value(),
            TransactionType::Expense => bucket.expenses += record.amount.value(),
        }
    }

    buckets.into_values().collect()
}

/// Serializes records in the report CSV format.
///
/// Rows are separated by `\n` with no trailing line break after the last row.
pub fn export_to_csv(records: &[TransactionRecord]) -> Result<Vec<u8>> {
    let mut writer = ReportWriter::new(Vec::new());
    writer.write_records(records)?;
    let mut bytes = writer.into_inner()?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    Ok(bytes)
}

/// File name used when an export is written to disk.
pub fn report_filename(date: NaiveDate) -> String {
    format!("financial-report-{}.csv", date.format("%Y-%m-%d"))
}

/// Parses a report CSV back into records, failing on the first bad row.
pub fn read_report<R: Read>(source: R) -> Result<Vec<TransactionRecord>> {
    TransactionReader::new(source).transactions().collect()
}
