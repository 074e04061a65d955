use crate::domain::money::Amount;
use crate::domain::transaction::{TransactionRecord, TransactionType};
use crate::error::{PaymentError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
struct ReportRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Type")]
    r#type: TransactionType,
    #[serde(rename = "Category")]
    category: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
    // Kept as text: csv would otherwise hand the value over as an f64.
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Reference")]
    reference: Option<String>,
}

fn parse_amount(raw: &str) -> Result<Amount> {
    let value = Decimal::from_str(raw)
        .map_err(|e| PaymentError::ValidationError(format!("Invalid amount '{raw}': {e}")))?;
    Amount::new(value)
}

/// Reads transactions from a report-format CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<TransactionRecord>`.
/// Records get the id `row-<n>`, counting data rows from 1.
pub struct TransactionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransactionReader<R> {
    /// Creates a new `TransactionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes transactions.
    pub fn transactions(self) -> impl Iterator<Item = Result<TransactionRecord>> {
        self.reader
            .into_deserialize::<ReportRow>()
            .enumerate()
            .map(|(index, result)| {
                let row = result.map_err(PaymentError::from)?;
                Ok(TransactionRecord {
                    id: format!("row-{}", index + 1),
                    r#type: row.r#type,
                    amount: parse_amount(&row.amount)?,
                    category: row.category.filter(|c| !c.is_empty()),
                    description: row.description.filter(|d| !d.is_empty()),
                    date: row.date,
                    reference: row.reference.filter(|r| !r.is_empty()),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "Date,Type,Category,Description,Amount,Reference\n\
                    2024-01-01,income,Salary,January pay,2500,\n\
                    2024-01-02,expense,Food,,12.5,R-9";
        let reader = TransactionReader::new(data.as_bytes());
        let results: Vec<Result<TransactionRecord>> = reader.transactions().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.id, "row-1");
        assert_eq!(first.r#type, TransactionType::Income);
        assert_eq!(first.amount.value(), dec!(2500));
        assert_eq!(first.reference, None);

        let second = results[1].as_ref().unwrap();
        assert_eq!(second.id, "row-2");
        assert_eq!(second.description, None);
        assert_eq!(second.reference.as_deref(), Some("R-9"));
    }

    #[test]
    fn test_reader_keeps_every_digit_of_the_amount() {
        let data = "Date,Type,Category,Description,Amount,Reference\n\
                    2024-01-01,income,Salary,,99999999999999.99,\n\
                    2024-01-02,expense,Food,,12345678901234567.89,\n\
                    2024-01-03,expense,Food,,0.1234567890123456789,";
        let amounts: Vec<Decimal> = TransactionReader::new(data.as_bytes())
            .transactions()
            .map(|r| r.unwrap().amount.value())
            .collect();

        assert_eq!(
            amounts,
            vec![
                dec!(99999999999999.99),
                dec!(12345678901234567.89),
                dec!(0.1234567890123456789),
            ]
        );
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "Date,Type,Category,Description,Amount,Reference\n\
                    2024-01-01,transfer,Food,,1.0,\n\
                    2024-01-01,expense,Food,,-4,\n\
                    not-a-date,expense,Food,,4,\n\
                    2024-01-01,expense,Food,,,";
        let reader = TransactionReader::new(data.as_bytes());
        let results: Vec<Result<TransactionRecord>> = reader.transactions().collect();

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.is_err()));
    }
}
