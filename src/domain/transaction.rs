use super::money::Amount;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category key used when a record carries no category.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single income or expense entry.
///
/// Records are values: they are never updated in place, an edit produces a new
/// record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransactionRecord {
    pub id: String,
    pub r#type: TransactionType,
    pub amount: Amount,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub reference: Option<String>,
}

impl TransactionRecord {
    pub fn new(
        id: impl Into<String>,
        r#type: TransactionType,
        amount: Amount,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        let category = category.into();
        Self {
            id: id.into(),
            r#type,
            amount,
            category: (!category.is_empty()).then_some(category),
            description: None,
            date,
            reference: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// The grouping key for this record's category.
    pub fn category_key(&self) -> &str {
        match self.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => category,
            _ => UNCATEGORIZED,
        }
    }
}
