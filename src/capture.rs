//! Turning captured speech and receipt text into transaction drafts.
//!
//! The speech and OCR engines themselves live outside this crate behind the
//! [`SpeechTranscriber`] and [`ReceiptScanner`] ports; only their text output is
//! interpreted here.

use crate::domain::money::Amount;
use crate::domain::ports::{ReceiptScanner, SpeechTranscriber};
use crate::domain::transaction::{TransactionRecord, TransactionType};
use crate::error::Result;
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

pub const OTHER_CATEGORY: &str = "other";
const RECEIPT_FALLBACK_DESCRIPTION: &str = "Receipt scan";
const VOICE_CATEGORIES: [&str; 6] = [
    "food",
    "transport",
    "shopping",
    "utilities",
    "entertainment",
    "salary",
];
const INCOME_WORDS: [&str; 3] = ["income", "earned", "received"];

static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static CURRENCY_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:KES|KSH|RS)\s*(\d+(?:,\d{3})*(?:\.\d{2})?)").unwrap()
});
static PLAIN_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:,\d{3})*(?:\.\d{2})?)").unwrap());

/// A transaction guessed from captured input, to be reviewed before saving.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionDraft {
    pub r#type: TransactionType,
    pub amount: Amount,
    pub category: String,
    pub description: String,
}

impl TransactionDraft {
    pub fn into_record(self, id: impl Into<String>, date: NaiveDate) -> TransactionRecord {
        TransactionRecord::new(id, self.r#type, self.amount, self.category, date)
            .with_description(self.description)
    }
}

fn parse_amount(digits: &str) -> Amount {
    Decimal::from_str(&digits.replace(',', ""))
        .ok()
        .and_then(|value| Amount::new(value).ok())
        .unwrap_or(Amount::ZERO)
}

/// Reads a spoken note such as "spent 200 on food".
///
/// The first whole number is the amount. The note counts as income when it
/// mentions income, earned or received.
pub fn parse_voice_note(transcript: &str) -> TransactionDraft {
    let text = transcript.to_lowercase();
    let amount = FIRST_NUMBER
        .find(&text)
        .map(|m| parse_amount(m.as_str()))
        .unwrap_or(Amount::ZERO);
    let r#type = if INCOME_WORDS.iter().any(|word| text.contains(word)) {
        TransactionType::Income
    } else {
        TransactionType::Expense
    };
    let category = VOICE_CATEGORIES
        .iter()
        .find(|category| text.contains(*category))
        .copied()
        .unwrap_or(OTHER_CATEGORY);

    TransactionDraft {
        r#type,
        amount,
        category: category.to_string(),
        description: transcript.to_string(),
    }
}

/// Reads OCR output of a receipt. Receipts are always expenses.
pub fn parse_receipt_text(text: &str) -> TransactionDraft {
    let amount = CURRENCY_AMOUNT
        .captures(text)
        .or_else(|| PLAIN_AMOUNT.captures(text))
        .and_then(|captures| captures.get(1))
        .map(|m| parse_amount(m.as_str()))
        .unwrap_or(Amount::ZERO);
    let description = text
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .unwrap_or(RECEIPT_FALLBACK_DESCRIPTION);

    TransactionDraft {
        r#type: TransactionType::Expense,
        amount,
        category: OTHER_CATEGORY.to_string(),
        description: description.to_string(),
    }
}

pub async fn capture_voice(transcriber: &dyn SpeechTranscriber) -> Result<TransactionDraft> {
    let transcript = transcriber.transcribe().await?;
    Ok(parse_voice_note(&transcript))
}

pub async fn capture_receipt(
    scanner: &dyn ReceiptScanner,
    image: &[u8],
) -> Result<TransactionDraft> {
    let text = scanner.extract_text(image).await?;
    Ok(parse_receipt_text(&text))
}
