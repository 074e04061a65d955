use super::money::Amount;
use super::transaction::{TransactionRecord, TransactionType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category assigned to records produced from completed payments.
pub const PAYMENTS_CATEGORY: &str = "Payments";

/// Result code reported by the mobile-money network for a confirmed push.
pub const MOBILE_PUSH_SUCCESS_CODE: &str = "0";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Mpesa,
    Bank,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Mpesa => f.write_str("mpesa"),
            PaymentMethod::Bank => f.write_str("bank"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
}

/// What the caller asks the lifecycle to pay.
#[derive(Debug, PartialEq, Clone)]
pub enum PaymentRequest {
    Mpesa { amount: Amount, phone_number: String },
    Bank { amount: Amount, details: BankDetails },
}

impl PaymentRequest {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentRequest::Mpesa { .. } => PaymentMethod::Mpesa,
            PaymentRequest::Bank { .. } => PaymentMethod::Bank,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            PaymentRequest::Mpesa { amount, .. } | PaymentRequest::Bank { amount, .. } => *amount,
        }
    }
}

/// Keeps only the digits of a phone number, e.g. `+254 700-000 000` -> `254700000000`.
pub fn normalize_phone_number(phone_number: &str) -> String {
    phone_number.chars().filter(char::is_ascii_digit).collect()
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Idle,
    Initiating,
    PendingConfirmation,
    AwaitingDelay,
    Completed,
    Failed,
    TimedOut,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::TimedOut
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Idle, Initiating)
                | (Initiating, PendingConfirmation)
                | (Initiating, AwaitingDelay)
                | (Initiating, Failed)
                | (PendingConfirmation, Completed)
                | (PendingConfirmation, Failed)
                | (PendingConfirmation, TimedOut)
                | (AwaitingDelay, Completed)
                | (AwaitingDelay, Failed)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Idle => "idle",
            PaymentStatus::Initiating => "initiating",
            PaymentStatus::PendingConfirmation => "pending_confirmation",
            PaymentStatus::AwaitingDelay => "awaiting_delay",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

/// Status sent to the gateway when finalizing a payment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    Success,
    Failed,
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationStatus::Success => f.write_str("success"),
            ConfirmationStatus::Failed => f.write_str("failed"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct MobilePushReceipt {
    pub checkout_reference: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct MobilePushStatus {
    pub result_code: Option<String>,
    pub result_desc: Option<String>,
}

impl MobilePushStatus {
    pub fn succeeded() -> Self {
        Self {
            result_code: Some(MOBILE_PUSH_SUCCESS_CODE.to_string()),
            result_desc: None,
        }
    }

    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            result_code: Some(code.into()),
            result_desc: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result_code.as_deref() == Some(MOBILE_PUSH_SUCCESS_CODE)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct BankDepositReceipt {
    pub payment_id: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Confirmation {
    pub payment_id: String,
    pub transaction_id: Option<String>,
}

/// One payment attempt as tracked by the lifecycle.
#[derive(Debug, PartialEq, Clone)]
pub struct PaymentAttempt {
    pub reference: String,
    pub request: PaymentRequest,
    pub status: PaymentStatus,
    pub poll_attempts: u32,
}

impl PaymentAttempt {
    pub fn new(reference: impl Into<String>, request: PaymentRequest) -> Self {
        Self {
            reference: reference.into(),
            request,
            status: PaymentStatus::Idle,
            poll_attempts: 0,
        }
    }

    pub fn outcome(&self, failure: Option<String>) -> PaymentOutcome {
        PaymentOutcome {
            r#type: self.request.method(),
            amount: self.request.amount(),
            reference: self.reference.clone(),
            status: self.status,
            failure,
        }
    }
}

/// A state transition published to lifecycle subscribers.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct StateChange {
    pub reference: String,
    pub status: PaymentStatus,
}

/// The terminal result of a payment attempt.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentOutcome {
    pub r#type: PaymentMethod,
    pub amount: Amount,
    pub reference: String,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl PaymentOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    /// Records a completed payment as income, keyed by its payment reference.
    pub fn to_transaction(&self, date: NaiveDate) -> Option<TransactionRecord> {
        if !self.is_completed() {
            return None;
        }
        let record = TransactionRecord::new(
            self.reference.clone(),
            TransactionType::Income,
            self.amount,
            PAYMENTS_CATEGORY,
            date,
        )
        .with_description(format!("{} payment", self.r#type))
        .with_reference(self.reference.clone());
        Some(record)
    }
}
