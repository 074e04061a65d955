use super::money::Amount;
use super::payment::{
    BankDepositReceipt, BankDetails, Confirmation, ConfirmationStatus, MobilePushReceipt,
    MobilePushStatus,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// The remote payment processor.
///
/// Implementations receive their credentials at construction time. Every call
/// may fail; failures are reported as `PaymentError::GatewayError`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate_mobile_push(
        &self,
        amount: Amount,
        phone_number: &str,
        reference: &str,
    ) -> Result<MobilePushReceipt>;

    async fn check_mobile_push_status(&self, checkout_reference: &str) -> Result<MobilePushStatus>;

    async fn initiate_bank_deposit(
        &self,
        amount: Amount,
        details: &BankDetails,
        reference: &str,
    ) -> Result<BankDepositReceipt>;

    async fn confirm_payment(
        &self,
        payment_id: &str,
        status: ConfirmationStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<Confirmation>;
}

/// Source of time for everything that waits.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
    fn now(&self) -> DateTime<Utc>;
}

/// Turns recorded speech into text.
#[async_trait]
pub trait SpeechTranscriber: Send + Sync {
    async fn transcribe(&self) -> Result<String>;
}

/// Extracts printed text from a photographed receipt.
#[async_trait]
pub trait ReceiptScanner: Send + Sync {
    async fn extract_text(&self, image: &[u8]) -> Result<String>;
}

pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type ClockRef = Arc<dyn Clock>;
