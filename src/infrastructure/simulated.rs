use crate::domain::money::Amount;
use crate::domain::payment::{
    BankDepositReceipt, BankDetails, Confirmation, ConfirmationStatus, MobilePushReceipt,
    MobilePushStatus,
};
use crate::domain::ports::PaymentGateway;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A scripted answer to one status check.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReply {
    /// The push has no result yet.
    Pending,
    /// The gateway answered with this status.
    Code(MobilePushStatus),
    /// The check never reached the gateway.
    Unreachable,
}

/// Calls received by a [`SimulatedGateway`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayCalls {
    pub mobile_push_initiations: u32,
    pub status_checks: u32,
    pub bank_deposits: u32,
    pub confirmations: u32,
    pub phone_numbers: Vec<String>,
    pub confirmed_payments: Vec<(String, ConfirmationStatus)>,
}

impl GatewayCalls {
    pub fn total(&self) -> u32 {
        self.mobile_push_initiations + self.status_checks + self.bank_deposits + self.confirmations
    }
}

#[derive(Debug, Default)]
struct Simulation {
    calls: GatewayCalls,
    next_id: u32,
    fixed_reference: Option<String>,
    pending_polls: u32,
    polls_by_reference: HashMap<String, u32>,
    status_script: VecDeque<StatusReply>,
    initiation_failure: Option<String>,
    confirmation_failure: Option<String>,
}

impl Simulation {
    fn next_reference(&mut self) -> String {
        if let Some(reference) = &self.fixed_reference {
            return reference.clone();
        }
        self.next_id += 1;
        format!("MOCK_{:08X}", self.next_id)
    }
}

/// An in-process payment gateway that simulates confirmation.
///
/// Without a script, a push is confirmed after `pending_polls` status checks
/// answered as pending. A status script, when set, answers checks in order
/// before falling back to that rule. Clones share the same simulation, so a
/// test can keep a handle to inspect [`calls`](Self::calls). The `with_*` and
/// `failing_*` builders panic once a clone exists.
#[derive(Debug, Default, Clone)]
pub struct SimulatedGateway {
    simulation: Arc<RwLock<Simulation>>,
}

impl SimulatedGateway {
    /// Creates a gateway that confirms pushes on the first status check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder methods only work before the gateway is cloned.
    fn configure(mut self, f: impl FnOnce(&mut Simulation)) -> Self {
        let simulation = Arc::get_mut(&mut self.simulation)
            .expect("SimulatedGateway must be configured before it is cloned");
        f(simulation.get_mut());
        self
    }

    pub fn with_pending_polls(self, pending_polls: u32) -> Self {
        self.configure(|s| s.pending_polls = pending_polls)
    }

    /// Returns `reference` as checkout reference and deposit id.
    pub fn with_reference(self, reference: impl Into<String>) -> Self {
        let reference = reference.into();
        self.configure(|s| s.fixed_reference = Some(reference))
    }

    pub fn with_status_script(self, replies: Vec<StatusReply>) -> Self {
        self.configure(|s| s.status_script = replies.into())
    }

    pub fn failing_initiation(self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.configure(|s| s.initiation_failure = Some(reason))
    }

    pub fn failing_confirmation(self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.configure(|s| s.confirmation_failure = Some(reason))
    }

    pub async fn clear_failures(&self) {
        let mut simulation = self.simulation.write().await;
        simulation.initiation_failure = None;
        simulation.confirmation_failure = None;
    }

    pub async fn calls(&self) -> GatewayCalls {
        self.simulation.read().await.calls.clone()
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn initiate_mobile_push(
        &self,
        _amount: Amount,
        phone_number: &str,
        _reference: &str,
    ) -> Result<MobilePushReceipt> {
        let mut simulation = self.simulation.write().await;
        simulation.calls.mobile_push_initiations += 1;
        simulation.calls.phone_numbers.push(phone_number.to_string());
        if let Some(reason) = &simulation.initiation_failure {
            return Err(PaymentError::GatewayError(reason.clone()));
        }
        Ok(MobilePushReceipt {
            checkout_reference: simulation.next_reference(),
        })
    }

    async fn check_mobile_push_status(&self, checkout_reference: &str) -> Result<MobilePushStatus> {
        let mut simulation = self.simulation.write().await;
        simulation.calls.status_checks += 1;

        if let Some(reply) = simulation.status_script.pop_front() {
            return match reply {
                StatusReply::Pending => Ok(MobilePushStatus::default()),
                StatusReply::Code(status) => Ok(status),
                StatusReply::Unreachable => Err(PaymentError::GatewayError(
                    "status endpoint unreachable".to_string(),
                )),
            };
        }

        let pending_polls = simulation.pending_polls;
        let polls = simulation
            .polls_by_reference
            .entry(checkout_reference.to_string())
            .or_insert(0);
        *polls += 1;
        if *polls > pending_polls {
            Ok(MobilePushStatus::succeeded())
        } else {
            Ok(MobilePushStatus::default())
        }
    }

    async fn initiate_bank_deposit(
        &self,
        _amount: Amount,
        _details: &BankDetails,
        _reference: &str,
    ) -> Result<BankDepositReceipt> {
        let mut simulation = self.simulation.write().await;
        simulation.calls.bank_deposits += 1;
        if let Some(reason) = &simulation.initiation_failure {
            return Err(PaymentError::GatewayError(reason.clone()));
        }
        Ok(BankDepositReceipt {
            payment_id: simulation.next_reference(),
        })
    }

    async fn confirm_payment(
        &self,
        payment_id: &str,
        status: ConfirmationStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<Confirmation> {
        let mut simulation = self.simulation.write().await;
        simulation.calls.confirmations += 1;
        simulation
            .calls
            .confirmed_payments
            .push((payment_id.to_string(), status));
        if let Some(reason) = &simulation.confirmation_failure {
            return Err(PaymentError::GatewayError(reason.clone()));
        }
        Ok(Confirmation {
            payment_id: payment_id.to_string(),
            transaction_id: Some(format!("TRX-{}", timestamp.timestamp_millis())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount() -> Amount {
        Amount::new(dec!(100)).unwrap()
    }

    #[tokio::test]
    async fn test_generates_mock_references() {
        let gateway = SimulatedGateway::new();
        let first = gateway
            .initiate_mobile_push(amount(), "254712345678", "KSH-1")
            .await
            .unwrap();
        let second = gateway
            .initiate_mobile_push(amount(), "254712345678", "KSH-2")
            .await
            .unwrap();

        assert_eq!(first.checkout_reference, "MOCK_00000001");
        assert_eq!(second.checkout_reference, "MOCK_00000002");
    }

    #[tokio::test]
    async fn test_confirms_after_pending_polls() {
        let gateway = SimulatedGateway::new().with_pending_polls(2);
        let receipt = gateway
            .initiate_mobile_push(amount(), "254712345678", "KSH-1")
            .await
            .unwrap();

        for _ in 0..2 {
            let status = gateway
                .check_mobile_push_status(&receipt.checkout_reference)
                .await
                .unwrap();
            assert!(!status.is_success());
        }
        let status = gateway
            .check_mobile_push_status(&receipt.checkout_reference)
            .await
            .unwrap();
        assert!(status.is_success());
        assert_eq!(gateway.calls().await.status_checks, 3);
    }

    #[tokio::test]
    async fn test_script_is_answered_in_order() {
        let gateway = SimulatedGateway::new().with_status_script(vec![
            StatusReply::Unreachable,
            StatusReply::Code(MobilePushStatus::with_code("1032")),
        ]);

        assert!(gateway.check_mobile_push_status("CR1").await.is_err());
        let status = gateway.check_mobile_push_status("CR1").await.unwrap();
        assert_eq!(status.result_code.as_deref(), Some("1032"));
        // Script exhausted, falls back to confirming.
        assert!(gateway.check_mobile_push_status("CR1").await.unwrap().is_success());
    }

    #[test]
    #[should_panic(expected = "configured before it is cloned")]
    fn test_configuring_a_shared_gateway_panics() {
        let gateway = SimulatedGateway::new();
        let _handle = gateway.clone();
        let _ = gateway.with_pending_polls(1);
    }

    #[tokio::test]
    async fn test_configured_failures() {
        let gateway = SimulatedGateway::new()
            .failing_initiation("rejected")
            .failing_confirmation("ledger down");
        let details = BankDetails {
            bank_name: "KCB".to_string(),
            account_number: "0011".to_string(),
            account_name: "Jane Doe".to_string(),
        };

        let deposit = gateway.initiate_bank_deposit(amount(), &details, "KSH-1").await;
        assert!(matches!(deposit, Err(PaymentError::GatewayError(_))));

        let confirm = gateway
            .confirm_payment("P1", ConfirmationStatus::Success, Utc::now())
            .await;
        assert!(matches!(confirm, Err(PaymentError::GatewayError(_))));

        let calls = gateway.calls().await;
        assert_eq!(calls.bank_deposits, 1);
        assert_eq!(calls.confirmations, 1);
        assert_eq!(calls.confirmed_payments, vec![("P1".to_string(), ConfirmationStatus::Success)]);
    }
}
