use crate::domain::payment::{
    normalize_phone_number, BankDetails, ConfirmationStatus, PaymentAttempt, PaymentOutcome,
    PaymentRequest, PaymentStatus, StateChange,
};
use crate::domain::ports::{ClockRef, PaymentGatewayRef};
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 16;

/// Timing and retry budget of the payment protocol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Wait before each mobile-push status check.
    pub poll_interval: Duration,
    /// Status checks performed before the attempt times out.
    pub max_poll_attempts: u32,
    /// Wait between a bank deposit initiation and its confirmation.
    pub settlement_delay: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_poll_attempts: 10,
            settlement_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Default)]
struct LifecycleState {
    status: PaymentStatus,
    cancel: Option<CancellationToken>,
}

/// Drives one payment attempt at a time from initiation to a terminal state.
///
/// The gateway is only reached through [`PaymentGateway`](crate::domain::ports::PaymentGateway)
/// and every wait goes through the injected [`Clock`](crate::domain::ports::Clock),
/// so the whole protocol can run against simulated time.
///
/// Gateway failures never escape [`initiate`](Self::initiate): they end the attempt
/// in [`PaymentStatus::Failed`] with the cause attached to the outcome.
pub struct PaymentLifecycle {
    gateway: PaymentGatewayRef,
    clock: ClockRef,
    config: LifecycleConfig,
    events: broadcast::Sender<StateChange>,
    state: Mutex<LifecycleState>,
}

/// Releases the in-flight slot on every exit path, including a dropped future.
struct InFlightGuard<'a> {
    state: &'a Mutex<LifecycleState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.cancel = None;
        if !state.status.is_terminal() {
            state.status = PaymentStatus::Idle;
        }
    }
}

fn lock(state: &Mutex<LifecycleState>) -> MutexGuard<'_, LifecycleState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn ensure_active(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        Err(PaymentError::Cancelled)
    } else {
        Ok(())
    }
}

impl PaymentLifecycle {
    pub fn new(gateway: PaymentGatewayRef, clock: ClockRef, config: LifecycleConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gateway,
            clock,
            config,
            events,
            state: Mutex::new(LifecycleState::default()),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Receives every state change published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    /// State of the current attempt, or the terminal state of the last one.
    pub fn status(&self) -> PaymentStatus {
        lock(&self.state).status
    }

    /// Abandons the attempt in flight, if any.
    ///
    /// Scheduled waits are dropped and the result of a gateway call still in
    /// progress is discarded once it arrives. Returns whether an attempt was
    /// cancelled.
    pub fn cancel(&self) -> bool {
        match lock(&self.state).cancel.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Runs a payment attempt to its terminal state.
    ///
    /// Fails with `AttemptInFlight` while another attempt of this instance is
    /// running, whatever the request. Otherwise fails with `ValidationError`
    /// for unusable payment details, and with `Cancelled` when
    /// [`cancel`](Self::cancel) is called before the attempt finishes.
    pub async fn initiate(&self, request: PaymentRequest) -> Result<PaymentOutcome> {
        let token = CancellationToken::new();
        let request = {
            let mut state = lock(&self.state);
            if state.cancel.is_some() {
                return Err(PaymentError::AttemptInFlight);
            }
            let request = validate(request)?;
            state.cancel = Some(token.clone());
            state.status = PaymentStatus::Idle;
            request
        };
        let _guard = InFlightGuard { state: &self.state };

        let reference = format!("KSH-{}", self.clock.now().timestamp_millis());
        let mut attempt = PaymentAttempt::new(reference, request);
        self.transition(&mut attempt, PaymentStatus::Initiating);

        let result = match attempt.request.clone() {
            PaymentRequest::Mpesa {
                amount,
                phone_number,
            } => {
                let receipt = self
                    .gateway
                    .initiate_mobile_push(amount, &phone_number, &attempt.reference)
                    .await;
                ensure_active(&token)?;
                match receipt {
                    Ok(receipt) => {
                        attempt.reference = receipt.checkout_reference;
                        self.transition(&mut attempt, PaymentStatus::PendingConfirmation);
                        self.poll_until_resolved(&mut attempt, &token).await
                    }
                    Err(e) => Ok(self.fail(&mut attempt, e)),
                }
            }
            PaymentRequest::Bank { amount, details } => {
                let receipt = self
                    .gateway
                    .initiate_bank_deposit(amount, &details, &attempt.reference)
                    .await;
                ensure_active(&token)?;
                match receipt {
                    Ok(receipt) => {
                        attempt.reference = receipt.payment_id;
                        self.transition(&mut attempt, PaymentStatus::AwaitingDelay);
                        self.sleep(&token, self.config.settlement_delay).await?;
                        self.finalize(&mut attempt, &token).await
                    }
                    Err(e) => Ok(self.fail(&mut attempt, e)),
                }
            }
        };

        if matches!(result, Err(PaymentError::Cancelled)) {
            info!(reference = %attempt.reference, status = %attempt.status, "Payment attempt cancelled");
        }
        result
    }

    /// Checks the push status until it succeeds or the attempt budget runs out.
    ///
    /// A check that fails to reach the gateway still consumes one attempt.
    async fn poll_until_resolved(
        &self,
        attempt: &mut PaymentAttempt,
        token: &CancellationToken,
    ) -> Result<PaymentOutcome> {
        while attempt.poll_attempts < self.config.max_poll_attempts {
            self.sleep(token, self.config.poll_interval).await?;
            attempt.poll_attempts += 1;

            let status = self
                .gateway
                .check_mobile_push_status(&attempt.reference)
                .await;
            ensure_active(token)?;

            match status {
                Ok(status) if status.is_success() => {
                    return self.finalize(attempt, token).await;
                }
                Ok(status) => {
                    debug!(
                        reference = %attempt.reference,
                        attempt = attempt.poll_attempts,
                        result_code = ?status.result_code,
                        "Payment not confirmed yet"
                    );
                }
                Err(e) => {
                    warn!(
                        reference = %attempt.reference,
                        attempt = attempt.poll_attempts,
                        "Status check failed: {e}"
                    );
                }
            }
        }

        let timeout = PaymentError::Timeout {
            reference: attempt.reference.clone(),
            attempts: attempt.poll_attempts,
        };
        warn!("{timeout}");
        self.transition(attempt, PaymentStatus::TimedOut);
        Ok(attempt.outcome(Some(timeout.to_string())))
    }

    async fn finalize(
        &self,
        attempt: &mut PaymentAttempt,
        token: &CancellationToken,
    ) -> Result<PaymentOutcome> {
        let confirmation = self
            .gateway
            .confirm_payment(&attempt.reference, ConfirmationStatus::Success, self.clock.now())
            .await;
        ensure_active(token)?;

        match confirmation {
            Ok(_) => {
                self.transition(attempt, PaymentStatus::Completed);
                Ok(attempt.outcome(None))
            }
            Err(e) => Ok(self.fail(attempt, e)),
        }
    }

    async fn sleep(&self, token: &CancellationToken, duration: Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(PaymentError::Cancelled),
            _ = self.clock.sleep(duration) => Ok(()),
        }
    }

    fn fail(&self, attempt: &mut PaymentAttempt, cause: PaymentError) -> PaymentOutcome {
        error!(reference = %attempt.reference, "Payment failed: {cause}");
        self.transition(attempt, PaymentStatus::Failed);
        attempt.outcome(Some(cause.to_string()))
    }

    fn transition(&self, attempt: &mut PaymentAttempt, next: PaymentStatus) {
        debug_assert!(
            attempt.status.can_transition_to(next),
            "invalid payment transition {} -> {}",
            attempt.status,
            next
        );
        attempt.status = next;
        lock(&self.state).status = next;
        info!(reference = %attempt.reference, status = %next, "Payment state changed");

        // Nobody listening is fine.
        let _ = self.events.send(StateChange {
            reference: attempt.reference.clone(),
            status: next,
        });
    }
}

fn validate(request: PaymentRequest) -> Result<PaymentRequest> {
    if request.amount().is_zero() {
        return Err(PaymentError::ValidationError(
            "Payment amount must be positive".to_string(),
        ));
    }

    match request {
        PaymentRequest::Mpesa {
            amount,
            phone_number,
        } => {
            let phone_number = normalize_phone_number(&phone_number);
            if phone_number.is_empty() {
                return Err(PaymentError::ValidationError(
                    "Phone number has no digits".to_string(),
                ));
            }
            Ok(PaymentRequest::Mpesa {
                amount,
                phone_number,
            })
        }
        PaymentRequest::Bank { amount, details } => {
            let BankDetails {
                bank_name,
                account_number,
                account_name,
            } = &details;
            if [bank_name, account_number, account_name]
                .iter()
                .any(|field| field.trim().is_empty())
            {
                return Err(PaymentError::ValidationError(
                    "Bank name, account number and account name are required".to_string(),
                ));
            }
            Ok(PaymentRequest::Bank { amount, details })
        }
    }
}
