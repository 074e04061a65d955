//! Application layer: the aggregation pipeline and the payment lifecycle.
//!
//! [`aggregator`] is a set of pure functions over transaction records.
//! [`lifecycle::PaymentLifecycle`] drives a payment through the gateway port and
//! owns the timing of the protocol through the clock port.

pub mod aggregator;
pub mod lifecycle;
