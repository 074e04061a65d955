//! Adapters implementing the domain ports.

pub mod clock;
#[cfg(feature = "gateway-http")]
pub mod http;
pub mod simulated;
