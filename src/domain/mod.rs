//! Domain entities and the ports the application layer depends on.

pub mod money;
pub mod payment;
pub mod ports;
pub mod transaction;
