pub mod application;
pub mod capture;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
