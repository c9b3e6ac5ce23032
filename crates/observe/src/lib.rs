//! This crate contains the code required to make the deployer observable.
//! That is the initialization logic for logging as well as the panic hook that
//! routes panic messages through the same log output.
pub mod config;
pub mod tracing;

pub use config::Config;
