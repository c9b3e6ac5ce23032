#![forbid(unsafe_code)]

pub mod domain;
pub mod infra;
pub mod run;

pub use run::start;
