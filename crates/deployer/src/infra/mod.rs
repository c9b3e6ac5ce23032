pub mod blockchain;
pub mod cli;
pub mod cluster;
pub mod compiler;
pub mod config;
pub mod input;
pub mod observe;

pub use {blockchain::Ethereum, cluster::KubeConfig, compiler::Solc, config::Config};
