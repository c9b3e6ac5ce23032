pub mod contract;
pub mod manifest;

pub use {
    contract::{CompiledArtifact, ContractName, ContractSource, DeploymentReceipt},
    manifest::Manifests,
};
