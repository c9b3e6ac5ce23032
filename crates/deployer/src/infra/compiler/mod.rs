use {
    crate::domain::{CompiledArtifact, ContractName, ContractSource},
    std::path::PathBuf,
    thiserror::Error,
};

pub mod solc;

pub use solc::Solc;

/// Turns contract source into a deployable artifact.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Compile: Send + Sync {
    /// Compiles the source and returns the artifact of the contract named in
    /// `source`.
    async fn compile(&self, source: &ContractSource) -> Result<CompiledArtifact, Error>;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to run compiler {binary:?}: {source}")]
    Spawn {
        binary: PathBuf,
        source: std::io::Error,
    },
    #[error("compiler exited with {status}: {stderr}")]
    Exited { status: String, stderr: String },
    #[error("compilation failed:\n{0}")]
    Diagnostics(String),
    #[error("malformed compiler output: {0}")]
    Output(String),
    #[error("contract {0} has no creation bytecode, it is abstract or an interface")]
    EmptyBytecode(String),
    #[error("contract {name} not found in compiler output, available: {available:?}")]
    ContractNotFound {
        name: ContractName,
        available: Vec<String>,
    },
}

impl Error {
    /// Name of the failure class this error belongs to.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContractNotFound { .. } => "ContractNotFoundError",
            _ => "CompileError",
        }
    }
}
