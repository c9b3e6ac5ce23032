use {
    alloy::{
        json_abi::JsonAbi,
        primitives::{Address, Bytes, TxHash},
    },
    std::fmt,
};

/// The name of the contract to pick from the compiler output. Also reused as
/// the name of the cluster resources wired up for the contract.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContractName(String);

impl ContractName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without a `<unit>:` prefix.
    pub fn unqualified(&self) -> &str {
        self.0
            .rsplit_once(':')
            .map_or(self.0.as_str(), |(_, name)| name)
    }
}

impl From<String> for ContractName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ContractName {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Solidity source text together with the contract that should be deployed
/// from it.
#[derive(Clone, Debug)]
pub struct ContractSource {
    pub text: String,
    pub name: ContractName,
}

/// ABI and creation bytecode of exactly one contract of the compiler output.
#[derive(Clone, Debug)]
pub struct CompiledArtifact {
    /// Fully qualified identifier in the compiler output, e.g.
    /// `<stdin>:Storage`.
    pub id: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl CompiledArtifact {
    /// Names of all functions in the ABI, sorted and deduplicated.
    pub fn function_names(&self) -> Vec<&str> {
        self.abi.functions.keys().map(String::as_str).collect()
    }
}

/// Data of a mined contract creation transaction.
///
/// Only ever constructed from a confirmed receipt, so there is no pending
/// state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeploymentReceipt {
    pub address: Address,
    pub transaction: TxHash,
    pub block: Option<u64>,
}
