//! Compilation through the `solc --standard-json` interface.

use {
    super::{Compile, Error},
    crate::domain::{CompiledArtifact, ContractName, ContractSource},
    alloy::{json_abi::JsonAbi, primitives::Bytes},
    serde::Deserialize,
    std::{collections::BTreeMap, path::PathBuf, process::Stdio},
    tokio::io::AsyncWriteExt,
};

/// Source unit name the contract text is compiled under. Contracts in the
/// output are identified as `<stdin>:<ContractName>`.
pub const SOURCE_UNIT: &str = "<stdin>";

/// A `solc` binary on the local machine.
#[derive(Clone, Debug)]
pub struct Solc {
    binary: PathBuf,
}

impl Solc {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Runs the compiler with the standard JSON input on stdin and returns
    /// its stdout.
    async fn run(&self, input: &[u8]) -> Result<Vec<u8>, Error> {
        let spawn_error = |source| Error::Spawn {
            binary: self.binary.clone(),
            source,
        };

        let mut child = tokio::process::Command::new(&self.binary)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        // Stdin has to be closed before waiting, otherwise solc keeps reading.
        let mut stdin = child.stdin.take().expect("stdin is piped");
        stdin.write_all(input).await.map_err(spawn_error)?;
        drop(stdin);

        let output = child.wait_with_output().await.map_err(spawn_error)?;
        if !output.status.success() {
            return Err(Error::Exited {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait::async_trait]
impl Compile for Solc {
    async fn compile(&self, source: &ContractSource) -> Result<CompiledArtifact, Error> {
        let input = serde_json::to_vec(&input(&source.text)).expect("JSON values serialize");
        let stdout = self.run(&input).await?;
        let output: Output =
            serde_json::from_slice(&stdout).map_err(|err| Error::Output(err.to_string()))?;
        select(output, &source.name)
    }
}

/// Standard JSON input compiling `text` as a single source unit, only
/// requesting the outputs needed for deployment.
pub fn input(text: &str) -> serde_json::Value {
    serde_json::json!({
        "language": "Solidity",
        "sources": {
            SOURCE_UNIT: { "content": text },
        },
        "settings": {
            "outputSelection": {
                "*": { "*": ["abi", "evm.bytecode.object"] },
            },
        },
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    #[serde(default)]
    errors: Vec<Diagnostic>,
    /// Source unit name → contract name → contract.
    #[serde(default)]
    contracts: BTreeMap<String, BTreeMap<String, Contract>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Diagnostic {
    severity: String,
    message: String,
    formatted_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Contract {
    #[serde(default)]
    abi: Option<serde_json::Value>,
    #[serde(default)]
    evm: Option<Evm>,
}

#[derive(Debug, Deserialize)]
struct Evm {
    bytecode: Option<Bytecode>,
}

#[derive(Debug, Deserialize)]
struct Bytecode {
    object: String,
}

/// Picks the contract named `name` out of the compiler output. `name` may be
/// either the bare contract name or its fully qualified identifier.
pub fn select(output: Output, name: &ContractName) -> Result<CompiledArtifact, Error> {
    let errors = output
        .errors
        .iter()
        .filter(|diagnostic| diagnostic.severity == "error")
        .map(|diagnostic| {
            diagnostic
                .formatted_message
                .as_deref()
                .unwrap_or(&diagnostic.message)
                .trim()
        })
        .collect::<Vec<_>>();
    if !errors.is_empty() {
        return Err(Error::Diagnostics(errors.join("\n")));
    }

    let mut matches = Vec::new();
    let mut available = Vec::new();
    for (unit, contracts) in output.contracts {
        for (contract_name, contract) in contracts {
            let id = format!("{unit}:{contract_name}");
            if contract_name == name.as_str() || id == name.as_str() {
                matches.push((id.clone(), contract));
            }
            available.push(id);
        }
    }

    let (id, contract) = match matches.len() {
        0 => {
            return Err(Error::ContractNotFound {
                name: name.clone(),
                available,
            });
        }
        1 => matches.remove(0),
        _ => {
            return Err(Error::Output(format!(
                "contract name {name} is ambiguous, use one of {:?}",
                matches.iter().map(|(id, _)| id).collect::<Vec<_>>()
            )));
        }
    };

    let abi: JsonAbi = serde_json::from_value(
        contract
            .abi
            .ok_or_else(|| Error::Output(format!("{id} has no ABI")))?,
    )
    .map_err(|err| Error::Output(format!("invalid ABI for {id}: {err}")))?;
    let object = contract
        .evm
        .and_then(|evm| evm.bytecode)
        .map(|bytecode| bytecode.object)
        .ok_or_else(|| Error::Output(format!("{id} has no bytecode")))?;
    if object.is_empty() {
        return Err(Error::EmptyBytecode(id));
    }
    let bytecode: Bytes = alloy::primitives::hex::decode(&object)
        .map_err(|err| {
            // Unlinked library references show up as `__$…$__` placeholders.
            Error::Output(format!("bytecode of {id} is not valid hex: {err}"))
        })?
        .into();

    Ok(CompiledArtifact { id, abi, bytecode })
}
