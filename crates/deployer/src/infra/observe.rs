//! This module implements the observability for the deployer. It exposes
//! functions which represent events that are meaningful to the workflow.
//! These functions are called when the corresponding events occur and log
//! them.

use {
    crate::{
        domain::{CompiledArtifact, ContractSource, DeploymentReceipt},
        run::{Error, Stage},
    },
    alloy::primitives::{Address, TxHash},
    std::fmt::Display,
    url::Url,
};

/// Setup the observability. The log argument configures the tokio tracing
/// framework.
pub fn init(config: &observe::Config) {
    observe::tracing::initialize(config);
}

/// Observe that the inputs of the workflow are known.
pub fn inputs_resolved(source: &ContractSource, endpoint: Option<&Url>) {
    tracing::info!(
        contract = %source.name,
        source_len = source.text.len(),
        endpoint = endpoint.map(tracing::field::display),
        "resolved inputs"
    );
}

/// Observe that compilation is about to start.
pub fn compiling(source: &ContractSource) {
    tracing::debug!(contract = %source.name, "compiling contract");
}

/// Observe a successfully compiled contract.
pub fn compiled(artifact: &CompiledArtifact) {
    tracing::info!(
        id = %artifact.id,
        bytecode_len = artifact.bytecode.len(),
        functions = ?artifact.function_names(),
        "compiled contract"
    );
}

/// Observe that a connection to the node was established.
pub fn connected(url: &Url, chain_id: u64) {
    tracing::debug!(%url, chain_id, "connected to node");
}

/// Observe the account contracts get deployed from.
pub fn account_selected(account: Address, known_accounts: usize) {
    if known_accounts > 1 {
        tracing::debug!(
            ?account,
            known_accounts,
            "node knows multiple accounts, using the first"
        );
    }
    tracing::info!(?account, "deploying from account");
}

pub fn account_unlocked(account: Address) {
    tracing::info!(?account, "unlocked account");
}

/// Observe that the contract creation transaction was accepted by the node.
pub fn transaction_submitted(transaction: TxHash) {
    tracing::info!(?transaction, "submitted contract creation, waiting for receipt");
}

/// Observe a mined contract creation.
pub fn deployed(receipt: &DeploymentReceipt) {
    tracing::info!(
        address = ?receipt.address,
        transaction = ?receipt.transaction,
        block = ?receipt.block,
        "deployed contract"
    );
}

pub fn cluster_config_loaded(cluster: &impl Display, namespace: &str) {
    tracing::debug!(%cluster, namespace, "loaded cluster config");
}

/// Observe a created cluster resource.
pub fn created(kind: &str, name: &str) {
    tracing::info!(kind, name, "created cluster resource");
}

/// Observe that the workflow stopped at `stage`. Nothing created by earlier
/// stages is cleaned up.
pub fn failed(stage: Stage, err: &Error) {
    tracing::error!(?stage, kind = err.kind(), "deployment failed: {err}");
}
