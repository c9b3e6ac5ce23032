use {
    crate::{
        domain::{CompiledArtifact, DeploymentReceipt},
        infra::observe,
    },
    alloy::{
        network::TransactionBuilder,
        primitives::{Address, Bytes, TxHash},
        providers::{DynProvider, PendingTransactionError, Provider, ProviderBuilder},
        rpc::types::{TransactionReceipt, TransactionRequest},
        transports::TransportError,
    },
    serde::Deserialize,
    std::{fmt, time::Duration},
    thiserror::Error,
    url::Url,
};

/// Puts compiled contracts on chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Chain: Send + Sync {
    /// Deploys the artifact from the node's primary account and waits until
    /// the creation transaction is mined.
    async fn deploy(&self, artifact: &CompiledArtifact) -> Result<DeploymentReceipt, Error>;
}

/// How to unlock a node managed account that is reported as locked.
#[derive(Clone)]
pub struct Unlock {
    pub passphrase: String,
    pub duration: Duration,
}

impl fmt::Debug for Unlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unlock")
            .field("passphrase", &"SECRET")
            .field("duration", &self.duration)
            .finish()
    }
}

/// An Ethereum (or Ethereum-compatible) node reachable over JSON-RPC whose
/// accounts are managed and signed for by the node itself.
#[derive(Clone)]
pub struct Ethereum {
    provider: DynProvider,
    url: Url,
    unlock: Unlock,
}

impl fmt::Debug for Ethereum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ethereum")
            .field("url", &self.url)
            .field("unlock", &self.unlock)
            .finish()
    }
}

/// Entry of `personal_listWallets`.
#[derive(Debug, Deserialize)]
struct Wallet {
    status: String,
    #[serde(default)]
    accounts: Vec<WalletAccount>,
}

#[derive(Debug, Deserialize)]
struct WalletAccount {
    address: Address,
}

const LOCKED: &str = "Locked";

impl Ethereum {
    /// Creates a client for the node at `url`. No request is made until the
    /// first deployment.
    pub fn new(url: &Url, unlock: Unlock) -> Self {
        let provider = ProviderBuilder::new().connect_http(url.clone()).erased();
        Self {
            provider,
            url: url.clone(),
            unlock,
        }
    }

    /// Checks that the node answers requests at all.
    async fn connect(&self) -> Result<u64, Error> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|source| Error::Connection {
                url: self.url.clone(),
                source,
            })
    }

    /// Returns the first account known to the node. Further accounts are
    /// ignored.
    async fn account(&self) -> Result<Address, Error> {
        let accounts = self.provider.get_accounts().await.map_err(Error::Accounts)?;
        let account = *accounts.first().ok_or(Error::NoAccounts)?;
        observe::account_selected(account, accounts.len());
        Ok(account)
    }

    /// Whether the node reports the account as locked. Nodes without the
    /// `personal` namespace (e.g. dev nodes) only manage unlocked accounts.
    async fn is_locked(&self, account: Address) -> Result<bool, Error> {
        let wallets = match self
            .provider
            .raw_request::<_, Vec<Wallet>>("personal_listWallets".into(), serde_json::json!([]))
            .await
        {
            Ok(wallets) => wallets,
            Err(err) if err.as_error_resp().is_some() => {
                tracing::debug!(?err, "node does not list wallets, assuming unlocked accounts");
                return Ok(false);
            }
            Err(err) => return Err(Error::Accounts(err)),
        };

        Ok(wallets.iter().any(|wallet| {
            wallet.status == LOCKED
                && wallet
                    .accounts
                    .iter()
                    .any(|wallet_account| wallet_account.address == account)
        }))
    }

    async fn unlock(&self, account: Address) -> Result<(), Error> {
        let unlocked = self
            .provider
            .raw_request::<_, bool>(
                "personal_unlockAccount".into(),
                (
                    account,
                    self.unlock.passphrase.clone(),
                    self.unlock.duration.as_secs(),
                ),
            )
            .await
            .map_err(|source| Error::Unlock { account, source })?;
        if !unlocked {
            return Err(Error::UnlockRefused { account });
        }
        observe::account_unlocked(account);
        Ok(())
    }

    /// Returns the code deployed at `address`.
    pub async fn code(&self, address: Address) -> Result<Bytes, Error> {
        self.provider
            .get_code_at(address)
            .await
            .map_err(Error::Code)
    }
}

#[async_trait::async_trait]
impl Chain for Ethereum {
    async fn deploy(&self, artifact: &CompiledArtifact) -> Result<DeploymentReceipt, Error> {
        let chain_id = self.connect().await?;
        observe::connected(&self.url, chain_id);

        let account = self.account().await?;
        if self.is_locked(account).await? {
            self.unlock(account).await?;
        }

        let tx = TransactionRequest::default()
            .from(account)
            .with_deploy_code(artifact.bytecode.clone());
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(Error::Send)?;
        let transaction = *pending.tx_hash();
        observe::transaction_submitted(transaction);

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|source| Error::Receipt {
                transaction,
                source,
            })?;
        let address = created_contract(&receipt)?;
        if self.code(address).await?.is_empty() {
            return Err(Error::EmptyCode { address });
        }

        Ok(DeploymentReceipt {
            address,
            transaction,
            block: receipt.block_number,
        })
    }
}

/// Address of the contract a successful creation transaction created.
fn created_contract(receipt: &TransactionReceipt) -> Result<Address, Error> {
    let transaction = receipt.transaction_hash;
    if !receipt.status() {
        return Err(Error::Reverted { transaction });
    }
    receipt
        .contract_address
        .ok_or(Error::NoContractAddress { transaction })
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to connect to node at {url}: {source}")]
    Connection { url: Url, source: TransportError },
    #[error("failed to query node accounts: {0}")]
    Accounts(TransportError),
    #[error("node has no accounts to deploy from")]
    NoAccounts,
    #[error("failed to unlock account {account}: {source}")]
    Unlock {
        account: Address,
        source: TransportError,
    },
    #[error("node refused to unlock account {account}")]
    UnlockRefused { account: Address },
    #[error("failed to submit contract creation transaction: {0}")]
    Send(TransportError),
    #[error("no receipt for transaction {transaction}: {source}")]
    Receipt {
        transaction: TxHash,
        source: PendingTransactionError,
    },
    #[error("contract creation transaction {transaction} reverted")]
    Reverted { transaction: TxHash },
    #[error("receipt of transaction {transaction} has no contract address")]
    NoContractAddress { transaction: TxHash },
    #[error("failed to fetch code: {0}")]
    Code(TransportError),
    #[error("no code at reported contract address {address}")]
    EmptyCode { address: Address },
}

impl Error {
    /// Name of the failure class this error belongs to.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "ConnectionError",
            Self::Accounts(_)
            | Self::NoAccounts
            | Self::Unlock { .. }
            | Self::UnlockRefused { .. } => "AccountError",
            Self::Send(_)
            | Self::Receipt { .. }
            | Self::Reverted { .. }
            | Self::NoContractAddress { .. }
            | Self::Code(_)
            | Self::EmptyCode { .. } => "TransactionError",
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::{
            primitives::{U64, address},
            transports::mock::Asserter,
        },
        serde_json::json,
    };

    const ACCOUNT: Address = address!("8ba1f109551bd432803012645ac136ddd64dba72");
    const OTHER: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");

    /// Node whose JSON-RPC responses are served in order from `asserter`.
    fn mocked(asserter: &Asserter) -> Ethereum {
        Ethereum {
            provider: ProviderBuilder::new()
                .disable_recommended_fillers()
                .connect_mocked_client(asserter.clone())
                .erased(),
            url: "http://localhost:8545".parse().unwrap(),
            unlock: unlock(),
        }
    }

    fn wallets(status: &str, account: Address) -> serde_json::Value {
        json!([{
            "url": "keystore:///root/.ethereum/keystore/UTC--2019",
            "status": status,
            "accounts": [{ "address": account }],
        }])
    }

    fn receipt(status: &str, contract_address: Option<Address>) -> TransactionReceipt {
        serde_json::from_value(json!({
            "type": "0x2",
            "status": status,
            "cumulativeGasUsed": "0x1d4c0",
            "logs": [],
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "transactionHash": TxHash::repeat_byte(1),
            "transactionIndex": "0x0",
            "blockHash": TxHash::repeat_byte(2),
            "blockNumber": "0x1",
            "gasUsed": "0x1d4c0",
            "effectiveGasPrice": "0x3b9aca00",
            "from": ACCOUNT,
            "to": null,
            "contractAddress": contract_address,
        }))
        .unwrap()
    }

    fn artifact() -> CompiledArtifact {
        CompiledArtifact {
            id: "<stdin>:Storage".to_owned(),
            abi: Default::default(),
            bytecode: Bytes::from_static(&[0x60, 0x80]),
        }
    }

    fn unlock() -> Unlock {
        Unlock {
            passphrase: "password".to_owned(),
            duration: Duration::from_secs(300),
        }
    }

    #[test]
    fn debug_output_hides_passphrase() {
        let eth = Ethereum::new(&"http://localhost:8545".parse().unwrap(), unlock());

        let debug = format!("{eth:?}");
        assert!(debug.contains("SECRET"));
        assert!(!debug.contains("password"));
    }

    #[test]
    fn wallets_deserialize_from_geth_response() {
        let wallets: Vec<Wallet> = serde_json::from_value(serde_json::json!([
            {
                "url": "keystore:///root/.ethereum/keystore/UTC--2019",
                "status": "Locked",
                "accounts": [{
                    "address": "0x8ba1f109551bd432803012645ac136ddd64dba72",
                    "url": "keystore:///root/.ethereum/keystore/UTC--2019",
                }],
            },
            { "url": "trezor://0001", "status": "Closed" },
        ]))
        .unwrap();

        assert_eq!(wallets.len(), 2);
        assert_eq!(wallets[0].status, LOCKED);
        assert_eq!(
            wallets[0].accounts[0].address,
            "0x8ba1f109551bd432803012645ac136ddd64dba72"
                .parse::<Address>()
                .unwrap()
        );
        assert!(wallets[1].accounts.is_empty());
    }

    #[test]
    fn errors_map_to_failure_classes() {
        assert_eq!(Error::NoAccounts.kind(), "AccountError");
        assert_eq!(
            Error::UnlockRefused {
                account: Address::ZERO
            }
            .kind(),
            "AccountError"
        );
        assert_eq!(
            Error::Reverted {
                transaction: TxHash::ZERO
            }
            .kind(),
            "TransactionError"
        );
        assert_eq!(
            Error::EmptyCode {
                address: Address::ZERO
            }
            .kind(),
            "TransactionError"
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_connection_error() {
        // Nothing listens on port 1, so the connection is refused right away.
        let eth = Ethereum::new(&"http://127.0.0.1:1".parse().unwrap(), unlock());

        let err = tokio::time::timeout(Duration::from_secs(30), eth.deploy(&artifact()))
            .await
            .expect("connection attempt must not hang")
            .unwrap_err();

        assert_eq!(err.kind(), "ConnectionError");
    }

    #[tokio::test]
    async fn node_without_accounts_is_account_error() {
        let asserter = Asserter::new();
        asserter.push_success(&U64::from(1));
        asserter.push_success(&Vec::<Address>::new());

        let err = mocked(&asserter).deploy(&artifact()).await.unwrap_err();

        assert!(matches!(err, Error::NoAccounts));
        assert_eq!(err.kind(), "AccountError");
    }

    #[tokio::test]
    async fn deploys_from_first_account() {
        let asserter = Asserter::new();
        asserter.push_success(&vec![ACCOUNT, OTHER]);

        let account = mocked(&asserter).account().await.unwrap();

        assert_eq!(account, ACCOUNT);
    }

    #[tokio::test]
    async fn locked_wallet_reports_locked_account() {
        let asserter = Asserter::new();
        asserter.push_success(&wallets("Locked", ACCOUNT));

        assert!(mocked(&asserter).is_locked(ACCOUNT).await.unwrap());
    }

    #[tokio::test]
    async fn other_locked_wallets_do_not_matter() {
        let asserter = Asserter::new();
        asserter.push_success(&wallets("Locked", OTHER));
        asserter.push_success(&wallets("Unlocked", ACCOUNT));

        let eth = mocked(&asserter);

        assert!(!eth.is_locked(ACCOUNT).await.unwrap());
        assert!(!eth.is_locked(ACCOUNT).await.unwrap());
    }

    #[tokio::test]
    async fn node_without_personal_namespace_has_unlocked_accounts() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("the method personal_listWallets does not exist/is not available");

        assert!(!mocked(&asserter).is_locked(ACCOUNT).await.unwrap());
    }

    #[tokio::test]
    async fn unlocks_account() {
        let asserter = Asserter::new();
        asserter.push_success(&true);

        mocked(&asserter).unlock(ACCOUNT).await.unwrap();
    }

    #[tokio::test]
    async fn refused_unlock_is_account_error() {
        let asserter = Asserter::new();
        asserter.push_success(&U64::from(1));
        asserter.push_success(&vec![ACCOUNT]);
        asserter.push_success(&wallets("Locked", ACCOUNT));
        asserter.push_success(&false);

        let err = mocked(&asserter).deploy(&artifact()).await.unwrap_err();

        assert!(matches!(err, Error::UnlockRefused { account } if account == ACCOUNT));
        assert_eq!(err.kind(), "AccountError");
    }

    #[tokio::test]
    async fn failed_unlock_is_account_error() {
        let asserter = Asserter::new();
        asserter.push_success(&U64::from(1));
        asserter.push_success(&vec![ACCOUNT]);
        asserter.push_success(&wallets("Locked", ACCOUNT));
        asserter.push_failure_msg("could not decrypt key with given password");

        let err = mocked(&asserter).deploy(&artifact()).await.unwrap_err();

        assert!(matches!(err, Error::Unlock { account, .. } if account == ACCOUNT));
        assert_eq!(err.kind(), "AccountError");
    }

    #[test]
    fn successful_receipt_yields_contract_address() {
        assert_eq!(created_contract(&receipt("0x1", Some(OTHER))).unwrap(), OTHER);
    }

    #[test]
    fn reverted_receipt_is_transaction_error() {
        let err = created_contract(&receipt("0x0", None)).unwrap_err();

        assert!(matches!(err, Error::Reverted { .. }));
        assert_eq!(err.kind(), "TransactionError");
    }

    #[test]
    fn receipt_without_contract_address_is_transaction_error() {
        let err = created_contract(&receipt("0x1", None)).unwrap_err();

        assert!(matches!(err, Error::NoContractAddress { .. }));
    }
}
