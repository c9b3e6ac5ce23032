use {
    std::{fmt, path::PathBuf},
    url::Url,
};

#[derive(Debug, clap::Parser)]
#[clap(about = "Compile a contract, deploy it and run a node for it in a cluster")]
pub struct Args {
    /// Contract source code as text. Ignored if `--contract-file` is given.
    #[clap(long, env)]
    pub contract_source: Option<String>,

    /// Path to the contract source code. Prompted for if neither this nor
    /// `--contract-source` is given.
    #[clap(long, env)]
    pub contract_file: Option<PathBuf>,

    /// Name of the contract to deploy. Either the bare name or the fully
    /// qualified `<stdin>:<Name>` identifier. Also names the cluster
    /// resources.
    #[clap(long, env)]
    pub contract_name: String,

    /// The node RPC API endpoint. Prompted for if omitted.
    #[clap(long, env)]
    pub web3_provider: Option<Url>,

    /// Name of the cluster secret holding the keystore password.
    #[clap(long, env, default_value = "geth-secret")]
    pub secret_name: String,

    /// Path to the kubeconfig file. Defaults to `$KUBECONFIG` or
    /// `~/.kube/config`.
    #[clap(long, env)]
    pub kube_config: Option<PathBuf>,

    /// The solc binary used for compilation.
    #[clap(long, env, default_value = "solc")]
    pub solc: PathBuf,

    /// Passphrase for unlocking the deploying account if the node reports it
    /// as locked.
    #[clap(long, env, default_value = "password", hide_default_value = true)]
    pub unlock_passphrase: String,

    /// Path to a TOML file overriding defaults like the node image.
    #[clap(long, env)]
    pub config: Option<PathBuf>,

    /// Only compile the contract and print the cluster manifests that would
    /// be created.
    #[clap(long, env)]
    pub dry_run: bool,

    /// The log filter.
    #[clap(long, env, default_value = "warn,deployer=debug,observe=info")]
    pub log: String,

    /// At which log level logs should be printed to stderr instead of stdout.
    /// Defaults to all logs so stdout only carries the deployed address or
    /// the dry run manifests.
    #[clap(long, env, default_value = "trace")]
    pub stderr_threshold: Option<tracing::Level>,

    /// Whether to use JSON format for the logs.
    #[clap(long, env, default_value = "false")]
    pub use_json_logs: bool,
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            contract_source,
            contract_file,
            contract_name,
            web3_provider,
            secret_name,
            kube_config,
            solc,
            unlock_passphrase: _,
            config,
            dry_run,
            log,
            stderr_threshold,
            use_json_logs,
        } = self;

        writeln!(
            f,
            "contract_source: {:?}",
            contract_source.as_ref().map(|source| source.len())
        )?;
        writeln!(f, "contract_file: {contract_file:?}")?;
        writeln!(f, "contract_name: {contract_name}")?;
        writeln!(f, "web3_provider: {web3_provider:?}")?;
        writeln!(f, "secret_name: {secret_name}")?;
        writeln!(f, "kube_config: {kube_config:?}")?;
        writeln!(f, "solc: {}", solc.display())?;
        writeln!(f, "unlock_passphrase: SECRET")?;
        writeln!(f, "config: {config:?}")?;
        writeln!(f, "dry_run: {dry_run}")?;
        writeln!(f, "log: {log}")?;
        writeln!(f, "stderr_threshold: {stderr_threshold:?}")?;
        writeln!(f, "use_json_logs: {use_json_logs}")?;
        Ok(())
    }
}
