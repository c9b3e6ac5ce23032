use {
    crate::{
        domain::{ContractSource, DeploymentReceipt, Manifests, manifest},
        infra::{
            blockchain::{self, Chain, Ethereum},
            cli,
            cluster::{self, Connect, KubeConfig},
            compiler::{self, Compile, Solc},
            config::{self, Config},
            input::{self, Terminal},
            observe,
        },
    },
    clap::Parser,
    std::process::ExitCode,
    thiserror::Error,
};

/// Parses the arguments, runs the workflow and reports how it went. Every
/// failure is logged and turns into a non-zero exit code.
pub async fn start(args: impl Iterator<Item = String>) -> ExitCode {
    let args = cli::Args::parse_from(args);
    observe::init(&observe_config(&args));
    tracing::info!("running deployer with validated arguments:\n{}", args);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            observe::failed(err.stage(), &err);
            ExitCode::FAILURE
        }
    }
}

fn observe_config(args: &cli::Args) -> ::observe::Config {
    let mut config = ::observe::Config::default().with_env_filter(&args.log);
    if let Some(threshold) = args.stderr_threshold {
        config = config.with_stderr_threshold(threshold);
    }
    if args.use_json_logs {
        config = config.with_json_format();
    }
    config
}

async fn run(args: cli::Args) -> Result<(), Error> {
    let config = match &args.config {
        Some(path) => Config::from_path(path).await?,
        None => Config::default(),
    };

    let prompt = Terminal;
    let source = input::source(
        args.contract_source,
        args.contract_file.as_deref(),
        args.contract_name.into(),
        &prompt,
    )
    .await?;
    let plan = Plan {
        source,
        secret_name: args.secret_name,
        template: config.template(),
    };
    let solc = Solc::new(args.solc);

    if args.dry_run {
        observe::inputs_resolved(&plan.source, None);
        let manifests = dry_run(&plan, &solc).await?;
        println!(
            "{}",
            serde_json::to_string_pretty(&manifests).expect("manifests serialize to JSON")
        );
        return Ok(());
    }

    let endpoint = input::endpoint(args.web3_provider, &config.default_web3_provider, &prompt)?;
    observe::inputs_resolved(&plan.source, Some(&endpoint));
    let eth = Ethereum::new(
        &endpoint,
        blockchain::Unlock {
            passphrase: args.unlock_passphrase,
            duration: config.chain.unlock_duration(),
        },
    );
    let kube = KubeConfig::new(args.kube_config.as_deref(), &config.cluster.namespace);

    let outcome = execute(&plan, &solc, &eth, &kube).await?;
    println!("{}", outcome.receipt.address);
    Ok(())
}

/// Everything the workflow needs once the inputs are known.
#[derive(Clone, Debug)]
pub struct Plan {
    pub source: ContractSource,
    /// Secret holding the keystore password of the node.
    pub secret_name: String,
    pub template: manifest::Template,
}

impl Plan {
    pub fn manifests(&self) -> Manifests {
        Manifests::new(
            self.source.name.unqualified(),
            &self.secret_name,
            &self.template,
        )
    }
}

#[derive(Clone, Debug)]
pub struct Outcome {
    pub receipt: DeploymentReceipt,
    pub manifests: Manifests,
}

/// Compiles and deploys the contract, then creates the service and the
/// deployment for it. Stops at the first failing stage without undoing
/// anything the earlier stages did.
pub async fn execute(
    plan: &Plan,
    compiler: &dyn Compile,
    chain: &dyn Chain,
    connect: &dyn Connect,
) -> Result<Outcome, Error> {
    observe::compiling(&plan.source);
    let artifact = compiler.compile(&plan.source).await?;
    observe::compiled(&artifact);

    let receipt = chain.deploy(&artifact).await?;
    observe::deployed(&receipt);

    let manifests = plan.manifests();
    let cluster = connect.connect().await?;
    let name = plan.source.name.unqualified();
    cluster.create_service(&manifests.service).await?;
    observe::created("Service", name);
    cluster.create_deployment(&manifests.deployment).await?;
    observe::created("Deployment", name);

    Ok(Outcome {
        receipt,
        manifests,
    })
}

/// Compiles the contract and returns the manifests that would be submitted
/// without touching the chain or the cluster.
pub async fn dry_run(plan: &Plan, compiler: &dyn Compile) -> Result<Manifests, Error> {
    observe::compiling(&plan.source);
    let artifact = compiler.compile(&plan.source).await?;
    observe::compiled(&artifact);
    Ok(plan.manifests())
}

/// Steps of the workflow in the order they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    ResolveInputs,
    Compile,
    Deploy,
    LoadClusterConfig,
    CreateService,
    CreateDeployment,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Input(#[from] input::Error),
    #[error(transparent)]
    Compile(#[from] compiler::Error),
    #[error(transparent)]
    Deploy(#[from] blockchain::Error),
    #[error(transparent)]
    Cluster(#[from] cluster::Error),
}

impl Error {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Config(_) | Self::Input(_) => Stage::ResolveInputs,
            Self::Compile(_) => Stage::Compile,
            Self::Deploy(_) => Stage::Deploy,
            Self::Cluster(cluster::Error::Api { kind: "Service", .. }) => Stage::CreateService,
            Self::Cluster(cluster::Error::Api { .. }) => Stage::CreateDeployment,
            Self::Cluster(_) => Stage::LoadClusterConfig,
        }
    }

    /// Name of the failure class this error belongs to.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "InputError",
            Self::Input(err) => err.kind(),
            Self::Compile(err) => err.kind(),
            Self::Deploy(err) => err.kind(),
            Self::Cluster(err) => err.kind(),
        }
    }
}
