use {
    crate::infra::observe,
    k8s_openapi::api::{apps::v1::Deployment, core::v1::Service},
    kube::{
        Api,
        Client,
        api::PostParams,
        config::{KubeConfigOptions, Kubeconfig, KubeconfigError},
    },
    std::path::{Path, PathBuf},
    thiserror::Error,
};

/// Loads credentials for a cluster and connects to its control plane.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Cluster>, Error>;
}

/// Namespaced create operations on a cluster control plane. There is no
/// update path: creating a resource whose name is taken fails.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Cluster: Send + Sync {
    async fn create_service(&self, service: &Service) -> Result<(), Error>;
    async fn create_deployment(&self, deployment: &Deployment) -> Result<(), Error>;
}

/// Cluster credentials from a kubeconfig file.
#[derive(Clone, Debug)]
pub struct KubeConfig {
    /// Explicit kubeconfig path. `None` uses the default location, i.e.
    /// `$KUBECONFIG` or `~/.kube/config`.
    path: Option<PathBuf>,
    namespace: String,
}

impl KubeConfig {
    pub fn new(path: Option<&Path>, namespace: impl Into<String>) -> Self {
        Self {
            path: path.map(expand_home),
            namespace: namespace.into(),
        }
    }

    async fn load(&self) -> Result<kube::Config, Error> {
        let options = KubeConfigOptions::default();
        let config = match &self.path {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|source| {
                    Error::ConfigLoad {
                        path: Some(path.clone()),
                        source,
                    }
                })?;
                kube::Config::from_custom_kubeconfig(kubeconfig, &options).await
            }
            None => kube::Config::from_kubeconfig(&options).await,
        };
        config.map_err(|source| Error::ConfigLoad {
            path: self.path.clone(),
            source,
        })
    }
}

/// Expands a leading `~` to the home directory of the current user.
fn expand_home(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[async_trait::async_trait]
impl Connect for KubeConfig {
    async fn connect(&self) -> Result<Box<dyn Cluster>, Error> {
        let config = self.load().await?;
        observe::cluster_config_loaded(&config.cluster_url, &self.namespace);
        let client = Client::try_from(config).map_err(Error::Client)?;
        Ok(Box::new(Kubernetes {
            client,
            namespace: self.namespace.clone(),
        }))
    }
}

/// A Kubernetes control plane scoped to one namespace.
pub struct Kubernetes {
    client: Client,
    namespace: String,
}

impl Kubernetes {
    fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait::async_trait]
impl Cluster for Kubernetes {
    async fn create_service(&self, service: &Service) -> Result<(), Error> {
        let name = service.metadata.name.clone().unwrap_or_default();
        self.api::<Service>()
            .create(&PostParams::default(), service)
            .await
            .map_err(|source| Error::Api {
                kind: "Service",
                name,
                source,
            })?;
        Ok(())
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<(), Error> {
        let name = deployment.metadata.name.clone().unwrap_or_default();
        self.api::<Deployment>()
            .create(&PostParams::default(), deployment)
            .await
            .map_err(|source| Error::Api {
                kind: "Deployment",
                name,
                source,
            })?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load cluster config from {}: {source}", display_path(.path))]
    ConfigLoad {
        path: Option<PathBuf>,
        source: KubeconfigError,
    },
    #[error("failed to create cluster client: {0}")]
    Client(kube::Error),
    #[error("failed to create {kind} {name}: {source}")]
    Api {
        kind: &'static str,
        name: String,
        source: kube::Error,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "default location".to_owned(),
    }
}

impl Error {
    /// Name of the failure class this error belongs to.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigLoad { .. } | Self::Client(_) => "ConfigLoadError",
            Self::Api { .. } => "ApiError",
        }
    }
}
