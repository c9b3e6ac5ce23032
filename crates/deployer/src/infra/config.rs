//! Optional TOML file overriding the defaults baked into the workflow. Every
//! key is optional and falls back to the values the original tooling used.

use {
    crate::domain::manifest,
    serde::Deserialize,
    std::{path::Path, time::Duration},
    thiserror::Error,
    url::Url,
};

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Config {
    /// Endpoint offered as the default when prompting for a web3 provider.
    pub default_web3_provider: Url,
    pub chain: Chain,
    pub cluster: Cluster,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_web3_provider: "http://localhost:8545".parse().expect("valid URL"),
            chain: Default::default(),
            cluster: Default::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Chain {
    /// How long a locked account stays unlocked after the deployer unlocked
    /// it.
    pub unlock_duration_secs: u64,
}

impl Default for Chain {
    fn default() -> Self {
        Self {
            unlock_duration_secs: 300,
        }
    }
}

impl Chain {
    pub fn unlock_duration(&self) -> Duration {
        Duration::from_secs(self.unlock_duration_secs)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Cluster {
    pub namespace: String,
    pub deployment: Deployment,
    pub service: Service,
}

impl Default for Cluster {
    fn default() -> Self {
        Self {
            namespace: "default".to_owned(),
            deployment: Default::default(),
            service: Default::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Deployment {
    pub image: String,
    pub args: Vec<String>,
    pub replicas: i32,
    pub network_id: String,
    pub secret_key: String,
    pub rpc_port: i32,
    pub rpc_port_name: String,
}

impl Default for Deployment {
    fn default() -> Self {
        let template = manifest::Template::default();
        Self {
            image: template.image,
            args: template.args,
            replicas: template.replicas,
            network_id: template.network_id,
            secret_key: template.secret_key,
            rpc_port: template.rpc_port,
            rpc_port_name: template.rpc_port_name,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Service {
    pub port: i32,
}

impl Default for Service {
    fn default() -> Self {
        Self {
            port: manifest::Template::default().service_port,
        }
    }
}

impl Config {
    pub async fn from_path(path: &Path) -> Result<Self, Error> {
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| Error::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::parse(&data).map_err(|err| Error::Parse {
            path: path.display().to_string(),
            // The file may contain secrets in the future, only echo parser
            // errors when explicitly asked to.
            details: if std::env::var("TOML_TRACE_ERROR").is_ok_and(|v| v == "1") {
                err.to_string()
            } else {
                "set TOML_TRACE_ERROR=1 to print the parsing error".to_owned()
            },
        })
    }

    fn parse(data: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    /// The contract independent parts of the cluster manifests.
    pub fn template(&self) -> manifest::Template {
        let deployment = &self.cluster.deployment;
        manifest::Template {
            image: deployment.image.clone(),
            args: deployment.args.clone(),
            replicas: deployment.replicas,
            network_id: deployment.network_id.clone(),
            secret_key: deployment.secret_key.clone(),
            rpc_port: deployment.rpc_port,
            rpc_port_name: deployment.rpc_port_name.clone(),
            service_port: self.cluster.service.port,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse TOML config at {path}: {details}")]
    Parse { path: String, details: String },
}
