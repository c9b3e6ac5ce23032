//! Declarative cluster resources that run a JSON-RPC client next to a deployed
//! contract. Construction is pure: the same inputs always produce the same
//! resources.

use {
    k8s_openapi::{
        api::{
            apps::v1::{Deployment, DeploymentSpec},
            core::v1::{
                Container,
                ContainerPort,
                EnvVar,
                EnvVarSource,
                PodSpec,
                PodTemplateSpec,
                SecretKeySelector,
                Service,
                ServicePort,
                ServiceSpec,
            },
        },
        apimachinery::pkg::{
            apis::meta::v1::{LabelSelector, ObjectMeta},
            util::intstr::IntOrString,
        },
    },
    serde::Serialize,
    std::collections::BTreeMap,
};

/// Label used to tie the service to the pods of the deployment.
pub const APP_LABEL: &str = "app";
pub const NETWORK_ID_ENV: &str = "ETH_NETWORK_ID";
pub const KEYSTORE_PASSWORD_ENV: &str = "ETH_KEYSTORE_PASSWORD";
const PROTOCOL: &str = "TCP";

/// The parts of the manifests that don't depend on the deployed contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pub image: String,
    pub args: Vec<String>,
    pub replicas: i32,
    pub network_id: String,
    /// Key inside the secret that holds the keystore password.
    pub secret_key: String,
    pub rpc_port: i32,
    pub rpc_port_name: String,
    pub service_port: i32,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            image: "ethereum/client-go:v1.9.3".to_owned(),
            args: [
                "--rpc",
                "--rpcaddr",
                "0.0.0.0",
                "--rpccorsdomain",
                "*",
                "--rpcapi",
                "eth,net,web3,personal",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
            replicas: 1,
            network_id: "1".to_owned(),
            secret_key: "password".to_owned(),
            rpc_port: 8545,
            rpc_port_name: "rpc".to_owned(),
            service_port: 80,
        }
    }
}

/// The service and deployment created for one contract.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Manifests {
    pub service: Service,
    pub deployment: Deployment,
}

impl Manifests {
    pub fn new(name: &str, secret_name: &str, template: &Template) -> Self {
        Self {
            service: service(name, template),
            deployment: deployment(name, secret_name, template),
        }
    }
}

fn labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_owned(), name.to_owned())])
}

fn metadata(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_owned()),
        ..Default::default()
    }
}

/// A service routing `template.service_port` to the RPC port of all pods
/// labeled `app=<name>`.
pub fn service(name: &str, template: &Template) -> Service {
    Service {
        metadata: metadata(name),
        spec: Some(ServiceSpec {
            selector: Some(labels(name)),
            ports: Some(vec![ServicePort {
                protocol: Some(PROTOCOL.to_owned()),
                port: template.service_port,
                target_port: Some(IntOrString::Int(template.rpc_port)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A deployment running the client image with its RPC server enabled. The
/// keystore password is never part of the manifest, only a reference to the
/// secret holding it.
pub fn deployment(name: &str, secret_name: &str, template: &Template) -> Deployment {
    let container = Container {
        name: name.to_owned(),
        image: Some(template.image.clone()),
        args: Some(template.args.clone()),
        env: Some(vec![
            EnvVar {
                name: NETWORK_ID_ENV.to_owned(),
                value: Some(template.network_id.clone()),
                ..Default::default()
            },
            EnvVar {
                name: KEYSTORE_PASSWORD_ENV.to_owned(),
                value_from: Some(EnvVarSource {
                    secret_key_ref: Some(SecretKeySelector {
                        name: secret_name.to_owned(),
                        key: template.secret_key.clone(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ]),
        ports: Some(vec![ContainerPort {
            name: Some(template.rpc_port_name.clone()),
            container_port: template.rpc_port,
            protocol: Some(PROTOCOL.to_owned()),
            ..Default::default()
        }]),
        ..Default::default()
    };

    Deployment {
        metadata: metadata(name),
        spec: Some(DeploymentSpec {
            replicas: Some(template.replicas),
            selector: LabelSelector {
                match_labels: Some(labels(name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(name)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, maplit::btreemap};

    fn container(deployment: &Deployment) -> &Container {
        &deployment
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .containers[0]
    }

    #[test]
    fn service_routes_port_80_to_rpc_port() {
        let service = service("Storage", &Template::default());

        assert_eq!(service.metadata.name.as_deref(), Some("Storage"));
        let spec = service.spec.unwrap();
        assert_eq!(spec.selector, Some(btreemap! {"app".into() => "Storage".into()}));
        let ports = spec.ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 80);
        assert_eq!(ports[0].target_port, Some(IntOrString::Int(8545)));
        assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));
    }

    #[test]
    fn deployment_runs_client_with_secret_reference() {
        let deployment = deployment("Storage", "geth-secret", &Template::default());

        assert_eq!(deployment.metadata.name.as_deref(), Some("Storage"));
        let spec = deployment.spec.as_ref().unwrap();
        assert_eq!(spec.replicas, Some(1));
        assert_eq!(
            spec.selector.match_labels,
            Some(btreemap! {"app".into() => "Storage".into()})
        );
        assert_eq!(
            spec.template.metadata.as_ref().unwrap().labels,
            Some(btreemap! {"app".into() => "Storage".into()})
        );

        let container = container(&deployment);
        assert_eq!(container.name, "Storage");
        assert_eq!(container.image.as_deref(), Some("ethereum/client-go:v1.9.3"));
        assert_eq!(
            container.args.as_deref().unwrap(),
            [
                "--rpc",
                "--rpcaddr",
                "0.0.0.0",
                "--rpccorsdomain",
                "*",
                "--rpcapi",
                "eth,net,web3,personal",
            ]
        );

        let env = container.env.as_ref().unwrap();
        assert_eq!(env[0].name, "ETH_NETWORK_ID");
        assert_eq!(env[0].value.as_deref(), Some("1"));
        assert_eq!(env[1].name, "ETH_KEYSTORE_PASSWORD");
        assert_eq!(env[1].value, None);
        let secret = env[1]
            .value_from
            .as_ref()
            .unwrap()
            .secret_key_ref
            .as_ref()
            .unwrap();
        assert_eq!(secret.name, "geth-secret");
        assert_eq!(secret.key, "password");

        let ports = container.ports.as_ref().unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].name.as_deref(), Some("rpc"));
        assert_eq!(ports[0].container_port, 8545);
        assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));
    }

    #[test]
    fn construction_is_deterministic() {
        let template = Template::default();
        let first = serde_json::to_vec(&Manifests::new("Storage", "geth-secret", &template)).unwrap();
        let second =
            serde_json::to_vec(&Manifests::new("Storage", "geth-secret", &template)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn serialized_manifests_carry_kind_and_api_version() {
        let manifests = Manifests::new("Storage", "geth-secret", &Template::default());
        let json = serde_json::to_value(&manifests).unwrap();

        assert_eq!(json["service"]["apiVersion"], "v1");
        assert_eq!(json["service"]["kind"], "Service");
        assert_eq!(json["deployment"]["apiVersion"], "apps/v1");
        assert_eq!(json["deployment"]["kind"], "Deployment");
        assert_eq!(
            json["deployment"]["spec"]["template"]["spec"]["containers"][0]["env"][1]["valueFrom"]
                ["secretKeyRef"]["name"],
            "geth-secret"
        );
    }

    #[test]
    fn template_overrides_are_applied() {
        let template = Template {
            image: "ethereum/client-go:v1.13.0".to_owned(),
            replicas: 3,
            network_id: "1337".to_owned(),
            service_port: 8080,
            ..Default::default()
        };
        let Manifests {
            service,
            deployment,
        } = Manifests::new("Counter", "keystore", &template);

        assert_eq!(service.spec.unwrap().ports.unwrap()[0].port, 8080);
        assert_eq!(deployment.spec.as_ref().unwrap().replicas, Some(3));
        let container = container(&deployment);
        assert_eq!(container.image.as_deref(), Some("ethereum/client-go:v1.13.0"));
        assert_eq!(
            container.env.as_ref().unwrap()[0].value.as_deref(),
            Some("1337")
        );
    }
}
