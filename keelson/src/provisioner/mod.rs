//! The provisioning sequence.
//!
//! A [`Provisioner`] executes, in fixed order: network creation, control
//! plane creation, node group creation, per-environment namespace, secret
//! and deployment setup, IAM role setup, and security group setup. Every
//! step builds an [`Invocation`] from the immutable configuration and the
//! identifiers captured earlier in the run, and hands it to a
//! [`CommandRunner`]. The first failing step aborts the run.

mod error;
mod invocation;
mod runner;

use keelson_base::consts::programs;
use snafu::{ResultExt, ensure};

pub use self::{
    error::Error,
    invocation::Invocation,
    runner::{CommandRunner, DryRunRunner, ProcessRunner},
};
use crate::{
    config::{Config, Environment, RolePolicy},
    manifest,
};

/// Identifiers captured from the creation commands of a completed run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    pub vpc_id: String,

    pub subnet_ids: Vec<String>,

    pub security_group_ids: Vec<String>,
}

pub struct Provisioner<R> {
    config: Config,
    runner: R,
}

impl<R: CommandRunner + Sync> Provisioner<R> {
    #[must_use]
    pub const fn new(config: Config, runner: R) -> Self { Self { config, runner } }

    /// Runs the whole provisioning sequence against the configured runner.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step; no further invocations
    /// are issued after a failure and nothing is rolled back.
    pub async fn run(&self) -> Result<Summary, Error> {
        let vpc_id = self.create_vpc().await?;
        let subnet_ids = self.create_subnets(&vpc_id).await?;
        self.create_control_plane(&vpc_id, &subnet_ids).await?;
        self.create_node_group().await?;

        for environment in &self.config.environments {
            self.provision_environment(environment).await?;
        }

        self.create_iam_role(&self.config.iam.cluster_role).await?;
        self.create_iam_role(&self.config.iam.worker_node_role).await?;

        let security_group_ids = self.create_security_groups(&vpc_id).await?;

        Ok(Summary { vpc_id, subnet_ids, security_group_ids })
    }

    async fn create_vpc(&self) -> Result<String, Error> {
        let cidr_block = &self.config.network.vpc_cidr_block;
        let vpc_id = self
            .runner
            .run(Invocation::new(
                programs::AWS,
                [
                    "ec2",
                    "create-vpc",
                    "--cidr-block",
                    cidr_block.as_str(),
                    "--query",
                    "Vpc.VpcId",
                    "--output",
                    "text",
                ],
            ))
            .await
            .with_context(|_| error::CreateVpcSnafu { cidr_block: cidr_block.clone() })?;
        ensure!(!vpc_id.is_empty(), error::EmptyResourceIdSnafu { resource: "vpc" });

        tracing::info!("vpc/{vpc_id} created with CIDR block {cidr_block}");
        Ok(vpc_id)
    }

    async fn create_subnets(&self, vpc_id: &str) -> Result<Vec<String>, Error> {
        let mut subnet_ids = Vec::with_capacity(self.config.network.subnet_cidr_blocks.len());
        for cidr_block in &self.config.network.subnet_cidr_blocks {
            let subnet_id = self
                .runner
                .run(Invocation::new(
                    programs::AWS,
                    [
                        "ec2",
                        "create-subnet",
                        "--vpc-id",
                        vpc_id,
                        "--cidr-block",
                        cidr_block.as_str(),
                        "--query",
                        "Subnet.SubnetId",
                        "--output",
                        "text",
                    ],
                ))
                .await
                .with_context(|_| error::CreateSubnetSnafu { cidr_block: cidr_block.clone() })?;
            ensure!(!subnet_id.is_empty(), error::EmptyResourceIdSnafu { resource: "subnet" });

            tracing::info!("subnet/{subnet_id} created in vpc/{vpc_id}");
            subnet_ids.push(subnet_id);
        }
        Ok(subnet_ids)
    }

    async fn create_control_plane(&self, vpc_id: &str, subnet_ids: &[String]) -> Result<(), Error> {
        let cluster_name = &self.config.cluster_name;
        let _output = self
            .runner
            .run(Invocation::new(
                programs::EKSCTL,
                [
                    "create",
                    "cluster",
                    "--name",
                    cluster_name.as_str(),
                    "--region",
                    self.config.aws.region.as_str(),
                    "--vpc-id",
                    vpc_id,
                    "--subnets",
                    subnet_ids.join(",").as_str(),
                ],
            ))
            .await
            .with_context(|_| error::CreateControlPlaneSnafu {
                cluster_name: cluster_name.clone(),
            })?;

        tracing::info!("cluster/{cluster_name} control plane created");
        Ok(())
    }

    async fn create_node_group(&self) -> Result<(), Error> {
        let cluster_name = &self.config.cluster_name;
        let nodes = &self.config.nodes;
        let _output = self
            .runner
            .run(Invocation::new(
                programs::EKSCTL,
                [
                    "create",
                    "nodegroup",
                    "--cluster",
                    cluster_name.as_str(),
                    "--node-type",
                    nodes.instance_type.as_str(),
                    "--nodes",
                    nodes.count.to_string().as_str(),
                ],
            ))
            .await
            .with_context(|_| error::CreateNodeGroupSnafu { cluster_name: cluster_name.clone() })?;

        tracing::info!(
            "nodegroup with {} x {} nodes created for cluster/{cluster_name}",
            nodes.count,
            nodes.instance_type
        );
        Ok(())
    }

    async fn provision_environment(&self, environment: &Environment) -> Result<(), Error> {
        let namespace = &environment.namespace;
        let _output = self
            .runner
            .run(Invocation::new(
                programs::KUBECTL,
                ["create", "namespace", namespace.as_str()],
            ))
            .await
            .with_context(|_| error::CreateNamespaceSnafu { namespace: namespace.clone() })?;
        tracing::info!("namespace/{namespace} created");

        let secret_name = environment.secret_name();
        let aws = &self.config.aws;
        let _output = self
            .runner
            .run(Invocation::new(
                programs::KUBECTL,
                [
                    "create".to_string(),
                    "secret".to_string(),
                    "generic".to_string(),
                    secret_name.clone(),
                    format!("--namespace={namespace}"),
                    format!(
                        "--from-literal={}={}",
                        crate::consts::ACCESS_KEY_ID_VAR,
                        aws.access_key_id
                    ),
                    format!(
                        "--from-literal={}={}",
                        crate::consts::SECRET_ACCESS_KEY_VAR,
                        aws.secret_access_key
                    ),
                ],
            ))
            .await
            .with_context(|_| error::CreateSecretSnafu {
                secret_name: secret_name.clone(),
                namespace: namespace.clone(),
            })?;
        tracing::info!("secret/{secret_name} created in namespace/{namespace}");

        let manifest = manifest::render_deployment(&manifest::DeploymentParams {
            app_name: &self.config.app_name,
            namespace,
            replicas: environment.replicas,
            image: &environment.image,
            secret_name: &secret_name,
        })
        .with_context(|_| error::RenderManifestSnafu { environment: environment.name.clone() })?;

        let _output = self
            .runner
            .run(
                Invocation::new(
                    programs::KUBECTL,
                    [
                        "apply".to_string(),
                        "-f".to_string(),
                        "-".to_string(),
                        format!("--namespace={namespace}"),
                    ],
                )
                .with_stdin(manifest),
            )
            .await
            .with_context(|_| error::ApplyManifestSnafu { namespace: namespace.clone() })?;
        tracing::info!(
            "deployment/{} applied in namespace/{namespace} with {} replicas",
            self.config.app_name,
            environment.replicas
        );

        Ok(())
    }

    async fn create_iam_role(&self, role: &RolePolicy) -> Result<(), Error> {
        let role_name = &role.name;
        let document = role.assume_role_policy_document().with_context(|_| {
            error::SerializePolicyDocumentSnafu { role_name: role_name.clone() }
        })?;

        let _output = self
            .runner
            .run(Invocation::new(
                programs::AWS,
                [
                    "iam",
                    "create-role",
                    "--role-name",
                    role_name.as_str(),
                    "--assume-role-policy-document",
                    document.as_str(),
                ],
            ))
            .await
            .with_context(|_| error::CreateRoleSnafu { role_name: role_name.clone() })?;
        tracing::info!("role/{role_name} created");

        let _output = self
            .runner
            .run(Invocation::new(
                programs::AWS,
                [
                    "iam",
                    "attach-role-policy",
                    "--role-name",
                    role_name.as_str(),
                    "--policy-arn",
                    role.policy_arn.as_str(),
                ],
            ))
            .await
            .with_context(|_| error::AttachRolePolicySnafu {
                role_name: role_name.clone(),
                policy_arn: role.policy_arn.clone(),
            })?;
        tracing::info!("policy {} attached to role/{role_name}", role.policy_arn);

        Ok(())
    }

    // One group is created per allowed CIDR; see the Open Question note in
    // DESIGN.md before changing this to a single group with multiple rules.
    async fn create_security_groups(&self, vpc_id: &str) -> Result<Vec<String>, Error> {
        let groups = &self.config.security_groups;
        let mut security_group_ids = Vec::with_capacity(groups.allowed_cidrs.len());

        for cidr in &groups.allowed_cidrs {
            let group_id = self
                .runner
                .run(Invocation::new(
                    programs::AWS,
                    [
                        "ec2",
                        "create-security-group",
                        "--group-name",
                        groups.group_name.as_str(),
                        "--description",
                        groups.description.as_str(),
                        "--vpc-id",
                        vpc_id,
                        "--query",
                        "GroupId",
                        "--output",
                        "text",
                    ],
                ))
                .await
                .with_context(|_| error::CreateSecurityGroupSnafu {
                    group_name: groups.group_name.clone(),
                })?;
            ensure!(
                !group_id.is_empty(),
                error::EmptyResourceIdSnafu { resource: "security group" }
            );
            tracing::info!("security-group/{group_id} created in vpc/{vpc_id}");

            let _output = self
                .runner
                .run(Invocation::new(
                    programs::AWS,
                    [
                        "ec2",
                        "authorize-security-group-ingress",
                        "--group-id",
                        group_id.as_str(),
                        "--protocol",
                        groups.protocol.as_str(),
                        "--port",
                        groups.port.to_string().as_str(),
                        "--cidr",
                        cidr.as_str(),
                    ],
                ))
                .await
                .with_context(|_| error::AuthorizeIngressSnafu { cidr: cidr.clone() })?;
            tracing::info!("ingress from {cidr} authorized on security-group/{group_id}");

            security_group_ids.push(group_id);
        }

        Ok(security_group_ids)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{CommandRunner, DryRunRunner, Error, Invocation, Provisioner, runner};
    use crate::config::{
        AwsConfig, Config, Environment, IamConfig, LogConfig, NetworkConfig, NodeGroupConfig,
        SecurityGroupConfig,
    };

    fn sample_config() -> Config {
        Config {
            cluster_name: "orca".to_string(),
            app_name: "gateway".to_string(),
            aws: AwsConfig {
                account_id: "123456789012".to_string(),
                region: "us-west-2".to_string(),
                access_key_id: "AKIATESTKEY".to_string(),
                secret_access_key: "swordfish".to_string(),
            },
            network: NetworkConfig {
                vpc_cidr_block: "10.1.0.0/16".to_string(),
                subnet_cidr_blocks: vec!["10.1.1.0/24".to_string(), "10.1.2.0/24".to_string()],
            },
            nodes: NodeGroupConfig { count: 2, instance_type: "t3.large".to_string() },
            environments: vec![
                Environment {
                    name: "staging".to_string(),
                    namespace: "staging".to_string(),
                    replicas: 2,
                    image: "registry.test/gateway:staging".to_string(),
                },
                Environment {
                    name: "production".to_string(),
                    namespace: "prod".to_string(),
                    replicas: 5,
                    image: "registry.test/gateway:1.4.2".to_string(),
                },
            ],
            iam: IamConfig::default(),
            security_groups: SecurityGroupConfig {
                group_name: "orca-sg".to_string(),
                description: "orca ingress".to_string(),
                protocol: "tcp".to_string(),
                port: 443,
                allowed_cidrs: vec!["203.0.113.0/24".to_string(), "198.51.100.0/24".to_string()],
            },
            log: LogConfig::default(),
        }
    }

    fn scripted_runner() -> DryRunRunner {
        DryRunRunner::new()
            .respond_with("ec2 create-vpc", ["vpc-123"])
            .respond_with("ec2 create-subnet", ["subnet-a", "subnet-b"])
            .respond_with("ec2 create-security-group", ["sg-1", "sg-2"])
    }

    #[tokio::test]
    async fn test_network_and_cluster_invocations() {
        let runner = scripted_runner();
        let _summary = Provisioner::new(sample_config(), &runner).run().await.unwrap();

        let recorded = runner.recorded();
        assert_eq!(
            recorded[0],
            Invocation::new(
                "aws",
                [
                    "ec2",
                    "create-vpc",
                    "--cidr-block",
                    "10.1.0.0/16",
                    "--query",
                    "Vpc.VpcId",
                    "--output",
                    "text",
                ]
            )
        );
        assert_eq!(
            recorded[1],
            Invocation::new(
                "aws",
                [
                    "ec2",
                    "create-subnet",
                    "--vpc-id",
                    "vpc-123",
                    "--cidr-block",
                    "10.1.1.0/24",
                    "--query",
                    "Subnet.SubnetId",
                    "--output",
                    "text",
                ]
            )
        );
        assert_eq!(recorded[2].args[5], "10.1.2.0/24");
        assert_eq!(
            recorded[3],
            Invocation::new(
                "eksctl",
                [
                    "create",
                    "cluster",
                    "--name",
                    "orca",
                    "--region",
                    "us-west-2",
                    "--vpc-id",
                    "vpc-123",
                    "--subnets",
                    "subnet-a,subnet-b",
                ]
            )
        );
        assert_eq!(
            recorded[4],
            Invocation::new(
                "eksctl",
                [
                    "create",
                    "nodegroup",
                    "--cluster",
                    "orca",
                    "--node-type",
                    "t3.large",
                    "--nodes",
                    "2",
                ]
            )
        );
    }

    #[tokio::test]
    async fn test_each_environment_gets_namespace_secret_and_deployment() {
        let runner = scripted_runner();
        let _summary = Provisioner::new(sample_config(), &runner).run().await.unwrap();

        let recorded = runner.recorded();
        let kubectl =
            recorded.iter().filter(|inv| inv.program == "kubectl").collect::<Vec<_>>();
        assert_eq!(kubectl.len(), 6);

        for (offset, name, namespace) in [(0, "staging", "staging"), (3, "production", "prod")] {
            assert_eq!(
                *kubectl[offset],
                Invocation::new("kubectl", ["create", "namespace", namespace])
            );

            let secret = kubectl[offset + 1];
            assert_eq!(secret.args[3], format!("aws-secret-{name}"));
            assert!(secret.args.contains(&format!("--namespace={namespace}")));
            assert!(
                secret
                    .args
                    .contains(&"--from-literal=AWS_ACCESS_KEY_ID=AKIATESTKEY".to_string())
            );
            assert!(
                secret
                    .args
                    .contains(&"--from-literal=AWS_SECRET_ACCESS_KEY=swordfish".to_string())
            );

            let apply = kubectl[offset + 2];
            assert_eq!(apply.args[..3], ["apply", "-f", "-"]);
            assert!(apply.args.contains(&format!("--namespace={namespace}")));
            let manifest = apply.stdin.as_deref().unwrap();
            assert!(manifest.contains(&format!("namespace: {namespace}")));
            assert!(manifest.contains(&format!("aws-secret-{name}")));
        }
    }

    #[tokio::test]
    async fn test_manifest_carries_replicas_and_image_verbatim() {
        let runner = scripted_runner();
        let _summary = Provisioner::new(sample_config(), &runner).run().await.unwrap();

        let manifests = runner
            .recorded()
            .into_iter()
            .filter_map(|inv| inv.stdin)
            .collect::<Vec<_>>();
        assert_eq!(manifests.len(), 2);
        assert!(manifests[0].contains("replicas: 2"));
        assert!(manifests[0].contains("registry.test/gateway:staging"));
        assert!(manifests[1].contains("replicas: 5"));
        assert!(manifests[1].contains("registry.test/gateway:1.4.2"));
    }

    #[tokio::test]
    async fn test_each_role_is_created_then_attached() {
        let runner = scripted_runner();
        let _summary = Provisioner::new(sample_config(), &runner).run().await.unwrap();

        let iam = runner
            .recorded()
            .into_iter()
            .filter(|inv| inv.args.first().is_some_and(|arg| arg == "iam"))
            .collect::<Vec<_>>();
        assert_eq!(iam.len(), 4);

        assert_eq!(iam[0].args[1], "create-role");
        assert_eq!(iam[0].args[3], "my-cluster-role");
        assert!(iam[0].args[5].contains("eks.amazonaws.com"));
        assert_eq!(iam[1].args[1], "attach-role-policy");
        assert_eq!(iam[1].args[3], "my-cluster-role");
        assert_eq!(iam[1].args[5], "arn:aws:iam::aws:policy/AmazonEKSClusterPolicy");

        assert_eq!(iam[2].args[1], "create-role");
        assert_eq!(iam[2].args[3], "my-worker-node-role");
        assert_eq!(iam[3].args[1], "attach-role-policy");
        assert_eq!(iam[3].args[3], "my-worker-node-role");
    }

    #[tokio::test]
    async fn test_security_group_created_per_cidr() {
        let runner = scripted_runner();
        let summary = Provisioner::new(sample_config(), &runner).run().await.unwrap();

        let recorded = runner.recorded();
        let tail = &recorded[recorded.len() - 4..];

        assert_eq!(tail[0].args[1], "create-security-group");
        assert_eq!(tail[0].args[3], "orca-sg");
        assert_eq!(tail[0].args[7], "vpc-123");
        assert_eq!(
            tail[1],
            Invocation::new(
                "aws",
                [
                    "ec2",
                    "authorize-security-group-ingress",
                    "--group-id",
                    "sg-1",
                    "--protocol",
                    "tcp",
                    "--port",
                    "443",
                    "--cidr",
                    "203.0.113.0/24",
                ]
            )
        );
        assert_eq!(tail[2].args[1], "create-security-group");
        assert_eq!(tail[3].args[3], "sg-2");
        assert_eq!(tail[3].args[9], "198.51.100.0/24");

        assert_eq!(summary.vpc_id, "vpc-123");
        assert_eq!(summary.subnet_ids, vec!["subnet-a", "subnet-b"]);
        assert_eq!(summary.security_group_ids, vec!["sg-1", "sg-2"]);
    }

    #[tokio::test]
    async fn test_empty_captured_identifier_aborts() {
        let runner = DryRunRunner::new().respond_with("ec2 create-vpc", [""]);
        let result = Provisioner::new(sample_config(), &runner).run().await;

        assert!(matches!(result, Err(Error::EmptyResourceId { resource: "vpc" })));
        assert_eq!(runner.recorded().len(), 1);
    }

    struct FailingRunner {
        calls: Mutex<usize>,
    }

    impl CommandRunner for FailingRunner {
        async fn run(&self, invocation: Invocation) -> Result<String, runner::Error> {
            *self.calls.lock().unwrap() += 1;
            Err(runner::Error::CommandFailed {
                command: invocation.render(),
                code: Some(1),
                stderr: "boom".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_first_failure_stops_the_sequence() {
        let runner = FailingRunner { calls: Mutex::new(0) };
        let result = Provisioner::new(sample_config(), &runner).run().await;

        assert!(matches!(result, Err(Error::CreateVpc { .. })));
        assert_eq!(*runner.calls.lock().unwrap(), 1);
    }
}
