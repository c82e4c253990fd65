use snafu::Snafu;

use super::runner;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to create VPC with CIDR block {cidr_block}, error: {source}"))]
    CreateVpc { cidr_block: String, source: runner::Error },

    #[snafu(display("Failed to create subnet with CIDR block {cidr_block}, error: {source}"))]
    CreateSubnet { cidr_block: String, source: runner::Error },

    #[snafu(display("Failed to create control plane for cluster {cluster_name}, error: {source}"))]
    CreateControlPlane { cluster_name: String, source: runner::Error },

    #[snafu(display("Failed to create node group for cluster {cluster_name}, error: {source}"))]
    CreateNodeGroup { cluster_name: String, source: runner::Error },

    #[snafu(display("Failed to create namespace {namespace}, error: {source}"))]
    CreateNamespace { namespace: String, source: runner::Error },

    #[snafu(display(
        "Failed to create secret {secret_name} in namespace {namespace}, error: {source}"
    ))]
    CreateSecret { secret_name: String, namespace: String, source: runner::Error },

    #[snafu(display(
        "Failed to render deployment manifest for environment {environment}, error: {source}"
    ))]
    RenderManifest { environment: String, source: serde_yaml::Error },

    #[snafu(display(
        "Failed to apply deployment manifest in namespace {namespace}, error: {source}"
    ))]
    ApplyManifest { namespace: String, source: runner::Error },

    #[snafu(display(
        "Failed to serialize assume-role policy for role {role_name}, error: {source}"
    ))]
    SerializePolicyDocument { role_name: String, source: serde_json::Error },

    #[snafu(display("Failed to create IAM role {role_name}, error: {source}"))]
    CreateRole { role_name: String, source: runner::Error },

    #[snafu(display("Failed to attach policy {policy_arn} to role {role_name}, error: {source}"))]
    AttachRolePolicy { role_name: String, policy_arn: String, source: runner::Error },

    #[snafu(display("Failed to create security group {group_name}, error: {source}"))]
    CreateSecurityGroup { group_name: String, source: runner::Error },

    #[snafu(display("Failed to authorize ingress from {cidr}, error: {source}"))]
    AuthorizeIngress { cidr: String, source: runner::Error },

    #[snafu(display("Creation command for {resource} returned an empty identifier"))]
    EmptyResourceId { resource: &'static str },
}
