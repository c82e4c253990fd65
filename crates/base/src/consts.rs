/// The default name for a cluster provisioned by Keelson.
pub const DEFAULT_CLUSTER_NAME: &str = "my-cluster";

/// The default name given to the application Deployment rendered for each
/// environment.
pub const DEFAULT_APP_NAME: &str = "my-app";

/// The default cloud region used when generating a configuration template.
pub const DEFAULT_REGION: &str = "us-east-1";

pub mod programs {
    //! External command-line tools driven by Keelson.

    /// The cloud-resource CLI, used for networks, subnets, IAM and security
    /// groups.
    pub const AWS: &str = "aws";

    /// The cluster-lifecycle CLI, used for control plane and node group
    /// creation.
    pub const EKSCTL: &str = "eksctl";

    /// The cluster-API CLI, used for namespaces, secrets and manifest apply.
    pub const KUBECTL: &str = "kubectl";
}
