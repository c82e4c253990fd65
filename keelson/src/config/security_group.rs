use serde::{Deserialize, Serialize};

/// Security group parameters and the source address ranges allowed to reach
/// the cluster.
///
/// One group is created per allowed CIDR, matching the historical behavior of
/// the provisioning sequence this tool replaces.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupConfig {
    pub group_name: String,

    pub description: String,

    #[serde(default = "default_protocol")]
    pub protocol: String,

    pub port: u16,

    #[serde(default = "Vec::new")]
    pub allowed_cidrs: Vec<String>,
}

impl Default for SecurityGroupConfig {
    fn default() -> Self {
        Self {
            group_name: "my-cluster-sg".to_string(),
            description: "Ingress rules for the cluster".to_string(),
            protocol: default_protocol(),
            port: 443,
            allowed_cidrs: vec!["10.0.0.0/16".to_string()],
        }
    }
}

fn default_protocol() -> String { "tcp".to_string() }
