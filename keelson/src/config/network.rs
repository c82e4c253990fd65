use serde::{Deserialize, Serialize};

/// Address blocks for the virtual network backing the cluster.
///
/// Values are forwarded verbatim to the cloud CLI; no CIDR syntax validation
/// is performed here.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub vpc_cidr_block: String,

    #[serde(default = "Vec::new")]
    pub subnet_cidr_blocks: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            vpc_cidr_block: "10.0.0.0/16".to_string(),
            subnet_cidr_blocks: vec!["10.0.1.0/24".to_string(), "10.0.2.0/24".to_string()],
        }
    }
}
