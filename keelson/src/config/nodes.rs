use serde::{Deserialize, Serialize};

/// Worker node pool settings forwarded to the cluster-lifecycle CLI.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGroupConfig {
    pub count: u32,

    pub instance_type: String,
}

impl Default for NodeGroupConfig {
    fn default() -> Self { Self { count: 3, instance_type: "t3.medium".to_string() } }
}
