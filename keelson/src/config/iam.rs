use serde::{Deserialize, Serialize};
use serde_json::json;

/// IAM roles attached to the cluster control plane and its worker nodes.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IamConfig {
    #[serde(default = "RolePolicy::default_cluster_role")]
    pub cluster_role: RolePolicy,

    #[serde(default = "RolePolicy::default_worker_node_role")]
    pub worker_node_role: RolePolicy,
}

impl Default for IamConfig {
    fn default() -> Self {
        Self {
            cluster_role: RolePolicy::default_cluster_role(),
            worker_node_role: RolePolicy::default_worker_node_role(),
        }
    }
}

/// An IAM role definition: the assume-role trust policy it is created with
/// and the managed policy attached to it afterwards.
///
/// The trust policy is kept structured in the configuration file and
/// serialized to the JSON string the cloud CLI expects at invocation time.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePolicy {
    pub name: String,

    pub assume_role_policy: serde_json::Value,

    pub policy_arn: String,
}

impl RolePolicy {
    /// Serializes the assume-role trust policy to a compact JSON document.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the policy value cannot be
    /// serialized.
    pub fn assume_role_policy_document(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.assume_role_policy)
    }

    #[must_use]
    pub fn default_cluster_role() -> Self {
        Self {
            name: "my-cluster-role".to_string(),
            assume_role_policy: assume_role_policy_for("eks.amazonaws.com"),
            policy_arn: "arn:aws:iam::aws:policy/AmazonEKSClusterPolicy".to_string(),
        }
    }

    #[must_use]
    pub fn default_worker_node_role() -> Self {
        Self {
            name: "my-worker-node-role".to_string(),
            assume_role_policy: assume_role_policy_for("ec2.amazonaws.com"),
            policy_arn: "arn:aws:iam::aws:policy/AmazonEKSWorkerNodePolicy".to_string(),
        }
    }
}

fn assume_role_policy_for(service: &str) -> serde_json::Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": service },
            "Action": "sts:AssumeRole",
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::RolePolicy;

    #[test]
    fn test_assume_role_policy_document_is_compact_json() {
        let role = RolePolicy::default_cluster_role();
        let document = role.assume_role_policy_document().unwrap();

        assert!(document.starts_with('{'));
        assert!(document.contains("\"eks.amazonaws.com\""));
        assert!(document.contains("\"sts:AssumeRole\""));
        assert!(!document.contains('\n'));
    }
}
