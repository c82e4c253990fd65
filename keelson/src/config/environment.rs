use serde::{Deserialize, Serialize};

use crate::consts::SECRET_NAME_PREFIX;

/// A logical deployment target (e.g. staging or production) with its
/// namespace, replica count and container image.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub name: String,

    pub namespace: String,

    pub replicas: i32,

    pub image: String,
}

impl Environment {
    /// The name of the credential secret created for this environment.
    #[must_use]
    pub fn secret_name(&self) -> String { format!("{SECRET_NAME_PREFIX}-{}", self.name) }
}

#[cfg(test)]
mod tests {
    use super::Environment;

    #[test]
    fn test_secret_name_includes_environment() {
        let environment = Environment {
            name: "staging".to_string(),
            namespace: "staging".to_string(),
            replicas: 2,
            image: "registry.example.com/app:staging".to_string(),
        };
        assert_eq!(environment.secret_name(), "aws-secret-staging");
    }
}
