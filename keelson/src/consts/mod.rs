pub mod k8s;

/// The name given to secrets holding cloud credentials is
/// `{SECRET_NAME_PREFIX}-{environment}`.
pub const SECRET_NAME_PREFIX: &str = "aws-secret";

/// The environment variable names injected into application containers from
/// the per-environment credential secret.
pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
