mod aws;
mod environment;
mod error;
mod iam;
mod log;
mod network;
mod nodes;
mod security_group;

use std::path::{Path, PathBuf};

use keelson_base::consts::{DEFAULT_APP_NAME, DEFAULT_CLUSTER_NAME};
use resolve_path::PathResolveExt;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

pub use self::{
    aws::AwsConfig,
    environment::Environment,
    error::Error,
    iam::{IamConfig, RolePolicy},
    log::LogConfig,
    network::NetworkConfig,
    nodes::NodeGroupConfig,
    security_group::SecurityGroupConfig,
};

/// The provisioning configuration, loaded once at startup and immutable for
/// the rest of the run.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    pub aws: AwsConfig,

    pub network: NetworkConfig,

    pub nodes: NodeGroupConfig,

    #[serde(default = "Vec::new")]
    pub environments: Vec<Environment>,

    #[serde(default = "IamConfig::default")]
    pub iam: IamConfig,

    pub security_groups: SecurityGroupConfig,

    #[serde(default = "LogConfig::default")]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster_name: default_cluster_name(),
            app_name: default_app_name(),
            aws: AwsConfig::default(),
            network: NetworkConfig::default(),
            nodes: NodeGroupConfig::default(),
            environments: vec![
                Environment {
                    name: "staging".to_string(),
                    namespace: "staging".to_string(),
                    replicas: 2,
                    image: "registry.example.com/my-app:staging".to_string(),
                },
                Environment {
                    name: "production".to_string(),
                    namespace: "production".to_string(),
                    replicas: 4,
                    image: "registry.example.com/my-app:latest".to_string(),
                },
            ],
            iam: IamConfig::default(),
            security_groups: SecurityGroupConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn search_config_file_path() -> PathBuf {
        let paths = vec![Self::default_path()]
            .into_iter()
            .chain(keelson_base::fallback_project_config_directories().into_iter().map(
                |mut path| {
                    path.push(keelson_base::CLI_CONFIG_NAME);
                    path
                },
            ))
            .collect::<Vec<_>>();
        for path in paths {
            let Ok(exists) = path.try_exists() else {
                continue;
            };
            if exists {
                return path;
            }
        }
        Self::default_path()
    }

    #[inline]
    #[must_use]
    pub fn default_path() -> PathBuf {
        [
            keelson_base::PROJECT_CONFIG_DIR.to_path_buf(),
            PathBuf::from(keelson_base::CLI_CONFIG_NAME),
        ]
        .into_iter()
        .collect()
    }

    /// Loads the configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the path cannot be resolved, the file cannot
    /// be read, or its content is not valid YAML for this schema.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut config: Self = {
            let path =
                path.as_ref().try_resolve().map(|path| path.to_path_buf()).with_context(|_| {
                    error::ResolveFilePathSnafu { file_path: path.as_ref().to_path_buf() }
                })?;
            let data =
                std::fs::read(&path).context(error::OpenConfigSnafu { filename: path.clone() })?;
            serde_yaml::from_slice(&data).context(error::ParseConfigSnafu { filename: path })?
        };

        config.log.file_path = match config.log.file_path.map(|path| {
            path.try_resolve()
                .map(|path| path.to_path_buf())
                .with_context(|_| error::ResolveFilePathSnafu { file_path: path.clone() })
        }) {
            Some(Ok(path)) => Some(path),
            Some(Err(err)) => return Err(err),
            None => None,
        };

        Ok(config)
    }

    /// Renders the default configuration as a YAML template.
    #[must_use]
    pub fn template_basic() -> Vec<u8> {
        serde_yaml::to_string(&Self::default()).map(String::into_bytes).unwrap_or_default()
    }
}

fn default_cluster_name() -> String { DEFAULT_CLUSTER_NAME.to_string() }

fn default_app_name() -> String { DEFAULT_APP_NAME.to_string() }

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn test_template_parses_back() {
        let template = Config::template_basic();
        let config: Config = serde_yaml::from_slice(&template).unwrap();

        assert_eq!(config.cluster_name, "my-cluster");
        assert_eq!(config.environments.len(), 2);
        assert_eq!(config.network.subnet_cidr_blocks.len(), 2);
    }

    #[test]
    fn test_minimal_config_applies_defaults() {
        let yaml = r"
aws:
  accountId: '210987654321'
  region: eu-west-1
  accessKeyId: AKIAEXAMPLE
  secretAccessKey: secret
network:
  vpcCidrBlock: 172.16.0.0/16
  subnetCidrBlocks:
    - 172.16.1.0/24
nodes:
  count: 2
  instanceType: m5.large
securityGroups:
  groupName: edge
  description: edge ingress
  port: 8443
  allowedCidrs:
    - 0.0.0.0/0
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.cluster_name, "my-cluster");
        assert_eq!(config.security_groups.protocol, "tcp");
        assert_eq!(config.iam.cluster_role.name, "my-cluster-role");
        assert!(config.environments.is_empty());
    }

    #[test]
    fn test_missing_required_section_is_rejected() {
        let yaml = "clusterName: lonely";
        let result = serde_yaml::from_str::<Config>(yaml);
        assert!(result.is_err());
    }
}
