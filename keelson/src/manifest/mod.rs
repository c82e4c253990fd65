//! Typed construction of the per-environment Deployment manifest.
//!
//! The manifest is built from `k8s-openapi` types and serialized to YAML, so
//! configured values can never break the document structure the way raw
//! string templating could.

use std::collections::BTreeMap;

use k8s_openapi::{
    Resource,
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{Container, EnvVar, EnvVarSource, PodSpec, PodTemplateSpec, SecretKeySelector},
    },
    apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta},
};
use serde::Serialize;

use crate::consts::{ACCESS_KEY_ID_VAR, SECRET_ACCESS_KEY_VAR, k8s::labels};

/// The values a Deployment manifest is parameterized by.
pub struct DeploymentParams<'a> {
    pub app_name: &'a str,

    pub namespace: &'a str,

    pub replicas: i32,

    pub image: &'a str,

    pub secret_name: &'a str,
}

/// `k8s-openapi` types carry `apiVersion` and `kind` as trait constants
/// rather than fields; a manifest piped to the cluster-API CLI needs both
/// inline.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Document<'a> {
    api_version: &'a str,
    kind: &'a str,
    #[serde(flatten)]
    deployment: &'a Deployment,
}

/// Builds the Deployment object for one environment.
#[must_use]
pub fn build_deployment(params: &DeploymentParams<'_>) -> Deployment {
    let DeploymentParams { app_name, namespace, replicas, image, secret_name } = *params;

    let selector_labels =
        BTreeMap::from_iter([(labels::APP.to_string(), app_name.to_string())]);
    let metadata_labels = selector_labels
        .clone()
        .into_iter()
        .chain([(labels::MANAGED_BY.to_string(), keelson_base::PROJECT_NAME.to_string())])
        .collect::<BTreeMap<_, _>>();

    Deployment {
        metadata: ObjectMeta {
            name: Some(app_name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(metadata_labels),
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(selector_labels.clone()),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector_labels),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: app_name.to_string(),
                        image: Some(image.to_string()),
                        image_pull_policy: Some("Always".to_string()),
                        env: Some(vec![
                            secret_env_var(ACCESS_KEY_ID_VAR, secret_name),
                            secret_env_var(SECRET_ACCESS_KEY_VAR, secret_name),
                        ]),
                        ..Container::default()
                    }],
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    }
}

/// Renders the Deployment for one environment as a YAML document.
///
/// # Errors
///
/// Returns a [`serde_yaml::Error`] if the document cannot be serialized.
pub fn render_deployment(params: &DeploymentParams<'_>) -> Result<String, serde_yaml::Error> {
    let deployment = build_deployment(params);
    serde_yaml::to_string(&Document {
        api_version: Deployment::API_VERSION,
        kind: Deployment::KIND,
        deployment: &deployment,
    })
}

/// An environment variable sourced from a key of the credential secret; the
/// variable name doubles as the secret key, matching how the secret is
/// created.
fn secret_env_var(name: &str, secret_name: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                key: name.to_string(),
                name: secret_name.to_string(),
                optional: None,
            }),
            ..EnvVarSource::default()
        }),
        ..EnvVar::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{DeploymentParams, build_deployment, render_deployment};

    fn params() -> DeploymentParams<'static> {
        DeploymentParams {
            app_name: "gateway",
            namespace: "staging",
            replicas: 2,
            image: "registry.test/gateway:staging",
            secret_name: "aws-secret-staging",
        }
    }

    #[test]
    fn test_deployment_references_secret_for_both_variables() {
        let deployment = build_deployment(&params());

        let containers = deployment.spec.unwrap().template.spec.unwrap().containers;
        assert_eq!(containers.len(), 1);

        let env = containers[0].env.clone().unwrap();
        assert_eq!(env.len(), 2);
        for var in &env {
            let selector = var.value_from.clone().unwrap().secret_key_ref.unwrap();
            assert_eq!(selector.name, "aws-secret-staging");
            assert_eq!(selector.key, var.name);
        }
        assert_eq!(env[0].name, "AWS_ACCESS_KEY_ID");
        assert_eq!(env[1].name, "AWS_SECRET_ACCESS_KEY");
    }

    #[test]
    fn test_deployment_selector_matches_template_labels() {
        let deployment = build_deployment(&params());
        let spec = deployment.spec.unwrap();

        let selector = spec.selector.match_labels.unwrap();
        let template_labels = spec.template.metadata.unwrap().labels.unwrap();
        assert_eq!(selector, template_labels);
        assert_eq!(selector.get("app").map(String::as_str), Some("gateway"));
    }

    #[test]
    fn test_rendered_document_is_a_complete_manifest() {
        let rendered = render_deployment(&params()).unwrap();

        assert!(rendered.contains("apiVersion: apps/v1"));
        assert!(rendered.contains("kind: Deployment"));
        assert!(rendered.contains("namespace: staging"));
        assert!(rendered.contains("replicas: 2"));
        assert!(rendered.contains("registry.test/gateway:staging"));
        assert!(rendered.contains("imagePullPolicy: Always"));
    }
}
