//! Keelson-specific Kubernetes definitions.

pub mod labels {
    //! Kubernetes labels applied to rendered manifests.

    /// The selector label that ties a Deployment to its pod template.
    pub const APP: &str = "app";

    /// The `app.kubernetes.io/managed-by` label value, indicating that a
    /// resource is managed by Keelson.
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
}
