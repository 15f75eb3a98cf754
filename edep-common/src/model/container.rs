// edep-common/src/model/container.rs
use serde_json::Value;

use super::registry::ImageDockerAuth;

/// Everything the image collaborator needs to bring a service's containers
/// onto the local machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerConfig {
    /// Service the images belong to.
    pub service_url: String,
    pub service_org: String,
    /// Validated image server location; `None` when images come from a
    /// docker registry.
    pub image_server_url: Option<String>,
    pub image_server_signature: String,
    pub deployment: Value,
    pub deployment_signature: String,
    pub image_auths: Vec<ImageDockerAuth>,
}

impl ContainerConfig {
    /// Image names listed under `services.*.image` in the deployment.
    pub fn images(&self) -> Vec<String> {
        let mut images: Vec<String> = self
            .deployment
            .get("services")
            .and_then(Value::as_object)
            .map(|services| {
                services
                    .values()
                    .filter_map(|svc| svc.get("image").and_then(Value::as_str))
                    .filter(|image| !image.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        images.sort();
        images.dedup();
        images
    }
}
