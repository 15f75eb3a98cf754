// edep-common/src/model/registry.rs
//! Wire shapes returned by the service registry.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::service::{ImageStore, RequiredService, ServiceDefinition, UserInput};
use crate::error::{EdepError, Result};

/// A service as the registry returns it. Unlike [`ServiceDefinition`] the
/// deployment is a JSON document encoded as a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryService {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub documentation: String,
    pub url: String,
    pub version: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub sharable: String,
    #[serde(default)]
    pub match_hardware: Option<Value>,
    #[serde(default)]
    pub required_services: Vec<RequiredService>,
    #[serde(default, rename = "userInput")]
    pub user_inputs: Vec<UserInput>,
    #[serde(default)]
    pub deployment: String,
    #[serde(default)]
    pub deployment_signature: String,
    #[serde(default)]
    pub image_store: Option<ImageStore>,
    #[serde(default)]
    pub last_updated: String,
}

impl RegistryService {
    pub fn has_dependencies(&self) -> bool {
        !self.required_services.is_empty()
    }

    /// Decodes the deployment string; an empty string means no deployment.
    pub fn parsed_deployment(&self) -> Result<Option<Value>> {
        if self.deployment.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.deployment).map(Some).map_err(|e| {
            EdepError::Parse(
                format!("deployment of {}/{}", self.url, self.version),
                e.to_string(),
            )
        })
    }

    /// Converts into the on-disk definition, recording `org` (the registry
    /// does not echo it back in the body).
    pub fn into_definition(self, org: &str, deployment: Option<Value>) -> ServiceDefinition {
        ServiceDefinition {
            org: org.to_string(),
            label: self.label,
            description: self.description,
            public: self.public,
            documentation: self.documentation,
            url: self.url,
            version: self.version,
            arch: self.arch,
            sharable: self.sharable,
            match_hardware: self.match_hardware,
            required_services: self.required_services,
            user_inputs: self.user_inputs,
            deployment,
            deployment_signature: self.deployment_signature,
            image_store: self.image_store,
        }
    }
}

/// Response of `GET orgs/{org}/services`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryServices {
    #[serde(default)]
    pub services: HashMap<String, RegistryService>,
    #[serde(default)]
    pub last_index: i64,
}

/// Image pull credential for one docker registry. The registry hands these
/// out per service; `userinput.json` can supply its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDockerAuth {
    #[serde(default)]
    pub registry: String,
    /// Login name; empty means the registry's `token` convention.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default)]
    pub token: String,
}

/// Strips the `{org}/` prefix from a registry service id.
pub fn short_service_id(id: &str) -> &str {
    id.split_once('/').map(|(_, rest)| rest).unwrap_or(id)
}
