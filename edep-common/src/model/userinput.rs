// edep-common/src/model/userinput.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::registry::ImageDockerAuth;
use super::service::ServiceFile;

/// Global attribute type holding image registry credentials in its `auths`
/// variable.
pub const DOCKER_REGISTRY_AUTH_ATTRIBUTES: &str = "DockerRegistryAuthAttributes";

/// `{url, org}` pair scoping a global attribute block to one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalServiceSpec {
    pub url: String,
    pub org: String,
}

/// One entry of the `global` list: an attribute of some type together with
/// its variable settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalSet {
    #[serde(rename = "type")]
    pub attribute_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_specs: Vec<GlobalServiceSpec>,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

impl GlobalSet {
    /// Two blocks configure the same thing when type and settings agree.
    pub fn same_setting(&self, other: &GlobalSet) -> bool {
        self.attribute_type == other.attribute_type && self.variables == other.variables
    }

    /// Unscoped blocks apply to every service; scoped ones to the listed
    /// services only. An empty org matches any org.
    pub fn applies_to_service(&self, url: &str, org: &str) -> bool {
        self.service_specs.is_empty()
            || self.service_specs.iter().any(|spec| {
                spec.url == url && (spec.org.is_empty() || org.is_empty() || spec.org == org)
            })
    }
}

/// Variable values for one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceVariables {
    #[serde(default)]
    pub org: String,
    pub url: String,
    #[serde(default)]
    pub version_range: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

impl ServiceVariables {
    /// Exact key used when merging blocks.
    pub fn same_target(&self, other: &ServiceVariables) -> bool {
        self.url == other.url && self.org == other.org && self.version_range == other.version_range
    }

    /// True when this block configures `service`; an empty org on either side
    /// matches any org.
    pub fn applies_to(&self, service: &dyn ServiceFile) -> bool {
        self.url == service.url()
            && (self.org.is_empty() || service.org().is_empty() || self.org == service.org())
    }
}

/// The project's `userinput.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInputFile {
    #[serde(default)]
    pub global: Vec<GlobalSet>,
    #[serde(default)]
    pub services: Vec<ServiceVariables>,
}

impl UserInputFile {
    /// First configured value of `name` for `service`, if any block sets it.
    pub fn variable_for(&self, service: &dyn ServiceFile, name: &str) -> Option<&Value> {
        self.services
            .iter()
            .filter(|block| block.applies_to(service))
            .find_map(|block| block.variables.get(name))
    }

    pub fn has_block_for(&self, candidate: &ServiceVariables) -> bool {
        self.services.iter().any(|b| b.same_target(candidate))
    }

    /// Image registry credentials configured for the service `url` in `org`.
    /// Entries without a registry or token are skipped.
    pub fn registry_auths(&self, url: &str, org: &str) -> Vec<ImageDockerAuth> {
        self.global
            .iter()
            .filter(|g| g.attribute_type == DOCKER_REGISTRY_AUTH_ATTRIBUTES)
            .filter(|g| g.applies_to_service(url, org))
            .filter_map(|g| g.variables.get("auths").and_then(Value::as_array))
            .flatten()
            .filter_map(|entry| {
                match serde_json::from_value::<ImageDockerAuth>(entry.clone()) {
                    Ok(auth) if !auth.registry.is_empty() && !auth.token.is_empty() => Some(auth),
                    Ok(_) => {
                        warn!("Ignoring incomplete registry auth in user inputs");
                        None
                    }
                    Err(e) => {
                        warn!("Ignoring malformed registry auth in user inputs: {}", e);
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::service::ServiceDefinition;

    #[test]
    fn parses_userinput_document() {
        let raw = json!({
            "global": [
                {"type": "LocationAttributes", "variables": {"lat": 1.0}}
            ],
            "services": [
                {"org": "org1", "url": "svc-a", "versionRange": "[0.0.0,INFINITY)",
                 "variables": {"port": 8080}}
            ]
        });
        let file: UserInputFile = serde_json::from_value(raw).unwrap();
        assert_eq!(file.global.len(), 1);
        assert!(file.global[0].service_specs.is_empty());
        assert_eq!(file.services[0].variables["port"], json!(8080));
    }

    #[test]
    fn global_equality_ignores_service_specs() {
        let mut vars = Map::new();
        vars.insert("lat".into(), json!(1.0));
        let a = GlobalSet {
            attribute_type: "LocationAttributes".into(),
            service_specs: vec![],
            variables: vars.clone(),
        };
        let b = GlobalSet {
            service_specs: vec![GlobalServiceSpec {
                url: "svc-a".into(),
                org: "org1".into(),
            }],
            ..a.clone()
        };
        assert!(a.same_setting(&b));
    }

    #[test]
    fn variable_lookup_tolerates_empty_org() {
        let def = ServiceDefinition {
            org: "org1".into(),
            url: "svc-a".into(),
            ..Default::default()
        };
        let mut vars = Map::new();
        vars.insert("port".into(), json!(""));
        let file = UserInputFile {
            global: vec![],
            services: vec![ServiceVariables {
                org: String::new(),
                url: "svc-a".into(),
                version_range: String::new(),
                variables: vars,
            }],
        };
        assert!(file.variable_for(&def, "port").is_some());
        assert!(file.variable_for(&def, "host").is_none());
    }

    #[test]
    fn registry_auths_follow_service_scope() {
        let raw = json!({
            "global": [
                {"type": "DockerRegistryAuthAttributes",
                 "variables": {"auths": [
                     {"registry": "r.example.com", "username": "ci", "token": "user-token"},
                     {"registry": "", "token": "dropped"}
                 ]}},
                {"type": "DockerRegistryAuthAttributes",
                 "service_specs": [{"url": "svc-b", "org": "org1"}],
                 "variables": {"auths": [{"registry": "b.example.com", "token": "b-token"}]}},
                {"type": "LocationAttributes", "variables": {"auths": [
                     {"registry": "x.example.com", "token": "x"}
                 ]}}
            ]
        });
        let file: UserInputFile = serde_json::from_value(raw).unwrap();

        let for_a = file.registry_auths("svc-a", "org1");
        assert_eq!(
            for_a,
            vec![ImageDockerAuth {
                registry: "r.example.com".into(),
                username: "ci".into(),
                token: "user-token".into(),
            }]
        );
        let for_b: Vec<String> = file
            .registry_auths("svc-b", "org1")
            .into_iter()
            .map(|a| a.registry)
            .collect();
        assert_eq!(for_b, vec!["r.example.com", "b.example.com"]);
    }
}
