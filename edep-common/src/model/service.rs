// edep-common/src/model/service.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::spec::ServiceSpec;
use crate::error::{EdepError, Result};
use crate::version::{self, VersionRange};

/// A required-service declaration: which service, from which org, in which
/// version range and for which architecture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredService {
    pub url: String,
    pub org: String,
    /// Older files carry the range in `version`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version_range: String,
    #[serde(default)]
    pub arch: String,
}

impl RequiredService {
    pub fn new(
        url: impl Into<String>,
        org: impl Into<String>,
        version_range: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            org: org.into(),
            version: String::new(),
            version_range: version_range.into(),
            arch: arch.into(),
        }
    }

    pub fn range_expression(&self) -> &str {
        if self.version_range.is_empty() {
            &self.version
        } else {
            &self.version_range
        }
    }

    pub fn range(&self) -> Result<VersionRange> {
        VersionRange::parse(self.range_expression())
    }

    /// The declaration as a spec; the version field holds the range
    /// expression, so compare it against concrete specs with
    /// [`is_satisfied_by`](Self::is_satisfied_by).
    pub fn spec(&self) -> ServiceSpec {
        ServiceSpec::new(&self.url, &self.org, self.range_expression(), &self.arch)
    }

    /// True when `resolved` has a matching identity and a version within the
    /// declared range.
    pub fn is_satisfied_by(&self, resolved: &ServiceSpec) -> Result<bool> {
        if !self.spec().matches_identity(resolved) {
            return Ok(false);
        }
        if resolved.version.is_empty() {
            return Ok(true);
        }
        self.range()?.contains(&resolved.version)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "type")]
    pub value_type: String,
    #[serde(default)]
    pub default_value: String,
}

impl UserInput {
    pub fn requires_value(&self) -> bool {
        self.default_value.is_empty()
    }
}

/// Where a service's images live, when they are not in a plain docker
/// registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStore {
    #[serde(default)]
    pub store_type: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub signature: String,
}

/// Capability set shared by every project definition shape.
pub trait ServiceFile {
    fn url(&self) -> &str;
    fn org(&self) -> &str;
    fn version(&self) -> &str;
    fn arch(&self) -> &str;
    fn user_inputs(&self) -> &[UserInput];
    fn deployment(&self) -> Option<&Value>;

    fn spec(&self) -> ServiceSpec {
        ServiceSpec::new(self.url(), self.org(), self.version(), self.arch())
    }
}

/// A resolved service: the contents of `service.definition.json` and of every
/// dependency record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    pub url: String,
    pub version: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub sharable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_hardware: Option<Value>,
    #[serde(default)]
    pub required_services: Vec<RequiredService>,
    #[serde(default, rename = "userInput")]
    pub user_inputs: Vec<UserInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deployment_signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_store: Option<ImageStore>,
}

impl ServiceDefinition {
    pub fn has_dependencies(&self) -> bool {
        !self.required_services.is_empty()
    }

    /// Structural self-check of a definition.
    pub fn validate(&self) -> Result<()> {
        let who = if self.url.is_empty() {
            "service definition".to_string()
        } else {
            format!("service definition {}", self.url)
        };
        let fail = |msg: String| Err(EdepError::Validation(format!("{who}: {msg}")));

        if self.url.is_empty() {
            return fail("url must be specified".to_string());
        }
        if self.org.is_empty() {
            return fail("org must be specified".to_string());
        }
        if self.version.is_empty() {
            return fail("version must be specified".to_string());
        }
        if !version::is_valid_version(&self.version) && !self.version.starts_with('$') {
            return fail(format!("version '{}' is not valid", self.version));
        }
        if self.arch.is_empty() {
            return fail("arch must be specified".to_string());
        }
        for (i, rs) in self.required_services.iter().enumerate() {
            if rs.url.is_empty() || rs.org.is_empty() {
                return fail(format!(
                    "requiredServices[{i}] must specify both url and org"
                ));
            }
            if let Err(e) = rs.range() {
                return fail(format!("requiredServices[{i}] ({}): {e}", rs.url));
            }
        }
        for (i, ui) in self.user_inputs.iter().enumerate() {
            if ui.name.is_empty() {
                return fail(format!("userInput[{i}] has no name"));
            }
        }
        match &self.deployment {
            None | Some(Value::Null) | Some(Value::Object(_)) => Ok(()),
            Some(Value::String(s)) if s.is_empty() => Ok(()),
            Some(_) => fail("deployment must be a JSON object".to_string()),
        }
    }
}

impl ServiceFile for ServiceDefinition {
    fn url(&self) -> &str {
        &self.url
    }

    fn org(&self) -> &str {
        &self.org
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn arch(&self) -> &str {
        &self.arch
    }

    fn user_inputs(&self) -> &[UserInput] {
        &self.user_inputs
    }

    fn deployment(&self) -> Option<&Value> {
        self.deployment.as_ref()
    }
}

/// One workload entry of a legacy microservice definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    #[serde(default)]
    pub deployment: Option<Value>,
    #[serde(default)]
    pub deployment_signature: String,
    #[serde(default)]
    pub torrent: String,
}

/// The legacy `microservice.definition.json` shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroserviceDefinition {
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub public: bool,
    pub spec_ref: String,
    pub version: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub sharable: String,
    #[serde(default, rename = "userInput")]
    pub user_inputs: Vec<UserInput>,
    #[serde(default)]
    pub workloads: Vec<Workload>,
}

impl ServiceFile for MicroserviceDefinition {
    fn url(&self) -> &str {
        &self.spec_ref
    }

    fn org(&self) -> &str {
        &self.org
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn arch(&self) -> &str {
        &self.arch
    }

    fn user_inputs(&self) -> &[UserInput] {
        &self.user_inputs
    }

    fn deployment(&self) -> Option<&Value> {
        self.workloads.first().and_then(|w| w.deployment.as_ref())
    }
}
