// edep-common/src/model/spec.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a service: reference (url), organization, version and
/// architecture.
///
/// An empty field is a wildcard when comparing with [`ServiceSpec::matches`];
/// it never means "empty" for a spec that is written to disk. Matching is
/// symmetric and reflexive but deliberately not transitive: `{url: a}` matches
/// both `{url: a, version: 1}` and `{url: a, version: 2}`, which do not match
/// each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(rename = "url")]
    pub reference: String,
    pub org: String,
    pub version: String,
    pub arch: String,
}

fn field_matches(a: &str, b: &str) -> bool {
    a.is_empty() || b.is_empty() || a == b
}

impl ServiceSpec {
    pub fn new(
        reference: impl Into<String>,
        org: impl Into<String>,
        version: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            org: org.into(),
            version: version.into(),
            arch: arch.into(),
        }
    }

    pub fn matches(&self, other: &ServiceSpec) -> bool {
        field_matches(&self.org, &other.org)
            && field_matches(&self.reference, &other.reference)
            && field_matches(&self.version, &other.version)
            && field_matches(&self.arch, &other.arch)
    }

    /// Same as [`matches`](Self::matches) but ignoring the version field, for
    /// comparisons where one side carries a version range instead of a
    /// version.
    pub fn matches_identity(&self, other: &ServiceSpec) -> bool {
        field_matches(&self.org, &other.org)
            && field_matches(&self.reference, &other.reference)
            && field_matches(&self.arch, &other.arch)
    }

    /// Human readable target description, omitting unset fields.
    pub fn describe(&self) -> String {
        let mut target = format!("url: {}, org: {}", self.reference, self.org);
        if !self.version.is_empty() {
            target.push_str(&format!(", version: {}", self.version));
        }
        if !self.arch.is_empty() {
            target.push_str(&format!(", arch: {}", self.arch));
        }
        target
    }
}

impl fmt::Display for ServiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{url: {}, org: {}, version: {}, arch: {}}}",
            self.reference, self.org, self.version, self.arch
        )
    }
}
