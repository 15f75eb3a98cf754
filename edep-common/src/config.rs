// edep-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{EdepError, Result};

/// Fallback used when HZN_EXCHANGE_URL is not set or is empty.
const DEFAULT_REGISTRY_URL: &str = "http://localhost:3090/v1";

pub const DEPENDENCY_DIR: &str = "dependencies";
pub const SERVICE_DEFINITION_FILE: &str = "service.definition.json";
pub const LEGACY_MICROSERVICE_DEFINITION_FILE: &str = "microservice.definition.json";
pub const USERINPUT_FILE: &str = "userinput.json";
const STATE_DIR: &str = ".edep";

#[derive(Debug, Clone)]
pub struct Config {
    pub registry_url: String,
    pub org: Option<String>,
    pub user_auth: Option<String>,
    pub public_key_file: Option<PathBuf>,
    pub default_arch: String,
    pub project_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading edep configuration");

        let registry_url = env::var("HZN_EXCHANGE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                debug!(
                    "HZN_EXCHANGE_URL environment variable not set or empty, falling back to default: {}",
                    DEFAULT_REGISTRY_URL
                );
                DEFAULT_REGISTRY_URL.to_string()
            });
        let registry_url = registry_url.trim_end_matches('/').to_string();

        let org = non_empty_var("HZN_ORG_ID");
        let user_auth = non_empty_var("HZN_EXCHANGE_USER_AUTH");
        let public_key_file = non_empty_var("HZN_PUBLIC_KEY_FILE").map(PathBuf::from);
        let default_arch = non_empty_var("HZN_ARCH").unwrap_or_else(host_arch);

        let project_dir = match non_empty_var("HZN_DEVTOOL_PROJECT") {
            Some(dir) => PathBuf::from(dir),
            None => env::current_dir().map_err(|e| {
                EdepError::Config(format!("Unable to determine current directory: {e}"))
            })?,
        };

        debug!(
            "Configuration loaded: registry={}, project={}, arch={}",
            registry_url,
            project_dir.display(),
            default_arch
        );
        Ok(Self {
            registry_url,
            org,
            user_auth,
            public_key_file,
            default_arch,
            project_dir,
        })
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(&self.project_dir)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.is_empty())
}

/// Host architecture in the notation the registry uses.
pub fn host_arch() -> String {
    match env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "arm" => "arm",
        "powerpc64" => "ppc64le",
        "s390x" => "s390x",
        other => other,
    }
    .to_string()
}

/// Path helpers for a service project on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn definition_path(&self) -> PathBuf {
        self.root.join(SERVICE_DEFINITION_FILE)
    }

    pub fn legacy_definition_path(&self) -> PathBuf {
        self.root.join(LEGACY_MICROSERVICE_DEFINITION_FILE)
    }

    pub fn dependency_dir(&self) -> PathBuf {
        self.root.join(DEPENDENCY_DIR)
    }

    pub fn userinput_path(&self) -> PathBuf {
        self.root.join(USERINPUT_FILE)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR).join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_hang_off_the_root() {
        let layout = ProjectLayout::new("/work/svc");
        assert_eq!(
            layout.definition_path(),
            PathBuf::from("/work/svc/service.definition.json")
        );
        assert_eq!(layout.dependency_dir(), PathBuf::from("/work/svc/dependencies"));
        assert_eq!(layout.userinput_path(), PathBuf::from("/work/svc/userinput.json"));
        assert_eq!(layout.logs_dir(), PathBuf::from("/work/svc/.edep/logs"));
    }

    #[test]
    fn host_arch_is_never_empty() {
        assert!(!host_arch().is_empty());
    }
}
