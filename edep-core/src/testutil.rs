// edep-core/src/testutil.rs
//! Fixtures and in-memory collaborators shared by the engine's tests.
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use edep_common::config::Config;
use edep_common::error::{EdepError, Result};
use edep_common::model::{
    ContainerConfig, ImageDockerAuth, RegistryService, RequiredService, ServiceDefinition,
    UserInput, UserInputFile,
};
use edep_net::images::ImageFetcher;
use edep_net::registry::{Registry, ServiceQuery};
use tempfile::TempDir;

use crate::project::Project;

pub fn definition(url: &str, version: &str) -> ServiceDefinition {
    ServiceDefinition {
        org: "org1".into(),
        label: url.into(),
        url: url.into(),
        version: version.into(),
        arch: "amd64".into(),
        ..Default::default()
    }
}

pub fn requiring(mut def: ServiceDefinition, urls: &[&str]) -> ServiceDefinition {
    for url in urls {
        def.required_services
            .push(RequiredService::new(*url, "org1", "1.0.0", "amd64"));
    }
    def
}

pub fn with_variable(mut def: ServiceDefinition, name: &str) -> ServiceDefinition {
    def.user_inputs.push(UserInput {
        name: name.into(),
        value_type: "string".into(),
        ..Default::default()
    });
    def
}

/// A temporary service project whose definition requires `deps`.
pub fn project(deps: Vec<RequiredService>) -> (TempDir, Project) {
    let dir = TempDir::new().unwrap();
    let project = Project::open(dir.path()).unwrap();
    let mut def = definition("svc-p", "1.0.0");
    def.required_services = deps;
    project.write_definition(&def).unwrap();
    (dir, project)
}

pub fn config(project_dir: &Path) -> Config {
    Config {
        registry_url: "http://registry.invalid/v1".into(),
        org: Some("org1".into()),
        user_auth: Some("tester:pw".into()),
        public_key_file: None,
        default_arch: "amd64".into(),
        project_dir: project_dir.to_path_buf(),
    }
}

pub fn registry_service(def: &ServiceDefinition) -> RegistryService {
    RegistryService {
        owner: format!("{}/tester", def.org),
        label: def.label.clone(),
        url: def.url.clone(),
        version: def.version.clone(),
        arch: def.arch.clone(),
        required_services: def.required_services.clone(),
        user_inputs: def.user_inputs.clone(),
        deployment: def
            .deployment
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default(),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    services: Vec<(String, String, RegistryService)>,
    auths: HashMap<String, Vec<ImageDockerAuth>>,
    pub queries: RefCell<Vec<ServiceQuery>>,
}

impl FakeRegistry {
    pub fn with(defs: &[ServiceDefinition]) -> Self {
        let mut registry = Self::default();
        for def in defs {
            registry.publish(def);
        }
        registry
    }

    pub fn publish(&mut self, def: &ServiceDefinition) {
        let id = format!("{}/{}_{}_{}", def.org, def.url, def.version, def.arch);
        self.services
            .push((id, def.org.clone(), registry_service(def)));
    }

    pub fn publish_raw(&mut self, org: &str, svc: RegistryService) {
        let id = format!("{}/{}_{}_{}", org, svc.url, svc.version, svc.arch);
        self.services.push((id, org.to_string(), svc));
    }

    pub fn add_auth(&mut self, service_id: &str, auth: ImageDockerAuth) {
        self.auths.entry(service_id.to_string()).or_default().push(auth);
    }
}

impl Registry for FakeRegistry {
    async fn get_services(
        &self,
        query: &ServiceQuery,
        _creds: Option<&str>,
    ) -> Result<HashMap<String, RegistryService>> {
        self.queries.borrow_mut().push(query.clone());
        Ok(self
            .services
            .iter()
            .filter(|(_, org, svc)| {
                *org == query.org
                    && svc.url == query.url
                    && svc.arch == query.arch
                    && query.version.as_ref().is_none_or(|v| *v == svc.version)
            })
            .map(|(id, _, svc)| (id.clone(), svc.clone()))
            .collect())
    }

    async fn get_docker_auths(
        &self,
        _org: &str,
        service_id: &str,
        _creds: Option<&str>,
    ) -> Result<Vec<ImageDockerAuth>> {
        Ok(self.auths.get(service_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeImages {
    pub fail: bool,
    pub pulled: RefCell<Vec<ContainerConfig>>,
    pub keys: RefCell<Vec<PathBuf>>,
    pub inputs: RefCell<Vec<UserInputFile>>,
}

impl ImageFetcher for FakeImages {
    async fn fetch_images(
        &self,
        config: &ContainerConfig,
        signing_keys: &[PathBuf],
        user_inputs: &UserInputFile,
    ) -> Result<()> {
        self.inputs.borrow_mut().push(user_inputs.clone());
        if self.fail {
            return Err(EdepError::Fetch("image pull refused".into()));
        }
        self.pulled.borrow_mut().push(config.clone());
        self.keys.borrow_mut().extend(signing_keys.iter().cloned());
        Ok(())
    }
}
