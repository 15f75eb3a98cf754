// edep-core/src/project.rs
//! A service project on disk: its definition file, its `userinput.json` and
//! its dependency store.
use std::path::{Path, PathBuf};

use edep_aio::{fs, read_json, write_json};
use edep_common::config::ProjectLayout;
use edep_common::error::{EdepError, Result};
use edep_common::model::{
    GlobalServiceSpec, GlobalSet, MicroserviceDefinition, RequiredService, ServiceDefinition,
    ServiceFile, ServiceSpec, ServiceVariables, UserInputFile,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::store::DependencyStore;

#[derive(Debug, Clone)]
pub struct Project {
    layout: ProjectLayout,
}

fn org_matches(a: &str, b: &str) -> bool {
    a.is_empty() || b.is_empty() || a == b
}

/// Skeleton block for `dep`: every variable without a default, set to `""`.
/// `None` when the service has nothing that needs configuring.
fn skeleton_block(dep: &dyn ServiceFile) -> Option<ServiceVariables> {
    let variables: Map<String, Value> = dep
        .user_inputs()
        .iter()
        .filter(|ui| ui.requires_value())
        .map(|ui| (ui.name.clone(), Value::String(String::new())))
        .collect();
    if variables.is_empty() {
        return None;
    }
    Some(ServiceVariables {
        org: dep.org().to_string(),
        url: dep.url().to_string(),
        version_range: dep.version().to_string(),
        variables,
    })
}

/// Adds the skeleton block for `dep` unless a block for the same
/// (url, org, versionRange) is already there.
fn insert_skeleton(inputs: &mut UserInputFile, dep: &dyn ServiceFile) -> bool {
    match skeleton_block(dep) {
        Some(block) if !inputs.has_block_for(&block) => {
            inputs.services.push(block);
            true
        }
        Some(_) => {
            debug!("Variables for {} are already configured", dep.url());
            false
        }
        None => false,
    }
}

impl Project {
    /// Opens the project rooted at `dir`, which must be an existing directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !fs::is_directory(&dir) {
            return Err(EdepError::Input(format!(
                "project directory {} does not exist",
                dir.display()
            )));
        }
        Ok(Self {
            layout: ProjectLayout::new(dir),
        })
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn store(&self) -> DependencyStore {
        DependencyStore::for_project(&self.layout)
    }

    pub fn is_service_project(&self) -> bool {
        fs::is_file(&self.layout.definition_path())
    }

    pub fn is_microservice_project(&self) -> bool {
        fs::is_file(&self.layout.legacy_definition_path())
    }

    /// Fails unless the project holds a service definition. Legacy
    /// microservice projects are reported as unsupported.
    pub fn require_service_project(&self) -> Result<()> {
        if self.is_service_project() {
            Ok(())
        } else if self.is_microservice_project() {
            Err(EdepError::Validation("unsupported project type".to_string()))
        } else {
            Err(EdepError::NotFound(format!(
                "{} does not contain a service definition",
                self.root().display()
            )))
        }
    }

    /// Reads `service.definition.json`. Without substitution `$VAR`
    /// references are kept so the file can be written back unchanged.
    pub fn read_definition(&self, substitute_env_vars: bool) -> Result<ServiceDefinition> {
        self.require_service_project()?;
        read_json(&self.layout.definition_path(), substitute_env_vars)
    }

    pub fn read_legacy_definition(
        &self,
        substitute_env_vars: bool,
    ) -> Result<MicroserviceDefinition> {
        read_json(&self.layout.legacy_definition_path(), substitute_env_vars)
    }

    pub fn write_definition(&self, def: &ServiceDefinition) -> Result<()> {
        write_json(&self.layout.definition_path(), def)
    }

    /// The user input file to use: `path` when given, otherwise the project's
    /// own `userinput.json`.
    pub fn userinput_path(&self, path: Option<&Path>) -> PathBuf {
        path.map(Path::to_path_buf)
            .unwrap_or_else(|| self.layout.userinput_path())
    }

    /// Reads the project's `userinput.json`; a missing file is an empty
    /// document.
    pub fn read_user_inputs(&self, substitute_env_vars: bool) -> Result<UserInputFile> {
        self.read_user_inputs_from(None, substitute_env_vars)
    }

    pub fn read_user_inputs_from(
        &self,
        path: Option<&Path>,
        substitute_env_vars: bool,
    ) -> Result<UserInputFile> {
        let path = self.userinput_path(path);
        if !path.exists() {
            debug!("{} not present, using empty user inputs", path.display());
            return Ok(UserInputFile::default());
        }
        read_json(&path, substitute_env_vars)
    }

    pub fn write_user_inputs(&self, inputs: &UserInputFile) -> Result<()> {
        write_json(&self.layout.userinput_path(), inputs)
    }

    /// Points the project's required-service entry for `dep` (by url and
    /// org) at `dep`'s version, adding the entry if there is none.
    pub fn refresh_service_dependencies(&self, dep: &dyn ServiceFile) -> Result<()> {
        let mut def = self.read_definition(false)?;
        let existing = def
            .required_services
            .iter_mut()
            .find(|rs| rs.url == dep.url() && rs.org == dep.org());
        match existing {
            Some(rs) => {
                rs.version = dep.version().to_string();
                rs.version_range = dep.version().to_string();
                rs.arch = dep.arch().to_string();
            }
            None => {
                let mut rs = RequiredService::new(dep.url(), dep.org(), dep.version(), dep.arch());
                rs.version = dep.version().to_string();
                def.required_services.push(rs);
            }
        }
        debug!("Updated required services of {} with {}", def.url, dep.url());
        self.write_definition(&def)
    }

    /// Drops every required-service entry for `dep`'s url and org. Returns
    /// whether anything was removed.
    pub fn remove_service_dependency(&self, dep: &ServiceSpec) -> Result<bool> {
        let mut def = self.read_definition(false)?;
        let before = def.required_services.len();
        def.required_services
            .retain(|rs| !(rs.url == dep.reference && org_matches(&rs.org, &dep.org)));
        if def.required_services.len() == before {
            return Ok(false);
        }
        self.write_definition(&def)?;
        Ok(true)
    }

    /// Adds placeholder values for `dep`'s variables that have no default.
    /// Returns whether `userinput.json` changed.
    pub fn add_skeleton_variables(&self, dep: &dyn ServiceFile) -> Result<bool> {
        let mut inputs = self.read_user_inputs(false)?;
        if !insert_skeleton(&mut inputs, dep) {
            return Ok(false);
        }
        self.write_user_inputs(&inputs)?;
        debug!("Added skeleton variables for {}", dep.url());
        Ok(true)
    }

    /// Copies the dependency project's variable blocks that this project does
    /// not have yet, then adds skeleton variables for `dep` itself.
    pub fn merge_variable_configuration(
        &self,
        dep: &dyn ServiceFile,
        blocks: &[ServiceVariables],
    ) -> Result<()> {
        let mut inputs = self.read_user_inputs(false)?;
        for block in blocks {
            if !inputs.has_block_for(block) {
                inputs.services.push(block.clone());
            }
        }
        insert_skeleton(&mut inputs, dep);
        self.write_user_inputs(&inputs)
    }

    /// Brings the dependency's global attribute blocks over. A block whose
    /// type and settings are already present is skipped; an untargeted block
    /// is scoped to the dependency.
    pub fn merge_global_attributes(
        &self,
        dep: &dyn ServiceFile,
        globals: &[GlobalSet],
    ) -> Result<()> {
        let mut inputs = self.read_user_inputs(false)?;
        for global in globals {
            if inputs.global.iter().any(|g| g.same_setting(global)) {
                continue;
            }
            let mut global = global.clone();
            if global.service_specs.is_empty() {
                global.service_specs.push(GlobalServiceSpec {
                    url: dep.url().to_string(),
                    org: dep.org().to_string(),
                });
            }
            inputs.global.push(global);
        }
        self.write_user_inputs(&inputs)
    }

    /// Strips the variable blocks configured for `dep`'s url and org.
    pub fn remove_configured_variables(&self, dep: &ServiceSpec) -> Result<bool> {
        let path = self.layout.userinput_path();
        if !path.exists() {
            return Ok(false);
        }
        let mut inputs = self.read_user_inputs(false)?;
        let before = inputs.services.len();
        inputs
            .services
            .retain(|b| !(b.url == dep.reference && org_matches(&b.org, &dep.org)));
        if inputs.services.len() == before {
            return Ok(false);
        }
        self.write_user_inputs(&inputs)?;
        Ok(true)
    }
}
