// edep-core/src/store.rs
//! The project's `dependencies/` directory: one JSON record per resolved
//! dependency, named from its org, url and version.
use std::path::{Path, PathBuf};

use edep_aio::{expand_env, fs, read_json, write_json};
use edep_common::config::{ProjectLayout, SERVICE_DEFINITION_FILE};
use edep_common::error::{EdepError, Result};
use edep_common::model::ServiceDefinition;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

lazy_static! {
    static ref SCHEME_RE: Regex = Regex::new(r"^[A-Za-z0-9+.-]*?://").unwrap();
    static ref RESERVED_RE: Regex = Regex::new(r"[$!*,;/?@&~=%]").unwrap();
}

/// Suffix shared by every dependency record.
pub const DEPENDENCY_FILE_SUFFIX: &str = SERVICE_DEFINITION_FILE;

/// Makes a service url usable inside a file name: the scheme is dropped and
/// reserved characters become `-`.
pub fn sanitize_reference(url: &str) -> String {
    let without_scheme = SCHEME_RE.replace(url, "");
    RESERVED_RE.replace_all(&without_scheme, "-").into_owned()
}

/// `{org}_{sanitized url}_{version}.service.definition.json`. Environment
/// references in url and version are expanded first.
pub fn dependency_file_name(org: &str, url: &str, version: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        org,
        sanitize_reference(&expand_env(url)),
        expand_env(version),
        DEPENDENCY_FILE_SUFFIX
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStore {
    dir: PathBuf,
}

impl DependencyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_project(layout: &ProjectLayout) -> Self {
        Self::new(layout.dependency_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Reports whether the directory exists, creating it first when `create`
    /// is set.
    pub fn ensure_dependency_directory(&self, create: bool) -> Result<bool> {
        if fs::is_directory(&self.dir) {
            return Ok(true);
        }
        if !create {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir)?;
        fs::set_permissions(&self.dir, 0o755)?;
        debug!("Created dependency directory {}", self.dir.display());
        Ok(true)
    }

    /// Names of the record files in the directory, sorted. A missing
    /// directory has no records.
    pub fn list_dependency_files(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let files = fs::list_directory_entries(&self.dir)?
            .into_iter()
            .filter(|(name, _, is_dir)| !is_dir && name.ends_with(DEPENDENCY_FILE_SUFFIX))
            .map(|(name, _, _)| name)
            .collect();
        Ok(files)
    }

    pub fn read_dependency_definition(&self, file_name: &str) -> Result<ServiceDefinition> {
        read_json(&self.record_path(file_name), false)
    }

    pub fn write_dependency_record(&self, file_name: &str, def: &ServiceDefinition) -> Result<()> {
        debug!("Writing dependency record {}", file_name);
        write_json(&self.record_path(file_name), def)
    }

    pub fn delete_dependency_record(&self, file_name: &str) -> Result<()> {
        debug!("Deleting dependency record {}", file_name);
        fs::remove_file(&self.record_path(file_name))
    }

    /// Writes `def` under its deterministic name, creating the directory if
    /// needed. Returns the file name.
    pub fn store_definition(&self, def: &ServiceDefinition) -> Result<String> {
        self.ensure_dependency_directory(true)?;
        let file_name = dependency_file_name(&def.org, &def.url, &def.version);
        self.write_dependency_record(&file_name, def)?;
        Ok(file_name)
    }

    /// Every record with its file name, in file name order.
    pub fn load_all(&self) -> Result<Vec<(String, ServiceDefinition)>> {
        self.list_dependency_files()?
            .into_iter()
            .map(|name| {
                let def = self.read_dependency_definition(&name)?;
                Ok((name, def))
            })
            .collect()
    }

    /// Copies every record of `other` into this store after checking it is a
    /// well-formed definition. Returns how many records were copied.
    pub fn copy_from(&self, other: &DependencyStore) -> Result<usize> {
        let records = other.load_all()?;
        if records.is_empty() {
            return Ok(0);
        }
        self.ensure_dependency_directory(true)?;
        for (name, def) in &records {
            def.validate().map_err(|e| {
                warn!("Refusing to copy invalid record {}: {}", name, e);
                EdepError::Validation(format!(
                    "dependency {} in {} is not valid: {e}",
                    name,
                    other.dir.display()
                ))
            })?;
            self.write_dependency_record(name, def)?;
        }
        debug!(
            "Copied {} dependency records from {}",
            records.len(),
            other.dir.display()
        );
        Ok(records.len())
    }
}
