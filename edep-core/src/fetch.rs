// edep-core/src/fetch.rs
//! Brings a dependency, and everything it requires, into a project.
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use edep_common::config::Config;
use edep_common::error::{EdepError, Result};
use edep_common::model::registry::short_service_id;
use edep_common::model::{ContainerConfig, RegistryService, RequiredService, ServiceDefinition};
use edep_common::version::{compare_versions, VersionRange};
use edep_net::images::ImageFetcher;
use edep_net::registry::{Registry, ServiceQuery};
use edep_net::validation::validate_url;
use tracing::{debug, info, warn};

use crate::project::Project;

/// Where a dependency comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSource {
    /// Another service project on this machine. `user_input_path` overrides
    /// that project's `userinput.json`.
    Local {
        path: PathBuf,
        user_input_path: Option<PathBuf>,
    },
    Remote(RemoteSource),
}

/// A service to look up in the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSource {
    pub url: String,
    pub org: String,
    /// Exact version to ask the registry for.
    pub version: Option<String>,
    /// Range the chosen version must fall in.
    pub version_range: Option<String>,
    pub arch: Option<String>,
    pub credentials: Option<String>,
    pub signing_keys: Vec<PathBuf>,
}

/// Registry lookup for one service, after defaults are applied.
#[derive(Debug, Clone)]
struct Lookup {
    query: ServiceQuery,
    range: VersionRange,
}

/// Credentials and keys shared by every lookup of one fetch.
struct Access {
    credentials: Option<String>,
    signing_keys: Vec<PathBuf>,
}

type WalkKey = (String, String, String);

/// A dependency still to be resolved, with the chain of services that led
/// to it.
struct Pending {
    required: RequiredService,
    chain: Vec<WalkKey>,
}

pub struct Fetcher<'a, R, I> {
    config: &'a Config,
    registry: &'a R,
    images: &'a I,
}

impl<'a, R: Registry, I: ImageFetcher> Fetcher<'a, R, I> {
    pub fn new(config: &'a Config, registry: &'a R, images: &'a I) -> Self {
        Self {
            config,
            registry,
            images,
        }
    }

    /// Adds the dependency described by `source` to `project`: its record and
    /// the records of everything it requires land in the dependency store,
    /// the project's required services point at it, and `userinput.json`
    /// gains entries for its unset variables.
    pub async fn fetch(
        &self,
        project: &Project,
        source: &FetchSource,
    ) -> Result<ServiceDefinition> {
        match source {
            FetchSource::Local {
                path,
                user_input_path,
            } => self.fetch_local(project, path, user_input_path.as_deref()),
            FetchSource::Remote(remote) => self.fetch_remote(project, remote).await,
        }
    }

    fn fetch_local(
        &self,
        project: &Project,
        dep_dir: &Path,
        user_input_path: Option<&Path>,
    ) -> Result<ServiceDefinition> {
        project.require_service_project()?;
        let dep_project = Project::open(dep_dir)?;
        if !dep_project.is_service_project() {
            if dep_project.is_microservice_project() {
                return Err(EdepError::Validation("unsupported project type".to_string()));
            }
            return Err(EdepError::Input(format!(
                "{} does not contain service metadata",
                dep_dir.display()
            )));
        }

        let def = dep_project.read_definition(true)?;
        def.validate()?;
        let dep_inputs = dep_project.read_user_inputs_from(user_input_path, true)?;
        info!("Found dependency {}, org {}", def.url, def.org);

        let store = project.store();
        let file_name = store.store_definition(&def)?;
        debug!("Created {} as a new dependency", file_name);
        let copied = store.copy_from(&dep_project.store())?;
        debug!("Carried over {} record(s) from {}", copied, dep_dir.display());

        project.refresh_service_dependencies(&def)?;
        project.merge_variable_configuration(&def, &dep_inputs.services)?;
        project.merge_global_attributes(&def, &dep_inputs.global)?;
        Ok(def)
    }

    async fn fetch_remote(
        &self,
        project: &Project,
        remote: &RemoteSource,
    ) -> Result<ServiceDefinition> {
        project.require_service_project()?;
        if remote.url.is_empty() || remote.org.is_empty() {
            return Err(EdepError::Input(
                "both a url and an org must be specified".to_string(),
            ));
        }
        let access = self.access(remote)?;

        let lookup = Lookup {
            query: ServiceQuery {
                org: remote.org.clone(),
                url: remote.url.clone(),
                version: remote.version.clone().filter(|v| !v.is_empty()),
                arch: self.arch_or_default(remote.arch.as_deref()),
            },
            range: VersionRange::parse(remote.version_range.as_deref().unwrap_or(""))?,
        };
        let def = self.resolve(project, &lookup, &access).await?;
        let file_name = project.store().store_definition(&def)?;
        debug!("Created {} as a new dependency", file_name);

        self.fetch_required(project, &def, &access).await?;

        project.refresh_service_dependencies(&def)?;
        project.add_skeleton_variables(&def)?;
        Ok(def)
    }

    /// Resolves and stores the whole closure below `root`. Each stored
    /// dependency gets skeleton variables; the project definition is left
    /// alone.
    async fn fetch_required(
        &self,
        project: &Project,
        root: &ServiceDefinition,
        access: &Access,
    ) -> Result<()> {
        let root_chain = vec![walk_key(root)];
        let mut pending: Vec<Pending> = root
            .required_services
            .iter()
            .rev()
            .map(|rs| Pending {
                required: rs.clone(),
                chain: root_chain.clone(),
            })
            .collect();

        while let Some(next) = pending.pop() {
            let rs = &next.required;
            let lookup = Lookup {
                query: ServiceQuery {
                    org: rs.org.clone(),
                    url: rs.url.clone(),
                    version: None,
                    arch: self.arch_or_default(Some(&rs.arch)),
                },
                range: rs.range()?,
            };
            let def = self.resolve(project, &lookup, access).await?;
            let key = walk_key(&def);
            if next.chain.contains(&key) {
                return Err(EdepError::Validation(format!(
                    "dependency cycle detected at {} version {}",
                    def.url, def.version
                )));
            }

            let file_name = project.store().store_definition(&def)?;
            debug!("Created {} as a dependency of a dependency", file_name);
            project.add_skeleton_variables(&def)?;

            let mut chain = next.chain.clone();
            chain.push(key);
            pending.extend(def.required_services.iter().rev().map(|child| Pending {
                required: child.clone(),
                chain: chain.clone(),
            }));
        }
        Ok(())
    }

    /// Picks the highest registry candidate within range, pulls its images
    /// and returns it as a definition.
    async fn resolve(
        &self,
        project: &Project,
        lookup: &Lookup,
        access: &Access,
    ) -> Result<ServiceDefinition> {
        let query = &lookup.query;
        let candidates = self
            .registry
            .get_services(query, access.credentials.as_deref())
            .await?;
        debug!(
            "Registry returned {} candidate(s) for {}/{}",
            candidates.len(),
            query.org,
            query.url
        );

        let mut best: Option<(String, RegistryService)> = None;
        for (id, svc) in candidates {
            if !lookup.range.contains(&svc.version)? {
                debug!("Skipping {} {}: outside {}", svc.url, svc.version, lookup.range);
                continue;
            }
            let higher = match &best {
                None => true,
                Some((_, current)) => {
                    compare_versions(&svc.version, &current.version)? == Ordering::Greater
                }
            };
            if higher {
                best = Some((id, svc));
            }
        }
        let Some((service_id, svc)) = best else {
            return Err(EdepError::NotFound(format!(
                "no services found in the registry for url {}, org {}, arch {}{}",
                query.url,
                query.org,
                query.arch,
                if lookup.range.expression().is_empty() {
                    String::new()
                } else {
                    format!(", version range {}", lookup.range)
                }
            )));
        };
        info!("Creating dependency on {} {} (org {})", svc.url, svc.version, query.org);

        let deployment = svc.parsed_deployment()?;
        if let Some(deployment) = &deployment {
            self.pull_images(project, &query.org, &service_id, &svc, deployment, access)
                .await?;
        }
        Ok(svc.into_definition(&query.org, deployment))
    }

    async fn pull_images(
        &self,
        project: &Project,
        org: &str,
        service_id: &str,
        svc: &RegistryService,
        deployment: &serde_json::Value,
        access: &Access,
    ) -> Result<()> {
        let user_inputs = project.read_user_inputs(true)?;

        let store = svc.image_store.as_ref().filter(|s| !s.url.is_empty());
        let image_server_url = match store {
            Some(store) => Some(validate_url(&store.url)?.to_string()),
            None => None,
        };

        let image_auths = self
            .registry
            .get_docker_auths(
                org,
                short_service_id(service_id),
                access.credentials.as_deref(),
            )
            .await?;
        debug!("{} image auth(s) for {}/{}", image_auths.len(), org, svc.url);

        let container = ContainerConfig {
            service_url: svc.url.clone(),
            service_org: org.to_string(),
            image_server_url,
            image_server_signature: store.map(|s| s.signature.clone()).unwrap_or_default(),
            deployment: deployment.clone(),
            deployment_signature: svc.deployment_signature.clone(),
            image_auths,
        };
        self.images
            .fetch_images(&container, &access.signing_keys, &user_inputs)
            .await
            .map_err(|e| {
                EdepError::Fetch(format!("failed to get images for {}/{}: {e}", org, svc.url))
            })
    }

    /// Credentials and signing keys for a remote fetch, with configured
    /// defaults filled in. Every key file must exist.
    fn access(&self, remote: &RemoteSource) -> Result<Access> {
        let credentials = remote
            .credentials
            .clone()
            .filter(|c| !c.is_empty())
            .or_else(|| self.config.user_auth.clone());

        let signing_keys = if remote.signing_keys.is_empty() {
            self.config.public_key_file.iter().cloned().collect()
        } else {
            remote.signing_keys.clone()
        };
        for key in &signing_keys {
            if !key.is_file() {
                return Err(EdepError::Input(format!(
                    "signing key file {} does not exist",
                    key.display()
                )));
            }
        }
        if signing_keys.is_empty() {
            warn!("No public signing key configured; image signatures cannot be checked");
        }
        Ok(Access {
            credentials,
            signing_keys,
        })
    }

    fn arch_or_default(&self, arch: Option<&str>) -> String {
        arch.filter(|a| !a.is_empty())
            .unwrap_or(&self.config.default_arch)
            .to_string()
    }
}

fn walk_key(def: &ServiceDefinition) -> WalkKey {
    (def.org.clone(), def.url.clone(), def.version.clone())
}

/// Remote source for a required-service declaration, as used by auto-fetch.
pub fn remote_source_for(
    rs: &RequiredService,
    credentials: Option<String>,
    signing_keys: Vec<PathBuf>,
) -> RemoteSource {
    RemoteSource {
        url: rs.url.clone(),
        org: rs.org.clone(),
        version: None,
        version_range: Some(rs.range_expression().to_string()),
        arch: Some(rs.arch.clone()),
        credentials,
        signing_keys,
    }
}
