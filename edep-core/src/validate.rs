// edep-core/src/validate.rs
//! Checks that a project's dependency store is complete and that every
//! dependency variable without a default has a value.
use std::cmp::Ordering;
use std::path::PathBuf;

use edep_common::error::{EdepError, Result};
use edep_common::model::{RequiredService, ServiceDefinition, ServiceFile, UserInputFile};
use edep_common::version::compare_versions;
use edep_net::images::ImageFetcher;
use edep_net::registry::Registry;
use tracing::{debug, info};

use crate::fetch::{remote_source_for, FetchSource, Fetcher};
use crate::project::Project;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Fetch missing dependencies from the registry instead of failing.
    pub auto_fetch: bool,
    pub credentials: Option<String>,
    pub signing_keys: Vec<PathBuf>,
    /// Alternative `userinput.json` to check variables against.
    pub user_input_path: Option<PathBuf>,
}

/// Which stored record satisfies each required service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub resolved: Vec<(RequiredService, String)>,
    pub fetched: Vec<String>,
}

impl ValidationReport {
    /// File name of the record chosen for the required service `url`.
    pub fn resolved_file(&self, url: &str) -> Option<&str> {
        self.resolved
            .iter()
            .find(|(rs, _)| rs.url == url)
            .map(|(_, file)| file.as_str())
    }
}

/// Highest-versioned record satisfying `rs`.
fn find_satisfying<'r>(
    rs: &RequiredService,
    records: &'r [(String, ServiceDefinition)],
) -> Result<Option<&'r (String, ServiceDefinition)>> {
    let mut best: Option<&(String, ServiceDefinition)> = None;
    for record in records {
        if !rs.is_satisfied_by(&record.1.spec())? {
            continue;
        }
        let higher = match best {
            None => true,
            Some(current) => {
                compare_versions(&record.1.version, &current.1.version)? == Ordering::Greater
            }
        };
        if higher {
            best = Some(record);
        }
    }
    Ok(best)
}

/// Every variable without a default that `dep` declares must be set for it
/// in `user_inputs`.
fn check_variables(
    dep: &ServiceDefinition,
    user_inputs: &UserInputFile,
    user_input_path: &str,
) -> Result<()> {
    for ui in dep.user_inputs.iter().filter(|ui| ui.requires_value()) {
        if user_inputs.variable_for(dep, &ui.name).is_none() {
            return Err(EdepError::Validation(format!(
                "variable {} has no default and must be specified in {}",
                ui.name, user_input_path
            )));
        }
    }
    Ok(())
}

/// Validates `project`'s dependencies against `user_inputs`. Every missing
/// dependency and every unset variable is reported, not just the first.
pub async fn validate_project<R: Registry, I: ImageFetcher>(
    project: &Project,
    user_inputs: UserInputFile,
    options: &ValidationOptions,
    fetcher: &Fetcher<'_, R, I>,
) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    if !project.is_service_project() && project.is_microservice_project() {
        debug!("Legacy microservice project; no dependencies to validate");
        return Ok(report);
    }

    let def = project.read_definition(true)?;
    let store = project.store();
    let mut records = store.load_all()?;
    let mut user_inputs = user_inputs;
    let user_input_path = project.userinput_path(options.user_input_path.as_deref());
    let mut errors = Vec::new();

    for rs in &def.required_services {
        let mut found = match find_satisfying(rs, &records) {
            Ok(found) => found.map(|(name, _)| name.clone()),
            Err(e) => {
                errors.push(EdepError::Validation(format!(
                    "dependency {} has an invalid version range {}: {e}",
                    rs.url,
                    rs.range_expression()
                )));
                continue;
            }
        };

        if found.is_none() && options.auto_fetch {
            info!("Fetching missing dependency {} {}", rs.url, rs.range_expression());
            let source = FetchSource::Remote(remote_source_for(
                rs,
                options.credentials.clone(),
                options.signing_keys.clone(),
            ));
            match fetcher.fetch(project, &source).await {
                Ok(fetched) => {
                    report.fetched.push(fetched.url.clone());
                    records = store.load_all()?;
                    user_inputs =
                        project.read_user_inputs_from(options.user_input_path.as_deref(), true)?;
                    found = find_satisfying(rs, &records)?.map(|(name, _)| name.clone());
                }
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            }
        }

        match found {
            Some(file) => report.resolved.push((rs.clone(), file)),
            None => errors.push(EdepError::Validation(format!(
                "dependency {} at version {} does not exist in {}",
                rs.url,
                rs.range_expression(),
                store.dir().display()
            ))),
        }
    }

    let path_text = user_input_path.display().to_string();
    for (name, dep) in &records {
        let checked = dep
            .validate()
            .and_then(|()| check_variables(dep, &user_inputs, &path_text));
        if let Err(e) = checked {
            errors.push(EdepError::Validation(format!(
                "dependency {name} did not validate, error: {e}"
            )));
        }
    }

    EdepError::from_collected(errors)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use edep_common::model::ServiceVariables;
    use serde_json::{json, Map};

    use super::*;
    use crate::testutil::{config, definition, project, with_variable, FakeImages, FakeRegistry};

    async fn run(
        project: &Project,
        user_inputs: UserInputFile,
        options: &ValidationOptions,
        registry: &FakeRegistry,
    ) -> Result<ValidationReport> {
        let cfg = config(project.root());
        let images = FakeImages::default();
        let fetcher = Fetcher::new(&cfg, registry, &images);
        validate_project(project, user_inputs, options, &fetcher).await
    }

    fn range(url: &str, expr: &str) -> RequiredService {
        RequiredService::new(url, "org1", expr, "amd64")
    }

    #[tokio::test]
    async fn version_in_range_is_selected() {
        let (_dir, project) = project(vec![range("svc-a", "[1.0.0,2.0.0)")]);
        let store = project.store();
        store.store_definition(&definition("svc-a", "0.9.0")).unwrap();
        let chosen = store.store_definition(&definition("svc-a", "1.5.0")).unwrap();

        let report = run(
            &project,
            UserInputFile::default(),
            &ValidationOptions::default(),
            &FakeRegistry::default(),
        )
        .await
        .unwrap();
        assert_eq!(report.resolved_file("svc-a"), Some(chosen.as_str()));
    }

    #[tokio::test]
    async fn version_out_of_range_is_missing() {
        let (_dir, project) = project(vec![range("svc-a", "[1.0.0,2.0.0)")]);
        project
            .store()
            .store_definition(&definition("svc-a", "0.9.0"))
            .unwrap();

        let err = run(
            &project,
            UserInputFile::default(),
            &ValidationOptions::default(),
            &FakeRegistry::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EdepError::Validation(ref m) if m.contains("dependency svc-a")));
    }

    #[tokio::test]
    async fn other_services_do_not_satisfy_a_declaration() {
        let (_dir, project) = project(vec![range("svc-a", "1.0.0")]);
        project
            .store()
            .store_definition(&definition("svc-b", "1.0.0"))
            .unwrap();
        let result = run(
            &project,
            UserInputFile::default(),
            &ValidationOptions::default(),
            &FakeRegistry::default(),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unset_variable_is_named() {
        let (_dir, project) = project(vec![range("svc-a", "1.0.0")]);
        project
            .store()
            .store_definition(&with_variable(definition("svc-a", "1.0.0"), "port"))
            .unwrap();

        let err = run(
            &project,
            UserInputFile::default(),
            &ValidationOptions::default(),
            &FakeRegistry::default(),
        )
        .await
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("variable port has no default"), "{msg}");
        assert!(msg.contains("userinput.json"), "{msg}");
    }

    #[tokio::test]
    async fn configured_variable_passes_with_wildcard_org() {
        let (_dir, project) = project(vec![range("svc-a", "1.0.0")]);
        project
            .store()
            .store_definition(&with_variable(definition("svc-a", "1.0.0"), "port"))
            .unwrap();
        let mut variables = Map::new();
        variables.insert("port".into(), json!(8080));
        let inputs = UserInputFile {
            global: vec![],
            services: vec![ServiceVariables {
                org: String::new(),
                url: "svc-a".into(),
                version_range: String::new(),
                variables,
            }],
        };
        run(
            &project,
            inputs,
            &ValidationOptions::default(),
            &FakeRegistry::default(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn all_failures_are_reported_together() {
        let (_dir, project) = project(vec![range("svc-a", "1.0.0"), range("svc-b", "1.0.0")]);
        project
            .store()
            .store_definition(&with_variable(definition("svc-a", "1.0.0"), "port"))
            .unwrap();

        let err = run(
            &project,
            UserInputFile::default(),
            &ValidationOptions::default(),
            &FakeRegistry::default(),
        )
        .await
        .unwrap_err();
        match err {
            EdepError::Multiple(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected aggregate error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn auto_fetch_fills_the_gap() {
        let (_dir, project) = project(vec![range("svc-a", "[1.0.0,2.0.0)")]);
        let registry =
            FakeRegistry::with(&[definition("svc-a", "1.4.0"), definition("svc-a", "2.0.0")]);
        let options = ValidationOptions {
            auto_fetch: true,
            ..Default::default()
        };

        let report = run(&project, UserInputFile::default(), &options, &registry)
            .await
            .unwrap();
        assert_eq!(report.fetched, vec!["svc-a".to_string()]);
        assert_eq!(
            report.resolved_file("svc-a"),
            Some("org1_svc-a_1.4.0.service.definition.json")
        );
    }

    #[tokio::test]
    async fn auto_fetched_variables_need_values() {
        let (_dir, project) = project(vec![range("svc-a", "1.0.0")]);
        let registry = FakeRegistry::with(&[with_variable(definition("svc-a", "1.0.0"), "port")]);
        let options = ValidationOptions {
            auto_fetch: true,
            ..Default::default()
        };

        // The fetch writes a skeleton entry, so the variable is present
        // (empty) after the user inputs are re-read.
        run(&project, UserInputFile::default(), &options, &registry)
            .await
            .unwrap();
        let inputs = project.read_user_inputs(false).unwrap();
        assert_eq!(inputs.services[0].variables["port"], json!(""));
    }
}
