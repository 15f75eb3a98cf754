// edep-core/src/remove.rs
use edep_common::error::{EdepError, Result};
use edep_common::model::{RequiredService, ServiceSpec};
use tracing::{debug, info, warn};

use crate::graph::{build_graph, ServiceDependency};
use crate::project::Project;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedDependency {
    pub service: ServiceSpec,
    pub file_name: String,
    /// False when the record was only pulled in by another dependency.
    pub top_level: bool,
}

/// Outcome of a removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    /// Records deleted together with their configuration.
    pub removed: Vec<RemovedDependency>,
    /// Dropped from the project's required services only; still needed by
    /// another dependency.
    pub detached: Vec<ServiceSpec>,
    /// Left untouched because other dependencies still require them. A
    /// removal that only retains is a no-op, not a failure.
    pub retained: Vec<String>,
}

/// True when the top reference `top` (a required-service declaration,
/// version holding a range) stands for `target`.
fn reference_matches(top: &ServiceSpec, target: &ServiceSpec) -> bool {
    if top.matches(target) {
        return true;
    }
    RequiredService::new(&top.reference, &top.org, &top.version, &top.arch)
        .is_satisfied_by(target)
        .unwrap_or(false)
}

/// True when `node` is itself the dependency being removed rather than
/// something it pulled in.
fn is_target(node: &ServiceDependency, target: &ServiceSpec) -> bool {
    node.service.matches(target)
        || node
            .top_references
            .iter()
            .filter(|top| reference_matches(top, target))
            .any(|top| reference_matches(top, &node.service))
}

fn is_top_level(node: &ServiceDependency) -> bool {
    node.top_references
        .first()
        .is_some_and(|top| reference_matches(top, &node.service))
}

/// Deletes the record, its required-service entry and its variables.
/// Failures are collected so the other parts are still cleaned up.
fn remove_fully(project: &Project, node: &ServiceDependency, errors: &mut Vec<EdepError>) {
    if let Err(e) = project.remove_service_dependency(&node.service) {
        errors.push(EdepError::Validation(format!(
            "error updating project definition: {e}"
        )));
    }
    if let Err(e) = project.store().delete_dependency_record(&node.file_name) {
        errors.push(EdepError::IoError(format!(
            "dependency {} could not be removed: {e}",
            node.file_name
        )));
    }
    if let Err(e) = project.remove_configured_variables(&node.service) {
        errors.push(EdepError::Validation(format!("error updating userinputs: {e}")));
    }
}

/// Removes `target` from the project, together with whichever of its own
/// dependencies no other direct dependency still needs.
///
/// A record referenced by a single direct dependency is deleted. A record
/// several direct dependencies share is kept; if it is the target itself its
/// required-service entry is dropped.
pub fn remove_dependency(project: &Project, target: &ServiceSpec) -> Result<RemovalReport> {
    let nodes = build_graph(project)?;
    debug!("All dependencies: {:?}", nodes);

    let matching: Vec<&ServiceDependency> = nodes
        .iter()
        .filter(|n| n.top_references.iter().any(|t| reference_matches(t, target)))
        .collect();

    let mut report = RemovalReport::default();
    if matching.is_empty() {
        // Pulled in by several other dependencies: nothing to remove.
        report.retained = nodes
            .iter()
            .filter(|n| n.is_shared() && n.service.matches(target))
            .map(|n| {
                warn!(
                    "Will not remove dependency {} because it is referenced by other services",
                    n.file_name
                );
                n.file_name.clone()
            })
            .collect();
        if report.retained.is_empty() {
            return Err(EdepError::NotFound(format!(
                "dependency {} not found",
                target.describe()
            )));
        }
        return Ok(report);
    }

    let mut errors = Vec::new();
    for node in matching {
        debug!("Found dependency: {}", node.file_name);
        if !node.is_shared() {
            remove_fully(project, node, &mut errors);
            report.removed.push(RemovedDependency {
                service: node.service.clone(),
                file_name: node.file_name.clone(),
                top_level: is_top_level(node),
            });
        } else if is_target(node, target) {
            info!(
                "{} is still required by other dependencies; only dropping it from the project definition",
                node.file_name
            );
            if let Err(e) = project.remove_service_dependency(&node.service) {
                errors.push(e);
            }
            report.detached.push(node.service.clone());
        } else {
            warn!(
                "Will not remove dependency {} because it is referenced by other services",
                node.file_name
            );
            report.retained.push(node.file_name.clone());
        }
    }

    EdepError::from_collected(errors)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use edep_common::model::ServiceDefinition;

    use super::*;
    use crate::testutil::{definition, project, requiring, with_variable};

    fn top(url: &str) -> RequiredService {
        RequiredService::new(url, "org1", "1.0.0", "amd64")
    }

    fn target(url: &str) -> ServiceSpec {
        ServiceSpec::new(url, "org1", "", "")
    }

    fn store_all(project: &Project, defs: Vec<ServiceDefinition>) {
        for def in defs {
            project.store().store_definition(&def).unwrap();
        }
    }

    fn stored_urls(project: &Project) -> Vec<String> {
        project
            .store()
            .load_all()
            .unwrap()
            .into_iter()
            .map(|(_, d)| d.url)
            .collect()
    }

    fn declared_urls(project: &Project) -> Vec<String> {
        project
            .read_definition(false)
            .unwrap()
            .required_services
            .into_iter()
            .map(|rs| rs.url)
            .collect()
    }

    #[test]
    fn single_reference_is_deleted_with_its_configuration() {
        let (_dir, project) = project(vec![top("svc-a")]);
        let dep = with_variable(definition("svc-a", "1.0.0"), "port");
        store_all(&project, vec![dep.clone()]);
        project.add_skeleton_variables(&dep).unwrap();

        let report = remove_dependency(&project, &target("svc-a")).unwrap();
        assert_eq!(report.removed.len(), 1);
        assert!(report.removed[0].top_level);
        assert!(stored_urls(&project).is_empty());
        assert!(declared_urls(&project).is_empty());
        assert!(project.read_user_inputs(false).unwrap().services.is_empty());
    }

    #[test]
    fn unknown_target_is_not_found() {
        let (_dir, project) = project(vec![top("svc-a")]);
        store_all(&project, vec![definition("svc-a", "1.0.0")]);
        let err = remove_dependency(&project, &target("svc-z")).unwrap_err();
        assert!(matches!(err, EdepError::NotFound(_)));
    }

    #[test]
    fn shared_transitive_dependency_survives_until_last_reference_goes() {
        let (_dir, project) = project(vec![top("svc-a"), top("svc-b")]);
        store_all(
            &project,
            vec![
                requiring(definition("svc-a", "1.0.0"), &["svc-c"]),
                requiring(definition("svc-b", "1.0.0"), &["svc-c"]),
                definition("svc-c", "1.0.0"),
            ],
        );

        let report = remove_dependency(&project, &target("svc-a")).unwrap();
        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.removed[0].service.reference, "svc-a");
        assert_eq!(
            report.retained,
            vec!["org1_svc-c_1.0.0.service.definition.json".to_string()]
        );
        assert_eq!(stored_urls(&project), vec!["svc-b", "svc-c"]);
        assert_eq!(declared_urls(&project), vec!["svc-b"]);

        let nodes = build_graph(&project).unwrap();
        let c = nodes.iter().find(|n| n.service.reference == "svc-c").unwrap();
        assert_eq!(c.top_references.len(), 1);
        assert_eq!(c.top_references[0].reference, "svc-b");

        let report = remove_dependency(&project, &target("svc-b")).unwrap();
        assert_eq!(report.removed.len(), 2);
        let c = report
            .removed
            .iter()
            .find(|r| r.service.reference == "svc-c")
            .unwrap();
        assert!(!c.top_level);
        assert!(stored_urls(&project).is_empty());
        assert!(declared_urls(&project).is_empty());
    }

    #[test]
    fn shared_transitive_target_is_retained_untouched() {
        let (_dir, project) = project(vec![top("svc-a"), top("svc-b")]);
        store_all(
            &project,
            vec![
                requiring(definition("svc-a", "1.0.0"), &["svc-c"]),
                requiring(definition("svc-b", "1.0.0"), &["svc-c"]),
                definition("svc-c", "1.0.0"),
            ],
        );
        let before = stored_urls(&project);

        let report = remove_dependency(&project, &target("svc-c")).unwrap();
        assert!(report.removed.is_empty());
        assert!(report.detached.is_empty());
        assert_eq!(
            report.retained,
            vec!["org1_svc-c_1.0.0.service.definition.json".to_string()]
        );
        assert_eq!(stored_urls(&project), before);
        assert_eq!(declared_urls(&project), vec!["svc-a", "svc-b"]);
    }

    #[test]
    fn unshared_transitive_target_is_not_found() {
        let (_dir, project) = project(vec![top("svc-a")]);
        store_all(
            &project,
            vec![
                requiring(definition("svc-a", "1.0.0"), &["svc-c"]),
                definition("svc-c", "1.0.0"),
            ],
        );

        let err = remove_dependency(&project, &target("svc-c")).unwrap_err();
        assert!(matches!(err, EdepError::NotFound(_)));
        assert_eq!(stored_urls(&project), vec!["svc-a", "svc-c"]);
        assert_eq!(declared_urls(&project), vec!["svc-a"]);
    }

    #[test]
    fn direct_dependency_also_required_elsewhere_is_only_detached() {
        let (_dir, project) = project(vec![top("svc-a"), top("svc-c")]);
        let c = with_variable(definition("svc-c", "1.0.0"), "port");
        store_all(
            &project,
            vec![requiring(definition("svc-a", "1.0.0"), &["svc-c"]), c.clone()],
        );
        project.add_skeleton_variables(&c).unwrap();

        let report = remove_dependency(&project, &target("svc-c")).unwrap();
        assert!(report.removed.is_empty());
        assert_eq!(report.detached.len(), 1);
        assert_eq!(stored_urls(&project), vec!["svc-a", "svc-c"]);
        assert_eq!(declared_urls(&project), vec!["svc-a"]);
        assert_eq!(project.read_user_inputs(false).unwrap().services.len(), 1);
    }

    #[test]
    fn versioned_target_matches_a_range_declaration() {
        let (_dir, project) = project(vec![RequiredService::new(
            "svc-a",
            "org1",
            "[1.0.0,2.0.0)",
            "amd64",
        )]);
        store_all(&project, vec![definition("svc-a", "1.5.0")]);
        let report =
            remove_dependency(&project, &ServiceSpec::new("svc-a", "org1", "1.5.0", "")).unwrap();
        assert_eq!(report.removed.len(), 1);
        assert!(stored_urls(&project).is_empty());
    }
}
