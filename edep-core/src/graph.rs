// edep-core/src/graph.rs
//! In-memory view of which of the project's direct dependencies pull in each
//! stored dependency record.
use std::collections::HashSet;

use edep_common::error::{EdepError, Result};
use edep_common::model::{RequiredService, ServiceDefinition, ServiceFile, ServiceSpec};
use serde::Serialize;
use tracing::{debug, trace};

use crate::project::Project;

/// One stored dependency together with the project's direct dependencies
/// that require it, directly or transitively.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDependency {
    pub service: ServiceSpec,
    pub top_references: Vec<ServiceSpec>,
    pub file_name: String,
}

impl ServiceDependency {
    pub fn new(service: ServiceSpec, top: ServiceSpec, file_name: impl Into<String>) -> Self {
        Self {
            service,
            top_references: vec![top],
            file_name: file_name.into(),
        }
    }

    /// Records another top reference unless an equivalent one is already
    /// present.
    pub fn add_top_reference(&mut self, top: ServiceSpec) {
        if !self.top_references.iter().any(|t| t.matches(&top)) {
            self.top_references.push(top);
        }
    }

    pub fn is_shared(&self) -> bool {
        self.top_references.len() > 1
    }
}

type WalkKey = (String, String, String);

fn walk_key(def: &ServiceDefinition) -> WalkKey {
    (def.org.clone(), def.url.clone(), def.version.clone())
}

struct GraphWalk<'a> {
    records: &'a [(String, ServiceDefinition)],
    nodes: Vec<ServiceDependency>,
    in_progress: HashSet<WalkKey>,
}

impl GraphWalk<'_> {
    fn visit(&mut self, top: &ServiceSpec, search: &RequiredService) -> Result<()> {
        trace!("Looking for {} under top reference {}", search.spec(), top);
        for (file_name, dep) in self.records {
            let resolved = dep.spec();
            if !search.is_satisfied_by(&resolved)? {
                continue;
            }

            match self.nodes.iter_mut().find(|n| n.service.matches(&resolved)) {
                Some(node) => node.add_top_reference(top.clone()),
                None => self
                    .nodes
                    .push(ServiceDependency::new(resolved, top.clone(), file_name)),
            }

            let key = walk_key(dep);
            if !self.in_progress.insert(key) {
                return Err(EdepError::Validation(format!(
                    "dependency cycle detected at {} version {}",
                    dep.url, dep.version
                )));
            }
            for child in &dep.required_services {
                self.visit(top, child)?;
            }
            self.in_progress.remove(&walk_key(dep));
        }
        Ok(())
    }
}

/// Builds the dependency graph from the given declarations and store
/// records. Each declaration is its own top reference.
pub fn build_graph_from(
    declarations: &[RequiredService],
    records: &[(String, ServiceDefinition)],
) -> Result<Vec<ServiceDependency>> {
    let mut walk = GraphWalk {
        records,
        nodes: Vec::new(),
        in_progress: HashSet::new(),
    };
    let mut tops: Vec<ServiceSpec> = Vec::new();
    for rs in declarations {
        let top = rs.spec();
        if tops.iter().any(|t| t.matches(&top)) {
            continue;
        }
        tops.push(top.clone());
        walk.visit(&top, rs)?;
    }
    debug!(
        "Dependency graph has {} node(s) under {} top reference(s)",
        walk.nodes.len(),
        tops.len()
    );
    Ok(walk.nodes)
}

/// Builds the graph for the project's own required services against its
/// dependency store.
pub fn build_graph(project: &Project) -> Result<Vec<ServiceDependency>> {
    let def = project.read_definition(true)?;
    let records = project.store().load_all()?;
    build_graph_from(&def.required_services, &records)
}

/// A stored dependency as shown by `dependency list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedDependency {
    pub file_name: String,
    pub required_by: Vec<ServiceSpec>,
    pub definition: ServiceDefinition,
}

/// Stored dependencies reachable from the project's declarations, in store
/// order.
pub fn list_dependencies(project: &Project) -> Result<Vec<ListedDependency>> {
    let def = project.read_definition(true)?;
    let records = project.store().load_all()?;
    let nodes = build_graph_from(&def.required_services, &records)?;
    let listed = records
        .into_iter()
        .filter_map(|(file_name, definition)| {
            let node = nodes.iter().find(|n| n.file_name == file_name)?;
            Some(ListedDependency {
                required_by: node.top_references.clone(),
                file_name,
                definition,
            })
        })
        .collect();
    Ok(listed)
}
