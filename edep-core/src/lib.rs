// edep-core/src/lib.rs

// Dependency resolution and lifecycle for service projects
pub mod fetch;
pub mod graph;
pub mod project;
pub mod remove;
pub mod store;
pub mod validate;

#[cfg(test)]
mod testutil;

// Re-export key types for the CLI crate
pub use fetch::{FetchSource, Fetcher, RemoteSource};
pub use graph::{build_graph, list_dependencies, ListedDependency, ServiceDependency};
pub use project::Project;
pub use remove::{remove_dependency, RemovalReport, RemovedDependency};
pub use store::{dependency_file_name, sanitize_reference, DependencyStore};
pub use validate::{validate_project, ValidationOptions, ValidationReport};
