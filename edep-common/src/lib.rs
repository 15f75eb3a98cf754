// edep-common/src/lib.rs
pub mod config;
pub mod error;
pub mod model;
pub mod version;

// Re-export key types
pub use config::{Config, ProjectLayout};
pub use error::{EdepError, ErrorKind, Result};
pub use model::{ServiceDefinition, ServiceSpec, UserInputFile};
