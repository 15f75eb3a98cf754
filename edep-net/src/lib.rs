// edep-net/src/lib.rs
pub mod images;
pub mod registry;
pub mod validation;

pub use images::{DockerCliFetcher, ImageFetcher};
pub use registry::{Registry, RegistryClient, ServiceQuery};
pub use validation::validate_url;
