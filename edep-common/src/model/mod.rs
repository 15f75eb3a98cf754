// edep-common/src/model/mod.rs
// Declares the modules within the model directory.

pub mod container;
pub mod registry;
pub mod service;
pub mod spec;
pub mod userinput;

// Re-export
pub use container::ContainerConfig;
pub use registry::{ImageDockerAuth, RegistryService, RegistryServices};
pub use service::{
    ImageStore, MicroserviceDefinition, RequiredService, ServiceDefinition, ServiceFile,
    UserInput,
};
pub use spec::ServiceSpec;
pub use userinput::{GlobalServiceSpec, GlobalSet, ServiceVariables, UserInputFile};
