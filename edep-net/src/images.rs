// edep-net/src/images.rs
use std::path::PathBuf;

use edep_aio::process::{run_command_async, stderr_text};
use edep_common::error::{EdepError, Result};
use edep_common::model::container::ContainerConfig;
use edep_common::model::registry::ImageDockerAuth;
use edep_common::model::userinput::UserInputFile;
use tracing::{debug, info, warn};

/// Makes a service's container images available locally.
#[allow(async_fn_in_trait)]
pub trait ImageFetcher {
    async fn fetch_images(
        &self,
        config: &ContainerConfig,
        signing_keys: &[PathBuf],
        user_inputs: &UserInputFile,
    ) -> Result<()>;
}

/// Pulls images with the `docker` command line client, logging in to any
/// image registry the service carries credentials for.
#[derive(Debug, Clone)]
pub struct DockerCliFetcher {
    program: String,
}

impl Default for DockerCliFetcher {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }
}

impl DockerCliFetcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn login(&self, auth: &ImageDockerAuth) -> Result<()> {
        let username = if auth.username.is_empty() {
            "token"
        } else {
            auth.username.as_str()
        };
        let args = vec![
            "login".to_string(),
            "--username".to_string(),
            username.to_string(),
            "--password-stdin".to_string(),
            auth.registry.clone(),
        ];
        let output = run_command_async(&self.program, &args, Some(&auth.token)).await?;
        if !output.status.success() {
            return Err(EdepError::Fetch(format!(
                "docker login to {} failed: {}",
                auth.registry,
                stderr_text(&output)
            )));
        }
        Ok(())
    }

    async fn pull(&self, image: &str) -> Result<()> {
        info!("Pulling image {}", image);
        let args = vec!["pull".to_string(), image.to_string()];
        let output = run_command_async(&self.program, &args, None).await?;
        if !output.status.success() {
            return Err(EdepError::Fetch(format!(
                "unable to pull image {image}: {}",
                stderr_text(&output)
            )));
        }
        Ok(())
    }
}

/// Host part of an image reference when it names a registry.
fn image_registry(image: &str) -> Option<&str> {
    let (first, _) = image.split_once('/')?;
    (first.contains('.') || first.contains(':') || first == "localhost").then_some(first)
}

/// Credentials to log in with before pulling `images`. Auths configured in
/// the user inputs replace the registry's own for the same image registry.
fn login_auths(
    config: &ContainerConfig,
    user_inputs: &UserInputFile,
    images: &[String],
) -> Vec<ImageDockerAuth> {
    let mut auths = user_inputs.registry_auths(&config.service_url, &config.service_org);
    for auth in &config.image_auths {
        if !auths.iter().any(|a| a.registry == auth.registry) {
            auths.push(auth.clone());
        }
    }
    auths.retain(|auth| {
        images
            .iter()
            .any(|image| image_registry(image) == Some(auth.registry.as_str()))
    });
    auths
}

impl ImageFetcher for DockerCliFetcher {
    async fn fetch_images(
        &self,
        config: &ContainerConfig,
        signing_keys: &[PathBuf],
        user_inputs: &UserInputFile,
    ) -> Result<()> {
        let images = config.images();
        if images.is_empty() {
            debug!("Deployment names no images; nothing to pull");
            return Ok(());
        }
        if let Some(server) = &config.image_server_url {
            debug!(
                "Image server {} configured (signature {}); pulling from docker registries",
                server,
                if config.image_server_signature.is_empty() { "absent" } else { "present" }
            );
        }
        if config.deployment_signature.is_empty() {
            warn!("Deployment is unsigned; pulling images without signature check");
        } else {
            debug!(
                "Deployment signature present, {} signing key(s) supplied",
                signing_keys.len()
            );
        }

        for auth in login_auths(config, user_inputs, &images) {
            self.login(&auth).await?;
        }
        for image in &images {
            self.pull(image).await?;
        }
        Ok(())
    }
}
