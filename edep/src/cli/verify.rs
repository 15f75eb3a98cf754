// edep/src/cli/verify.rs
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use edep_common::config::Config;
use edep_common::error::Result;
use edep_core::{validate_project, Fetcher, Project, ValidationOptions};
use edep_net::{DockerCliFetcher, RegistryClient};
use tracing::{debug, instrument};

#[derive(Args, Debug)]
pub struct Verify {
    /// Fetch dependencies missing from the project instead of failing
    #[arg(long)]
    pub auto_fetch: bool,

    /// Registry credentials as user:password
    #[arg(short = 'u', long = "user-pw")]
    pub credentials: Option<String>,

    /// Public key files used to verify fetched images
    #[arg(short = 'k', long = "public-key-file")]
    pub keys: Vec<PathBuf>,

    /// User input file to check variables against
    #[arg(short = 'f', long = "user-input-file")]
    pub user_input_file: Option<PathBuf>,
}

impl Verify {
    #[instrument(skip_all, fields(auto_fetch = self.auto_fetch))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let project = Project::open(&config.project_dir)?;
        let user_inputs = project.read_user_inputs_from(self.user_input_file.as_deref(), true)?;
        let options = ValidationOptions {
            auto_fetch: self.auto_fetch,
            credentials: self.credentials.clone(),
            signing_keys: self.keys.clone(),
            user_input_path: self.user_input_file.clone(),
        };

        let registry = RegistryClient::new(config)?;
        let images = DockerCliFetcher::default();
        let fetcher = Fetcher::new(config, &registry, &images);
        let report = validate_project(&project, user_inputs, &options, &fetcher).await?;

        for url in &report.fetched {
            println!("{} Fetched missing dependency {}", "✓".green(), url.cyan());
        }
        for (rs, file) in &report.resolved {
            debug!("{} {} resolved to {}", rs.url, rs.range_expression(), file);
        }
        println!(
            "{} Project {} verified",
            "✓".green(),
            project.root().display().to_string().bold()
        );
        Ok(())
    }
}
