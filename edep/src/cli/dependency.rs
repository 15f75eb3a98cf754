// edep/src/cli/dependency.rs
use std::path::PathBuf;

use clap::{ArgGroup, Args, Subcommand};
use colored::Colorize;
use edep_common::config::Config;
use edep_common::error::Result;
use edep_common::model::{ServiceFile, ServiceSpec};
use edep_core::{
    list_dependencies, remove_dependency, FetchSource, Fetcher, Project, RemoteSource,
};
use edep_net::{DockerCliFetcher, RegistryClient};
use tracing::{debug, instrument};

#[derive(Subcommand, Debug)]
pub enum DependencyCommand {
    /// Add a dependency and everything it requires to the project
    Fetch(Fetch),
    /// Show the dependencies stored in the project
    List(List),
    /// Remove a dependency and whatever only it needed
    Remove(Remove),
}

impl DependencyCommand {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Fetch(command) => command.run(config).await,
            Self::List(command) => command.run(config),
            Self::Remove(command) => command.run(config),
        }
    }
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["project", "url"])))]
pub struct Fetch {
    /// Another service project to take the dependency from
    #[arg(short = 'p', long)]
    pub project: Option<PathBuf>,

    /// URL of the service to look up in the registry
    #[arg(long, requires = "org")]
    pub url: Option<String>,

    /// Organization that published the service
    #[arg(short = 'o', long, requires = "url")]
    pub org: Option<String>,

    /// Exact version to fetch. The newest version is used when omitted.
    #[arg(long, requires = "url")]
    pub ver: Option<String>,

    /// Architecture to fetch. Defaults to HZN_ARCH or the host architecture.
    #[arg(short = 'a', long, requires = "url")]
    pub arch: Option<String>,

    /// Registry credentials as user:password
    #[arg(short = 'u', long = "user-pw")]
    pub credentials: Option<String>,

    /// Public key files used to verify images
    #[arg(short = 'k', long = "public-key-file")]
    pub keys: Vec<PathBuf>,

    /// User input file of the project named by --project
    #[arg(short = 'f', long = "user-input-file", requires = "project")]
    pub user_input_file: Option<PathBuf>,
}

impl Fetch {
    fn source(&self) -> FetchSource {
        match &self.project {
            Some(path) => FetchSource::Local {
                path: path.clone(),
                user_input_path: self.user_input_file.clone(),
            },
            None => FetchSource::Remote(RemoteSource {
                url: self.url.clone().unwrap_or_default(),
                org: self.org.clone().unwrap_or_default(),
                version: self.ver.clone(),
                version_range: None,
                arch: self.arch.clone(),
                credentials: self.credentials.clone(),
                signing_keys: self.keys.clone(),
            }),
        }
    }

    #[instrument(skip_all, fields(url = ?self.url, project = ?self.project))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let project = Project::open(&config.project_dir)?;
        let registry = RegistryClient::new(config)?;
        let images = DockerCliFetcher::default();
        let fetcher = Fetcher::new(config, &registry, &images);

        let fetched = fetcher.fetch(&project, &self.source()).await?;
        println!(
            "{} New dependency created: {}",
            "✓".green(),
            fetched.spec().describe().cyan()
        );
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct List {}

impl List {
    #[instrument(skip_all)]
    pub fn run(&self, config: &Config) -> Result<()> {
        let project = Project::open(&config.project_dir)?;
        let listed = list_dependencies(&project)?;
        debug!("{} dependencies listed", listed.len());
        println!("{}", serde_json::to_string_pretty(&listed)?);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct Remove {
    /// URL of the dependency to remove
    #[arg(long, required = true)]
    pub url: String,

    /// Organization of the dependency; any when omitted
    #[arg(short = 'o', long)]
    pub org: Option<String>,

    /// Version of the dependency; any when omitted
    #[arg(long)]
    pub ver: Option<String>,

    /// Architecture of the dependency; any when omitted
    #[arg(short = 'a', long)]
    pub arch: Option<String>,
}

impl Remove {
    fn target(&self) -> ServiceSpec {
        ServiceSpec::new(
            &self.url,
            self.org.clone().unwrap_or_default(),
            self.ver.clone().unwrap_or_default(),
            self.arch.clone().unwrap_or_default(),
        )
    }

    #[instrument(skip_all, fields(url = %self.url))]
    pub fn run(&self, config: &Config) -> Result<()> {
        let project = Project::open(&config.project_dir)?;
        let report = remove_dependency(&project, &self.target())?;

        for removed in &report.removed {
            let what = if removed.top_level {
                "Removed dependency"
            } else {
                "Removed dependency's dependency"
            };
            println!("{} {} {}", "✓".green(), what, removed.service.describe().cyan());
        }
        for detached in &report.detached {
            println!(
                "{} Removed {} from the required services; other dependencies still use it",
                "✓".green(),
                detached.describe().cyan()
            );
        }
        for retained in &report.retained {
            println!(
                "{} Will not remove dependency {} because it is referenced by other services.",
                "!".yellow(),
                retained
            );
        }
        Ok(())
    }
}
