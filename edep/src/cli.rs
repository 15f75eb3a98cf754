// edep/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use edep_common::config::Config;
use edep_common::error::Result;

pub mod dependency;
pub mod verify;

use crate::cli::dependency::DependencyCommand;
use crate::cli::verify::Verify;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "edep", bin_name = "edep")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Service project directory. Defaults to HZN_DEVTOOL_PROJECT or the
    /// current directory.
    #[arg(short = 'd', long = "directory", global = true)]
    pub directory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the project's service dependencies
    #[command(subcommand)]
    Dependency(DependencyCommand),
    /// Check that every dependency is present and configured
    Verify(Verify),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Dependency(command) => command.run(config).await,
            Self::Verify(command) => command.run(config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::cli::dependency::DependencyCommand;

    #[test]
    fn argument_definitions_are_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn fetch_needs_a_source() {
        assert!(CliArgs::try_parse_from(["edep", "dependency", "fetch"]).is_err());
    }

    #[test]
    fn fetch_sources_are_exclusive() {
        let parsed = CliArgs::try_parse_from([
            "edep", "dependency", "fetch", "--project", "../other", "--url", "svc-a",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn remote_fetch_requires_an_org() {
        assert!(CliArgs::try_parse_from(["edep", "dependency", "fetch", "--url", "svc-a"]).is_err());
        let args = CliArgs::try_parse_from([
            "edep", "-d", "/work/p", "dependency", "fetch", "--url", "svc-a", "--org", "org1",
            "--ver", "1.2.0", "-k", "a.pem", "-k", "b.pem",
        ])
        .unwrap();
        assert_eq!(args.directory, Some(PathBuf::from("/work/p")));
        match args.command {
            Command::Dependency(DependencyCommand::Fetch(fetch)) => {
                assert_eq!(fetch.url.as_deref(), Some("svc-a"));
                assert_eq!(fetch.ver.as_deref(), Some("1.2.0"));
                assert_eq!(fetch.keys.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn remove_requires_a_url() {
        assert!(CliArgs::try_parse_from(["edep", "dependency", "remove"]).is_err());
        assert!(CliArgs::try_parse_from(["edep", "dependency", "remove", "--url", "svc-a"]).is_ok());
    }

    #[test]
    fn verbosity_counts_and_is_global() {
        let args = CliArgs::try_parse_from(["edep", "verify", "-vv", "--auto-fetch"]).unwrap();
        assert_eq!(args.verbose, 2);
    }
}
