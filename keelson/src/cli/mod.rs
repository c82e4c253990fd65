//! The `keelson` crate provides a Command Line Interface (CLI) that stands up
//! a managed Kubernetes cluster end to end.
//!
//! It orchestrates the cloud-resource, cluster-lifecycle and cluster-API
//! CLIs to create the network, control plane, node group, per-environment
//! namespaces, secrets and deployments, IAM roles and security groups
//! described by a single configuration file.
//!
//! # Examples
//!
//! ```bash
//! # Print the commands a run would execute, without touching anything
//! keelson plan
//!
//! # Provision everything described by the configuration file
//! keelson provision
//!
//! # Provision under a different cluster name
//! keelson provision --cluster-name staging-cluster
//! ```

pub mod error;
mod plan;
mod provision;

use std::{io::Write, path::PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use futures::FutureExt;
use keelson_base::{CLI_PROGRAM_NAME, consts::programs};
use snafu::ResultExt;
use tokio::runtime::Runtime;

pub use self::error::Error;
use self::{plan::PlanCommand, provision::ProvisionCommand};
use crate::{
    config::Config,
    provisioner::{CommandRunner, Invocation, ProcessRunner},
    shadow,
};

/// `Cli` is the main entry point for the Keelson Command Line Interface.
///
/// It parses command-line arguments and dispatches to appropriate
/// subcommands for cluster provisioning.
#[derive(Parser)]
#[command(
    name = CLI_PROGRAM_NAME,
    author,
    version,
    long_version = shadow::CLAP_LONG_VERSION,
    about = "Keelson CLI: provision a managed Kubernetes cluster from a single configuration file.",
    long_about = "Keelson is a Rust-based Command Line Interface (CLI) tool that provisions a \
                  managed Kubernetes cluster end to end. It drives the cloud-resource, \
                  cluster-lifecycle and cluster-API CLIs to create the network, control plane, \
                  node group, per-environment namespaces, secrets and deployments, IAM roles \
                  and security groups described by a configuration file.",
    color = clap::ColorChoice::Always
)]
pub struct Cli {
    /// The subcommand to execute.
    #[clap(subcommand)]
    commands: Option<Commands>,

    /// Path to the configuration file.
    ///
    /// Defaults to `~/.config/keelson/config.yaml` or the path specified by
    /// the `KEELSON_CONFIG_FILE_PATH` environment variable.
    #[clap(
        long = "config",
        short = 'c',
        env = "KEELSON_CONFIG_FILE_PATH",
        help = "Specify a configuration file. Defaults to ~/.config/keelson/config.yaml or \
                KEELSON_CONFIG_FILE_PATH env var."
    )]
    config_file: Option<PathBuf>,

    /// Sets the logging level for the application.
    #[clap(
        long = "log-level",
        env = "KEELSON_LOG_LEVEL",
        help = "Set the logging level (e.g., info, debug, trace)."
    )]
    log_level: Option<tracing::Level>,
}

/// `Commands` enumerates the available subcommands for the Keelson CLI.
#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Displays client version information and the versions of the external
    /// CLIs it drives.
    #[command(about = "Display client version and the versions of the external CLIs")]
    Version {
        /// If true, shows only the client version and does not probe the
        /// external CLIs.
        #[clap(long = "client", help = "If true, shows client version only (no probing).")]
        client: bool,
    },

    /// Generates a shell completion script for the specified shell.
    #[command(about = "Generate shell completion script for the specified shell (bash, zsh, fish)")]
    Completions { shell: clap_complete::Shell },

    /// Outputs the default configuration in YAML format to standard output.
    #[command(about = "Output the default configuration in YAML format")]
    DefaultConfig,

    /// Provisions the cluster, its networking, IAM roles, security groups
    /// and per-environment objects.
    #[command(
        alias = "p",
        about = "Provision the cluster, networking, IAM roles, security groups and environments"
    )]
    Provision(ProvisionCommand),

    /// Prints the command sequence a provisioning run would execute.
    #[command(
        aliases = ["dry-run"],
        about = "Print the command sequence a provisioning run would execute"
    )]
    Plan(PlanCommand),
}

impl Default for Cli {
    /// Creates a new `Cli` instance by parsing command-line arguments.
    fn default() -> Self { Self::parse() }
}

impl Cli {
    /// Loads the application configuration, applying any overrides from CLI
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns an `Error` if the configuration file cannot be loaded or
    /// parsed.
    fn load_config(&self) -> Result<Config, Error> {
        let mut config =
            Config::load(self.config_file.clone().unwrap_or_else(Config::search_config_file_path))?;

        if let Some(log_level) = self.log_level {
            config.log.level = log_level;
        }

        Ok(config)
    }

    /// Executes the main logic of the CLI application based on the parsed
    /// command and arguments.
    ///
    /// # Returns
    ///
    /// A `Result` indicating the exit code (0 for success, non-zero for
    /// error) on success, or an `Error` if an unrecoverable issue occurs
    /// during execution.
    ///
    /// # Errors
    ///
    /// Returns an `Error` if configuration loading fails, the Tokio runtime
    /// cannot be initialized, or any subcommand's `run` method returns an
    /// error.
    ///
    /// # Panics
    ///
    /// - This method `expect`s on `std::io::stdout().write_all()` operations.
    ///   In a typical CLI environment, writing to `stdout` or `stderr` is
    ///   expected to succeed.
    pub fn run(self) -> Result<i32, Error> {
        let client_version = Self::command().get_version().unwrap_or_default().to_string();
        match self.commands {
            Some(Commands::Version { client }) if client => {
                std::io::stdout()
                    .write_all(Self::command().render_long_version().as_bytes())
                    .expect("Failed to write to stdout");
                std::io::stdout()
                    .write_all(format!("Client Version: {client_version}\n").as_bytes())
                    .expect("Failed to write to stdout");

                return Ok(0);
            }
            Some(Commands::Completions { shell }) => {
                let mut app = Self::command();
                let bin_name = app.get_name().to_string();
                clap_complete::generate(shell, &mut app, bin_name, &mut std::io::stdout());
                return Ok(0);
            }
            Some(Commands::DefaultConfig) => {
                std::io::stdout()
                    .write_all(Config::template_basic().as_slice())
                    .expect("Failed to write to stdout");
                return Ok(0);
            }
            _ => {}
        }

        let config = self.load_config()?;
        config.log.registry();

        let fut = async move {
            match self.commands {
                Some(Commands::Version { .. }) => {
                    let mut report = format!("Client Version: {client_version}\n");
                    for (program, args) in [
                        (programs::AWS, vec!["--version"]),
                        (programs::EKSCTL, vec!["version"]),
                        (programs::KUBECTL, vec!["version", "--client"]),
                    ] {
                        let version =
                            ProcessRunner.run(Invocation::new(program, args)).await.map_or_else(
                                |_| "unknown".to_string(),
                                |output| {
                                    output.lines().next().unwrap_or("unknown").to_string()
                                },
                            );
                        report.push_str(&format!("{program}: {version}\n"));
                    }

                    std::io::stdout()
                        .write_all(Self::command().render_long_version().as_bytes())
                        .expect("Failed to write to stdout");
                    std::io::stdout()
                        .write_all(report.as_bytes())
                        .expect("Failed to write to stdout");

                    return Ok(0);
                }
                Some(Commands::Provision(cmd)) => cmd.run(config).boxed().await?,
                Some(Commands::Plan(cmd)) => cmd.run(config).await?,
                _ => {
                    let help = Self::command().render_long_help().ansi().to_string();
                    std::io::stderr()
                        .write_all(help.as_bytes())
                        .expect("Failed to write to stderr");
                    return Ok(-1);
                }
            }

            Ok(0)
        };

        Runtime::new().context(error::InitializeTokioRuntimeSnafu)?.block_on(fut)
    }
}
