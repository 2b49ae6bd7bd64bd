use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::commands::{config, infra, scenario, ssh};
use crate::config::{DEFAULT_LOGLEVEL, DEFAULT_SCENARIOS_DIR, DEFAULT_TF_DIR};

pub const BIN_NAME: &str = "simulator";

const LONG_ABOUT: &str = "
A distributed systems and infrastructure simulator for attacking and
debugging Kubernetes";

const COMPLETION_LONG_ABOUT: &str = "To load completion run

. <(simulator completion)

To configure your Bash shell to load completions for each session add to your bashrc

# ~/.bashrc or ~/.profile
. <(simulator completion)
";

/// Simulator command line
#[derive(Parser, Debug)]
#[command(name = BIN_NAME)]
#[command(about = "Simulator command line", long_about = LONG_ABOUT)]
pub struct Cli {
    /// Path to the simulator config file
    #[arg(short = 'c', long = "config-file", global = true, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// The name of the s3 bucket to use. Must be globally unique and will be prefixed with 'simulator-'
    #[arg(short = 'b', long, global = true)]
    pub bucket: Option<String>,

    /// Level of detail in output logging
    #[arg(short = 'l', long, global = true, default_value = DEFAULT_LOGLEVEL)]
    pub loglevel: String,

    /// Path to a directory containing the infrastructure scripts
    #[arg(short = 't', long = "tf-dir", global = true, default_value = DEFAULT_TF_DIR)]
    pub tf_dir: String,

    /// Path to a directory containing a scenario manifest
    #[arg(short = 's', long = "scenarios-dir", global = true, default_value = DEFAULT_SCENARIOS_DIR)]
    pub scenarios_dir: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Inspect the resolved simulator configuration
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Create, inspect and destroy the simulator infrastructure
    #[command(subcommand)]
    Infra(infra::InfraCommands),

    /// List and launch scenarios
    #[command(subcommand)]
    Scenario(scenario::ScenarioCommands),

    /// Open a shell on a simulator host
    Ssh(ssh::SshArgs),

    /// Print the simulator version
    Version {
        /// Print only the version number
        #[arg(long)]
        short: bool,
    },

    /// Generates Bash completion scripts
    #[command(long_about = COMPLETION_LONG_ABOUT)]
    Completion {
        /// Shell to generate the script for
        #[arg(value_enum, default_value_t = Shell::Bash)]
        shell: Shell,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Config(_) => "config",
            Commands::Infra(_) => "infra",
            Commands::Scenario(_) => "scenario",
            Commands::Ssh(_) => "ssh",
            Commands::Version { .. } => "version",
            Commands::Completion { .. } => "completion",
        }
    }

    /// Whether the command reads configuration. Commands that don't skip the
    /// config file and the `--bucket` requirement.
    pub fn needs_config(&self) -> bool {
        !matches!(self, Commands::Version { .. } | Commands::Completion { .. })
    }
}

/// Build the full command tree.
pub fn command() -> clap::Command {
    Cli::command()
}

/// Usage error for a command run without `--bucket`.
pub fn missing_bucket(root: &mut clap::Command) -> clap::Error {
    root.error(
        ErrorKind::MissingRequiredArgument,
        "the following required arguments were not provided:\n  --bucket <BUCKET>",
    )
}
