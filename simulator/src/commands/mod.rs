pub mod completion;
pub mod config;
pub mod external;
pub mod infra;
pub mod scenario;
pub mod ssh;
pub mod version;

use crate::cli::Commands;
use crate::context::Context;

/// Run the selected leaf command and return its exit code.
pub fn run(command: Commands, ctx: &Context) -> Result<u8, Box<dyn std::error::Error>> {
    tracing::debug!(command = command.name(), loglevel = %ctx.logger.level(), "Running command");
    match command {
        Commands::Config(cmd) => config::run(cmd, ctx),
        Commands::Infra(cmd) => infra::run(cmd, ctx),
        Commands::Scenario(cmd) => scenario::run(cmd, ctx),
        Commands::Ssh(args) => ssh::run(args, ctx),
        Commands::Version { short } => version::run(short),
        Commands::Completion { shell } => completion::run(shell),
    }
}
