use clap::Args;

use super::external::Tool;
use crate::config::keys;
use crate::context::Context;

const SSH: &str = "ssh";

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SshArgs {
    /// Host to connect to, as `[user@]host`
    pub target: String,

    /// Private key used for the connection
    #[arg(short = 'i', long = "identity-file", value_name = "PATH")]
    pub identity_file: Option<String>,

    /// Remote command to run instead of an interactive shell
    #[arg(last = true)]
    pub command: Vec<String>,
}

/// Open a shell through the system `ssh` client. The identity file comes
/// from the resolved configuration, so `SIMULATOR_IDENTITY_FILE` and the
/// config file apply as well as `-i`.
pub fn run(args: SshArgs, ctx: &Context) -> Result<u8, Box<dyn std::error::Error>> {
    let identity = ctx.config.get(keys::IDENTITY_FILE);
    tracing::debug!(
        identity,
        from_flag = args.identity_file.is_some(),
        "Resolved SSH identity"
    );

    let tool = ssh_tool(&args.target, identity, &args.command);
    tracing::info!(host = %args.target, "Opening SSH session");
    Ok(tool.run()?)
}

fn ssh_tool(target: &str, identity: &str, command: &[String]) -> Tool {
    let mut tool = Tool::new(SSH);
    if !identity.is_empty() {
        tool = tool.args(["-i", identity]);
    }
    tool.arg(target).args(command.iter().cloned())
}
