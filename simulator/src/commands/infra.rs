use std::path::Path;

use clap::Subcommand;

use super::external::Tool;
use crate::context::Context;
use crate::output;

const TERRAFORM: &str = "terraform";

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum InfraCommands {
    /// Provision the simulator infrastructure
    #[command(visible_alias = "up")]
    Create {
        /// Apply without an interactive approval prompt
        #[arg(long)]
        auto_approve: bool,
    },

    /// Show the outputs of the current infrastructure
    Status,

    /// Tear down the simulator infrastructure
    #[command(visible_alias = "down")]
    Destroy {
        /// Destroy without an interactive approval prompt
        #[arg(long)]
        auto_approve: bool,
    },
}

pub fn run(cmd: InfraCommands, ctx: &Context) -> Result<u8, Box<dyn std::error::Error>> {
    let tf_dir = ctx.tf_dir();
    if !tf_dir.is_dir() {
        return Err(format!(
            "Terraform directory {} not found. Pass --tf-dir or set SIMULATOR_TF_DIR.",
            output::emphasized(&tf_dir.display().to_string())
        )
        .into());
    }

    let state_bucket = ctx.state_bucket();
    tracing::info!(
        tf_dir = %tf_dir.display(),
        state_bucket = %state_bucket,
        action = action_name(&cmd),
        "Running infrastructure lifecycle"
    );

    for tool in plan(&cmd, &tf_dir, &state_bucket) {
        output::step(&format!("Running {}", output::emphasized(&tool.to_string())));
        let code = tool.run()?;
        if code != 0 {
            tracing::warn!(command = %tool, code, "terraform exited with failure");
            output::warning(&format!("terraform exited with status {code}"));
            return Ok(code);
        }
    }

    output::success(&format!("infra {} complete", action_name(&cmd)));
    Ok(0)
}

fn action_name(cmd: &InfraCommands) -> &'static str {
    match cmd {
        InfraCommands::Create { .. } => "create",
        InfraCommands::Status => "status",
        InfraCommands::Destroy { .. } => "destroy",
    }
}

/// Terraform invocations for `cmd`: backend init against the state bucket,
/// then the action itself.
fn plan(cmd: &InfraCommands, tf_dir: &Path, state_bucket: &str) -> Vec<Tool> {
    let terraform = || Tool::new(TERRAFORM).current_dir(tf_dir);

    let init = terraform().args([
        "init".to_string(),
        "-input=false".to_string(),
        format!("-backend-config=bucket={state_bucket}"),
    ]);

    let action = match cmd {
        InfraCommands::Create { auto_approve } => {
            let apply = terraform().args(["apply", "-input=false"]);
            if *auto_approve {
                apply.arg("-auto-approve")
            } else {
                apply
            }
        }
        InfraCommands::Status => terraform().arg("output"),
        InfraCommands::Destroy { auto_approve } => {
            let destroy = terraform().args(["destroy", "-input=false"]);
            if *auto_approve {
                destroy.arg("-auto-approve")
            } else {
                destroy
            }
        }
    };

    vec![init, action]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context_with;
    use tempfile::TempDir;

    #[test]
    fn create_initialises_backend_then_applies() {
        let tools = plan(
            &InfraCommands::Create { auto_approve: true },
            Path::new("/tf"),
            "simulator-team-a",
        );

        assert_eq!(tools.len(), 2);
        assert_eq!(
            tools[0].to_string(),
            "terraform init -input=false -backend-config=bucket=simulator-team-a"
        );
        assert_eq!(tools[1].get_args(), &["apply", "-input=false", "-auto-approve"]);
        assert!(tools.iter().all(|t| t.dir() == Some(Path::new("/tf"))));
    }

    #[test]
    fn destroy_without_auto_approve_prompts() {
        let tools = plan(
            &InfraCommands::Destroy {
                auto_approve: false,
            },
            Path::new("/tf"),
            "simulator-b",
        );
        assert_eq!(tools[1].get_args(), &["destroy", "-input=false"]);
    }

    #[test]
    fn status_reads_outputs() {
        let tools = plan(&InfraCommands::Status, Path::new("/tf"), "simulator-b");
        assert_eq!(tools[1].program(), "terraform");
        assert_eq!(tools[1].get_args(), &["output"]);
    }

    #[test]
    fn missing_tf_dir_is_reported() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent");
        let ctx = context_with(&[("bucket", "b"), ("tf-dir", missing.to_str().unwrap())]);

        let err = run(InfraCommands::Status, &ctx).unwrap_err();
        assert!(err.to_string().contains("Terraform directory"), "unexpected: {err}");
    }
}
