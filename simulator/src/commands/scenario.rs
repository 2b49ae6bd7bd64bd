use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;

use super::external::Tool;
use crate::config::env_var_name;
use crate::config::keys;
use crate::context::Context;
use crate::output;

/// Script in the scenarios directory that applies a scenario to the cluster
const PERTURB_SCRIPT: &str = "perturb.sh";

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ScenarioCommands {
    /// List available scenarios
    #[command(visible_alias = "ls")]
    List,

    /// Launch a scenario against the running infrastructure
    Launch {
        /// Scenario id (directory name under the scenarios directory)
        id: String,
    },
}

pub fn run(cmd: ScenarioCommands, ctx: &Context) -> Result<u8, Box<dyn std::error::Error>> {
    let scenarios_dir = ctx.scenarios_dir();
    match cmd {
        ScenarioCommands::List => {
            let scenarios = list_scenarios(&scenarios_dir)?;
            output::section("Scenarios");
            if scenarios.is_empty() {
                output::muted(&format!("No scenarios in {}", scenarios_dir.display()));
            }
            for id in scenarios {
                output::step(&id);
            }
            Ok(0)
        }
        ScenarioCommands::Launch { id } => {
            let scenario = scenario_path(&scenarios_dir, &id)?;
            let tool = launch_tool(&scenarios_dir, &scenario, &ctx.state_bucket());
            tracing::info!(scenario = %id, command = %tool, "Launching scenario");
            output::step(&format!("Launching scenario {}", output::emphasized(&id)));
            Ok(tool.run()?)
        }
    }
}

/// Scenario ids: sub-directories of `dir`, sorted, hidden ones skipped.
pub fn list_scenarios(dir: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        format!(
            "Failed to read scenarios directory {}: {}",
            dir.display(),
            e
        )
    })?;

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with('.') {
            ids.push(name);
        }
    }
    ids.sort();
    Ok(ids)
}

fn scenario_path(dir: &Path, id: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
        return Err(format!("Invalid scenario id '{}'", id).into());
    }
    let path = dir.join(id);
    if !path.is_dir() {
        return Err(format!(
            "Scenario '{}' not found in {}. Run 'simulator scenario list'.",
            id,
            dir.display()
        )
        .into());
    }
    Ok(path)
}

fn launch_tool(scenarios_dir: &Path, scenario: &Path, state_bucket: &str) -> Tool {
    Tool::new(scenarios_dir.join(PERTURB_SCRIPT).display().to_string())
        .arg(scenario.display().to_string())
        .current_dir(scenarios_dir)
        .env(env_var_name(keys::BUCKET), state_bucket)
}
