use std::io::{self, Write};

use clap::{Subcommand, ValueEnum};

use crate::config::{ConfigStore, Entry};
use crate::context::Context;
use crate::output;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Print the resolved value of a key
    Get {
        /// Key name, as used for flags and in simulator.yaml
        key: String,
    },

    /// Show every resolved key with the layer it came from
    #[command(visible_alias = "ls")]
    List {
        #[arg(short = 'o', long, value_enum, default_value_t = ListFormat::Text)]
        output: ListFormat,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    Text,
    Json,
}

pub fn run(cmd: ConfigCommands, ctx: &Context) -> Result<u8, Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommands::Get { key } => {
            let mut stdout = io::stdout().lock();
            get(&ctx.config, &key, &mut stdout)
        }
        ConfigCommands::List {
            output: ListFormat::Json,
        } => {
            let mut stdout = io::stdout().lock();
            write_json(&ctx.config, &mut stdout)?;
            Ok(0)
        }
        ConfigCommands::List {
            output: ListFormat::Text,
        } => {
            list_text(&ctx.config);
            Ok(0)
        }
    }
}

/// Print the value of `key`. An unknown key prints nothing and exits 1.
fn get<W: Write>(
    config: &ConfigStore,
    key: &str,
    out: &mut W,
) -> Result<u8, Box<dyn std::error::Error>> {
    match config.lookup(key) {
        Some((value, layer)) => {
            tracing::debug!(key, %layer, "Resolved config key");
            writeln!(out, "{value}")?;
            Ok(0)
        }
        None => {
            tracing::warn!(key, "Config key is not set in any layer");
            Ok(1)
        }
    }
}

fn write_json<W: Write>(config: &ConfigStore, out: &mut W) -> Result<(), Box<dyn std::error::Error>> {
    let entries: Vec<Entry> = config.entries();
    serde_json::to_writer_pretty(&mut *out, &entries)?;
    writeln!(out)?;
    Ok(())
}

fn list_text(config: &ConfigStore) {
    let entries = config.entries();
    output::section("Configuration");
    match config.file_path() {
        Some(path) => output::muted(&format!("file: {}", path.display())),
        None => output::muted("file: (none)"),
    }
    let width = entries.iter().map(|e| e.key.len()).max().unwrap_or(0);
    for entry in &entries {
        output::key_value(&entry.key, &entry.value, &entry.layer.to_string(), width);
    }
}
