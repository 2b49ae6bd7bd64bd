use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use clap::parser::ValueSource;
use clap::{ArgMatches, Command};
use serde::Serialize;

use super::env::{EnvSource, env_var_name, key_for_env_var, snapshot};
use super::error::Result;
use super::file;
use super::keys;

/// Where a resolved value came from, ordered from lowest to highest
/// precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Default,
    File,
    Env,
    Flag,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Default => "default",
            Layer::File => "file",
            Layer::Env => "env",
            Layer::Flag => "flag",
        };
        f.write_str(name)
    }
}

/// One resolved key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub layer: Layer,
}

/// Layered configuration for a single run.
///
/// Built once at the start of command execution: flags are bound while the
/// command line is inspected, then [`ConfigStore::resolve`] loads the file
/// and environment layers. After that the store is only read.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    defaults: BTreeMap<String, String>,
    file: BTreeMap<String, String>,
    /// Keyed by upper-cased variable name
    env: BTreeMap<String, String>,
    flags: BTreeMap<String, String>,
    file_path: Option<PathBuf>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_default(&mut self, key: &str, value: impl Into<String>) {
        self.defaults.insert(key.to_lowercase(), value.into());
    }

    pub fn set_flag(&mut self, key: &str, value: impl Into<String>) {
        self.flags.insert(key.to_lowercase(), value.into());
    }

    /// Bind the value-taking `--long` options of `command` and of the
    /// selected subcommand chain whose names are configuration keys.
    ///
    /// Declared defaults fill the default layer; only options actually given
    /// on the command line fill the flag layer, so a default never shadows
    /// the file or the environment.
    pub fn bind_flags(&mut self, command: &Command, matches: &ArgMatches) {
        for arg in command.get_arguments() {
            let Some(key) = arg.get_long() else { continue };
            if !arg.get_action().takes_values() || !keys::is_known(key) {
                continue;
            }

            if let Some(default) = arg.get_default_values().first() {
                self.set_default(key, default.to_string_lossy());
            }

            let id = arg.get_id().as_str();
            if matches.value_source(id) == Some(ValueSource::CommandLine)
                && let Some(mut values) = matches.get_raw(id)
                && let Some(value) = values.next()
            {
                self.set_flag(key, value.to_string_lossy());
            }
        }

        if let Some((name, sub_matches)) = matches.subcommand()
            && let Some(subcommand) = command.find_subcommand(name)
        {
            self.bind_flags(subcommand, sub_matches);
        }
    }

    /// Load the config file and the environment.
    ///
    /// With `explicit` set, exactly that file is read. Otherwise
    /// `simulator.<ext>` must exist in `search_dir`. Either way a file that
    /// cannot be found, read or parsed is an error and the environment is
    /// not consulted.
    pub fn resolve(
        &mut self,
        explicit: Option<&Path>,
        search_dir: &Path,
        env: &dyn EnvSource,
    ) -> Result<()> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => file::discover(search_dir)?,
        };

        self.file = file::load_file(&path)?;
        tracing::trace!(path = %path.display(), keys = self.file.len(), "Loaded config file");
        self.file_path = Some(path);

        self.resolve_env(env);
        Ok(())
    }

    /// Load only the environment layer.
    pub fn resolve_env(&mut self, env: &dyn EnvSource) {
        self.env = snapshot(env);
    }

    /// The winning value for `key` and the layer it came from.
    pub fn lookup(&self, key: &str) -> Option<(&str, Layer)> {
        let key = key.to_lowercase();
        self.flags
            .get(&key)
            .map(|v| (v.as_str(), Layer::Flag))
            .or_else(|| {
                self.env
                    .get(&env_var_name(&key))
                    .map(|v| (v.as_str(), Layer::Env))
            })
            .or_else(|| self.file.get(&key).map(|v| (v.as_str(), Layer::File)))
            .or_else(|| self.defaults.get(&key).map(|v| (v.as_str(), Layer::Default)))
    }

    /// Resolved value for `key`; empty when no layer sets it.
    pub fn get(&self, key: &str) -> &str {
        self.lookup(key).map(|(value, _)| value).unwrap_or("")
    }

    pub fn get_path(&self, key: &str) -> PathBuf {
        PathBuf::from(self.get(key))
    }

    /// Every key set in the default, file or flag layer, plus configuration
    /// keys set only in the environment. Sorted.
    pub fn entries(&self) -> Vec<Entry> {
        let keys: BTreeSet<String> = self
            .defaults
            .keys()
            .chain(self.file.keys())
            .chain(self.flags.keys())
            .cloned()
            .chain(
                self.env
                    .keys()
                    .filter_map(|name| key_for_env_var(name))
                    .filter(|key| keys::is_known(key)),
            )
            .collect();

        keys.into_iter()
            .filter_map(|key| {
                let (value, layer) = self.lookup(&key)?;
                Some(Entry {
                    value: value.to_string(),
                    layer,
                    key,
                })
            })
            .collect()
    }

    /// The file loaded by [`ConfigStore::resolve`], if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}
