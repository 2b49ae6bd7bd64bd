//! Start-up sequencing.
//!
//! ```text
//! phase 1  bootstrap logger (debug, console)
//!          -> build command tree -> parse -> validate --bucket
//! phase 2  pre-run: bind flags -> config file -> environment
//!          -> rebuild logger at the resolved `loglevel`
//!          -> run the selected command
//! ```
//!
//! The logger is shared through a [`LoggerHandle`], so the phase 2 rebuild
//! is what every command logs through.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::FromArgMatches;
use thiserror::Error;

use crate::cli::{self, Cli, Commands};
use crate::commands;
use crate::config::{
    ConfigError, ConfigStore, DEFAULT_LOG_FORMAT, EnvSource, StdEnv, keys,
};
use crate::context::Context;
use crate::logging::{LogError, LoggerHandle, new_logger};

/// Errors that stop a run before or while the command executes
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Bad command line; carries clap's usage output
    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("Error reading config file: {0}")]
    Config(#[from] ConfigError),

    #[error("can't re-initialize logger: {0}")]
    Logger(#[from] LogError),

    #[error("{0}")]
    Command(Box<dyn std::error::Error>),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub struct Bootstrap {
    logger: LoggerHandle,
    env: Box<dyn EnvSource>,
    search_dir: PathBuf,
}

impl Bootstrap {
    /// Sequencer over the process environment, searching the current
    /// directory for the config file.
    pub fn new(logger: LoggerHandle) -> std::io::Result<Self> {
        Ok(Self {
            logger,
            env: Box::new(StdEnv),
            search_dir: std::env::current_dir()?,
        })
    }

    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dir = dir.into();
        self
    }

    /// Parse `args`, resolve configuration and run the selected command.
    /// Returns the command's exit code.
    pub fn execute<I, T>(&self, args: I) -> Result<u8, BootstrapError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut root = cli::command();
        let matches = root.try_get_matches_from_mut(args)?;
        let cli = Cli::from_arg_matches(&matches)?;

        let Some(command) = cli.command.clone() else {
            root.print_help()?;
            println!();
            return Ok(0);
        };

        if command.needs_config() && cli.bucket.is_none() {
            return Err(cli::missing_bucket(&mut root).into());
        }

        let ctx = self.pre_run(&root, &matches, &cli, &command)?;
        self.logger
            .scope(|| commands::run(command, &ctx))
            .map_err(BootstrapError::Command)
    }

    /// Resolve configuration for this run and rebuild the logger from it.
    fn pre_run(
        &self,
        root: &clap::Command,
        matches: &clap::ArgMatches,
        cli: &Cli,
        command: &Commands,
    ) -> Result<Context, BootstrapError> {
        let mut config = ConfigStore::new();
        config.set_default(keys::LOG_FORMAT, DEFAULT_LOG_FORMAT);
        config.bind_flags(root, matches);

        // Config-free commands skip discovery, but a file named with
        // --config-file is always read.
        self.logger.scope(|| {
            if command.needs_config() || cli.config_file.is_some() {
                config.resolve(
                    cli.config_file.as_deref(),
                    &self.search_dir,
                    self.env.as_ref(),
                )
            } else {
                config.resolve_env(self.env.as_ref());
                Ok(())
            }
        })?;

        let logger = new_logger(config.get(keys::LOGLEVEL), config.get(keys::LOG_FORMAT))?;
        self.logger.replace(logger);

        self.logger.scope(|| {
            tracing::debug!(
                command = command.name(),
                config_file = %display_path(config.file_path()),
                loglevel = %self.logger.level(),
                log_format = %self.logger.format(),
                "Starting CLI"
            );
        });

        Ok(Context::new(config, self.logger.clone()))
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapEnv;
    use crate::logging::tests::{Capture, captured};
    use crate::logging::{LogFormat, LogLevel};
    use std::fs;
    use tempfile::TempDir;

    fn sequencer(dir: &Path, env: MapEnv) -> (Bootstrap, Capture) {
        let (logger, capture) = captured(LogLevel::Debug, LogFormat::Console);
        let bootstrap = Bootstrap::new(LoggerHandle::new(logger))
            .unwrap()
            .with_env(env)
            .with_search_dir(dir);
        (bootstrap, capture)
    }

    fn project(content: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("simulator.yaml"), content).unwrap();
        temp
    }

    #[test]
    fn missing_bucket_fails_before_reading_config() {
        let temp = TempDir::new().unwrap();
        let (bootstrap, _) = sequencer(temp.path(), MapEnv::default());

        let err = bootstrap
            .execute(["simulator", "config", "get", "loglevel"])
            .unwrap_err();

        let BootstrapError::Usage(err) = err else {
            panic!("expected usage error, got {err}");
        };
        assert_eq!(err.exit_code(), 2);
        assert_eq!(bootstrap.logger.level(), LogLevel::Debug, "no pre-run happened");
    }

    #[test]
    fn missing_explicit_config_file_is_fatal() {
        let temp = project("bucket: b\n");
        let (bootstrap, _) = sequencer(temp.path(), MapEnv::default());

        let err = bootstrap
            .execute([
                "simulator",
                "--bucket",
                "b",
                "--config-file",
                "/nonexistent/simulator.yaml",
                "config",
                "get",
                "bucket",
            ])
            .unwrap_err();

        assert!(matches!(err, BootstrapError::Config(ConfigError::FileRead(..))));
        assert!(err.to_string().starts_with("Error reading config file:"));
    }

    #[test]
    fn undiscoverable_config_file_is_fatal() {
        let temp = TempDir::new().unwrap();
        let (bootstrap, _) = sequencer(temp.path(), MapEnv::default());

        let err = bootstrap
            .execute(["simulator", "-b", "b", "config", "list"])
            .unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::Config(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn logger_is_rebuilt_at_resolved_level() {
        let temp = project("loglevel: error\n");
        let env = MapEnv::from_pairs([("SIMULATOR_LOGLEVEL", "debug")]);
        let (bootstrap, _) = sequencer(temp.path(), env);

        let code = bootstrap
            .execute(["simulator", "-b", "b", "--loglevel", "warn", "config", "get", "bucket"])
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(bootstrap.logger.level(), LogLevel::Warn);
    }

    #[test]
    fn env_level_applies_without_flag() {
        let temp = project("loglevel: error\n");
        let env = MapEnv::from_pairs([("SIMULATOR_LOGLEVEL", "trace")]);
        let (bootstrap, _) = sequencer(temp.path(), env);

        bootstrap
            .execute(["simulator", "-b", "b", "config", "get", "bucket"])
            .unwrap();

        assert_eq!(bootstrap.logger.level(), LogLevel::Trace);
    }

    #[test]
    fn file_can_select_json_logs() {
        let temp = project("log-format: json\n");
        let (bootstrap, _) = sequencer(temp.path(), MapEnv::default());

        bootstrap
            .execute(["simulator", "-b", "b", "config", "get", "bucket"])
            .unwrap();

        assert_eq!(bootstrap.logger.format(), LogFormat::Json);
        assert_eq!(bootstrap.logger.level(), LogLevel::Info);
    }

    #[test]
    fn invalid_level_is_fatal() {
        let temp = project("loglevel: chatty\n");
        let (bootstrap, _) = sequencer(temp.path(), MapEnv::default());

        let err = bootstrap
            .execute(["simulator", "-b", "b", "config", "get", "bucket"])
            .unwrap_err();

        assert!(matches!(err, BootstrapError::Logger(LogError::InvalidLevel(_))));
    }

    #[test]
    fn version_needs_no_bucket_or_config_file() {
        let temp = TempDir::new().unwrap();
        let (bootstrap, _) = sequencer(temp.path(), MapEnv::default());

        let code = bootstrap.execute(["simulator", "version", "--short"]).unwrap();
        assert_eq!(code, 0);
        assert_eq!(bootstrap.logger.level(), LogLevel::Info);
    }

    #[test]
    fn version_still_reads_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let (bootstrap, _) = sequencer(temp.path(), MapEnv::default());

        let err = bootstrap
            .execute(["simulator", "--config-file", "/nonexistent.yaml", "version"])
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Config(ConfigError::FileRead(..))));

        let config = temp.path().join("custom.yaml");
        fs::write(&config, "loglevel: warn\n").unwrap();
        let code = bootstrap
            .execute(["simulator", "-c", config.to_str().unwrap(), "completion"])
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(bootstrap.logger.level(), LogLevel::Warn);
    }

    #[test]
    fn records_after_rebuild_bypass_bootstrap_logger() {
        let temp = project("loglevel: error\n");
        let (bootstrap, capture) = sequencer(temp.path(), MapEnv::default());

        bootstrap
            .execute(["simulator", "-b", "b", "config", "get", "bucket"])
            .unwrap();
        bootstrap
            .logger
            .scope(|| tracing::error!("after rebuild"));

        assert!(!capture.contents().contains("after rebuild"));
    }

    #[test]
    fn unknown_config_key_exit_code_is_propagated() {
        let temp = project("bucket: b\n");
        let (bootstrap, _) = sequencer(temp.path(), MapEnv::default());

        let code = bootstrap
            .execute(["simulator", "-b", "b", "config", "get", "missing-key"])
            .unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn no_subcommand_prints_help() {
        let temp = TempDir::new().unwrap();
        let (bootstrap, _) = sequencer(temp.path(), MapEnv::default());
        assert_eq!(bootstrap.execute(["simulator"]).unwrap(), 0);
    }
}
