use std::path::PathBuf;

use crate::config::{BUCKET_PREFIX, ConfigStore, keys};
use crate::logging::LoggerHandle;

/// Everything a subcommand gets to work with: the configuration resolved
/// for this run and the shared logger.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: ConfigStore,
    pub logger: LoggerHandle,
}

impl Context {
    pub fn new(config: ConfigStore, logger: LoggerHandle) -> Self {
        Self { config, logger }
    }

    pub fn bucket(&self) -> &str {
        self.config.get(keys::BUCKET)
    }

    /// Bucket holding infrastructure state: `bucket` with the
    /// `simulator-` prefix.
    pub fn state_bucket(&self) -> String {
        state_bucket_name(self.bucket())
    }

    pub fn tf_dir(&self) -> PathBuf {
        self.config.get_path(keys::TF_DIR)
    }

    pub fn scenarios_dir(&self) -> PathBuf {
        self.config.get_path(keys::SCENARIOS_DIR)
    }
}

pub fn state_bucket_name(bucket: &str) -> String {
    format!("{BUCKET_PREFIX}{bucket}")
}
