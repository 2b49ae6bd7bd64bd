use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file {0}: {1}")]
    FileRead(PathBuf, std::io::Error),

    #[error("Failed to parse YAML in {0}: {1}")]
    YamlParse(PathBuf, serde_yaml::Error),

    #[error("Config file {0} must contain a mapping of keys to values")]
    NotAMapping(PathBuf),

    #[error("Config File \"{name}\" Not Found in \"{dir}\"")]
    NotFound { name: String, dir: PathBuf },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
