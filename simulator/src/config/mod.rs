mod env;
mod error;
mod file;
mod store;

pub use env::*;
pub use error::*;
pub use file::*;
pub use store::*;

/// Keys shared by the root command and its subcommands
pub mod keys {
    pub const BUCKET: &str = "bucket";
    pub const LOGLEVEL: &str = "loglevel";
    pub const LOG_FORMAT: &str = "log-format";
    pub const TF_DIR: &str = "tf-dir";
    pub const SCENARIOS_DIR: &str = "scenarios-dir";
    pub const IDENTITY_FILE: &str = "identity-file";

    /// Every configuration key. Command-line options outside this list,
    /// such as `--output` or `--config-file`, are not bound into the store.
    pub const ALL: &[&str] = &[
        BUCKET,
        LOGLEVEL,
        LOG_FORMAT,
        TF_DIR,
        SCENARIOS_DIR,
        IDENTITY_FILE,
    ];

    pub fn is_known(key: &str) -> bool {
        ALL.iter().any(|known| known.eq_ignore_ascii_case(key))
    }
}

/// Literal prefix consumers put in front of `bucket`
pub const BUCKET_PREFIX: &str = "simulator-";

pub const DEFAULT_LOGLEVEL: &str = "info";
pub const DEFAULT_LOG_FORMAT: &str = "console";
pub const DEFAULT_TF_DIR: &str = "./terraform/deployments/AWS";
pub const DEFAULT_SCENARIOS_DIR: &str = "./simulation-scripts";
