use std::collections::BTreeMap;

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "SIMULATOR";

/// Source of environment variables.
///
/// Resolution reads through this trait so tests can supply a fixed
/// environment instead of mutating the process one.
pub trait EnvSource {
    fn vars(&self) -> Box<dyn Iterator<Item = (String, String)> + '_>;
}

/// The process environment. Variables that are not valid UTF-8 are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnv;

impl EnvSource for StdEnv {
    fn vars(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        Box::new(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }
}

/// Fixed environment backed by a map.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

#[cfg(test)]
impl MapEnv {
    pub fn from_pairs<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
impl EnvSource for MapEnv {
    fn vars(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        Box::new(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

/// Environment variable that overrides `key`: `tf-dir` -> `SIMULATOR_TF_DIR`.
pub fn env_var_name(key: &str) -> String {
    format!("{}_{}", ENV_PREFIX, key.replace('-', "_").to_ascii_uppercase())
}

/// Inverse of [`env_var_name`] for listing: `SIMULATOR_TF_DIR` -> `tf-dir`.
pub(crate) fn key_for_env_var(name: &str) -> Option<String> {
    let rest = name.get(ENV_PREFIX.len()..)?.strip_prefix('_')?;
    if !name[..ENV_PREFIX.len()].eq_ignore_ascii_case(ENV_PREFIX) || rest.is_empty() {
        return None;
    }
    Some(rest.to_ascii_lowercase().replace('_', "-"))
}

/// Snapshot the prefixed variables, keyed by upper-cased name.
///
/// Names match case-insensitively. When two variables differ only in case
/// the upper-case spelling wins. Empty values count as unset.
pub(crate) fn snapshot(source: &dyn EnvSource) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for (name, value) in source.vars() {
        if value.is_empty() || key_for_env_var(&name).is_none() {
            continue;
        }
        let canonical = name.to_ascii_uppercase();
        if canonical == name {
            vars.insert(canonical, value);
        } else {
            vars.entry(canonical).or_insert(value);
        }
    }
    vars
}
