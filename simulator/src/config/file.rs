use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use super::error::{ConfigError, Result};

/// Base name of the implicitly discovered config file
pub const CONFIG_NAME: &str = "simulator";

/// Extensions tried, in order, when searching for `simulator.<ext>`.
/// Every candidate is parsed as YAML.
pub const CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Find `simulator.<ext>` in `dir`.
pub fn discover(dir: &Path) -> Result<PathBuf> {
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{CONFIG_NAME}.{ext}")))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ConfigError::NotFound {
            name: CONFIG_NAME.to_string(),
            dir: dir.to_path_buf(),
        })
}

/// Read a config file into flat `key -> value` pairs.
pub fn load_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content =
        fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
    parse(path, &content)
}

/// Parse YAML content.
///
/// Keys are lower-cased and nested mappings are flattened with `.`
/// (`ssh: {user: root}` -> `ssh.user`). Scalars keep their textual form,
/// sequences are joined with `,` and nulls are treated as unset.
pub fn parse(path: &Path, content: &str) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    if content.trim().is_empty() {
        return Ok(values);
    }

    let document: Value = serde_yaml::from_str(content)
        .map_err(|e| ConfigError::YamlParse(path.to_path_buf(), e))?;

    match document {
        Value::Null => {}
        Value::Mapping(_) => flatten("", &document, &mut values),
        _ => return Err(ConfigError::NotAMapping(path.to_path_buf())),
    }

    Ok(values)
}

fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Mapping(mapping) => {
            for (key, nested) in mapping {
                let Some(key) = scalar(key) else { continue };
                let key = key.to_lowercase();
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, nested, out);
            }
        }
        Value::Sequence(items) => {
            let joined: Vec<String> = items.iter().filter_map(scalar).collect();
            out.insert(prefix.to_string(), joined.join(","));
        }
        Value::Tagged(tagged) => flatten(prefix, &tagged.value, out),
        other => {
            if let Some(text) = scalar(other) {
                out.insert(prefix.to_string(), text);
            }
        }
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(number(n)),
        Value::Tagged(tagged) => scalar(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Floats render without a trailing `.0` or exponent, so `1e3` reads back
/// as `1000`.
fn number(n: &serde_yaml::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.is_finite() => f.to_string(),
        _ => n.to_string(),
    }
}
