//! Reader for flat `key=value` properties files

use crate::config::ConfigError;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Parse properties text.
///
/// Accepts `key=value`, `key: value` and `key value`. Lines starting with
/// `#` or `!` are comments. Later duplicates win.
pub fn parse(text: &str) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let split_at = line
            .find(|c: char| c == '=' || c == ':' || c.is_whitespace())
            .unwrap_or(line.len());
        let key = line[..split_at].trim_end();
        let mut rest = line[split_at..].trim_start();
        if rest.starts_with('=') || rest.starts_with(':') {
            rest = rest[1..].trim_start();
        }

        props.insert(key.to_string(), rest.to_string());
    }

    props
}

/// Read and parse a properties file.
pub fn read(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    let text = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(parse(&text))
}
