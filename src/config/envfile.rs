// src/config/envfile.rs

//! `KEY=VALUE` environment-file loading for `settings.env_file`.
//!
//! The format is the common dotenv subset: one assignment per line, blank
//! lines and `#` comments skipped, an optional `export ` prefix tolerated,
//! and single or double quotes around the value stripped.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

/// Read and parse an environment file.
pub fn load_env_file(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading env file at {:?}", path))?;
    Ok(parse_env(&contents))
}

/// Parse env-file contents into a map. Malformed lines are skipped with a
/// warning rather than failing the whole file.
pub fn parse_env(contents: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();

    for (lineno, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            warn!(line = lineno + 1, "env file line has no '=', skipping");
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            warn!(line = lineno + 1, "env file line has an empty key, skipping");
            continue;
        }

        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    vars
}

/// Strip one pair of matching surrounding quotes, if present.
fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}
