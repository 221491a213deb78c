// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::config::model::ConfigFile;

/// Load a configuration file from a given path and return the raw
/// `ConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] to
/// also run the semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {:?}", path))?;

    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML config from {:?}", path))?;

    Ok(config)
}

/// Load a configuration file from path and run basic validation.
///
/// This is the recommended entry point for the rest of the application:
/// reads TOML, applies defaults (via `serde` + `Default` impls), and
/// checks that the process table is non-empty and every `cmd` is set.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Semantic checks on a loaded configuration.
///
/// Deliberately shallow: name uniqueness is already guaranteed by the TOML
/// table keys, and spawn-time failures (bad cwd, missing binary) are the
/// supervisor's job to report.
pub fn validate_config(config: &ConfigFile) -> Result<()> {
    if config.process.is_empty() {
        return Err(anyhow!(
            "config must contain at least one [process.<name>] section"
        ));
    }

    for (name, process) in config.process.iter() {
        if process.cmd.trim().is_empty() {
            return Err(anyhow!("process '{}' has an empty `cmd`", name));
        }
        if !process.use_shell && !process.args.is_empty() && process.cmd.contains(' ') {
            return Err(anyhow!(
                "process '{}' mixes a multi-word `cmd` with `args` but `use_shell = false`; \
                 put the executable in `cmd` and the rest in `args`",
                name
            ));
        }
    }

    Ok(())
}
