// src/config/mod.rs

//! Configuration loading for the `procmux` binary.
//!
//! The library API takes `SpawnOptions` directly; this module only exists
//! for the CLI, mapping a `Procmux.toml` file (plus an optional env file)
//! onto spawn tasks.

pub mod envfile;
pub mod loader;
pub mod model;

pub use envfile::{load_env_file, parse_env};
pub use loader::{load_and_validate, load_from_path, validate_config};
pub use model::{ConfigFile, ProcessConfig, SettingsSection};
