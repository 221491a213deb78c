// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [settings]
/// stream_output = true
/// prefix_output = true
/// capture_output = false
/// env_file = ".env"
///
/// [process.web]
/// cmd = "python3 -m http.server 8000"
/// cwd = "site"
/// env = { PYTHONUNBUFFERED = "1" }
///
/// [process.worker]
/// cmd = "cargo run --bin worker"
/// capture_output = true
/// ```
///
/// All sections are optional except that at least one `[process.<name>]`
/// must exist.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Global defaults from `[settings]`.
    #[serde(default)]
    pub settings: SettingsSection,

    /// All processes from `[process.<name>]`; keys are the process names.
    #[serde(default)]
    pub process: BTreeMap<String, ProcessConfig>,
}

/// `[settings]` section: defaults that individual processes can override.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsSection {
    /// Pass child output through to the terminal (default true).
    #[serde(default = "default_true")]
    pub stream_output: bool,

    /// Prefix streamed lines with `[name]` (default true).
    #[serde(default = "default_true")]
    pub prefix_output: bool,

    /// Retain output lines for post-mortem inspection (default false).
    #[serde(default)]
    pub capture_output: bool,

    /// Optional `KEY=VALUE` file, resolved relative to the config file,
    /// whose variables are handed to every process (per-process `env`
    /// entries win on conflict).
    #[serde(default)]
    pub env_file: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            stream_output: true,
            prefix_output: true,
            capture_output: false,
            env_file: None,
        }
    }
}

/// `[process.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessConfig {
    /// The command to execute. With `use_shell` (the default here) this is
    /// a full shell command line.
    pub cmd: String,

    /// Extra arguments, for processes launched without a shell.
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for the child.
    #[serde(default)]
    pub cwd: Option<String>,

    /// Per-process environment variables; override `env_file` entries.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Override `settings.stream_output` for this process.
    #[serde(default)]
    pub stream_output: Option<bool>,

    /// Override `settings.prefix_output` for this process.
    #[serde(default)]
    pub prefix_output: Option<bool>,

    /// Override `settings.capture_output` for this process.
    #[serde(default)]
    pub capture_output: Option<bool>,

    /// Run through the platform shell. Defaults to true so `cmd` can be a
    /// normal shell one-liner, matching how the config file reads.
    #[serde(default = "default_true")]
    pub use_shell: bool,
}

impl ProcessConfig {
    pub fn effective_stream_output(&self, settings: &SettingsSection) -> bool {
        self.stream_output.unwrap_or(settings.stream_output)
    }

    pub fn effective_prefix_output(&self, settings: &SettingsSection) -> bool {
        self.prefix_output.unwrap_or(settings.prefix_output)
    }

    pub fn effective_capture_output(&self, settings: &SettingsSection) -> bool {
        self.capture_output.unwrap_or(settings.capture_output)
    }
}
