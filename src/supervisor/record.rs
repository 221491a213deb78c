// src/supervisor/record.rs

use chrono::{DateTime, Utc};

/// Lifecycle state of a tracked process.
///
/// Transitions are forward-only: `Spawning` becomes `Running` once the OS
/// launch succeeds, or `Failed` if the launch itself is refused (a failed
/// record is never registered and never gets an exit event). `Running`
/// becomes `Terminated` when the child exits. `Terminated` and `Failed`
/// are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Spawning,
    Running,
    Terminated,
    Failed,
}

impl ProcessState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessState::Terminated | ProcessState::Failed)
    }
}

/// Point-in-time snapshot of one tracked process.
///
/// Every read through the supervisor hands out a clone; mutating a
/// snapshot never touches registry state. `exit_code` and `ended_at` are
/// written exactly once, before the exit notification is published.
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    /// Unique registry key: the caller-supplied label or a derived
    /// `<command>_<N>` name.
    pub name: String,
    /// The command line this record was launched from, for display.
    pub command: String,
    pub pid: Option<u32>,
    pub state: ProcessState,
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Utc>,
    /// Set when the record enters a terminal state.
    pub ended_at: Option<DateTime<Utc>>,
    /// Completed stdout lines, in order. Only populated in capture mode.
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ProcessRecord {
    pub(crate) fn new(name: String, command: String) -> Self {
        Self {
            name,
            command,
            pid: None,
            state: ProcessState::Spawning,
            exit_code: None,
            started_at: Utc::now(),
            ended_at: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == ProcessState::Running
    }

    /// The captured lines of both streams.
    pub fn output(&self) -> ProcessOutput {
        ProcessOutput {
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        }
    }
}

/// Captured output of one process, stdout and stderr kept separate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}
