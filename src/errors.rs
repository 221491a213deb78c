// src/errors.rs

//! Typed errors for the supervisor core.
//!
//! The CLI and config layers keep using `anyhow` for context-rich one-off
//! failures; everything the supervisor itself can produce is a
//! [`SupervisorError`] so callers can match on the failure class.

use std::collections::BTreeMap;
use std::fmt;

use nix::sys::signal::Signal;
use thiserror::Error;

use crate::supervisor::record::ProcessRecord;

/// Which child stream a line or an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// Everything that can go wrong inside the supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The OS refused to create the process (missing binary, permission
    /// denied). Surfaces synchronously from spawn; nothing is registered.
    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An operation referenced a name the registry does not know.
    #[error("no process registered under '{0}'")]
    NotFound(String),

    /// I/O failure while reading a child's output stream. Reaches callers
    /// as an `Error` event, never as a late failure of a returned call.
    #[error("{stream} read error for '{name}': {source}")]
    Stream {
        name: String,
        stream: StreamKind,
        #[source]
        source: std::io::Error,
    },

    /// Signal delivery failed, typically because the process died between
    /// the liveness check and the delivery.
    #[error("failed to deliver {signal} to '{name}' (pid {pid}): {source}")]
    Signal {
        name: String,
        pid: u32,
        signal: Signal,
        #[source]
        source: nix::Error,
    },

    /// One or more launches in a `spawn_multiple` batch failed.
    #[error(transparent)]
    Batch(#[from] BatchSpawnError),
}

/// Aggregate failure from a `spawn_multiple` batch.
///
/// The batch is best-effort: every launch is attempted and successful ones
/// stay registered and running. `spawned` holds the records that did
/// launch (keyed by their final registry names), `failures` the per-task
/// errors keyed by the requested name or command, counter-suffixed when
/// several failing tasks requested the same one.
#[derive(Debug, Error)]
#[error("{} of {attempted} launches failed", .failures.len())]
pub struct BatchSpawnError {
    pub attempted: usize,
    pub spawned: BTreeMap<String, ProcessRecord>,
    pub failures: BTreeMap<String, SupervisorError>,
}

/// Result alias for supervisor operations.
pub type Result<T, E = SupervisorError> = std::result::Result<T, E>;
