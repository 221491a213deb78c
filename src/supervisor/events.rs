// src/supervisor/events.rs

//! Typed lifecycle events with multi-subscriber fan-out.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::errors::SupervisorError;

use super::record::ProcessRecord;

/// Everything the supervisor announces about its children.
///
/// A closed set of variants with typed payloads. Subscribers receive
/// events in emission order; for one process that means its own stdout
/// lines arrive in the order the bytes were produced and always before its
/// `Exited`. No ordering is promised between stdout and stderr of the same
/// process or between different processes.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// A process was launched and registered. The snapshot is taken after
    /// registration, so looking its name up at this point already succeeds.
    Spawned { record: ProcessRecord },
    /// One completed stdout line (piped mode only).
    Stdout { name: String, line: String },
    /// One completed stderr line (piped mode only).
    Stderr { name: String, line: String },
    /// The process reached its terminal state. Emitted strictly after the
    /// registry entry went terminal, so a subscriber reacting to this
    /// always observes the stored exit code.
    Exited { name: String, code: i32 },
    /// A launch or stream-level failure. Orthogonal to `Exited`: a stream
    /// error does not change which terminal state the record reaches.
    Error {
        name: String,
        error: Arc<SupervisorError>,
    },
}

/// Broadcast fan-out of [`ProcessEvent`]s.
///
/// `subscribe` returns an independent receiver; dropping it unsubscribes.
/// A subscriber that falls more than the channel capacity behind loses the
/// oldest events (`RecvError::Lagged`) but never blocks the supervisor.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ProcessEvent>,
}

impl EventBus {
    const CAPACITY: usize = 1024;

    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(Self::CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.tx.subscribe()
    }

    /// Deliver an event to all current subscribers. With no subscribers
    /// the event is simply dropped.
    pub(crate) fn emit(&self, event: ProcessEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
