// src/supervisor/mod.rs

//! The process supervisor core.
//!
//! This module is responsible for:
//! - Launching OS child processes and tracking them as named records.
//! - Reassembling line-oriented output from arbitrarily chunked reads.
//! - Letting callers wait on or signal any subset of processes without
//!   races between termination notification and wait registration.
//! - Fanning lifecycle events out to any number of subscribers.
//!
//! It knows nothing about what the processes do; downstream runners are
//! just more callers issuing spawns and waits.

pub mod events;
pub mod lines;
pub mod record;
pub mod registry;
pub mod spawn;

pub use events::{EventBus, ProcessEvent};
pub use lines::LineAccumulator;
pub use record::{ProcessOutput, ProcessRecord, ProcessState};
pub use registry::Registry;
pub use spawn::{SpawnOptions, SpawnTask};

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use nix::sys::signal;
use nix::unistd::Pid;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub use nix::sys::signal::Signal;

use crate::errors::{BatchSpawnError, Result, SupervisorError};

use registry::ExitSubscription;

/// Supervisor over a set of named child processes.
///
/// Cheap to clone; clones share the same registry and event bus. Construct
/// one per scope that needs its own process namespace; there is no global
/// instance.
#[derive(Debug, Clone, Default)]
pub struct Supervisor {
    shared: Arc<Shared>,
}

/// State shared between the supervisor handle and its spawned tasks.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) registry: Registry,
    pub(crate) bus: EventBus,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to lifecycle events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.shared.bus.subscribe()
    }

    /// Launch one process and return its registered record snapshot.
    ///
    /// The returned record is already visible through [`Supervisor::process`]
    /// and the `Spawned` event has fired. Fails with
    /// [`SupervisorError::Launch`] when the OS refuses the launch; nothing
    /// is registered in that case.
    pub async fn spawn(
        &self,
        command: &str,
        args: &[String],
        options: SpawnOptions,
    ) -> Result<ProcessRecord> {
        spawn::spawn_process(Arc::clone(&self.shared), command, args, options).await
    }

    /// Launch a batch of processes concurrently, best-effort.
    ///
    /// Every launch is attempted; if all succeed the name→record map is
    /// returned. If any fail, the successfully launched processes stay
    /// registered and running, and the [`BatchSpawnError`] carries both
    /// the spawned map and the per-task failures.
    pub async fn spawn_multiple(
        &self,
        tasks: Vec<SpawnTask>,
    ) -> Result<BTreeMap<String, ProcessRecord>, BatchSpawnError> {
        let attempted = tasks.len();
        let launches = tasks.into_iter().map(|task| {
            let sup = self.clone();
            async move {
                let requested = task.requested_name();
                let (command, args, options) = task.into_parts();
                let outcome = sup.spawn(&command, &args, options).await;
                (requested, outcome)
            }
        });

        let mut spawned = BTreeMap::new();
        let mut failures = BTreeMap::new();
        for (requested, outcome) in join_all(launches).await {
            match outcome {
                Ok(record) => {
                    spawned.insert(record.name.clone(), record);
                }
                Err(err) => {
                    // Failure keys must stay distinct even when several
                    // unnamed tasks share a command.
                    let mut key = requested.clone();
                    let mut n = 1;
                    while failures.contains_key(&key) {
                        key = format!("{requested}_{n}");
                        n += 1;
                    }
                    failures.insert(key, err);
                }
            }
        }

        if failures.is_empty() {
            Ok(spawned)
        } else {
            Err(BatchSpawnError {
                attempted,
                spawned,
                failures,
            })
        }
    }

    /// Wait for a process to exit and return its exit code.
    ///
    /// Resolves immediately from stored state if the record is already
    /// terminal; otherwise suspends until the single underlying exit
    /// notification fires. Any number of concurrent waiters resolve from
    /// that one notification; the OS-level wait happens exactly once, in
    /// the reaper task.
    pub async fn wait_for(&self, name: &str) -> Result<i32> {
        match self.shared.registry.subscribe_exit(name) {
            ExitSubscription::Unknown => Err(SupervisorError::NotFound(name.to_string())),
            ExitSubscription::Done(code) => Ok(code),
            ExitSubscription::Pending(mut rx) => {
                let guard = rx
                    .wait_for(|code| code.is_some())
                    .await
                    .map_err(|_| SupervisorError::NotFound(name.to_string()))?;
                Ok(guard.expect("watch holds a code once the predicate passes"))
            }
        }
    }

    /// Wait for every currently tracked process; returns name→exit code.
    ///
    /// Terminal records answer from stored state, running ones are awaited
    /// concurrently.
    pub async fn wait_for_all(&self) -> Result<BTreeMap<String, i32>> {
        let names: Vec<String> = self.shared.registry.all().into_keys().collect();
        let waits = names.into_iter().map(|name| {
            let sup = self.clone();
            async move {
                let code = sup.wait_for(&name).await?;
                Ok::<_, SupervisorError>((name, code))
            }
        });

        join_all(waits).await.into_iter().collect()
    }

    /// Deliver `signal` to a running process.
    ///
    /// Returns `false` without error when the name is unknown or the
    /// record is not running. Returns `true` as soon as the signal is
    /// delivered; actual termination is observed asynchronously through
    /// the normal exit path, so a pending wait is never cancelled by this.
    pub fn kill(&self, name: &str, sig: Signal) -> Result<bool> {
        let Some(pid) = self.shared.registry.running_pid(name) else {
            return Ok(false);
        };

        signal::kill(Pid::from_raw(pid as i32), sig).map_err(|source| {
            SupervisorError::Signal {
                name: name.to_string(),
                pid,
                signal: sig,
                source,
            }
        })?;

        debug!(process = %name, pid, signal = %sig, "signal delivered");
        Ok(true)
    }

    /// Deliver `signal` to every currently running process, logging and
    /// continuing past individual delivery failures.
    pub fn kill_all(&self, sig: Signal) {
        for (name, pid) in self.shared.registry.running_pids() {
            match signal::kill(Pid::from_raw(pid as i32), sig) {
                Ok(()) => debug!(process = %name, pid, signal = %sig, "signal delivered"),
                Err(err) => {
                    warn!(process = %name, pid, signal = %sig, error = %err, "signal delivery failed");
                }
            }
        }
    }

    /// Snapshot of one process record.
    pub fn process(&self, name: &str) -> Option<ProcessRecord> {
        self.shared.registry.get(name)
    }

    /// Snapshot of every tracked record.
    pub fn processes(&self) -> BTreeMap<String, ProcessRecord> {
        self.shared.registry.all()
    }

    /// Snapshot of the currently running records.
    pub fn running(&self) -> BTreeMap<String, ProcessRecord> {
        self.shared.registry.running()
    }

    /// Captured output of one process, if it is tracked.
    pub fn output(&self, name: &str) -> Option<ProcessOutput> {
        self.shared.registry.get(name).map(|r| r.output())
    }

    /// Drop the history of terminated processes; running ones stay.
    pub fn clear_finished(&self) -> usize {
        self.shared.registry.clear_finished()
    }
}
