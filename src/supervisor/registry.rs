// src/supervisor/registry.rs

//! Name-keyed store of tracked processes.
//!
//! All reads hand out clones of the records, so callers can never mutate
//! supervisor state through a snapshot. Writes go through crate-internal
//! methods used by the spawner's own tasks.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use super::record::{ProcessRecord, ProcessState};

/// Internal per-process entry: the mutable record plus the channel that
/// publishes its terminal exit code to waiters.
#[derive(Debug)]
pub(crate) struct ProcessEntry {
    pub record: ProcessRecord,
    pub exit_tx: watch::Sender<Option<i32>>,
}

/// Outcome of asking the registry for a process's exit notification.
pub(crate) enum ExitSubscription {
    /// Name is not registered.
    Unknown,
    /// Already terminal; the stored exit code answers immediately.
    Done(i32),
    /// Still running; await a value on the receiver. The receiver is
    /// cloned under the registry lock, and `watch` retains the last value,
    /// so a code published in between cannot be missed.
    Pending(watch::Receiver<Option<i32>>),
}

/// Name-keyed registry of process entries.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<HashMap<String, ProcessEntry>>,
    counter: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next value of the process-wide monotonic counter used to derive
    /// default names.
    pub(crate) fn next_ordinal(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a record, resolving name collisions before insertion.
    ///
    /// If the record's name is taken, counter suffixes are appended until
    /// it is unique; an existing entry is never overwritten. Returns the
    /// registered snapshot (with its final name).
    pub(crate) fn register(&self, mut record: ProcessRecord) -> ProcessRecord {
        let mut entries = self.entries.lock().expect("registry lock poisoned");

        let base = record.name.clone();
        while entries.contains_key(&record.name) {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            record.name = format!("{base}_{n}");
        }

        let (exit_tx, _exit_rx) = watch::channel(None);
        let snapshot = record.clone();
        entries.insert(record.name.clone(), ProcessEntry { record, exit_tx });
        snapshot
    }

    /// Run `f` against the entry for `name` while holding the registry
    /// lock. Returns `None` if the name is unknown.
    pub(crate) fn with_entry<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut ProcessEntry) -> R,
    ) -> Option<R> {
        let mut entries = self.entries.lock().expect("registry lock poisoned");
        entries.get_mut(name).map(f)
    }

    /// Atomically decide how a waiter should observe `name`'s exit.
    pub(crate) fn subscribe_exit(&self, name: &str) -> ExitSubscription {
        let entries = self.entries.lock().expect("registry lock poisoned");
        match entries.get(name) {
            None => ExitSubscription::Unknown,
            Some(entry) => match entry.record.exit_code {
                Some(code) => ExitSubscription::Done(code),
                None => ExitSubscription::Pending(entry.exit_tx.subscribe()),
            },
        }
    }

    /// The pid of `name`, only while the record is still running.
    pub(crate) fn running_pid(&self, name: &str) -> Option<u32> {
        let entries = self.entries.lock().expect("registry lock poisoned");
        entries
            .get(name)
            .filter(|e| e.record.state == ProcessState::Running)
            .and_then(|e| e.record.pid)
    }

    /// Names and pids of every currently running record.
    pub(crate) fn running_pids(&self) -> Vec<(String, u32)> {
        let entries = self.entries.lock().expect("registry lock poisoned");
        entries
            .values()
            .filter(|e| e.record.state == ProcessState::Running)
            .filter_map(|e| e.record.pid.map(|pid| (e.record.name.clone(), pid)))
            .collect()
    }

    /// Snapshot of one record.
    pub fn get(&self, name: &str) -> Option<ProcessRecord> {
        let entries = self.entries.lock().expect("registry lock poisoned");
        entries.get(name).map(|e| e.record.clone())
    }

    /// Snapshot of every tracked record, independent of the live map.
    pub fn all(&self) -> BTreeMap<String, ProcessRecord> {
        let entries = self.entries.lock().expect("registry lock poisoned");
        entries
            .values()
            .map(|e| (e.record.name.clone(), e.record.clone()))
            .collect()
    }

    /// Snapshot of the records that are currently running.
    pub fn running(&self) -> BTreeMap<String, ProcessRecord> {
        let entries = self.entries.lock().expect("registry lock poisoned");
        entries
            .values()
            .filter(|e| e.record.state == ProcessState::Running)
            .map(|e| (e.record.name.clone(), e.record.clone()))
            .collect()
    }

    /// Drop records that reached a terminal state; running entries stay so
    /// reaper bookkeeping and pending waits cannot dangle. Returns how
    /// many records were removed.
    pub fn clear_finished(&self) -> usize {
        let mut entries = self.entries.lock().expect("registry lock poisoned");
        let before = entries.len();
        entries.retain(|_, e| !e.record.state.is_terminal());
        before - entries.len()
    }
}
