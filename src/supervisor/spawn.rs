// src/supervisor/spawn.rs

//! Launching child processes and wiring their output streams.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::errors::{StreamKind, SupervisorError};

use super::Shared;
use super::events::ProcessEvent;
use super::lines::LineAccumulator;
use super::record::{ProcessRecord, ProcessState};

/// Per-spawn configuration.
///
/// Defaults mirror interactive use: stream child output through with a
/// name prefix, capture nothing.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    /// Registry name for the process. Defaults to `<command>_<N>` with a
    /// process-wide counter; collisions get a further counter suffix.
    pub label: Option<String>,
    /// Pass child output through for real-time visibility (default true).
    /// Without capture this uses inherited stdio, so colors and TTY
    /// detection in the child survive.
    pub stream_output: bool,
    /// Tag streamed lines with `[name]` (default true; piped mode only).
    pub prefix_output: bool,
    /// Retain completed lines for later retrieval (default false).
    ///
    /// Capture forces piped stdio: lines are reassembled and re-printed,
    /// which loses native TTY passthrough in the child.
    pub capture_output: bool,
    /// Working directory for the child.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables for the child.
    pub env: BTreeMap<String, String>,
    /// Run the command through the platform shell (`sh -c` / `cmd /C`).
    pub use_shell: bool,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            label: None,
            stream_output: true,
            prefix_output: true,
            capture_output: false,
            cwd: None,
            env: BTreeMap::new(),
            use_shell: false,
        }
    }
}

/// How the child's stdio ends up wired.
///
/// Capture needs pipes; streaming without capture inherits the terminal;
/// neither means the output goes nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IoMode {
    Inherit,
    Piped,
    Null,
}

impl SpawnOptions {
    fn io_mode(&self) -> IoMode {
        if self.capture_output {
            IoMode::Piped
        } else if self.stream_output {
            IoMode::Inherit
        } else {
            IoMode::Null
        }
    }
}

/// One entry in a `spawn_multiple` batch.
#[derive(Debug, Clone)]
pub struct SpawnTask {
    /// Registry name; falls back to `options.label`, then to a derived one.
    pub name: Option<String>,
    pub command: String,
    pub args: Vec<String>,
    pub options: SpawnOptions,
}

impl SpawnTask {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            name: None,
            command: command.into(),
            args: Vec::new(),
            options: SpawnOptions::default(),
        }
    }

    /// Name used to key a launch failure in the batch error.
    pub(crate) fn requested_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.options.label.clone())
            .unwrap_or_else(|| self.command.clone())
    }

    pub(crate) fn into_parts(self) -> (String, Vec<String>, SpawnOptions) {
        let mut options = self.options;
        if self.name.is_some() {
            options.label = self.name;
        }
        (self.command, self.args, options)
    }
}

/// Launch one process, register it, and wire up its readers and reaper.
///
/// The record is registered before the `Spawned` event fires, so any
/// subscriber reacting to the event can already find it. On launch failure
/// nothing is registered: the record goes `Failed`, an `Error` event is
/// emitted, and the `Launch` error is returned.
pub(crate) async fn spawn_process(
    shared: Arc<Shared>,
    command: &str,
    args: &[String],
    options: SpawnOptions,
) -> Result<ProcessRecord, SupervisorError> {
    let display_cmd = display_command(command, args);
    let name = options
        .label
        .clone()
        .unwrap_or_else(|| format!("{}_{}", command_stem(command), shared.registry.next_ordinal()));

    let mut cmd = build_command(command, args, &options);
    match options.io_mode() {
        IoMode::Inherit => {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        IoMode::Piped => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        IoMode::Null => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
    }
    cmd.kill_on_drop(true);

    let mut record = ProcessRecord::new(name, display_cmd.clone());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            record.state = ProcessState::Failed;
            record.ended_at = Some(Utc::now());
            warn!(process = %record.name, command = %display_cmd, error = %source, "launch refused");

            // io::Error is not Clone; the event carries a reconstructed copy.
            let event_source = std::io::Error::new(source.kind(), source.to_string());
            shared.bus.emit(ProcessEvent::Error {
                name: record.name.clone(),
                error: Arc::new(SupervisorError::Launch {
                    command: display_cmd.clone(),
                    source: event_source,
                }),
            });
            return Err(SupervisorError::Launch {
                command: display_cmd,
                source,
            });
        }
    };

    record.state = ProcessState::Running;
    record.pid = child.id();

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let snapshot = shared.registry.register(record);
    info!(process = %snapshot.name, pid = ?snapshot.pid, "process started");
    shared.bus.emit(ProcessEvent::Spawned {
        record: snapshot.clone(),
    });

    let reap_shared = Arc::clone(&shared);
    let reap_name = snapshot.name.clone();
    tokio::spawn(async move {
        run_to_exit(reap_shared, reap_name, child, stdout, stderr, options).await;
    });

    Ok(snapshot)
}

/// Drive both stream readers to EOF, then reap the child and perform the
/// terminal transition. Joining the readers first guarantees every line,
/// including flushed fragments, is delivered before the `Exited` event.
async fn run_to_exit(
    shared: Arc<Shared>,
    name: String,
    mut child: Child,
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
    options: SpawnOptions,
) {
    let out_task = stdout.map(|stream| {
        let shared = Arc::clone(&shared);
        let name = name.clone();
        let options = options.clone();
        tokio::spawn(async move {
            read_stream(shared, name, StreamKind::Stdout, stream, options).await;
        })
    });
    let err_task = stderr.map(|stream| {
        let shared = Arc::clone(&shared);
        let name = name.clone();
        let options = options.clone();
        tokio::spawn(async move {
            read_stream(shared, name, StreamKind::Stderr, stream, options).await;
        })
    });

    if let Some(task) = out_task {
        let _ = task.await;
    }
    if let Some(task) = err_task {
        let _ = task.await;
    }

    let code = match child.wait().await {
        Ok(status) => exit_code(status),
        Err(err) => {
            warn!(process = %name, error = %err, "waiting on child failed");
            -1
        }
    };

    let finished = shared.registry.with_entry(&name, |entry| {
        entry.record.state = ProcessState::Terminated;
        entry.record.exit_code = Some(code);
        entry.record.ended_at = Some(Utc::now());
        let _ = entry.exit_tx.send(Some(code));
        // Emitted inside the same critical section: the record is terminal
        // before any subscriber can observe the exit.
        shared.bus.emit(ProcessEvent::Exited {
            name: name.clone(),
            code,
        });
    });

    match finished {
        Some(()) => info!(process = %name, exit_code = code, "process exited"),
        None => warn!(process = %name, exit_code = code, "exited but no longer registered"),
    }
}

/// Consume one stream chunk-wise, reassembling and delivering lines, and
/// flush the trailing fragment at EOF.
async fn read_stream(
    shared: Arc<Shared>,
    name: String,
    stream: StreamKind,
    mut source: impl AsyncRead + Unpin,
    options: SpawnOptions,
) {
    let mut acc = LineAccumulator::new();
    let mut buf = [0u8; 8192];

    loop {
        match source.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for line in acc.push(&buf[..n]) {
                    deliver_line(&shared, &name, stream, line, &options);
                }
            }
            Err(source) => {
                warn!(process = %name, %stream, error = %source, "stream read error");
                shared.bus.emit(ProcessEvent::Error {
                    name: name.clone(),
                    error: Arc::new(SupervisorError::Stream {
                        name: name.clone(),
                        stream,
                        source,
                    }),
                });
                break;
            }
        }
    }

    if let Some(line) = acc.flush() {
        deliver_line(&shared, &name, stream, line, &options);
    }
}

/// Capture, stream and announce one completed line.
fn deliver_line(
    shared: &Shared,
    name: &str,
    stream: StreamKind,
    line: String,
    options: &SpawnOptions,
) {
    if options.capture_output {
        shared.registry.with_entry(name, |entry| match stream {
            StreamKind::Stdout => entry.record.stdout.push(line.clone()),
            StreamKind::Stderr => entry.record.stderr.push(line.clone()),
        });
    }

    if options.stream_output {
        match (stream, options.prefix_output) {
            (StreamKind::Stdout, true) => println!("[{name}] {line}"),
            (StreamKind::Stdout, false) => println!("{line}"),
            (StreamKind::Stderr, true) => eprintln!("[{name}] {line}"),
            (StreamKind::Stderr, false) => eprintln!("{line}"),
        }
    } else {
        debug!(process = %name, %stream, "{line}");
    }

    let event = match stream {
        StreamKind::Stdout => ProcessEvent::Stdout {
            name: name.to_string(),
            line,
        },
        StreamKind::Stderr => ProcessEvent::Stderr {
            name: name.to_string(),
            line,
        },
    };
    shared.bus.emit(event);
}

/// Build a command appropriate for the options and platform.
fn build_command(command: &str, args: &[String], options: &SpawnOptions) -> Command {
    let mut cmd = if options.use_shell {
        let full = shell_command_line(command, args);
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(full);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(full);
            c
        }
    } else {
        let mut c = Command::new(command);
        c.args(args);
        c
    };

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &options.env {
        cmd.env(key, value);
    }
    cmd
}

/// Map an exit status to a concrete code: the real code when there is one,
/// `128 + signal` for signal deaths on Unix, `-1` otherwise.
fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    status.code().unwrap_or(-1)
}

/// Command line handed to the shell: `command` is passed through verbatim
/// (it may itself be a full shell one-liner), `args` are quoted so an
/// argument containing whitespace keeps its word boundary.
fn shell_command_line(command: &str, args: &[String]) -> String {
    let mut full = command.to_string();
    for arg in args {
        full.push(' ');
        full.push_str(&shell_quote(arg));
    }
    full
}

/// Single-quote `arg` for `sh -c` unless it is plain enough to pass bare.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"_-./:=@%+,".contains(&b));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Last path component of the command, for derived names.
fn command_stem(command: &str) -> String {
    Path::new(command)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| command.to_string())
}

/// Human-readable command line for labels and error messages.
fn display_command(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, args.join(" "))
    }
}
