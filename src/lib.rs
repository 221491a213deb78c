// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod supervisor;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use tracing::{error, info, warn};

pub use crate::errors::{BatchSpawnError, StreamKind, SupervisorError};
pub use crate::supervisor::{
    LineAccumulator, ProcessEvent, ProcessOutput, ProcessRecord, ProcessState, Signal,
    SpawnOptions, SpawnTask, Supervisor,
};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, ProcessConfig};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config + env-file loading
/// - the supervisor
/// - Ctrl-C handling (terminate everything, then report)
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let selected = select_processes(&cfg, &args.only)?;

    if args.dry_run {
        print_dry_run(&cfg, &selected);
        return Ok(());
    }

    let base_env = match &cfg.settings.env_file {
        Some(file) => {
            let path = config_root_dir(&config_path).join(file);
            config::load_env_file(&path)?
        }
        None => BTreeMap::new(),
    };
    let tasks: Vec<SpawnTask> = selected
        .iter()
        .map(|(name, process)| spawn_task_from_config(name, process, &cfg, &base_env))
        .collect();

    let supervisor = Supervisor::new();

    // On Ctrl-C, terminate everything; pending waits resolve through the
    // normal exit path once the children are gone.
    {
        let sup = supervisor.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("interrupt received, terminating all processes");
            sup.kill_all(Signal::SIGTERM);
        });
    }

    let launch_failed = match supervisor.spawn_multiple(tasks).await {
        Ok(records) => {
            info!(count = records.len(), "all processes launched");
            false
        }
        Err(batch) => {
            for (name, err) in &batch.failures {
                error!(process = %name, error = %err, "launch failed");
            }
            if batch.spawned.is_empty() {
                return Err(batch.into());
            }
            warn!(
                launched = batch.spawned.len(),
                failed = batch.failures.len(),
                "continuing with the processes that did launch"
            );
            true
        }
    };

    let codes = supervisor.wait_for_all().await?;
    let mut any_nonzero = false;
    for (name, code) in &codes {
        if *code == 0 {
            info!(process = %name, "exited cleanly");
        } else {
            warn!(process = %name, exit_code = code, "exited with failure");
            any_nonzero = true;
        }
    }

    if launch_failed || any_nonzero {
        bail!("one or more processes failed");
    }
    Ok(())
}

/// Map one `[process.<name>]` section onto a spawn task, merging the
/// env-file variables beneath the per-process overrides.
fn spawn_task_from_config(
    name: &str,
    process: &ProcessConfig,
    cfg: &ConfigFile,
    base_env: &BTreeMap<String, String>,
) -> SpawnTask {
    let mut env = base_env.clone();
    env.extend(process.env.clone());

    SpawnTask {
        name: Some(name.to_string()),
        command: process.cmd.clone(),
        args: process.args.clone(),
        options: SpawnOptions {
            label: Some(name.to_string()),
            stream_output: process.effective_stream_output(&cfg.settings),
            prefix_output: process.effective_prefix_output(&cfg.settings),
            capture_output: process.effective_capture_output(&cfg.settings),
            cwd: process.cwd.clone().map(PathBuf::from),
            env,
            use_shell: process.use_shell,
        },
    }
}

/// Apply `--only` filtering, rejecting unknown names.
fn select_processes(
    cfg: &ConfigFile,
    only: &[String],
) -> Result<BTreeMap<String, ProcessConfig>> {
    if only.is_empty() {
        return Ok(cfg.process.clone());
    }

    let mut selected = BTreeMap::new();
    for name in only {
        let process = cfg
            .process
            .get(name)
            .ok_or_else(|| anyhow!("--only references unknown process '{name}'"))?;
        selected.insert(name.clone(), process.clone());
    }
    Ok(selected)
}

/// Directory the config file lives in; env-file paths resolve against it.
fn config_root_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Simple dry-run output: the selected processes and their effective
/// options, after `--only` filtering.
fn print_dry_run(cfg: &ConfigFile, selected: &BTreeMap<String, ProcessConfig>) {
    println!("procmux dry-run");
    if let Some(ref env_file) = cfg.settings.env_file {
        println!("  settings.env_file = {env_file}");
    }
    println!();

    println!("processes ({}):", selected.len());
    for (name, process) in selected.iter() {
        println!("  - {name}");
        println!("      cmd: {}", process.cmd);
        if !process.args.is_empty() {
            println!("      args: {:?}", process.args);
        }
        if let Some(ref cwd) = process.cwd {
            println!("      cwd: {cwd}");
        }
        if !process.env.is_empty() {
            println!("      env: {:?}", process.env);
        }
        println!(
            "      stream: {}, prefix: {}, capture: {}, shell: {}",
            process.effective_stream_output(&cfg.settings),
            process.effective_prefix_output(&cfg.settings),
            process.effective_capture_output(&cfg.settings),
            process.use_shell,
        );
    }
}
