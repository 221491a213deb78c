use std::error::Error;
use std::fs;

use procmux::cli::CliArgs;
use procmux::config::{load_and_validate, load_env_file, parse_env};

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("Procmux.toml");
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn parses_settings_and_process_overrides() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_config(
        &dir,
        r#"
        [settings]
        capture_output = true
        prefix_output = false

        [process.web]
        cmd = "python3 -m http.server"
        cwd = "site"
        env = { PORT = "8000" }

        [process.worker]
        cmd = "worker"
        args = ["--queue", "default"]
        use_shell = false
        capture_output = false
        "#,
    );

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.process.len(), 2);

    let web = &cfg.process["web"];
    assert!(web.use_shell);
    assert_eq!(web.cwd.as_deref(), Some("site"));
    assert_eq!(web.env["PORT"], "8000");
    assert!(web.effective_capture_output(&cfg.settings));
    assert!(!web.effective_prefix_output(&cfg.settings));
    assert!(web.effective_stream_output(&cfg.settings));

    let worker = &cfg.process["worker"];
    assert!(!worker.use_shell);
    assert_eq!(worker.args, vec!["--queue", "default"]);
    assert!(!worker.effective_capture_output(&cfg.settings));
    Ok(())
}

#[test]
fn config_without_processes_is_rejected() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_config(&dir, "[settings]\ncapture_output = true\n");

    let err = load_and_validate(&path).expect_err("empty config must fail");
    assert!(err.to_string().contains("at least one [process.<name>]"));
    Ok(())
}

#[test]
fn empty_cmd_is_rejected() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_config(&dir, "[process.broken]\ncmd = \"  \"\n");

    let err = load_and_validate(&path).expect_err("empty cmd must fail");
    assert!(err.to_string().contains("empty `cmd`"));
    Ok(())
}

#[test]
fn multiword_cmd_with_args_without_shell_is_rejected() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_config(
        &dir,
        r#"
        [process.confused]
        cmd = "worker --fast"
        args = ["--queue", "default"]
        use_shell = false
        "#,
    );

    assert!(load_and_validate(&path).is_err());
    Ok(())
}

#[tokio::test]
async fn dry_run_applies_only_filtering() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_config(
        &dir,
        "[process.web]\ncmd = \"true\"\n\n[process.worker]\ncmd = \"true\"\n",
    );

    let args = CliArgs {
        config: path.to_string_lossy().into_owned(),
        only: vec!["ghost".to_string()],
        log_level: None,
        dry_run: true,
    };
    let err = procmux::run(args).await.expect_err("unknown name must fail");
    assert!(err.to_string().contains("unknown process 'ghost'"));

    let args = CliArgs {
        config: path.to_string_lossy().into_owned(),
        only: vec!["web".to_string()],
        log_level: None,
        dry_run: true,
    };
    procmux::run(args).await?;
    Ok(())
}

#[test]
fn env_file_parsing_handles_common_shapes() {
    let vars = parse_env(
        "# comment\n\
         \n\
         PLAIN=value\n\
         export EXPORTED=yes\n\
         QUOTED=\"with spaces\"\n\
         SINGLE='single'\n\
         EMPTY=\n\
         malformed line\n\
         SPACED = padded \n",
    );

    assert_eq!(vars["PLAIN"], "value");
    assert_eq!(vars["EXPORTED"], "yes");
    assert_eq!(vars["QUOTED"], "with spaces");
    assert_eq!(vars["SINGLE"], "single");
    assert_eq!(vars["EMPTY"], "");
    assert_eq!(vars["SPACED"], "padded");
    assert_eq!(vars.len(), 6, "malformed line must be skipped");
}

#[test]
fn env_file_loads_from_disk() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(".env");
    fs::write(&path, "A=1\nB=2\n")?;

    let vars = load_env_file(&path)?;
    assert_eq!(vars["A"], "1");
    assert_eq!(vars["B"], "2");
    Ok(())
}
