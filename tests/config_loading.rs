use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use taskdag::config::{load_and_validate, load_task_spec};
use taskdag::{DecompositionError, TaskStatus, TaskdagError, run_from_files};
use taskdag_test_utils::{RecordingExecutor, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const CONFIG: &str = r#"
[scheduler]
max_parallel_tasks = 2
subtask_timeout = "2s"
"#;

const REPORT_SPEC: &str = r#"
name = "Generate report"
description = "collect, analyze, publish"

[[subtasks]]
id = "collect_data"
description = "Pull rows from both databases"
action = { type = "collect_data", params = { sources = ["db1", "db2"] } }

[[subtasks]]
id = "analyze_data"
action = { type = "analyze_data" }
after = ["collect_data"]

[[subtasks]]
id = "publish"
action = { type = "publish" }
after = ["analyze_data"]
"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::io::Result<std::path::PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

#[test]
fn scheduler_config_loads_from_toml() -> TestResult {
    let dir = TempDir::new()?;
    let path = write(&dir, "Taskdag.toml", CONFIG)?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.max_parallel_tasks, 2);
    assert_eq!(cfg.subtask_timeout, Some(Duration::from_secs(2)));

    Ok(())
}

#[test]
fn invalid_config_is_a_config_error() -> TestResult {
    let dir = TempDir::new()?;
    let path = write(&dir, "Taskdag.toml", "[scheduler]\nmax_parallel_tasks = 0\n")?;

    assert!(matches!(
        load_and_validate(&path),
        Err(TaskdagError::ConfigError(_))
    ));

    let path = write(&dir, "broken.toml", "[scheduler\n")?;
    assert!(matches!(load_and_validate(&path), Err(TaskdagError::TomlError(_))));

    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(
        load_task_spec("/definitely/not/here.toml"),
        Err(TaskdagError::IoError(_))
    ));
}

#[test]
fn task_spec_loads_subtasks_with_after_alias() -> TestResult {
    let dir = TempDir::new()?;
    let path = write(&dir, "report.toml", REPORT_SPEC)?;

    let spec = load_task_spec(&path)?;
    assert_eq!(spec.name, "Generate report");

    let subtasks = spec.subtasks.ok_or("no subtasks")?;
    assert_eq!(subtasks.len(), 3);
    assert_eq!(
        subtasks[0].description.as_deref(),
        Some("Pull rows from both databases")
    );
    assert_eq!(subtasks[0].action.params["sources"][1], "db2");
    assert!(subtasks[1].dependencies.contains("collect_data"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_from_files_drives_task_to_completion() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let config = write(&dir, "Taskdag.toml", CONFIG)?;
    let spec = write(&dir, "report.toml", REPORT_SPEC)?;

    let exec = RecordingExecutor::new();
    let view = with_timeout(run_from_files(&config, &spec, Arc::new(exec.clone()))).await?;

    assert_eq!(view.status, TaskStatus::Completed);
    assert_eq!(view.total_subtasks, 3);
    assert_eq!(exec.started(), vec!["collect_data", "analyze_data", "publish"]);

    Ok(())
}

#[tokio::test]
async fn steps_spec_from_toml_uses_automatic_decomposition() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let config = write(&dir, "Taskdag.toml", "")?;
    let spec = write(
        &dir,
        "steps.toml",
        r#"
name = "steps"

[[steps]]
action = { type = "fetch" }

[[steps]]
action = { type = "resize" }
parallel = true

[[steps]]
action = { type = "upload" }
"#,
    )?;

    let exec = RecordingExecutor::new();
    let view = with_timeout(run_from_files(&config, &spec, Arc::new(exec.clone()))).await?;

    assert_eq!(view.status, TaskStatus::Completed);
    let started = exec.started();
    assert_eq!(started.len(), 3);
    let upload = started.iter().position(|k| k == "upload").ok_or("upload missing")?;
    let resize = started.iter().position(|k| k == "resize").ok_or("resize missing")?;
    assert!(upload > resize, "upload must wait for resize: {started:?}");

    Ok(())
}

#[tokio::test]
async fn cyclic_spec_file_fails_at_submit() -> TestResult {
    let dir = TempDir::new()?;
    let config = write(&dir, "Taskdag.toml", CONFIG)?;
    let spec = write(
        &dir,
        "cycle.toml",
        r#"
name = "cycle"

[[subtasks]]
id = "A"
after = ["B"]

[[subtasks]]
id = "B"
after = ["A"]
"#,
    )?;

    let result = run_from_files(&config, &spec, Arc::new(RecordingExecutor::new())).await;
    assert!(matches!(
        result,
        Err(TaskdagError::Decomposition(
            DecompositionError::CyclicDependency { .. }
        ))
    ));

    Ok(())
}
