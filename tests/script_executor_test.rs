use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use scriptbridge::{
    interpreter::{EmbeddedInterpreter, EvaluationError},
    verify, ArtifactConvention, RunError, ScriptExecutor, VerifyError,
};
use tempfile::TempDir;

/// Copy a fixture into a scratch directory so the artifact lands beside it.
fn stage(fixture: &str) -> Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let src = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(fixture);
    let dst = dir.path().join(fixture);
    fs::copy(&src, &dst)?;
    Ok((dir, dst))
}

fn jmx() -> ArtifactConvention {
    ArtifactConvention::new("jmx")
}

#[test]
fn test_embedded_script_generates_file() -> Result<()> {
    let (dir, script) = stage("simpleCode.rhai")?;
    let exec = ScriptExecutor::new(EmbeddedInterpreter::new().working_dir(dir.path()));

    exec.run(&script)?;

    let artifact = jmx().derive(&script);
    assert!(artifact.exists(), "missing {}", artifact.display());
    assert_eq!(fs::metadata(&artifact)?.len(), 0);
    Ok(())
}

#[test]
fn test_embedded_script_generates_jmx_plan() -> Result<()> {
    let (dir, script) = stage("simpleJmx.rhai")?;
    let exec = ScriptExecutor::new(EmbeddedInterpreter::new().working_dir(dir.path()));

    let artifact = verify(&exec, &jmx(), &script)?;

    assert_eq!(artifact, dir.path().join("simpleJmx.jmx"));
    let body = fs::read_to_string(&artifact)?;
    assert!(body.contains("<jmeterTestPlan"));
    assert!(body.contains(r#"<stringProp name="ThreadGroup.num_threads">1</stringProp>"#));
    Ok(())
}

#[test]
fn test_embedded_undefined_symbol_fails_without_artifact() -> Result<()> {
    let (dir, script) = stage("undefinedSymbol.rhai")?;
    let exec = ScriptExecutor::new(EmbeddedInterpreter::new().working_dir(dir.path()));

    match exec.run(&script) {
        Err(RunError::Evaluation(EvaluationError::Script(msg))) => {
            assert!(msg.contains("missing_threads"), "Got: {}", msg);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!dir.path().join("undefinedSymbol.jmx").exists());
    Ok(())
}

#[test]
fn test_missing_script_is_io_error_every_time() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let exec = ScriptExecutor::new(EmbeddedInterpreter::new().working_dir(dir.path()));
    let script = dir.path().join("nonexistent").join("path.script");

    for _ in 0..2 {
        let err = exec.run(&script).unwrap_err();
        assert!(err.is_io(), "Got: {:?}", err);
        assert!(err.to_string().contains("path.script"), "Got: {}", err);
    }
    assert_eq!(fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[test]
fn test_verify_surfaces_run_failure() -> Result<()> {
    let exec = ScriptExecutor::new(EmbeddedInterpreter::new());
    let err = verify(&exec, &jmx(), "/nonexistent/path.script").unwrap_err();
    assert!(matches!(err, VerifyError::Run(RunError::Io { .. })), "Got: {:?}", err);
    Ok(())
}

#[cfg(unix)]
mod process {
    use super::*;
    use scriptbridge::interpreter::ProcessInterpreter;
    use std::time::Duration;

    fn sh_in(dir: &Path) -> ProcessInterpreter {
        ProcessInterpreter::new("sh").args(["-s"]).working_dir(dir)
    }

    #[test]
    fn test_shell_script_generates_file() -> Result<()> {
        let (dir, script) = stage("simpleCode.sh")?;
        let exec = ScriptExecutor::new(sh_in(dir.path()));

        let artifact = verify(&exec, &jmx(), &script)?;

        assert_eq!(artifact, dir.path().join("simpleCode.jmx"));
        Ok(())
    }

    #[test]
    fn test_shell_failure_keeps_interpreter_message() -> Result<()> {
        let (dir, script) = stage("undefinedSymbol.sh")?;
        let exec = ScriptExecutor::new(sh_in(dir.path()));

        match exec.run(&script) {
            Err(RunError::Evaluation(EvaluationError::Raised { code, stderr })) => {
                assert_ne!(code, Some(0));
                assert!(stderr.contains("missing_threads_command_4f1c"), "Got: {}", stderr);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!dir.path().join("undefinedSymbol.jmx").exists());
        Ok(())
    }

    #[test]
    fn test_shell_script_deadline() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let script = dir.path().join("slow.sh");
        fs::write(&script, "sleep 5\n: > slow.jmx\n")?;
        let exec = ScriptExecutor::new(sh_in(dir.path()).timeout(Duration::from_millis(200)));

        let err = exec.run(&script).unwrap_err();

        assert!(
            matches!(err, RunError::Evaluation(EvaluationError::TimedOut(_))),
            "Got: {:?}",
            err
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_run_from_async_caller() -> Result<()> {
        let (dir, script) = stage("simpleCode.sh")?;
        let exec = ScriptExecutor::new(sh_in(dir.path()));

        exec.run(&script)?;

        assert!(dir.path().join("simpleCode.jmx").exists());
        Ok(())
    }
}
