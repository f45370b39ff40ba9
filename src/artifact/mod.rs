//! Output artifact checks performed by the caller after a run.
//!
//! The executor knows nothing about artifacts. A script is expected to leave
//! a sibling file with the same stem and a different extension
//! (`simpleJmx.rb` -> `simpleJmx.jmx`); this module derives that path and
//! checks it only once the run has succeeded.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{
    executor::{RunError, ScriptExecutor},
    interpreter::Interpreter,
};

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error("expected output artifact {} was not produced", .0.display())]
    Missing(PathBuf),

    #[error("output artifact would be the script itself: {}", .0.display())]
    SameAsScript(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactConvention {
    extension: String,
}

impl ArtifactConvention {
    pub fn new(extension: impl AsRef<str>) -> Self {
        Self {
            extension: extension.as_ref().trim_start_matches('.').to_string(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path of the artifact expected next to `script`.
    pub fn derive(&self, script: impl AsRef<Path>) -> PathBuf {
        script.as_ref().with_extension(&self.extension)
    }
}

/// Run `script` and confirm its artifact exists.
///
/// A failed run is reported as-is and the file system is left untouched,
/// since a failing script may have written partial output.
pub fn verify<I: Interpreter>(
    executor: &ScriptExecutor<I>,
    convention: &ArtifactConvention,
    script: impl AsRef<Path>,
) -> Result<PathBuf, VerifyError> {
    let script = script.as_ref();
    let artifact = convention.derive(script);
    if artifact == script {
        return Err(VerifyError::SameAsScript(artifact));
    }

    executor.run(script)?;

    if artifact.is_file() {
        tracing::debug!(artifact = %artifact.display(), "output artifact present");
        Ok(artifact)
    } else {
        Err(VerifyError::Missing(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::EmbeddedInterpreter;
    use std::fs;

    #[test]
    fn test_derive_swaps_extension() {
        let conv = ArtifactConvention::new("jmx");
        assert_eq!(
            conv.derive("target/RubyExecutor/simpleJmx.rb"),
            PathBuf::from("target/RubyExecutor/simpleJmx.jmx")
        );
        assert_eq!(conv.derive("noext"), PathBuf::from("noext.jmx"));
    }

    #[test]
    fn test_leading_dot_is_ignored() {
        assert_eq!(ArtifactConvention::new(".txt").extension(), "txt");
    }

    #[test]
    fn test_verify_reports_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("quiet.rhai");
        fs::write(&script, "let a = 1;").unwrap();

        let exec = ScriptExecutor::new(EmbeddedInterpreter::new());
        let err = verify(&exec, &ArtifactConvention::new("jmx"), &script).unwrap_err();
        match err {
            VerifyError::Missing(p) => assert_eq!(p, dir.path().join("quiet.jmx")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_verify_does_not_look_after_failed_run() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("partial.rhai");
        let artifact = dir.path().join("partial.jmx");
        fs::write(
            &script,
            format!("touch({:?}); throw \"half done\";", artifact.to_string_lossy()),
        )
        .unwrap();

        let exec = ScriptExecutor::new(EmbeddedInterpreter::new());
        let err = verify(&exec, &ArtifactConvention::new("jmx"), &script).unwrap_err();
        assert!(matches!(err, VerifyError::Run(RunError::Evaluation(_))), "Got: {:?}", err);
    }

    #[test]
    fn test_artifact_matching_script_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("quiet.rhai");
        let marker = dir.path().join("ran.txt");
        fs::write(&script, format!("touch({:?});", marker.to_string_lossy())).unwrap();

        let exec = ScriptExecutor::new(EmbeddedInterpreter::new());
        let err = verify(&exec, &ArtifactConvention::new("rhai"), &script).unwrap_err();
        match err {
            VerifyError::SameAsScript(p) => assert_eq!(p, script),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!marker.exists(), "script should not run");
    }
}
