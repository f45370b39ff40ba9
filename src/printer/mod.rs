//! Printers: colored status line and JSON run reports.

use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use serde::Serialize;

use crate::interpreter::InterpreterKind;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub script: PathBuf,
    pub engine: InterpreterKind,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn succeeded(script: &Path, engine: InterpreterKind, artifact: Option<PathBuf>) -> Self {
        Self {
            script: script.to_path_buf(),
            engine,
            outcome: Outcome::Succeeded,
            artifact,
            error: None,
        }
    }

    pub fn failed(script: &Path, engine: InterpreterKind, error: &dyn std::error::Error) -> Self {
        Self {
            script: script.to_path_buf(),
            engine,
            outcome: Outcome::Failed,
            artifact: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded)
    }
}

pub struct TextPrinter {
    pub color: bool,
}

impl TextPrinter {
    pub fn print(&self, report: &RunReport) {
        let line = self.render(report);
        if report.is_success() {
            println!("{}", line);
        } else {
            eprintln!("{}", line);
        }
    }

    fn render(&self, report: &RunReport) -> String {
        let script = report.script.display();
        match (&report.outcome, self.color) {
            (Outcome::Succeeded, color) => {
                let tag = if color { format!("{}", "ok".green()) } else { "ok".to_string() };
                match &report.artifact {
                    Some(a) => format!("{} {} -> {}", tag, script, a.display()),
                    None => format!("{} {}", tag, script),
                }
            }
            (Outcome::Failed, color) => {
                let tag = if color { format!("{}", "failed".red()) } else { "failed".to_string() };
                format!("{} {}: {}", tag, script, report.error.as_deref().unwrap_or(""))
            }
        }
    }
}

pub struct JsonPrinter;

impl JsonPrinter {
    pub fn print(&self, report: &RunReport) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string_pretty(report)?);
        Ok(())
    }
}
