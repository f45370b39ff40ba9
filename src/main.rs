mod cli;

use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scriptbridge::{
    config::Config,
    interpreter,
    printer::{JsonPrinter, RunReport, TextPrinter},
    verify, ArtifactConvention, ScriptExecutor,
};

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let default_filter = match args.verbose {
        0 => "scriptbridge=error",
        1 => "scriptbridge=debug",
        _ => "scriptbridge=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load config, then let CLI flags override it
    let cfg = Config::load();
    tracing::debug!(config = %cfg.config_path.display(), "configuration loaded");
    let mut settings = cfg
        .interpreter_settings()
        .context("invalid interpreter configuration")?;
    if let Some(kind) = args.engine {
        settings.kind = kind;
    }
    if let Some(program) = &args.interpreter {
        settings.program = program.clone();
    }
    if !args.interpreter_args.is_empty() {
        settings.args = args.interpreter_args.clone();
    }
    if let Some(secs) = args.timeout {
        settings.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if let Some(dir) = &args.workdir {
        settings.working_dir = Some(dir.clone());
    }
    let expect_ext = args.expect_ext.clone().or_else(|| cfg.artifact_extension());

    let executor = ScriptExecutor::new(interpreter::build(&settings));
    let outcome = match &expect_ext {
        Some(ext) => verify(&executor, &ArtifactConvention::new(ext), &args.script).map(Some),
        None => executor.run(&args.script).map(|()| None).map_err(Into::into),
    };

    let report = match &outcome {
        Ok(artifact) => RunReport::succeeded(&args.script, settings.kind, artifact.clone()),
        Err(err) => RunReport::failed(&args.script, settings.kind, err),
    };
    if args.json {
        JsonPrinter.print(&report)?;
    } else {
        TextPrinter { color: !args.no_color }.print(&report);
    }

    // The report already carries the error; exit without a second message.
    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
