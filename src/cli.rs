use std::path::PathBuf;

use clap::{ArgAction, Parser};

use scriptbridge::interpreter::InterpreterKind;

#[derive(Parser, Debug, Clone)]
#[command(name = "scriptbridge", about = "Run a script in an interpreter and check its output", version)]
pub struct Cli {
    /// Script file to execute.
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Interpreter host: an external binary (process) or the built-in rhai engine (embedded).
    #[arg(long, value_enum)]
    pub engine: Option<InterpreterKind>,

    /// Interpreter binary for the process engine. It must read the program from stdin.
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Extra argument passed to the interpreter binary.
    /// Can be used multiple times: --interpreter-arg -s --interpreter-arg -e
    #[arg(long = "interpreter-arg", action = ArgAction::Append, allow_hyphen_values = true)]
    pub interpreter_args: Vec<String>,

    /// Abort the script after this many seconds (default: wait forever).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory the script runs in; relative output paths resolve against it.
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// After a successful run, require SCRIPT with this extension to exist (e.g. jmx).
    #[arg(long = "expect-ext", value_name = "EXT")]
    pub expect_ext: Option<String>,

    /// Print a JSON report instead of a status line.
    #[arg(long)]
    pub json: bool,

    /// Disable colored output.
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
