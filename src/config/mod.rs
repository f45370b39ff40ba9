use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;

use crate::interpreter::{InterpreterKind, InterpreterSettings};

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(default_config_path())
    }

    /// Defaults, then `KEY=VALUE` lines from `config_path`, then environment.
    pub fn load_from(config_path: PathBuf) -> Self {
        let mut map = default_map();

        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(|l| l.ok()) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).filter(|v| !v.is_empty()).cloned()
    }

    /// `None` when unset; a value that is not a number is an error.
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        self.get(key)
            .map(|v| {
                v.parse::<u64>()
                    .with_context(|| format!("{key} must be a whole number, got {v:?}"))
            })
            .transpose()
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    pub fn engine(&self) -> Result<InterpreterKind> {
        let raw = self.get("SCRIPT_ENGINE").unwrap_or_else(|| "process".into());
        raw.parse::<InterpreterKind>().map_err(|e| anyhow!(e))
    }

    /// `SCRIPT_TIMEOUT` in seconds; `0` means no deadline.
    pub fn timeout(&self) -> Result<Option<Duration>> {
        Ok(self
            .get_u64("SCRIPT_TIMEOUT")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs))
    }

    pub fn interpreter_settings(&self) -> Result<InterpreterSettings> {
        Ok(InterpreterSettings {
            kind: self.engine()?,
            program: self.get("SCRIPT_INTERPRETER").unwrap_or_else(|| "ruby".into()),
            args: self
                .get("SCRIPT_INTERPRETER_ARGS")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            timeout: self.timeout()?,
            working_dir: self.get_path("SCRIPT_WORKDIR"),
        })
    }

    pub fn artifact_extension(&self) -> Option<String> {
        self.get("ARTIFACT_EXTENSION")
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "SCRIPT_ENGINE",
        "SCRIPT_INTERPRETER",
        "SCRIPT_INTERPRETER_ARGS",
        "SCRIPT_TIMEOUT",
        "SCRIPT_WORKDIR",
        "ARTIFACT_EXTENSION",
    ];

    KEYS.contains(&k)
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    config_file_in(&base)
}

fn config_file_in(base: &Path) -> PathBuf {
    base.join("scriptbridge").join(".scriptbridgerc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("SCRIPT_ENGINE".into(), "process".into());
    m.insert("SCRIPT_INTERPRETER".into(), "ruby".into());
    m.insert("SCRIPT_TIMEOUT".into(), "0".into());
    m
}
