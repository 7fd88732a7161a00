//! Dispatch configuration (TOML).

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::outcome::SolverId;
use crate::core::sentinel::CompletionPolicy;

/// Dispatcher configuration.
///
/// Missing fields take their defaults. The solver list has no useful default
/// and is normally supplied by `--solvers` / `SOLVERS` at start-up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Solver executables run for every request.
    pub solvers: Vec<SolverId>,

    /// How a solver signals a finished solve.
    pub policy: CompletionPolicy,

    /// Wall-clock budget per solver process in seconds.
    pub solver_timeout_secs: u64,

    /// How often a waiting runner checks its deadline and cancellation.
    pub poll_interval_ms: u64,

    /// Minimum outcome queue capacity per dispatch.
    pub channel_capacity: usize,

    /// Longest solver output line kept, in bytes; the rest of the line is dropped.
    pub line_limit_bytes: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            solvers: Vec::new(),
            policy: CompletionPolicy::default(),
            solver_timeout_secs: 5 * 60,
            poll_interval_ms: 50,
            channel_capacity: 100,
            line_limit_bytes: 1_000_000,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.solvers.is_empty() {
            return Err(anyhow!("solvers must be a non-empty list"));
        }
        if self.solvers.iter().any(|s| s.as_str().trim().is_empty()) {
            return Err(anyhow!("solvers must not contain blank entries"));
        }
        if self.solver_timeout_secs == 0 {
            return Err(anyhow!("solver_timeout_secs must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be > 0"));
        }
        if self.channel_capacity == 0 {
            return Err(anyhow!("channel_capacity must be > 0"));
        }
        if self.line_limit_bytes == 0 {
            return Err(anyhow!("line_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn solver_timeout(&self) -> Duration {
        Duration::from_secs(self.solver_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Queue capacity that lets every runner hand off without blocking.
    pub fn effective_capacity(&self) -> usize {
        self.channel_capacity.max(self.solvers.len()).max(1)
    }
}

/// Split a comma-separated solver list, dropping blank entries.
pub fn parse_solver_list(list: &str) -> Vec<SolverId> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SolverId::new)
        .collect()
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `DispatchConfig::default()`. The result is
/// not validated; see [`resolve_config`].
pub fn load_config(path: &Path) -> Result<DispatchConfig> {
    if !path.exists() {
        return Ok(DispatchConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: DispatchConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

/// Start-up configuration: optional file, then the solver list override.
pub fn resolve_config(path: Option<&Path>, solvers: Option<&str>) -> Result<DispatchConfig> {
    let mut cfg = match path {
        Some(path) => load_config(path)?,
        None => DispatchConfig::default(),
    };
    if let Some(list) = solvers {
        let parsed = parse_solver_list(list);
        if !parsed.is_empty() {
            cfg.solvers = parsed;
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &DispatchConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
