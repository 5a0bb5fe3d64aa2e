use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct WrPaths {
    pub home: PathBuf,
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub state_file: PathBuf,
    pub ledger_file: PathBuf,
    pub lock_file: PathBuf,
}

impl WrPaths {
    pub fn under(home: PathBuf, data_dir: PathBuf, logs_dir: PathBuf) -> Self {
        Self {
            state_file: data_dir.join("state.json"),
            ledger_file: data_dir.join("wrs.json"),
            lock_file: data_dir.join("wr-live.lock"),
            home,
            data_dir,
            logs_dir,
        }
    }
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<WrPaths> {
    let cwd = env::current_dir().context("current directory could not be resolved")?;
    let home = env_or_default_path("WR_HOME", cwd);
    let data_dir = env_or_default_path("WR_DATA_DIR", home.join("data"));
    let logs_dir = env_or_default_path("WR_LOGS_DIR", home.join("logs"));
    Ok(WrPaths::under(home, data_dir, logs_dir))
}
