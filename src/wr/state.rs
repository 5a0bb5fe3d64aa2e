use crate::wr::util::write_atomic;
use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Newest verification instant processed by any earlier scan. Zero means
/// no scan has completed yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastSeenState {
    #[serde(default)]
    pub last_seen_epoch: i64,
}

impl LastSeenState {
    pub fn last_seen(&self) -> Option<i64> {
        (self.last_seen_epoch > 0).then_some(self.last_seen_epoch)
    }

    /// Never moves backwards.
    pub fn advance(self, observed: i64) -> Self {
        Self {
            last_seen_epoch: self.last_seen_epoch.max(observed),
        }
    }
}

pub fn load(path: &Path) -> Result<LastSeenState> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LastSeenState::default()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    match serde_json::from_str::<LastSeenState>(&raw) {
        Ok(state) => Ok(LastSeenState {
            last_seen_epoch: state.last_seen_epoch.max(0),
        }),
        Err(err) => {
            warn!("failed to parse {}: {err}; treating as first run", path.display());
            Ok(LastSeenState::default())
        }
    }
}

pub fn save(path: &Path, state: &LastSeenState) -> Result<()> {
    let data = serde_json::to_string_pretty(state)?;
    write_atomic(path, &format!("{data}\n"))
}
