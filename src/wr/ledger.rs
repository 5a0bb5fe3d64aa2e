use crate::speedrun::api::SpeedrunApi;
use crate::speedrun::http::Fetch;
use crate::speedrun::run::{PlayerRecord, Run, parse_players};
use crate::wr::util::write_atomic;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::thread;
use std::time::Duration;

fn unknown_time() -> f64 {
    -1.0
}

/// One persisted record-setting run. `primary_t` is negative when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrEntry {
    pub run_id: String,
    pub verified_epoch: i64,
    #[serde(default)]
    pub verified_iso: String,
    #[serde(default)]
    pub game: String,
    #[serde(default)]
    pub game_cover: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub subcats: String,
    #[serde(default = "unknown_time")]
    pub primary_t: f64,
    #[serde(default)]
    pub players: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players_data: Option<Vec<PlayerRecord>>,
    #[serde(default)]
    pub weblink: String,
}

impl WrEntry {
    /// Needs a verification instant plus game and category; `subcats` is the
    /// already-resolved variable label.
    pub fn from_run(run: &Run, subcats: String) -> Option<Self> {
        let (verified_epoch, verified_iso) = run.verified.clone()?;
        let game = run.game.as_ref()?;
        let category = run.category.as_ref()?;
        Some(Self {
            run_id: run.id.clone(),
            verified_epoch,
            verified_iso,
            game: game.display().to_string(),
            game_cover: run.game_cover.clone().unwrap_or_default(),
            category: category.display().to_string(),
            level: run
                .level
                .as_ref()
                .map(|l| l.display().to_string())
                .unwrap_or_default(),
            subcats,
            primary_t: run.primary_t.unwrap_or(-1.0),
            players: run.players_compact(),
            players_data: (!run.players.is_empty()).then(|| run.players.clone()),
            weblink: run.weblink.clone(),
        })
    }

    pub fn primary_time(&self) -> Option<f64> {
        Some(self.primary_t).filter(|t| *t >= 0.0)
    }
}

/// Record-setting runs inside the retention window, unique by run id.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<WrEntry>,
    ids: HashSet<String>,
}

impl Ledger {
    pub fn from_entries(entries: impl IntoIterator<Item = WrEntry>) -> Self {
        let mut ledger = Self::default();
        for entry in entries {
            ledger.insert(entry);
        }
        ledger
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[WrEntry] {
        &self.entries
    }

    pub fn has(&self, run_id: &str) -> bool {
        self.ids.contains(run_id)
    }

    /// Appends `entry` unless its run id is already present.
    pub fn insert(&mut self, entry: WrEntry) -> bool {
        if self.ids.contains(&entry.run_id) {
            return false;
        }
        self.ids.insert(entry.run_id.clone());
        self.entries.push(entry);
        true
    }

    /// Drops entries verified strictly before `cutoff`.
    pub fn prune(&mut self, cutoff: i64) -> usize {
        let before = self.entries.len();
        let ids = &mut self.ids;
        self.entries.retain(|entry| {
            let keep = entry.verified_epoch >= cutoff;
            if !keep {
                ids.remove(&entry.run_id);
            }
            keep
        });
        before - self.entries.len()
    }

    /// Newest verification first; equal instants keep insertion order.
    pub fn sort_newest_first(&mut self) {
        self.entries
            .sort_by(|a, b| b.verified_epoch.cmp(&a.verified_epoch));
    }

    pub fn newest(&self) -> Option<&WrEntry> {
        self.entries.iter().max_by_key(|e| e.verified_epoch)
    }

    /// Entries at or after `since`, newest first.
    pub fn newest_since(&self, since: i64) -> Vec<&WrEntry> {
        let mut out: Vec<&WrEntry> = self
            .entries
            .iter()
            .filter(|e| e.verified_epoch >= since)
            .collect();
        out.sort_by(|a, b| b.verified_epoch.cmp(&a.verified_epoch));
        out
    }

    /// Missing file → empty. Unreadable JSON → empty with a warning; bad
    /// array elements are dropped one by one.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        let items = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                warn!("{} is not a JSON array; starting empty", path.display());
                return Ok(Self::default());
            }
            Err(err) => {
                warn!("failed to parse {}: {err}; starting empty", path.display());
                return Ok(Self::default());
            }
        };

        let total = items.len();
        let entries: Vec<WrEntry> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<WrEntry>(item).ok())
            .filter(|entry| !entry.run_id.is_empty())
            .collect();
        if entries.len() < total {
            warn!(
                "dropped {} malformed entries from {}",
                total - entries.len(),
                path.display()
            );
        }
        Ok(Self::from_entries(entries))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(path, &format!("{data}\n"))
    }

    /// Fills `players_data` for entries at or after `cutoff` that lack it,
    /// one embedded run lookup each. Returns how many entries were filled.
    pub fn enrich_missing_players<F: Fetch>(
        &mut self,
        api: &SpeedrunApi<F>,
        cutoff: i64,
        pause: Duration,
    ) -> usize {
        let mut filled = 0;
        for entry in self.entries.iter_mut() {
            if entry.verified_epoch < cutoff || entry.players_data.is_some() {
                continue;
            }
            let detail = match api.run_detail(&entry.run_id, true) {
                Ok(detail) => detail,
                Err(err) => {
                    debug!("enrich skipped for {}: {err}", entry.run_id);
                    continue;
                }
            };
            let players = parse_players(&detail);
            if !players.is_empty() {
                entry.players_data = Some(players);
                filled += 1;
            }
            if !pause.is_zero() {
                thread::sleep(pause);
            }
        }
        filled
    }
}
