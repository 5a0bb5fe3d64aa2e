use crate::speedrun::api::SpeedrunApi;
use crate::speedrun::http::Fetch;
use crate::wr::config::WrConfig;
use crate::wr::context::ScanContext;
use crate::wr::ledger::Ledger;
use crate::wr::paths::WrPaths;
use crate::wr::scanner::{self, ScanOutcome};
use crate::wr::state::{self, LastSeenState};
use anyhow::Result;
use log::info;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub enrich_players: bool,
}

#[derive(Debug)]
pub struct EngineRun {
    pub cutoff: i64,
    pub pruned: usize,
    pub enriched: usize,
    pub scan: ScanOutcome,
    pub state: LastSeenState,
    pub ledger: Ledger,
}

/// One full pass: load, prune, enrich, scan, sort, persist. Upstream
/// failures only shrink what is discovered; errors returned here are local.
/// The caller holds the run lock.
pub fn run_once<F: Fetch>(
    api: &SpeedrunApi<F>,
    cfg: &WrConfig,
    paths: &WrPaths,
    now: i64,
    opts: EngineOptions,
) -> Result<EngineRun> {
    let cutoff = now.saturating_sub(cfg.retention_secs());
    info!("Start. now={now} cutoff={cutoff}");

    let previous = state::load(&paths.state_file)?;
    let mut ledger = Ledger::load(&paths.ledger_file)?;
    let pruned = ledger.prune(cutoff);
    info!(
        "Loaded state: last_seen_epoch={} ledger={} (pruned {pruned})",
        previous.last_seen_epoch,
        ledger.len()
    );

    let enriched = if opts.enrich_players {
        ledger.enrich_missing_players(
            api,
            cutoff,
            Duration::from_millis(cfg.feed.pause_ms),
        )
    } else {
        0
    };

    let scan = {
        let mut ctx = ScanContext::new(api, cfg, &mut ledger);
        scanner::scan(&mut ctx, previous.last_seen(), cutoff)
    };

    ledger.sort_newest_first();
    ledger.save(&paths.ledger_file)?;
    let state = previous.advance(scan.new_last_seen);
    state::save(&paths.state_file, &state)?;
    info!(
        "After scan: entries={} new_last_seen={}",
        ledger.len(),
        state.last_seen_epoch
    );

    Ok(EngineRun {
        cutoff,
        pruned,
        enriched,
        scan,
        state,
        ledger,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speedrun::testing::FakeFetch;
    use crate::wr::key::Board;
    use crate::wr::ledger::WrEntry;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    const NOW: i64 = 1_710_058_530;

    fn paths(root: &std::path::Path) -> WrPaths {
        WrPaths::under(root.to_path_buf(), root.join("data"), root.join("logs"))
    }

    fn quiet_cfg() -> WrConfig {
        let mut cfg = WrConfig::default();
        cfg.feed.pause_ms = 0;
        cfg.history.detail_pause_ms = 0;
        cfg
    }

    fn stale_entry(id: &str, epoch: i64) -> WrEntry {
        serde_json::from_value(json!({ "run_id": id, "verified_epoch": epoch }))
            .expect("entry")
    }

    #[test]
    fn prunes_scans_and_persists_without_regressing_state() {
        let dir = tempdir().expect("tempdir");
        let paths = paths(dir.path());
        let cfg = quiet_cfg();
        let fake = FakeFetch::default();
        let api = SpeedrunApi::new(&fake, "https://api.test/v1").expect("api");

        Ledger::from_entries([stale_entry("old", NOW - 90_000), stale_entry("kept", NOW - 100)])
            .save(&paths.ledger_file)
            .expect("seed ledger");
        state::save(&paths.state_file, &LastSeenState { last_seen_epoch: NOW + 500 })
            .expect("seed state");

        fake.route(
            &api.verified_runs_url(0, cfg.feed.page_size).expect("url"),
            json!({ "data": [ {
                "id": "fresh",
                "status": { "verify-date": "2024-03-10T08:00:00Z" },
                "times": { "primary_t": 42.0 },
                "game": { "data": { "id": "g", "names": { "international": "Game" } } },
                "category": { "data": { "id": "c", "name": "Any%" } },
                "players": { "data": [ { "id": "u", "names": { "international": "me" } } ] }
            } ] }),
        );
        let board = Board::new("g", "c", None, Vec::new());
        fake.route(
            &api.leaderboard_url(&board, 1).expect("url"),
            json!({ "data": { "runs": [ { "run": { "id": "fresh" } } ] } }),
        );

        let run = run_once(
            &api,
            &cfg,
            &paths,
            NOW,
            EngineOptions {
                enrich_players: false,
            },
        )
        .expect("engine run");

        assert_eq!(run.pruned, 1);
        assert_eq!(run.state.last_seen_epoch, NOW + 500);
        let ids: Vec<&str> = run.ledger.entries().iter().map(|e| e.run_id.as_str()).collect();
        assert_eq!(ids, vec!["kept", "fresh"]);

        let on_disk = Ledger::load(&paths.ledger_file).expect("reload");
        assert_eq!(on_disk.len(), 2);
        let raw_state = fs::read_to_string(&paths.state_file).expect("state");
        assert!(raw_state.contains(&(NOW + 500).to_string()));
    }

    #[test]
    fn upstream_outage_still_persists_files() {
        let dir = tempdir().expect("tempdir");
        let paths = paths(dir.path());
        let cfg = quiet_cfg();
        let fake = FakeFetch::default();
        let api = SpeedrunApi::new(&fake, "https://api.test/v1").expect("api");

        let run = run_once(
            &api,
            &cfg,
            &paths,
            NOW,
            EngineOptions {
                enrich_players: true,
            },
        )
        .expect("engine run");

        assert!(run.ledger.is_empty());
        assert_eq!(run.state.last_seen_epoch, 0);
        assert!(paths.ledger_file.exists());
        assert!(paths.state_file.exists());
    }
}
