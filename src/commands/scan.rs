use anyhow::Result;
use log::warn;
use std::path::PathBuf;

use crate::commands::{CommandReport, write_artifact};
use crate::speedrun::api::SpeedrunApi;
use crate::speedrun::http::HttpClient;
use crate::wr::audit;
use crate::wr::config::WrConfig;
use crate::wr::engine::{self, EngineOptions};
use crate::wr::lock;
use crate::wr::paths::WrPaths;
use crate::wr::render::render_report;
use crate::wr::util::now_epoch_secs;

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub output: Option<PathBuf>,
    pub render: bool,
    pub enrich: bool,
}

pub fn run(cfg: &WrConfig, paths: &WrPaths, opts: &ScanOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("scan");
    let lock = lock::acquire(paths)?;
    report.detail(format!("data_dir={}", paths.data_dir.display()));
    report.detail(format!("lock={}", lock.path().display()));

    let client = HttpClient::new(&cfg.http)?;
    let api = SpeedrunApi::new(client, &cfg.http.api_base)?;
    let now = now_epoch_secs()?;

    let run = engine::run_once(
        &api,
        cfg,
        paths,
        now,
        EngineOptions {
            enrich_players: opts.enrich && cfg.report.enrich_players,
        },
    )?;

    report.detail(format!("cutoff_epoch={}", run.cutoff));
    report.detail(format!("pruned={}", run.pruned));
    report.detail(format!("enriched={}", run.enriched));
    report.detail(format!(
        "pages={} seen={} checked={} keys_processed={} added={}",
        run.scan.pages,
        run.scan.runs_seen,
        run.scan.runs_checked,
        run.scan.keys_processed,
        run.scan.entries_added
    ));
    report.detail(format!("ledger_entries={}", run.ledger.len()));
    report.detail(format!("last_seen_epoch={}", run.state.last_seen_epoch));

    if opts.render {
        write_artifact(opts.output.as_deref(), |out| {
            render_report(out, &run.ledger, &cfg.report, cfg.display_tz(), now)
        })?;
        if let Some(path) = &opts.output {
            report.detail(format!("report={}", path.display()));
        }
    }

    let status = if run.scan.runs_seen == 0 {
        "empty"
    } else {
        "ok"
    };
    let message = format!(
        "added={} entries={} last_seen={}",
        run.scan.entries_added,
        run.ledger.len(),
        run.state.last_seen_epoch
    );
    if let Err(err) = audit::append_event(paths, "scan", status, &message) {
        warn!("audit append failed: {err:#}");
        report.issue(format!("audit log unavailable: {err:#}"));
    }

    Ok(report)
}
