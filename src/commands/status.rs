use anyhow::Result;

use crate::commands::CommandReport;
use crate::wr::audit;
use crate::wr::config::{WrConfig, active_env_overrides, secs_from_hours};
use crate::wr::ledger::Ledger;
use crate::wr::lock;
use crate::wr::paths::WrPaths;
use crate::wr::render::format_when;
use crate::wr::state;

pub fn run(cfg: &WrConfig, paths: &WrPaths) -> Result<CommandReport> {
    let mut report = CommandReport::new("status");
    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("data_dir={}", paths.data_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("api_base={}", cfg.http.api_base));
    report.detail(format!(
        "retention_secs={}",
        secs_from_hours(cfg.retention.window_hours)
    ));

    let ledger = Ledger::load(&paths.ledger_file)?;
    report.detail(format!("ledger_entries={}", ledger.len()));
    if let Some(newest) = ledger.newest() {
        report.detail(format!(
            "newest={} {} / {} at {}",
            newest.run_id,
            newest.game,
            newest.category,
            format_when(newest.verified_epoch, cfg.display_tz())
        ));
    }

    let last_seen = state::load(&paths.state_file)?;
    match last_seen.last_seen() {
        Some(epoch) => report.detail(format!("last_seen_epoch={epoch}")),
        None => report.detail("last_seen_epoch=never"),
    }

    match lock::read_holder(&paths.lock_file) {
        Some(holder) => report.detail(format!(
            "lock_holder=pid:{} build:{} since:{}",
            holder.pid, holder.build_uuid, holder.start_time
        )),
        None => report.detail("lock_holder=none"),
    }

    if let Some(event) = audit::last_event(paths) {
        report.detail(format!(
            "last_run={} {} at {}: {}",
            event.phase, event.status, event.at_epoch_secs, event.message
        ));
    }

    let overrides = active_env_overrides();
    if overrides.is_empty() {
        report.detail("env_overrides=none");
    } else {
        report.detail(format!("env_overrides={}", overrides.join(",")));
    }
    report.detail(format!("build={}", env!("BUILD_UUID")));

    Ok(report)
}
