use anyhow::Result;
use std::path::Path;

use crate::commands::{CommandReport, write_artifact};
use crate::speedrun::api::SpeedrunApi;
use crate::speedrun::http::HttpClient;
use crate::wr::config::WrConfig;
use crate::wr::recent::{
    DEFAULT_DAYS, DEFAULT_LIMIT, collect_recent, render_recent, sanitize_arg,
};
use crate::wr::util::now_epoch_secs;
use crate::wr::verifier::LeaderboardTopCache;

pub fn run(
    cfg: &WrConfig,
    days: Option<u32>,
    limit: Option<u32>,
    output: Option<&Path>,
) -> Result<CommandReport> {
    let mut report = CommandReport::new("recent");
    let days_used = sanitize_arg(days, DEFAULT_DAYS);
    let limit_used = sanitize_arg(limit, DEFAULT_LIMIT);
    if days.is_some_and(|d| d != days_used) {
        report.detail(format!("--days out of range; using {days_used}"));
    }
    if limit.is_some_and(|l| l != limit_used) {
        report.detail(format!("--limit out of range; using {limit_used}"));
    }

    let client = HttpClient::new(&cfg.http)?;
    let api = SpeedrunApi::new(client, &cfg.http.api_base)?;
    let mut tops = LeaderboardTopCache::default();
    let rows = collect_recent(
        &api,
        &mut tops,
        cfg.feed.page_size,
        cfg.feed.pause_ms,
        now_epoch_secs()?,
        days_used,
        limit_used,
    );

    write_artifact(output, |out| render_recent(out, &rows, days_used))?;

    report.detail(format!("days={days_used} limit={limit_used}"));
    report.detail(format!("rows={}", rows.len()));
    report.detail(format!("boards_checked={}", tops.len()));
    if let Some(path) = output {
        report.detail(format!("report={}", path.display()));
    }
    Ok(report)
}
