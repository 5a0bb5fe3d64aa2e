use anyhow::Result;
use std::path::Path;

use crate::commands::{CommandReport, write_artifact};
use crate::wr::config::WrConfig;
use crate::wr::ledger::Ledger;
use crate::wr::paths::WrPaths;
use crate::wr::render::render_report;
use crate::wr::util::now_epoch_secs;

/// Re-renders the persisted ledger. No network access.
pub fn run(cfg: &WrConfig, paths: &WrPaths, output: Option<&Path>) -> Result<CommandReport> {
    let mut report = CommandReport::new("render");
    let ledger = Ledger::load(&paths.ledger_file)?;
    let now = now_epoch_secs()?;

    write_artifact(output, |out| {
        render_report(out, &ledger, &cfg.report, cfg.display_tz(), now)
    })?;

    report.detail(format!("ledger={}", paths.ledger_file.display()));
    report.detail(format!("entries={}", ledger.len()));
    if let Some(path) = output {
        report.detail(format!("report={}", path.display()));
    }
    Ok(report)
}
