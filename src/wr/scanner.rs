use crate::speedrun::http::Fetch;
use crate::speedrun::run::{Run, verification};
use crate::wr::context::ScanContext;
use crate::wr::history::{self, insert_run};
use crate::wr::util::pause_ms;
use log::{debug, info};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub new_last_seen: i64,
    pub scan_floor: i64,
    pub pages: u64,
    pub runs_seen: u64,
    pub runs_checked: u64,
    pub keys_processed: u64,
    pub entries_added: usize,
}

/// Oldest verification instant worth reading: one overlap below the last
/// seen instant, or below the retention cutoff on a first run.
pub fn scan_floor(last_seen: Option<i64>, cutoff: i64, overlap_secs: u64) -> i64 {
    let overlap = i64::try_from(overlap_secs).unwrap_or(i64::MAX);
    last_seen
        .unwrap_or(cutoff)
        .saturating_sub(overlap)
        .max(0)
}

/// Walks the verified-runs feed newest first down to the scan floor. Every
/// run that is currently #1 on a board not yet handled in this call triggers
/// one history reconstruction for that board. The returned last-seen value
/// is never below `last_seen`, even when a page fails.
pub fn scan<F: Fetch>(
    ctx: &mut ScanContext<'_, F>,
    last_seen: Option<i64>,
    cutoff: i64,
) -> ScanOutcome {
    let floor = scan_floor(last_seen, cutoff, ctx.cfg.retention.overlap_secs);
    let page_size = ctx.cfg.feed.page_size;
    let pause_every = ctx.cfg.feed.pause_every_runs;
    let ledger_before = ctx.ledger.len();

    let mut outcome = ScanOutcome {
        new_last_seen: last_seen.unwrap_or(0),
        scan_floor: floor,
        ..ScanOutcome::default()
    };
    let mut processed_keys: HashSet<String> = HashSet::new();
    let mut offset: u64 = 0;

    'pages: loop {
        outcome.pages += 1;
        debug!(
            "Runs page: offset={offset} max={page_size} scan_floor={floor} prune_cutoff={cutoff} last_seen={}",
            last_seen.unwrap_or(0)
        );

        let page = match ctx.api.verified_runs_page(offset, page_size) {
            Ok(page) => page,
            Err(err) => {
                info!("Failed to fetch runs page (offset={offset}): {err}. Stopping.");
                break;
            }
        };
        if page.is_empty() {
            debug!("Runs page empty (offset={offset}). Stopping.");
            break;
        }

        for raw in &page {
            let Some((verified, _)) = verification(raw) else {
                continue;
            };
            outcome.runs_seen += 1;
            outcome.new_last_seen = outcome.new_last_seen.max(verified);

            if verified < floor {
                info!("Stopping scan: reached scan_floor (oldest run < scan_floor)");
                break 'pages;
            }
            if verified < cutoff {
                continue;
            }

            outcome.runs_checked += 1;
            if pause_every > 0 && outcome.runs_checked % pause_every == 0 {
                pause_ms(ctx.cfg.feed.pause_ms);
            }

            let Some(run) = Run::parse(raw) else {
                continue;
            };
            if ctx.ledger.has(&run.id) {
                continue;
            }
            let Some(board) = run.board() else {
                continue;
            };
            if !ctx.tops.is_current_wr(ctx.api, &run.id, &board) {
                continue;
            }

            let key = board.key();
            if processed_keys.insert(key.clone()) {
                outcome.keys_processed += 1;
                info!("New current WR detected; backfilling history for key: {key}");
                history::reconstruct(ctx, &board, cutoff);
            }
            insert_run(ctx, raw, cutoff);
        }

        offset += page.len() as u64;
        if page.len() < page_size as usize {
            break;
        }
    }

    outcome.entries_added = ctx.ledger.len().saturating_sub(ledger_before);
    info!(
        "Scan complete: pages={} seen={} checked={} keys_processed={} new_last_seen={}",
        outcome.pages,
        outcome.runs_seen,
        outcome.runs_checked,
        outcome.keys_processed,
        outcome.new_last_seen
    );
    outcome
}
