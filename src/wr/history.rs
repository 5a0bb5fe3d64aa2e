//! Record-chain reconstruction for one leaderboard.
//!
//! The feed only shows the run that is #1 now. Runs that held the record
//! earlier inside the retention window are recovered by replaying the
//! board's top-N in verification order: any run that beat, or tied, the
//! best time known at its own verification instant was a record.

use crate::speedrun::http::Fetch;
use crate::speedrun::run::{Run, get_str, primary_time, verification};
use crate::wr::context::ScanContext;
use crate::wr::key::Board;
use crate::wr::ledger::WrEntry;
use crate::wr::util::pause_ms;
use log::debug;

/// Times closer than this are the same time.
pub const TIME_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedRun {
    pub run_id: String,
    pub primary_t: f64,
    pub verified_epoch: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryOutcome {
    pub ranked: usize,
    pub date_lookups: usize,
    pub chain: usize,
    pub inserted: usize,
}

/// Runs verified at or after `cutoff` that were a record (or tied one) at
/// their own verification instant, oldest first. The baseline is the best
/// time verified before `cutoff`; without one the first in-window run seeds
/// the chain. Unresolved runs are ignored.
pub fn replay_record_chain(runs: &[RankedRun], cutoff: i64) -> Vec<RankedRun> {
    let baseline = runs
        .iter()
        .filter(|r| r.verified_epoch.is_some_and(|v| v < cutoff))
        .map(|r| r.primary_t)
        .fold(None, |best: Option<f64>, t| {
            Some(best.map_or(t, |b| b.min(t)))
        });

    let mut candidates: Vec<&RankedRun> = runs
        .iter()
        .filter(|r| r.verified_epoch.is_some_and(|v| v >= cutoff))
        .collect();
    candidates.sort_by_key(|r| r.verified_epoch);

    let mut best = baseline;
    let mut chain = Vec::new();
    for candidate in candidates {
        let t = candidate.primary_t;
        let included = match best {
            None => {
                debug!("no baseline before cutoff; {} seeds the chain", candidate.run_id);
                best = Some(t);
                true
            }
            Some(b) if t < b - TIME_EPSILON => {
                best = Some(t);
                true
            }
            Some(b) => (t - b).abs() <= TIME_EPSILON,
        };
        if included {
            chain.push(candidate.clone());
        }
    }
    chain
}

/// Reads `board`'s top-N, resolves missing verification dates, replays the
/// chain and inserts every chain run not already in the ledger. Upstream
/// failures end the attempt quietly.
pub fn reconstruct<F: Fetch>(
    ctx: &mut ScanContext<'_, F>,
    board: &Board,
    cutoff: i64,
) -> HistoryOutcome {
    let mut outcome = HistoryOutcome::default();
    let key = board.key();

    let ranked = match ctx.api.leaderboard_runs(board, ctx.cfg.history.depth) {
        Ok(ranked) => ranked,
        Err(err) => {
            debug!("history fetch failed for {key}: {err}");
            return outcome;
        }
    };

    let mut runs: Vec<RankedRun> = ranked
        .iter()
        .filter_map(|raw| {
            let run_id = get_str(raw, "id").filter(|id| !id.is_empty())?;
            let primary_t = primary_time(raw)?;
            Some(RankedRun {
                run_id: run_id.to_string(),
                primary_t,
                verified_epoch: verification(raw).map(|(epoch, _)| epoch),
            })
        })
        .collect();
    outcome.ranked = runs.len();

    for run in runs.iter_mut().filter(|r| r.verified_epoch.is_none()) {
        outcome.date_lookups += 1;
        match ctx.api.run_detail(&run.run_id, false) {
            Ok(detail) => run.verified_epoch = verification(&detail).map(|(epoch, _)| epoch),
            Err(err) => {
                debug!("verify-date lookup failed for {}: {err}", run.run_id);
                continue;
            }
        }
        pause_ms(ctx.cfg.feed.pause_ms);
    }

    let chain = replay_record_chain(&runs, cutoff);
    outcome.chain = chain.len();

    for link in chain {
        if ctx.ledger.has(&link.run_id) {
            continue;
        }
        let detail = match ctx.api.run_detail(&link.run_id, true) {
            Ok(detail) => detail,
            Err(err) => {
                debug!("run detail failed for {}: {err}", link.run_id);
                continue;
            }
        };
        if insert_run(ctx, &detail, cutoff) {
            outcome.inserted += 1;
        }
        pause_ms(ctx.cfg.history.detail_pause_ms);
    }

    debug!(
        "history {key}: ranked={} lookups={} chain={} inserted={}",
        outcome.ranked, outcome.date_lookups, outcome.chain, outcome.inserted
    );
    outcome
}

/// Builds a ledger entry from an embedded run document and inserts it when
/// it was verified at or after `cutoff`.
pub fn insert_run<F: Fetch>(
    ctx: &mut ScanContext<'_, F>,
    raw: &serde_json::Value,
    cutoff: i64,
) -> bool {
    let Some(run) = Run::parse(raw) else {
        return false;
    };
    if run.verified_epoch().is_none_or(|v| v < cutoff) || ctx.ledger.has(&run.id) {
        return false;
    }
    let category_id = run.category.as_ref().map(|c| c.id.as_str()).unwrap_or("");
    let subcats = ctx
        .variables
        .resolve_subcategory_label(ctx.api, category_id, &run.filters);
    match WrEntry::from_run(&run, subcats) {
        Some(entry) => ctx.ledger.insert(entry),
        None => false,
    }
}
