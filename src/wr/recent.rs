use crate::speedrun::api::SpeedrunApi;
use crate::speedrun::http::Fetch;
use crate::speedrun::run::Run;
use crate::wr::util::{format_seconds, pause_ms};
use crate::wr::verifier::LeaderboardTopCache;
use log::{debug, info};
use std::io::{self, Write};

pub const DEFAULT_DAYS: u32 = 7;
pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_ARG: u32 = 3650;

#[derive(Debug, Clone, PartialEq)]
pub struct RecentRow {
    pub verified_iso: String,
    pub game: String,
    pub category: String,
    pub level: String,
    pub primary_t: Option<f64>,
    pub players: String,
    pub weblink: String,
}

impl RecentRow {
    fn from_run(run: &Run) -> Option<Self> {
        let (_, verified_iso) = run.verified.clone()?;
        Some(Self {
            verified_iso,
            game: run.game.as_ref()?.display().to_string(),
            category: run.category.as_ref()?.display().to_string(),
            level: run
                .level
                .as_ref()
                .map(|l| l.display().to_string())
                .unwrap_or_default(),
            primary_t: run.primary_t,
            players: run.players_compact(),
            weblink: run.weblink.clone(),
        })
    }
}

/// Out-of-range values fall back to the default rather than clamping.
pub fn sanitize_arg(value: Option<u32>, fallback: u32) -> u32 {
    value.filter(|v| (1..=MAX_ARG).contains(v)).unwrap_or(fallback)
}

/// Newest verified runs of the last `days` that are #1 on their board right
/// now, up to `limit` rows. Stops early on any feed failure.
pub fn collect_recent<F: Fetch>(
    api: &SpeedrunApi<F>,
    tops: &mut LeaderboardTopCache,
    page_size: u32,
    check_pause_ms: u64,
    now: i64,
    days: u32,
    limit: u32,
) -> Vec<RecentRow> {
    let cutoff = now.saturating_sub(i64::from(days) * 86_400);
    let limit = limit as usize;
    let mut rows = Vec::new();
    let mut offset: u64 = 0;

    'pages: while rows.len() < limit {
        let page = match api.verified_runs_page(offset, page_size) {
            Ok(page) => page,
            Err(err) => {
                info!("recent: feed page at offset={offset} failed: {err}");
                break;
            }
        };
        if page.is_empty() {
            break;
        }

        for raw in &page {
            if rows.len() >= limit {
                break 'pages;
            }
            let Some(run) = Run::parse(raw) else {
                continue;
            };
            let Some(verified) = run.verified_epoch() else {
                continue;
            };
            if verified < cutoff {
                break 'pages;
            }
            let Some(board) = run.board() else {
                continue;
            };

            let is_wr = tops.is_current_wr(api, &run.id, &board);
            pause_ms(check_pause_ms);
            if !is_wr {
                continue;
            }
            if let Some(row) = RecentRow::from_run(&run) {
                debug!("recent: {} is #1 on {}", run.id, board.key());
                rows.push(row);
            }
        }

        offset += page.len() as u64;
        if page.len() < page_size as usize {
            break;
        }
    }
    rows
}

fn md_cell(raw: &str) -> String {
    raw.replace(['\n', '\r', '\t'], " ").replace('|', "\\|")
}

pub fn render_recent<W: Write + ?Sized>(out: &mut W, rows: &[RecentRow], days: u32) -> io::Result<()> {
    writeln!(out, "### Current #1 records verified in the last {days} days\n")?;
    if rows.is_empty() {
        writeln!(
            out,
            "_No current #1 records found in the last {days} days (or API throttled)._"
        )?;
        return out.flush();
    }

    writeln!(out, "| Verified (UTC) | Game | Category | Level | Time | Runner(s) | Link |")?;
    writeln!(out, "|---|---|---|---|---:|---|---|")?;
    for row in rows {
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} |",
            md_cell(&row.verified_iso),
            md_cell(&row.game),
            md_cell(&row.category),
            md_cell(&row.level),
            format_seconds(row.primary_t),
            md_cell(&row.players),
            md_cell(&row.weblink),
        )?;
    }
    out.flush()
}
