//! Markdown/HTML report of the ledger, written straight to any `io::Write`.

use crate::speedrun::assets::normalize_cover_uri;
use crate::speedrun::run::PlayerRecord;
use crate::wr::config::{ReportConfig, secs_from_hours};
use crate::wr::ledger::{Ledger, WrEntry};
use crate::wr::util::{format_seconds, truncate_with_ellipsis};
use chrono::DateTime;
use chrono_tz::Tz;
use std::io::{self, Write};

const EMPTY_ROW: &str = "| <sub>—</sub> | <em>None</em> |  |  |  |  |  |  |";

/// Entity-escapes markup and table delimiters; line breaks and tabs become
/// spaces so a value never splits a table row.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '|' => out.push_str("&#124;"),
            '\n' | '\r' | '\t' => out.push(' '),
            other => out.push(other),
        }
    }
    out
}

pub fn format_when(epoch: i64, tz: Tz) -> String {
    match DateTime::from_timestamp(epoch, 0) {
        Some(utc) => utc.with_timezone(&tz).format("%b %d, %Y %I:%M %p %Z").to_string(),
        None => "?".to_string(),
    }
}

fn plain_cell(text: &str) -> String {
    format!("<sub>{}</sub>", escape_html(text))
}

fn subcategory_cell(text: &str, max_chars: usize) -> String {
    format!(
        "<sub><span title=\"{}\">{}</span></sub>",
        escape_html(text),
        escape_html(&truncate_with_ellipsis(text, max_chars))
    )
}

fn game_cell(name: &str, cover: &str) -> String {
    let image = if cover.trim().is_empty() {
        "<br/>".to_string()
    } else {
        format!(
            "<img src=\"{}\" alt=\"\" width=\"60\" style=\"display:block; margin:0 auto 4px auto;\"/><br/>",
            escape_html(&normalize_cover_uri(cover))
        )
    };
    format!(
        "<div style=\"text-align:center;\">{image}<sub>{}</sub></div>",
        escape_html(name)
    )
}

fn player_block(player: &PlayerRecord) -> String {
    let image = if player.image.is_empty() {
        "<br/>".to_string()
    } else {
        let img = format!(
            "<img src=\"{}\" alt=\"\" width=\"40\" style=\"display:block; margin:0 auto 4px auto; border-radius:50%;\"/>",
            escape_html(&player.image)
        );
        if player.weblink.is_empty() {
            format!("{img}<br/>")
        } else {
            format!("<a href=\"{}\">{img}</a><br/>", escape_html(&player.weblink))
        }
    };
    format!(
        "<div style=\"text-align:center;\">{image}<sub>{}</sub></div>",
        escape_html(&player.name)
    )
}

fn runners_cell(entry: &WrEntry) -> String {
    match entry.players_data.as_deref() {
        Some(players) if !players.is_empty() => {
            let blocks: String = players.iter().map(player_block).collect();
            format!(
                "<div style=\"display:flex; gap:6px; justify-content:center; align-items:flex-start;\">{blocks}</div>"
            )
        }
        _ => plain_cell(&entry.players),
    }
}

fn link_cell(weblink: &str) -> String {
    if weblink.is_empty() {
        "<sub>&nbsp;</sub>".to_string()
    } else {
        format!("<sub><a href=\"{}\">link</a></sub>", escape_html(weblink))
    }
}

fn write_row<W: Write + ?Sized>(out: &mut W, entry: &WrEntry, cfg: &ReportConfig, tz: Tz) -> io::Result<()> {
    writeln!(
        out,
        "| {} | {} | {} | {} | {} | {} | {} | {} |",
        plain_cell(&format_when(entry.verified_epoch, tz)),
        game_cell(&entry.game, &entry.game_cover),
        plain_cell(&entry.category),
        subcategory_cell(&entry.subcats, cfg.subcategory_max_chars),
        plain_cell(&entry.level),
        plain_cell(&format_seconds(entry.primary_time())),
        runners_cell(entry),
        link_cell(&entry.weblink),
    )
}

fn write_section<W: Write + ?Sized>(
    out: &mut W,
    title: &str,
    entries: &[&WrEntry],
    cfg: &ReportConfig,
    tz: Tz,
) -> io::Result<()> {
    writeln!(out, "### {title}\n")?;
    writeln!(
        out,
        "| <sub>When ({})</sub> | <sub>Game</sub> | <sub>Category</sub> | <sub>Subcategory</sub> | <sub>Level</sub> | <sub>Time</sub> | <sub>Runner(s)</sub> | <sub>Link</sub> |",
        escape_html(&cfg.timezone_label)
    )?;
    writeln!(out, "|---|---|---|---|---|---:|---|---|")?;
    if entries.is_empty() {
        writeln!(out, "{EMPTY_ROW}")?;
    }
    for entry in entries {
        write_row(out, entry, cfg, tz)?;
    }
    writeln!(out)
}

/// Title, tagline, then one table per configured section holding the
/// entries verified within that section's window before `now`.
pub fn render_report<W: Write + ?Sized>(
    out: &mut W,
    ledger: &Ledger,
    cfg: &ReportConfig,
    tz: Tz,
    now: i64,
) -> io::Result<()> {
    writeln!(out, "## {}\n", cfg.title)?;
    if !cfg.tagline.trim().is_empty() {
        writeln!(out, "_{}_\n", cfg.tagline.trim())?;
    }
    for section in &cfg.sections {
        let since = now.saturating_sub(secs_from_hours(section.window_hours));
        let entries = ledger.newest_since(since);
        write_section(out, &section.title, &entries, cfg, tz)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_710_058_530;

    fn entry(id: &str, epoch: i64) -> WrEntry {
        WrEntry {
            run_id: id.to_string(),
            verified_epoch: epoch,
            verified_iso: String::new(),
            game: "Super Mario 64".into(),
            game_cover: "http://www.speedrun.com/static/game/o1y9wo6q/cover?v=1".into(),
            category: "16 Star".into(),
            level: String::new(),
            subcats: "Platform: N64 | Wii VC, Version: JP".into(),
            primary_t: 925.4,
            players: "cheese, liamdoe".into(),
            players_data: None,
            weblink: format!("https://www.speedrun.com/sm64/run/{id}"),
        }
    }

    fn render(ledger: &Ledger) -> String {
        let mut buf = Vec::new();
        render_report(
            &mut buf,
            ledger,
            &ReportConfig::default(),
            chrono_tz::America::New_York,
            NOW,
        )
        .expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn escapes_markup_and_table_breakers() {
        assert_eq!(
            escape_html("<a href='x'>&\"|\n\t"),
            "&lt;a href=&#39;x&#39;&gt;&amp;&quot;&#124;  "
        );
    }

    #[test]
    fn when_column_uses_display_timezone() {
        assert_eq!(
            format_when(NOW, chrono_tz::America::New_York),
            "Mar 10, 2024 04:15 AM EDT"
        );
        assert_eq!(
            format_when(1_704_067_200, chrono_tz::America::New_York),
            "Dec 31, 2023 07:00 PM EST"
        );
    }

    #[test]
    fn empty_ledger_renders_placeholder_rows() {
        let out = render(&Ledger::default());
        assert!(out.starts_with("## 🏁 Live #1 Records\n\n_Updated hourly via GitHub Actions._\n\n"));
        assert!(out.contains("### Past hour\n"));
        assert!(out.contains("### Past 24 hours\n"));
        assert_eq!(out.matches(EMPTY_ROW).count(), 2);
    }

    #[test]
    fn sections_filter_by_window() {
        let ledger = Ledger::from_entries([entry("recent", NOW - 600), entry("older", NOW - 7200)]);
        let out = render(&ledger);
        let (hour, day) = out.split_once("### Past 24 hours").expect("two sections");
        assert!(hour.contains("run/recent"));
        assert!(!hour.contains("run/older"));
        assert!(day.contains("run/recent"));
        assert!(day.contains("run/older"));
        assert!(!out.contains(EMPTY_ROW));
    }

    #[test]
    fn row_cells_are_normalised_and_escaped() {
        let mut wr = entry("r1", NOW - 60);
        wr.players_data = Some(vec![PlayerRecord {
            name: "che<e>se".into(),
            weblink: "https://www.speedrun.com/user/cheese".into(),
            image: "https://www.speedrun.com/static/user/x/image.png".into(),
        }]);
        let out = render(&Ledger::from_entries([wr]));

        assert!(out.contains("cover.png?v=1"));
        assert!(out.contains("https://www.speedrun.com/static/game/"));
        assert!(out.contains(
            "<span title=\"Platform: N64 &#124; Wii VC, Version: JP\">Platform: N64 &#124; Wii…</span>"
        ));
        assert!(out.contains("<sub>15:25</sub>"));
        assert!(out.contains("<a href=\"https://www.speedrun.com/user/cheese\"><img src="));
        assert!(out.contains("<sub>che&lt;e&gt;se</sub>"));
        assert!(out.contains("<sub><a href=\"https://www.speedrun.com/sm64/run/r1\">link</a></sub>"));
    }

    #[test]
    fn missing_players_and_link_fall_back() {
        let mut wr = entry("r2", NOW - 60);
        wr.weblink.clear();
        wr.primary_t = -1.0;
        let out = render(&Ledger::from_entries([wr]));
        assert!(out.contains("<sub>cheese, liamdoe</sub>"));
        assert!(out.contains("<sub>&nbsp;</sub>"));
        assert!(out.contains("<sub>?</sub>"));
    }
}
