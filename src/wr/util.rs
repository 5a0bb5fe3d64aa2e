use anyhow::{Context, Result};
use chrono::DateTime;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;

/// Current Unix epoch in seconds, signed to match upstream verification
/// instants.
pub fn now_epoch_secs() -> Result<i64> {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    Ok(i64::try_from(secs)?)
}

/// Politeness delay between upstream requests; zero disables it.
pub fn pause_ms(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Parse an upstream verification timestamp (`2024-05-01T12:30:00Z`, optionally
/// with fractional seconds) to whole epoch seconds. The fraction is dropped.
pub fn parse_iso8601_utc(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.timestamp())
}

/// `h:mm:ss` when an hour or more, otherwise `m:ss`; rounds to the nearest
/// second. Unknown or negative durations render as `?`.
pub fn format_seconds(secs: Option<f64>) -> String {
    let Some(secs) = secs.filter(|s| s.is_finite() && *s >= 0.0) else {
        return "?".to_string();
    };
    let total = (secs + 0.5) as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Truncate `input` so the result is at most `max_chars` Unicode characters,
/// the last being `…` when anything was cut. Control characters are dropped.
pub fn truncate_with_ellipsis(input: &str, max_chars: usize) -> String {
    let clean: String = input.chars().filter(|c| !c.is_control()).collect();
    if max_chars == 0 || clean.chars().count() <= max_chars {
        return clean;
    }
    let mut s: String = clean.chars().take(max_chars - 1).collect();
    s.push('…');
    s
}

/// Replace `path` with `contents` via a temp file in the same directory, so a
/// reader never sees a half-written file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write temp file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("failed to flush temp file for {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_seconds_to_the_same_second() {
        let whole = parse_iso8601_utc("2024-03-10T08:15:30Z").expect("whole");
        let frac = parse_iso8601_utc("2024-03-10T08:15:30.987Z").expect("fractional");
        assert_eq!(whole, 1_710_058_530);
        assert_eq!(frac, whole);
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert_eq!(parse_iso8601_utc(""), None);
        assert_eq!(parse_iso8601_utc("yesterday"), None);
        assert_eq!(parse_iso8601_utc("2024-03-10 08:15:30"), None);
    }

    #[test]
    fn format_seconds_switches_to_hours() {
        assert_eq!(format_seconds(Some(59.4)), "0:59");
        assert_eq!(format_seconds(Some(59.6)), "1:00");
        assert_eq!(format_seconds(Some(3725.0)), "1:02:05");
        assert_eq!(format_seconds(Some(-1.0)), "?");
        assert_eq!(format_seconds(None), "?");
    }

    #[test]
    fn truncation_counts_the_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 20), "short");
        assert_eq!(truncate_with_ellipsis("abcdefgh", 5), "abcd…");
        assert_eq!(truncate_with_ellipsis("ÅÄÖÅÄÖ", 4), "ÅÄÖ…");
        assert_eq!(truncate_with_ellipsis("anything", 0), "anything");
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("out.json");
        write_atomic(&path, "first").expect("first write");
        write_atomic(&path, "second").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
        let leftovers = fs::read_dir(path.parent().expect("parent"))
            .expect("list")
            .count();
        assert_eq!(leftovers, 1);
    }
}
