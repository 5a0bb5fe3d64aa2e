use crate::error::WrError;
use crate::speedrun::api::DEFAULT_API_BASE;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

include!(concat!(env!("OUT_DIR"), "/wr_env_allowlist.rs"));

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub window_hours: u64,
    /// How far below the last-seen instant the feed scan reaches back.
    pub overlap_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            overlap_secs: 24 * 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub page_size: u32,
    pub pause_every_runs: u64,
    pub pause_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 200,
            pause_every_runs: 40,
            pause_ms: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Ranked-list depth fetched when backfilling a leaderboard's record chain.
    pub depth: u32,
    pub detail_pause_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            depth: 200,
            detail_pause_ms: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub api_base: String,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: format!("wr-live/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_secs: 20,
            timeout_secs: 60,
            max_attempts: 6,
            backoff_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub window_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    pub tagline: String,
    pub timezone: String,
    pub timezone_label: String,
    pub sections: Vec<ReportSection>,
    pub subcategory_max_chars: usize,
    pub enrich_players: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "🏁 Live #1 Records".to_string(),
            tagline: "Updated hourly via GitHub Actions.".to_string(),
            timezone: "America/New_York".to_string(),
            timezone_label: "ET".to_string(),
            sections: vec![
                ReportSection {
                    title: "Past hour".to_string(),
                    window_hours: 1,
                },
                ReportSection {
                    title: "Past 24 hours".to_string(),
                    window_hours: 24,
                },
            ],
            subcategory_max_chars: 20,
            enrich_players: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    pub debug: bool,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WrConfig {
    pub retention: RetentionConfig,
    pub feed: FeedConfig,
    pub history: HistoryConfig,
    pub http: HttpConfig,
    pub report: ReportConfig,
    pub log: LogConfig,
}

impl WrConfig {
    pub fn retention_secs(&self) -> i64 {
        secs_from_hours(self.retention.window_hours)
    }

    pub fn display_tz(&self) -> chrono_tz::Tz {
        self.report
            .timezone
            .parse::<chrono_tz::Tz>()
            .unwrap_or(chrono_tz::America::New_York)
    }
}

pub fn secs_from_hours(hours: u64) -> i64 {
    i64::try_from(hours.saturating_mul(3600)).unwrap_or(i64::MAX)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialWrConfig {
    retention: Option<RetentionConfig>,
    feed: Option<FeedConfig>,
    history: Option<HistoryConfig>,
    http: Option<HttpConfig>,
    report: Option<ReportConfig>,
    log: Option<LogConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => parse_bool(&v).unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" | "on" => Some(true),
        "0" | "false" | "FALSE" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_optional_string(var: &str, fallback: Option<String>) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => fallback,
    }
}

fn validate(cfg: &WrConfig) -> Result<()> {
    let invalid = |msg: String| -> anyhow::Error { WrError::InvalidConfig(msg).into() };

    if cfg.retention.window_hours == 0 {
        return Err(invalid("retention window must be >= 1 hour".into()));
    }
    if cfg.feed.page_size == 0 {
        return Err(invalid("feed page size must be >= 1".into()));
    }
    if cfg.history.depth == 0 {
        return Err(invalid("history depth must be >= 1".into()));
    }
    if cfg.http.max_attempts == 0 {
        return Err(invalid("http max attempts must be >= 1".into()));
    }
    let base = url::Url::parse(&cfg.http.api_base)
        .map_err(|err| invalid(format!("api base `{}`: {err}", cfg.http.api_base)))?;
    if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
        return Err(invalid(format!(
            "api base `{}` must be an absolute http(s) url",
            cfg.http.api_base
        )));
    }
    if cfg.report.timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(invalid(format!(
            "unknown display timezone `{}`",
            cfg.report.timezone
        )));
    }
    if let Some(section) = cfg.report.sections.iter().find(|s| s.window_hours == 0) {
        return Err(invalid(format!(
            "report section `{}` needs a window >= 1 hour",
            section.title
        )));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("WR_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".wr-live").join("config.toml"))
}

fn merge_toml(base: &mut WrConfig, raw: &str) -> Result<()> {
    let parsed: PartialWrConfig = toml::from_str(raw)?;
    if let Some(retention) = parsed.retention {
        base.retention = retention;
    }
    if let Some(feed) = parsed.feed {
        base.feed = feed;
    }
    if let Some(history) = parsed.history {
        base.history = history;
    }
    if let Some(http) = parsed.http {
        base.http = http;
    }
    if let Some(report) = parsed.report {
        base.report = report;
    }
    if let Some(log) = parsed.log {
        base.log = log;
    }
    Ok(())
}

fn merge_file_config(base: &mut WrConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    merge_toml(base, &raw)
        .map_err(|err| anyhow!("failed to parse wr config {}: {err}", path.display()))
}

fn apply_env_overrides(cfg: &mut WrConfig) {
    cfg.retention.window_hours = env_or_u64("WR_RETENTION_HOURS", cfg.retention.window_hours);
    cfg.retention.overlap_secs = env_or_u64("WR_OVERLAP_SECS", cfg.retention.overlap_secs);
    cfg.feed.page_size = env_or_u32("WR_PAGE_SIZE", cfg.feed.page_size);
    cfg.feed.pause_every_runs = env_or_u64("WR_PAUSE_EVERY_RUNS", cfg.feed.pause_every_runs);
    cfg.feed.pause_ms = env_or_u64("WR_PAUSE_MS", cfg.feed.pause_ms);
    cfg.history.depth = env_or_u32("WR_HISTORY_DEPTH", cfg.history.depth);
    cfg.history.detail_pause_ms = env_or_u64("WR_DETAIL_PAUSE_MS", cfg.history.detail_pause_ms);
    cfg.http.api_base = env_or_string("WR_API_BASE", &cfg.http.api_base);
    cfg.http.user_agent = env_or_string("WR_USER_AGENT", &cfg.http.user_agent);
    cfg.http.connect_timeout_secs =
        env_or_u64("WR_CONNECT_TIMEOUT_SECS", cfg.http.connect_timeout_secs);
    cfg.http.timeout_secs = env_or_u64("WR_TIMEOUT_SECS", cfg.http.timeout_secs);
    cfg.http.max_attempts = env_or_u32("WR_HTTP_MAX_ATTEMPTS", cfg.http.max_attempts);
    cfg.http.backoff_ms = env_or_u64("WR_HTTP_BACKOFF_MS", cfg.http.backoff_ms);
    cfg.report.timezone = env_or_string("WR_TIMEZONE", &cfg.report.timezone);
    cfg.report.timezone_label = env_or_string("WR_TIMEZONE_LABEL", &cfg.report.timezone_label);
    cfg.report.subcategory_max_chars = env_or_usize(
        "WR_SUBCATEGORY_MAX_CHARS",
        cfg.report.subcategory_max_chars,
    );
    cfg.report.enrich_players = env_or_bool("WR_ENRICH_PLAYERS", cfg.report.enrich_players);
    cfg.log.debug = env_or_bool("WR_DEBUG", cfg.log.debug);
    cfg.log.file = env_optional_string("WR_LOG_FILE", cfg.log.file.take());
}

pub fn load_config() -> Result<WrConfig> {
    let mut cfg = WrConfig::default();
    merge_file_config(&mut cfg)?;
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

/// `WR_*` variables referenced by this binary that are set in the current
/// environment.
pub fn active_env_overrides() -> Vec<String> {
    GENERATED_WR_ENV_ALLOWLIST
        .iter()
        .filter(|key| env::var_os(key).is_some())
        .map(|key| key.to_string())
        .collect()
}
