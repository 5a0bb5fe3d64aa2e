use assert_cmd::Command;
use chrono::{Duration, Utc};
use mockito::{Matcher, Server};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn wr_cmd(home: &Path, api_base: &str) -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("wr-live");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("WR_HOME", home)
        .env("WR_CONFIG_PATH", home.join("missing-config.toml"))
        .env("WR_API_BASE", api_base)
        .env("WR_HTTP_MAX_ATTEMPTS", "1")
        .env("WR_HTTP_BACKOFF_MS", "1")
        .env("WR_PAUSE_MS", "0")
        .env("WR_DETAIL_PAUSE_MS", "0")
        .env("WR_TIMEZONE", "UTC")
        .env_remove("WR_DATA_DIR")
        .env_remove("WR_LOGS_DIR")
        .env_remove("WR_LOG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

fn iso_minutes_ago(minutes: i64) -> String {
    (Utc::now() - Duration::minutes(minutes))
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

fn full_run(id: &str, verify_date: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "weblink": format!("https://www.speedrun.com/sm64/run/{id}"),
        "status": { "status": "verified", "verify-date": verify_date },
        "times": { "primary_t": 425.3 },
        "values": {},
        "game": { "data": {
            "id": "o1y9wo6q",
            "names": { "international": "Super Mario 64" },
            "assets": { "cover-tiny": { "uri": "https://www.speedrun.com/static/game/o1y9wo6q/cover" } }
        } },
        "category": { "data": { "id": "wkpoo02r", "name": "16 Star" } },
        "level": { "data": [] },
        "players": { "data": [ {
            "rel": "user",
            "id": "u1",
            "names": { "international": "cheese" },
            "weblink": "https://www.speedrun.com/user/cheese"
        } ] }
    })
}

#[test]
fn scan_records_new_world_record_and_renders_it() {
    let tmp = tempdir().expect("tempdir");
    let mut server = Server::new();
    let verified = iso_minutes_ago(10);
    let run = full_run("fresh1", &verified);

    let feed = server
        .mock("GET", "/runs")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(serde_json::json!({ "data": [ run.clone() ] }).to_string())
        .create();
    let board = server
        .mock("GET", "/leaderboards/o1y9wo6q/category/wkpoo02r")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            serde_json::json!({ "data": { "runs": [ { "place": 1, "run": {
                "id": "fresh1",
                "times": { "primary_t": 425.3 },
                "status": { "verify-date": verified }
            } } ] } })
            .to_string(),
        )
        .expect(2)
        .create();
    let detail = server
        .mock("GET", "/runs/fresh1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(serde_json::json!({ "data": run }).to_string())
        .create();

    wr_cmd(tmp.path(), &server.url())
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("### Past hour"))
        .stdout(predicate::str::contains("Super Mario 64"))
        .stdout(predicate::str::contains(
            "<a href=\"https://www.speedrun.com/sm64/run/fresh1\">link</a>",
        ))
        .stderr(predicate::str::contains("scan: ok"));

    feed.assert();
    board.assert();
    detail.assert();

    let ledger = fs::read_to_string(tmp.path().join("data/wrs.json")).expect("ledger");
    assert!(ledger.contains("\"run_id\": \"fresh1\""));
    assert!(ledger.contains("\"category\": \"16 Star\""));

    let state: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(tmp.path().join("data/state.json")).expect("state"),
    )
    .expect("state json");
    assert!(state["last_seen_epoch"].as_i64().unwrap_or(0) > 0);

    let audit = fs::read_to_string(tmp.path().join("logs/audit.log")).expect("audit");
    assert!(audit.contains("\"phase\":\"scan\""));
}

#[test]
fn scan_survives_api_outage_and_still_writes_files() {
    let tmp = tempdir().expect("tempdir");
    let mut server = Server::new();
    let feed = server
        .mock("GET", "/runs")
        .match_query(Matcher::Any)
        .with_status(503)
        .create();

    let report = tmp.path().join("out/report.md");
    wr_cmd(tmp.path(), &server.url())
        .arg("scan")
        .arg("--output")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("scan: ok"));

    let ledger = fs::read_to_string(tmp.path().join("data/wrs.json")).expect("ledger");
    assert_eq!(ledger.trim(), "[]");
    assert!(tmp.path().join("data/state.json").exists());

    let markdown = fs::read_to_string(&report).expect("report");
    assert!(markdown.contains("<em>None</em>"));
    feed.assert();
}

#[test]
fn scan_refuses_to_run_while_lock_is_held() {
    use fs2::FileExt;

    let tmp = tempdir().expect("tempdir");
    fs::create_dir_all(tmp.path().join("data")).expect("mkdir data");
    let held = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(tmp.path().join("data/wr-live.lock"))
        .expect("open lock");
    held.try_lock_exclusive().expect("hold lock");

    wr_cmd(tmp.path(), "http://127.0.0.1:9")
        .arg("scan")
        .arg("--no-render")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));

    assert!(!tmp.path().join("data/wrs.json").exists());
    FileExt::unlock(&held).expect("unlock");
}
