use crate::speedrun::assets::{normalize_cover_uri, normalize_user_image_uri};
use crate::wr::key::Board;
use crate::wr::util::parse_iso8601_utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const COVER_ASSET_KEYS: [&str; 5] = [
    "cover-tiny",
    "cover-small",
    "cover-medium",
    "cover-large",
    "icon",
];

pub fn get_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

pub fn get_f64(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

pub fn get_array<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    value.get(key).and_then(Value::as_array)
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.trim().is_empty())
}

/// A game/category/level reference: either a bare id or an embedded
/// `{ "data": { "id", "name" | "names": { "international" } } }` object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmbeddedRef {
    pub id: String,
    pub name: Option<String>,
}

impl EmbeddedRef {
    pub fn parse(field: Option<&Value>) -> Option<Self> {
        let field = field?;
        match field {
            Value::String(id) if !id.is_empty() => Some(Self {
                id: id.clone(),
                name: None,
            }),
            Value::Object(_) => {
                let data = field.get("data")?;
                let id = non_empty(get_str(data, "id"))?.to_string();
                let name = non_empty(get_str(data, "name"))
                    .or_else(|| data.get("names").and_then(|n| non_empty(get_str(n, "international"))))
                    .map(str::to_string);
                Some(Self { id, name })
            }
            _ => None,
        }
    }

    pub fn display(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    #[serde(default)]
    pub weblink: String,
    #[serde(default)]
    pub image: String,
}

fn player_name(player: &Value) -> String {
    non_empty(get_str(player, "name"))
        .or_else(|| player.get("names").and_then(|n| non_empty(get_str(n, "international"))))
        .or_else(|| non_empty(get_str(player, "id")))
        .unwrap_or("unknown")
        .to_string()
}

fn player_image(player: &Value) -> String {
    let Some(assets) = player.get("assets") else {
        return String::new();
    };
    let raw = ["image", "icon"]
        .iter()
        .filter_map(|key| assets.get(*key).and_then(|a| non_empty(get_str(a, "uri"))))
        .next();
    raw.map(normalize_user_image_uri).unwrap_or_default()
}

/// Players from `players.data` (embedded) or a bare `players` array.
pub fn parse_players(run: &Value) -> Vec<PlayerRecord> {
    let Some(players) = run.get("players") else {
        return Vec::new();
    };
    let list = players
        .as_array()
        .or_else(|| get_array(players, "data"));
    let Some(list) = list else {
        return Vec::new();
    };

    list.iter()
        .filter(|p| p.is_object())
        .map(|p| PlayerRecord {
            name: player_name(p),
            weblink: non_empty(get_str(p, "weblink")).unwrap_or_default().to_string(),
            image: player_image(p),
        })
        .collect()
}

fn parse_game_cover(run: &Value) -> Option<String> {
    let assets = run.get("game")?.get("data")?.get("assets")?;
    COVER_ASSET_KEYS
        .iter()
        .filter_map(|key| assets.get(*key).and_then(|a| non_empty(get_str(a, "uri"))))
        .next()
        .map(normalize_cover_uri)
}

/// Variable filters in document order; non-string values are ignored.
fn parse_filters(run: &Value) -> Vec<(String, String)> {
    let Some(values) = run.get("values").and_then(Value::as_object) else {
        return Vec::new();
    };
    values
        .iter()
        .filter_map(|(var, val)| val.as_str().map(|v| (var.clone(), v.to_string())))
        .collect()
}

/// `status.verify-date` with its parsed epoch, when both are usable.
pub fn verification(run: &Value) -> Option<(i64, String)> {
    let iso = run.get("status").and_then(|s| get_str(s, "verify-date"))?;
    let epoch = parse_iso8601_utc(iso)?;
    Some((epoch, iso.to_string()))
}

/// `times.primary_t`, only when it is a non-negative number.
pub fn primary_time(run: &Value) -> Option<f64> {
    run.get("times")
        .and_then(|t| get_f64(t, "primary_t"))
        .filter(|t| t.is_finite() && *t >= 0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub id: String,
    pub verified: Option<(i64, String)>,
    pub primary_t: Option<f64>,
    pub game: Option<EmbeddedRef>,
    pub category: Option<EmbeddedRef>,
    pub level: Option<EmbeddedRef>,
    pub filters: Vec<(String, String)>,
    pub weblink: String,
    pub players: Vec<PlayerRecord>,
    pub game_cover: Option<String>,
}

impl Run {
    /// Only the id is mandatory; everything else degrades to absent.
    pub fn parse(run: &Value) -> Option<Self> {
        let id = non_empty(get_str(run, "id"))?.to_string();
        Some(Self {
            id,
            verified: verification(run),
            primary_t: primary_time(run),
            game: EmbeddedRef::parse(run.get("game")),
            category: EmbeddedRef::parse(run.get("category")),
            level: EmbeddedRef::parse(run.get("level")),
            filters: parse_filters(run),
            weblink: get_str(run, "weblink").unwrap_or_default().to_string(),
            players: parse_players(run),
            game_cover: parse_game_cover(run),
        })
    }

    pub fn verified_epoch(&self) -> Option<i64> {
        self.verified.as_ref().map(|(epoch, _)| *epoch)
    }

    /// The leaderboard this run competes on; `None` without game and category.
    pub fn board(&self) -> Option<Board> {
        let game = self.game.as_ref()?;
        let category = self.category.as_ref()?;
        Some(Board::new(
            &game.id,
            &category.id,
            self.level.as_ref().map(|l| l.id.as_str()),
            self.filters.clone(),
        ))
    }

    pub fn players_compact(&self) -> String {
        self.players
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn embedded_run() -> Value {
        json!({
            "id": "r1",
            "weblink": "https://www.speedrun.com/sm64/run/r1",
            "status": { "status": "verified", "verify-date": "2024-03-10T08:15:30.250Z" },
            "times": { "primary_t": 1234.5 },
            "game": { "data": {
                "id": "g1",
                "names": { "international": "Super Mario 64" },
                "assets": {
                    "cover-tiny": { "uri": "" },
                    "cover-small": { "uri": "http://www.speedrun.com/static/game/g1/cover?v=2" }
                }
            }},
            "category": { "data": { "id": "c1", "name": "120 Star" } },
            "level": { "data": [] },
            "values": { "v2": "b", "v1": "a", "v3": 7 },
            "players": { "data": [
                { "id": "u1", "names": { "international": "cheese" },
                  "weblink": "https://www.speedrun.com/user/cheese",
                  "assets": { "image": { "uri": "http://www.speedrun.com/static/user/u1/image?v=1" } } },
                { "rel": "guest", "name": "Guest Runner" }
            ]}
        })
    }

    #[test]
    fn parses_embedded_run() {
        let run = Run::parse(&embedded_run()).expect("run");
        assert_eq!(run.id, "r1");
        assert_eq!(run.verified_epoch(), Some(1_710_058_530));
        assert_eq!(run.primary_t, Some(1234.5));
        assert_eq!(run.game.as_ref().map(EmbeddedRef::display), Some("Super Mario 64"));
        assert_eq!(run.category.as_ref().map(EmbeddedRef::display), Some("120 Star"));
        assert_eq!(run.level, None);
        assert_eq!(run.filters.len(), 2);
        assert_eq!(
            run.game_cover.as_deref(),
            Some("https://www.speedrun.com/static/game/g1/cover.png?v=2")
        );
        assert_eq!(run.players_compact(), "cheese, Guest Runner");
        assert_eq!(
            run.players[0].image,
            "https://www.speedrun.com/static/user/u1/image.png?v=1"
        );
        assert_eq!(run.players[1].image, "");
    }

    #[test]
    fn bare_ids_are_accepted_and_missing_fields_degrade() {
        let raw = json!({
            "id": "r2",
            "game": "g9",
            "category": "c9",
            "level": "l9",
            "times": { "primary_t": null },
            "players": [{ "rel": "user", "id": "u77" }]
        });
        let run = Run::parse(&raw).expect("run");
        assert_eq!(run.verified, None);
        assert_eq!(run.primary_t, None);
        let board = run.board().expect("board");
        assert_eq!(board.level_id.as_deref(), Some("l9"));
        assert_eq!(run.players_compact(), "u77");
    }

    #[test]
    fn run_without_id_is_rejected() {
        assert!(Run::parse(&json!({ "game": "g" })).is_none());
        assert!(Run::parse(&json!({ "id": "" })).is_none());
    }

    #[test]
    fn run_without_category_has_no_board() {
        let run = Run::parse(&json!({ "id": "r3", "game": "g" })).expect("run");
        assert!(run.board().is_none());
    }
}
