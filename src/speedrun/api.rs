use crate::error::FetchError;
use crate::speedrun::http::Fetch;
use crate::speedrun::run::get_str;
use crate::wr::key::Board;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://www.speedrun.com/api/v1";
pub const RUN_EMBEDS: &str = "game,category,players,level";
const VARIABLES_PAGE: &str = "200";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDef {
    pub id: String,
    pub name: String,
    pub labels: HashMap<String, String>,
}

pub struct SpeedrunApi<F: Fetch> {
    fetch: F,
    base: Url,
}

impl<F: Fetch> SpeedrunApi<F> {
    pub fn new(fetch: F, base: &str) -> Result<Self, FetchError> {
        let base = Url::parse(base.trim_end_matches('/'))?;
        if base.cannot_be_a_base() {
            return Err(FetchError::InvalidBase(base.to_string()));
        }
        Ok(Self { fetch, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidBase(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn verified_runs_url(&self, offset: u64, max: u32) -> Result<Url, FetchError> {
        let mut url = self.endpoint(&["runs"])?;
        url.query_pairs_mut()
            .append_pair("status", "verified")
            .append_pair("orderby", "verify-date")
            .append_pair("direction", "desc")
            .append_pair("embed", RUN_EMBEDS)
            .append_pair("max", &max.to_string())
            .append_pair("offset", &offset.to_string());
        Ok(url)
    }

    pub fn leaderboard_url(&self, board: &Board, top: u32) -> Result<Url, FetchError> {
        let mut url = match board.level_id.as_deref() {
            Some(level) => self.endpoint(&[
                "leaderboards",
                &board.game_id,
                "level",
                level,
                &board.category_id,
            ])?,
            None => self.endpoint(&[
                "leaderboards",
                &board.game_id,
                "category",
                &board.category_id,
            ])?,
        };
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("top", &top.to_string());
            for (var, value) in board.sorted_filters() {
                query.append_pair(&format!("var-{var}"), value);
            }
        }
        Ok(url)
    }

    pub fn run_url(&self, run_id: &str, embed: bool) -> Result<Url, FetchError> {
        let mut url = self.endpoint(&["runs", run_id])?;
        if embed {
            url.query_pairs_mut().append_pair("embed", RUN_EMBEDS);
        }
        Ok(url)
    }

    pub fn category_variables_url(&self, category_id: &str) -> Result<Url, FetchError> {
        let mut url = self.endpoint(&["categories", category_id, "variables"])?;
        url.query_pairs_mut().append_pair("max", VARIABLES_PAGE);
        Ok(url)
    }

    fn get_json(&self, url: &Url) -> Result<Value, FetchError> {
        let body = self.fetch.get_text(url)?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    fn shape_error(url: &Url, detail: &str) -> FetchError {
        FetchError::Shape {
            url: url.to_string(),
            detail: detail.to_string(),
        }
    }

    /// One page of the verified-runs feed, newest verification first.
    pub fn verified_runs_page(&self, offset: u64, max: u32) -> Result<Vec<Value>, FetchError> {
        let url = self.verified_runs_url(offset, max)?;
        let mut root = self.get_json(&url)?;
        match root.get_mut("data").map(Value::take) {
            Some(Value::Array(runs)) => Ok(runs),
            _ => Err(Self::shape_error(&url, "missing data[]")),
        }
    }

    /// The ranked `data.runs[].run` objects of a leaderboard, best first.
    pub fn leaderboard_runs(&self, board: &Board, top: u32) -> Result<Vec<Value>, FetchError> {
        let url = self.leaderboard_url(board, top)?;
        let mut root = self.get_json(&url)?;
        let runs = root
            .get_mut("data")
            .and_then(|d| d.get_mut("runs"))
            .map(Value::take);
        let Some(Value::Array(entries)) = runs else {
            return Err(Self::shape_error(&url, "missing data.runs[]"));
        };
        Ok(entries
            .into_iter()
            .filter_map(|mut entry| entry.get_mut("run").map(Value::take))
            .filter(Value::is_object)
            .collect())
    }

    /// Id of the run ranked first, `None` for an empty board.
    pub fn leaderboard_top_run_id(&self, board: &Board) -> Result<Option<String>, FetchError> {
        let runs = self.leaderboard_runs(board, 1)?;
        Ok(runs
            .first()
            .and_then(|run| get_str(run, "id"))
            .filter(|id| !id.is_empty())
            .map(str::to_string))
    }

    pub fn run_detail(&self, run_id: &str, embed: bool) -> Result<Value, FetchError> {
        let url = self.run_url(run_id, embed)?;
        let mut root = self.get_json(&url)?;
        match root.get_mut("data").map(Value::take) {
            Some(data @ Value::Object(_)) => Ok(data),
            _ => Err(Self::shape_error(&url, "missing data{}")),
        }
    }

    pub fn category_variables(&self, category_id: &str) -> Result<Vec<VariableDef>, FetchError> {
        let url = self.category_variables_url(category_id)?;
        let root = self.get_json(&url)?;
        let Some(vars) = root.get("data").and_then(Value::as_array) else {
            return Err(Self::shape_error(&url, "missing data[]"));
        };

        let mut out = Vec::with_capacity(vars.len());
        for var in vars {
            let Some(id) = get_str(var, "id").filter(|s| !s.is_empty()) else {
                continue;
            };
            let name = get_str(var, "name").unwrap_or(id).to_string();
            let mut labels = HashMap::new();
            let values = var
                .get("values")
                .and_then(|v| v.get("values"))
                .and_then(Value::as_object);
            if let Some(values) = values {
                for (value_id, entry) in values {
                    let label = get_str(entry, "label").unwrap_or(value_id);
                    labels.insert(value_id.clone(), label.to_string());
                }
            }
            out.push(VariableDef {
                id: id.to_string(),
                name,
                labels,
            });
        }
        Ok(out)
    }
}
