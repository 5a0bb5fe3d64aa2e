use crate::speedrun::api::SpeedrunApi;
use crate::speedrun::http::Fetch;
use crate::wr::key::Board;
use log::debug;
use std::collections::HashMap;

/// Current #1 run id per leaderboard key, for the lifetime of one run.
/// Only successful lookups are remembered; an empty board caches as `None`.
#[derive(Debug, Default)]
pub struct LeaderboardTopCache {
    tops: HashMap<String, Option<String>>,
}

impl LeaderboardTopCache {
    pub fn len(&self) -> usize {
        self.tops.len()
    }

    /// Whether `run_id` is ranked first on `board`. Lookup failures answer
    /// `false` so an indeterminate board never promotes a run.
    pub fn is_current_wr<F: Fetch>(
        &mut self,
        api: &SpeedrunApi<F>,
        run_id: &str,
        board: &Board,
    ) -> bool {
        let key = board.key();
        if let Some(top) = self.tops.get(&key) {
            return top.as_deref() == Some(run_id);
        }

        match api.leaderboard_top_run_id(board) {
            Ok(top) => {
                let is_top = top.as_deref() == Some(run_id);
                self.tops.insert(key, top);
                is_top
            }
            Err(err) => {
                debug!("top-1 lookup failed for {key}: {err}");
                false
            }
        }
    }
}
