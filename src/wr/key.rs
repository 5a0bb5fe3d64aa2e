/// One ranked list: game × category × optional level × variable filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub game_id: String,
    pub category_id: String,
    pub level_id: Option<String>,
    pub filters: Vec<(String, String)>,
}

impl Board {
    pub fn new(
        game_id: &str,
        category_id: &str,
        level_id: Option<&str>,
        filters: Vec<(String, String)>,
    ) -> Self {
        Self {
            game_id: game_id.to_string(),
            category_id: category_id.to_string(),
            level_id: level_id.filter(|l| !l.is_empty()).map(str::to_string),
            filters,
        }
    }

    pub fn key(&self) -> String {
        build_key(
            &self.game_id,
            &self.category_id,
            self.level_id.as_deref().unwrap_or(""),
            &self.filters,
        )
    }

    /// Filters with a value, sorted by variable id.
    pub fn sorted_filters(&self) -> Vec<(&str, &str)> {
        canonical_pairs(&self.filters)
    }
}

fn canonical_pairs(filters: &[(String, String)]) -> Vec<(&str, &str)> {
    let mut pairs: Vec<(&str, &str)> = filters
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(var, value)| (var.as_str(), value.as_str()))
        .collect();
    pairs.sort_unstable();
    pairs.dedup_by(|a, b| a.0 == b.0);
    pairs
}

/// `game|category|level|var1=val1&var2=val2`, independent of filter order.
/// An absent level stays as an empty field so level and full-game boards
/// never collide.
pub fn build_key(
    game_id: &str,
    category_id: &str,
    level_id: &str,
    filters: &[(String, String)],
) -> String {
    let pairs = canonical_pairs(filters)
        .into_iter()
        .map(|(var, value)| format!("{var}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{game_id}|{category_id}|{level_id}|{pairs}")
}
