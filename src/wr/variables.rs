use crate::speedrun::api::{SpeedrunApi, VariableDef};
use crate::speedrun::http::Fetch;
use log::debug;
use std::collections::HashMap;

/// Variable definitions per category id. A failed or empty lookup is stored
/// as `None` so it is not repeated within the run.
#[derive(Debug, Default)]
pub struct CategoryVariableCache {
    categories: HashMap<String, Option<HashMap<String, VariableDef>>>,
}

impl CategoryVariableCache {
    fn definitions<F: Fetch>(
        &mut self,
        api: &SpeedrunApi<F>,
        category_id: &str,
    ) -> Option<&HashMap<String, VariableDef>> {
        self.categories
            .entry(category_id.to_string())
            .or_insert_with(|| {
                debug!("Fetch category variables: cat_id={category_id}");
                match api.category_variables(category_id) {
                    Ok(defs) if !defs.is_empty() => Some(
                        defs.into_iter()
                            .map(|def| (def.id.clone(), def))
                            .collect(),
                    ),
                    Ok(_) => None,
                    Err(err) => {
                        debug!("category variables unavailable for {category_id}: {err}");
                        None
                    }
                }
            })
            .as_ref()
    }

    /// `"Platform: N64, Version: JP"` for the run's filters, in the order
    /// given. Unknown variables and values fall back to their raw ids; a
    /// category without definitions yields an empty label.
    pub fn resolve_subcategory_label<F: Fetch>(
        &mut self,
        api: &SpeedrunApi<F>,
        category_id: &str,
        filters: &[(String, String)],
    ) -> String {
        if category_id.is_empty() || filters.is_empty() {
            return String::new();
        }
        let Some(defs) = self.definitions(api, category_id) else {
            return String::new();
        };

        filters
            .iter()
            .map(|(var_id, value_id)| match defs.get(var_id) {
                Some(def) => {
                    let label = def.labels.get(value_id).unwrap_or(value_id);
                    format!("{}: {}", def.name, label)
                }
                None => format!("{var_id}: {value_id}"),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speedrun::testing::FakeFetch;
    use serde_json::json;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn labels_known_values_and_falls_back_for_unknown_ones() {
        let fake = FakeFetch::default();
        let api = SpeedrunApi::new(&fake, "https://api.test/v1").expect("api");
        fake.route(
            &api.category_variables_url("c1").expect("url"),
            json!({ "data": [
                { "id": "plat", "name": "Platform",
                  "values": { "values": { "n64": { "label": "N64" } } } },
                { "id": "ver", "name": "Version", "values": { "values": {} } }
            ]}),
        );

        let mut cache = CategoryVariableCache::default();
        let label = cache.resolve_subcategory_label(
            &api,
            "c1",
            &pairs(&[("plat", "n64"), ("ver", "jp"), ("ghost", "x")]),
        );
        assert_eq!(label, "Platform: N64, Version: jp, ghost: x");
    }

    #[test]
    fn failed_lookup_is_cached_and_yields_empty_label() {
        let fake = FakeFetch::default();
        let api = SpeedrunApi::new(&fake, "https://api.test/v1").expect("api");
        let url = api.category_variables_url("c404").expect("url");

        let mut cache = CategoryVariableCache::default();
        let filters = pairs(&[("plat", "n64")]);
        assert_eq!(cache.resolve_subcategory_label(&api, "c404", &filters), "");
        assert_eq!(cache.resolve_subcategory_label(&api, "c404", &filters), "");
        assert_eq!(fake.hits(&url), 1);
    }

    #[test]
    fn no_filters_means_no_lookup() {
        let fake = FakeFetch::default();
        let api = SpeedrunApi::new(&fake, "https://api.test/v1").expect("api");
        let mut cache = CategoryVariableCache::default();
        assert_eq!(cache.resolve_subcategory_label(&api, "c1", &[]), "");
        assert!(fake.calls().is_empty());
    }
}
