pub mod api;
pub mod assets;
pub mod http;
pub mod run;

#[cfg(test)]
pub mod testing {
    use crate::error::FetchError;
    use crate::speedrun::http::Fetch;
    use serde_json::Value;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use url::Url;

    /// Serves canned bodies by exact URL and records every request. Unknown
    /// URLs answer like a 404.
    #[derive(Default)]
    pub struct FakeFetch {
        routes: RefCell<HashMap<String, String>>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeFetch {
        pub fn route(&self, url: &Url, body: Value) {
            self.route_raw(url, &body.to_string());
        }

        pub fn route_raw(&self, url: &Url, body: &str) {
            self.routes
                .borrow_mut()
                .insert(url.to_string(), body.to_string());
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        pub fn hits(&self, url: &Url) -> usize {
            let wanted = url.as_str();
            self.calls.borrow().iter().filter(|c| *c == wanted).count()
        }

        /// Requests whose path contains `fragment`.
        pub fn hits_matching(&self, fragment: &str) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|c| c.contains(fragment))
                .count()
        }
    }

    impl Fetch for FakeFetch {
        fn get_text(&self, url: &Url) -> Result<String, FetchError> {
            self.calls.borrow_mut().push(url.to_string());
            self.routes
                .borrow()
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }
}
