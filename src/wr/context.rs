use crate::speedrun::api::SpeedrunApi;
use crate::speedrun::http::Fetch;
use crate::wr::config::WrConfig;
use crate::wr::ledger::Ledger;
use crate::wr::variables::CategoryVariableCache;
use crate::wr::verifier::LeaderboardTopCache;

/// Everything one engine run threads through the scanner and the history
/// reconstructor. The caches live exactly as long as this value.
pub struct ScanContext<'a, F: Fetch> {
    pub api: &'a SpeedrunApi<F>,
    pub cfg: &'a WrConfig,
    pub ledger: &'a mut Ledger,
    pub tops: LeaderboardTopCache,
    pub variables: CategoryVariableCache,
}

impl<'a, F: Fetch> ScanContext<'a, F> {
    pub fn new(api: &'a SpeedrunApi<F>, cfg: &'a WrConfig, ledger: &'a mut Ledger) -> Self {
        Self {
            api,
            cfg,
            ledger,
            tops: LeaderboardTopCache::default(),
            variables: CategoryVariableCache::default(),
        }
    }
}
