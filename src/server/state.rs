use axum::extract::FromRef;

use crate::catalog::Catalog;
use crate::config::RankingSettings;
use crate::features::FeatureCache;
use crate::recommend::Recommender;
use crate::search::SearchIndex;
use crate::spotify::LibrarySyncer;
use crate::stats::SummaryCache;
use crate::user::UserStore;
use std::sync::Arc;
use std::time::Instant;

pub type GuardedCatalog = Arc<Catalog>;
pub type GuardedFeatureCache = Arc<FeatureCache>;
pub type GuardedSearchIndex = Arc<SearchIndex>;
pub type GuardedSummaryCache = Arc<SummaryCache>;
pub type GuardedRecommender = Arc<Recommender>;
pub type GuardedUserStore = Arc<dyn UserStore>;
pub type OptionalSyncer = Option<Arc<LibrarySyncer>>;

#[derive(Clone)]
pub struct ServerState {
    pub ranking: RankingSettings,
    pub start_time: Instant,
    pub catalog: GuardedCatalog,
    pub features: GuardedFeatureCache,
    pub search_index: GuardedSearchIndex,
    pub summary: GuardedSummaryCache,
    pub recommender: GuardedRecommender,
    pub user_store: GuardedUserStore,
    pub syncer: OptionalSyncer,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedCatalog {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog.clone()
    }
}

impl FromRef<ServerState> for GuardedFeatureCache {
    fn from_ref(input: &ServerState) -> Self {
        input.features.clone()
    }
}

impl FromRef<ServerState> for GuardedSearchIndex {
    fn from_ref(input: &ServerState) -> Self {
        input.search_index.clone()
    }
}

impl FromRef<ServerState> for GuardedSummaryCache {
    fn from_ref(input: &ServerState) -> Self {
        input.summary.clone()
    }
}

impl FromRef<ServerState> for GuardedRecommender {
    fn from_ref(input: &ServerState) -> Self {
        input.recommender.clone()
    }
}

impl FromRef<ServerState> for GuardedUserStore {
    fn from_ref(input: &ServerState) -> Self {
        input.user_store.clone()
    }
}

impl FromRef<ServerState> for OptionalSyncer {
    fn from_ref(input: &ServerState) -> Self {
        input.syncer.clone()
    }
}

impl FromRef<ServerState> for RankingSettings {
    fn from_ref(input: &ServerState) -> Self {
        input.ranking.clone()
    }
}
