use std::sync::Arc;

use cache::ResponseCache;
use clock::Clock;
use config::Config;
use database::{DocumentStore, Repository, Resource};
use infrastructure::{AssetHost, Geocoder, NoopAssetHost, NoopGeocoder, RefreshGate, TokenManager};
use middleware::RateLimiter;
use routes::client::Client;

pub mod cache;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod infrastructure;
pub mod middleware;
pub mod result;
pub mod utils;

pub mod routes;

pub use routes::create_router;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DocumentStore>,
    pub cache: Arc<ResponseCache>,
    pub tokens: Arc<TokenManager>,
    pub refresh_gate: Arc<RefreshGate>,
    pub assets: Arc<dyn AssetHost>,
    pub geocoder: Arc<dyn Geocoder>,
    pub rate_limiter: Arc<RateLimiter>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// 组装应用状态，外部服务默认使用空实现
    pub fn new(config: Config, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        let cache = Arc::new(ResponseCache::new(clock.clone()));
        let sessions = Arc::new(Repository::<Client>::new(
            store.clone(),
            cache.clone(),
            clock.clone(),
        ));
        let tokens = Arc::new(TokenManager::new(&config, clock.clone(), sessions));
        let rate_limiter = Arc::new(RateLimiter::new(None, &config));

        Self {
            config: Arc::new(config),
            store,
            cache,
            tokens,
            refresh_gate: Arc::new(RefreshGate::new()),
            assets: Arc::new(NoopAssetHost),
            geocoder: Arc::new(NoopGeocoder),
            rate_limiter,
            clock,
        }
    }

    pub fn with_assets(mut self, assets: Arc<dyn AssetHost>) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = Arc::new(rate_limiter);
        self
    }

    /// 某个集合的仓储，共享同一个存储和缓存
    pub fn repo<R: Resource>(&self) -> Repository<R> {
        Repository::new(self.store.clone(), self.cache.clone(), self.clock.clone())
    }
}
