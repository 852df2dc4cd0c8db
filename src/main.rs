use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use agency_backend::{
    AppState,
    cache::spawn_sweeper,
    clock::SystemClock,
    config::Config,
    create_router,
    database::{DocumentStore, MemoryStore, PostgresStore},
    infrastructure::{GoogleGeocoder, HttpAssetHost},
    middleware::RateLimiter,
    routes::client::Client,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 没有配置数据库时使用内存存储
    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url)
                .await
                .expect("Failed to connect to Postgres");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory document store");
            Arc::new(MemoryStore::new())
        }
    };

    // 设置 Redis 客户端，用于限流计数
    let redis_client = config.redis_url.as_deref().map(|url| {
        redis::Client::open(url).expect("Failed to create Redis client")
    });
    let rate_limiter = RateLimiter::new(redis_client, &config);

    let mut state =
        AppState::new(config.clone(), store, Arc::new(SystemClock)).with_rate_limiter(rate_limiter);

    if let Some(url) = &config.asset_host_url {
        let host = HttpAssetHost::new(url, config.asset_host_api_key.clone())
            .expect("Invalid ASSET_HOST_URL");
        state = state.with_assets(Arc::new(host));
    }
    if let Some(key) = &config.geocoder_api_key {
        state = state.with_geocoder(Arc::new(GoogleGeocoder::new(&config.geocoder_url, key)));
    }

    // 初始化管理员账户
    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        state
            .repo::<Client>()
            .ensure_admin(email, password, config.bcrypt_cost)
            .await
            .expect("Failed to bootstrap admin account");
    }

    // 后台清理过期缓存
    let sweeper = spawn_sweeper(state.cache.clone(), config.cache_sweep_interval());

    let app = create_router(state);

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
    })
    .await
    .expect("Failed to start server");

    sweeper.abort();
}
