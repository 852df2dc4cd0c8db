use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use redis::AsyncCommands;

use crate::{AppState, config::Config, error::AppError};

/// 固定窗口限流器
///
/// 配置了 Redis 时用 INCR/EXPIRE 计数，多实例共享；
/// 没有 Redis 或 Redis 出错时退回进程内计数。
pub struct RateLimiter {
    redis: Option<redis::Client>,
    window: Duration,
    max_requests: u32,
    local: Mutex<HashMap<String, (Instant, u32)>>,
}

impl RateLimiter {
    pub fn new(redis: Option<redis::Client>, config: &Config) -> Self {
        Self {
            redis,
            window: config.rate_limit_window(),
            max_requests: config.rate_limit_requests,
            local: Mutex::new(HashMap::new()),
        }
    }

    /// 是否放行本次请求
    pub async fn check(&self, key: &str) -> bool {
        let count = match &self.redis {
            Some(client) => match self.redis_count(client, key).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!("Redis rate limit failed, using local counter: {}", e);
                    self.local_count(key)
                }
            },
            None => self.local_count(key),
        };
        count <= self.max_requests as u64
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }

    async fn redis_count(&self, client: &redis::Client, key: &str) -> redis::RedisResult<u64> {
        let key = format!("rate_limit:{}", key);
        let mut conn = client.get_multiplexed_async_connection().await?;

        // 使用 Redis 的 INCR 和 EXPIRE 命令实现计数器
        let count: u64 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(&key, self.window.as_secs() as i64).await?;
        }
        Ok(count)
    }

    fn local_count(&self, key: &str) -> u64 {
        let now = Instant::now();
        let mut counters = self.local.lock().unwrap_or_else(|e| e.into_inner());

        // 顺便清理过期窗口
        counters.retain(|_, (started, _)| now.duration_since(*started) < self.window);

        let entry = counters.entry(key.to_string()).or_insert((now, 0));
        entry.1 += 1;
        entry.1 as u64
    }
}

/// 客户端 IP：优先 x-real-ip，其次 x-forwarded-for 第一个，最后连接地址
fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .map(|ip| ip.trim().to_string())
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let ip = client_ip(req.headers(), remote);
    let key = format!("{}:{}", ip, req.uri().path());

    if !state.rate_limiter.check(&key).await {
        tracing::warn!("Rate limit exceeded for {}", key);
        return Err(AppError::RateLimited(state.rate_limiter.window_secs()));
    }

    Ok(next.run(req).await)
}
