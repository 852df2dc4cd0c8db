use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

use super::entry::CacheEntry;
use crate::clock::Clock;

/// 缓存命中统计
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// 进程内响应缓存
///
/// 只是读优化层：序列化失败只记日志，不向调用方传播。没有容量上限，
/// 条目只会因过期清理或显式失效而离开。
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            clock,
        }
    }

    /// 读取未过期的值，不存在、已过期或无法反序列化时返回 None
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let value = {
            let entries = self.entries.read().await;
            entries
                .get(key)
                .filter(|entry| !entry.is_expired(now))
                .map(|entry| entry.value.clone())
        };

        let Some(value) = value else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        match serde_json::from_value(value) {
            Ok(v) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Cache hit: {}", key);
                Some(v)
            }
            Err(e) => {
                tracing::warn!("Cached value for {} has unexpected shape: {}", key, e);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// 无条件覆盖写入
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to serialize cache value for {}: {}", key, e);
                return;
            }
        };

        let entry = CacheEntry::new(value, self.clock.now(), ttl);
        self.entries.write().await.insert(key.to_string(), entry);
        tracing::debug!("Cache set: {} (ttl {}s)", key, ttl.as_secs());
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// 删除某个前缀下的所有键，返回删除数量
    pub async fn delete_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("Cache invalidated {} entries under {}", removed, prefix);
        }
        removed
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// 命中则直接返回，否则调用 producer 并缓存结果
    ///
    /// producer 出错时不写缓存，错误原样返回。
    pub async fn read_through<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }

        let value = producer().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    /// 清理所有过期条目，返回清理数量
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheTtl;
    use crate::clock::ManualClock;
    use chrono::TimeDelta;
    use std::sync::atomic::AtomicUsize;

    fn cache_with_clock() -> (ResponseCache, ManualClock) {
        let clock = ManualClock::default();
        (ResponseCache::new(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn get_returns_value_until_ttl_elapses() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", &"v", Duration::from_secs(30)).await;

        clock.advance(TimeDelta::seconds(29));
        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("v"));

        clock.advance(TimeDelta::seconds(1));
        assert_eq!(cache.get::<String>("k").await, None);
    }

    #[tokio::test]
    async fn set_overwrites_and_resets_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", &1, Duration::from_secs(10)).await;
        clock.advance(TimeDelta::seconds(8));
        cache.set("k", &2, Duration::from_secs(10)).await;
        clock.advance(TimeDelta::seconds(8));

        assert_eq!(cache.get::<i32>("k").await, Some(2));
    }

    #[tokio::test]
    async fn read_through_calls_producer_once_within_ttl() {
        let (cache, clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        for _ in 0..5 {
            let value: Result<Vec<u32>, ()> = cache
                .read_through("list", CacheTtl::Short.duration(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await;
            assert_eq!(value, Ok(vec![1, 2, 3]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(TimeDelta::seconds(31));
        let _: Result<Vec<u32>, ()> = cache
            .read_through("list", CacheTtl::Short.duration(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![])
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn read_through_does_not_cache_errors() {
        let (cache, _clock) = cache_with_clock();

        let first: Result<u32, &str> = cache
            .read_through("k", Duration::from_secs(60), || async { Err("down") })
            .await;
        assert_eq!(first, Err("down"));

        let second: Result<u32, &str> = cache
            .read_through("k", Duration::from_secs(60), || async { Ok(7) })
            .await;
        assert_eq!(second, Ok(7));
    }

    #[tokio::test]
    async fn invalidation_after_write_avoids_stale_reads() {
        let (cache, _clock) = cache_with_clock();
        cache.set("services:list:public:{}", &vec!["old"], Duration::from_secs(300)).await;
        cache.set("services:item:public:web", &"old", Duration::from_secs(300)).await;
        cache.set("projects:list:public:{}", &vec!["keep"], Duration::from_secs(300)).await;

        assert_eq!(cache.delete_prefix("services:").await, 2);

        let fresh: Result<Vec<String>, ()> = cache
            .read_through("services:list:public:{}", Duration::from_secs(300), || async {
                Ok(vec!["new".to_string()])
            })
            .await;
        assert_eq!(fresh, Ok(vec!["new".to_string()]));
        assert!(cache.get::<Vec<String>>("projects:list:public:{}").await.is_some());

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_entries() {
        let (cache, clock) = cache_with_clock();
        cache.set("short", &1, CacheTtl::Short.duration()).await;
        cache.set("hour", &2, CacheTtl::Hour.duration()).await;

        clock.advance(TimeDelta::minutes(1));
        assert_eq!(cache.sweep_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(!cache.delete("short").await);
        assert!(cache.delete("hour").await);
    }

    #[tokio::test]
    async fn stats_track_hits_and_misses() {
        let (cache, _clock) = cache_with_clock();
        cache.set("k", &true, Duration::from_secs(5)).await;
        let _ = cache.get::<bool>("k").await;
        let _ = cache.get::<bool>("missing").await;
        // 类型不匹配按未命中处理
        let _ = cache.get::<Vec<String>>("k").await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 1);
    }
}
