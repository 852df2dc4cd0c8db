use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;

/// 缓存过期档位，由调用方按资源选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// 30 秒
    Short,
    /// 5 分钟
    Medium,
    /// 30 分钟
    Long,
    /// 60 分钟
    Hour,
}

impl CacheTtl {
    pub fn duration(self) -> Duration {
        match self {
            CacheTtl::Short => Duration::from_secs(30),
            CacheTtl::Medium => Duration::from_secs(5 * 60),
            CacheTtl::Long => Duration::from_secs(30 * 60),
            CacheTtl::Hour => Duration::from_secs(60 * 60),
        }
    }
}

impl From<CacheTtl> for Duration {
    fn from(ttl: CacheTtl) -> Self {
        ttl.duration()
    }
}

/// 单个缓存条目
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(value: Value, now: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            value,
            expires_at,
        }
    }

    /// 到达过期时间即视为过期
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_presets_are_fixed() {
        assert_eq!(CacheTtl::Short.duration(), Duration::from_secs(30));
        assert_eq!(CacheTtl::Medium.duration(), Duration::from_secs(300));
        assert_eq!(CacheTtl::Long.duration(), Duration::from_secs(1800));
        assert_eq!(CacheTtl::Hour.duration(), Duration::from_secs(3600));
    }

    #[test]
    fn entry_expires_exactly_at_deadline() {
        let now = Utc::now();
        let entry = CacheEntry::new(Value::from(1), now, Duration::from_secs(30));

        assert!(!entry.is_expired(now));
        assert!(!entry.is_expired(now + TimeDelta::seconds(29)));
        assert!(entry.is_expired(now + TimeDelta::seconds(30)));
    }

    #[test]
    fn huge_ttl_does_not_overflow() {
        let now = Utc::now();
        let entry = CacheEntry::new(Value::Null, now, Duration::from_secs(u64::MAX));
        assert!(!entry.is_expired(now + TimeDelta::days(365 * 100)));
    }
}
