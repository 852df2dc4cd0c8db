// 响应缓存模块
// 进程内的键值缓存，按条目过期，后台任务定期清理

pub mod entry;
pub mod keys;
pub mod store;
pub mod sweeper;

pub use entry::{CacheEntry, CacheTtl};
pub use store::{CacheStats, ResponseCache};
pub use sweeper::spawn_sweeper;
