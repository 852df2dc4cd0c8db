// 数据库模块
// 文档存储契约、内存与 PostgreSQL 实现，以及带缓存的通用仓储

pub mod document;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod store;

// 重新导出常用类型，方便其他模块使用
pub use document::{Asset, DocumentMeta, GeoPoint, Resource, Visibility};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use repository::Repository;
pub use store::{DocumentStore, StoreError};
