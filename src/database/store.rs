use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document already exists: {0}")]
    Duplicate(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Document serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// 文档存储契约
///
/// 文档按集合 + id 存放，内容是任意 JSON 对象。`merge` 必须是单文档原子操作，
/// 这是整个服务唯一依赖的一致性保证。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 插入新文档，id 已存在时返回 `Duplicate`
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// 按顶层字段精确匹配
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError>;

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    /// 把 patch 中的顶层字段合并进文档，返回合并后的文档；文档不存在时返回 None
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}
