use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value, json};

use super::document::{DocumentMeta, Resource, Visibility};
use super::store::{DocumentStore, StoreError};
use crate::cache::{ResponseCache, keys};
use crate::clock::Clock;
use crate::error::{AppError, AppResult};

/// 单个集合的通用仓储
///
/// 读操作走响应缓存，任何写操作之后立即按集合前缀失效，
/// 保证下一次读取能看到刚写入的数据。
pub struct Repository<R> {
    store: Arc<dyn DocumentStore>,
    cache: Arc<ResponseCache>,
    clock: Arc<dyn Clock>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Resource> Repository<R> {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: Arc<ResponseCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            cache,
            clock,
            _marker: PhantomData,
        }
    }

    /// 按视角和筛选条件列出文档，结果已排序
    pub async fn list(&self, visibility: Visibility, filter: &R::Filter) -> AppResult<Vec<R>> {
        R::check_filter(filter)?;
        let filter_key = serde_json::to_string(filter).map_err(AppError::internal)?;
        let key = keys::list_key(R::COLLECTION, visibility.as_str(), &filter_key);

        self.cache
            .read_through(&key, R::CACHE_TTL.duration(), || async {
                let mut items: Vec<R> = self
                    .load_all()
                    .await?
                    .into_iter()
                    .filter(|doc| doc.is_visible(visibility) && doc.matches(filter))
                    .collect();
                R::sort(&mut items);
                Ok::<_, AppError>(items)
            })
            .await
    }

    /// 按 id 或 slug 查找，软删除或不可见的文档视为不存在
    pub async fn find(&self, id_or_slug: &str, visibility: Visibility) -> AppResult<R> {
        let key = keys::item_key(R::COLLECTION, visibility.as_str(), id_or_slug);

        self.cache
            .read_through(&key, R::CACHE_TTL.duration(), || async {
                let doc = self.lookup(id_or_slug).await?;
                doc.filter(|d| d.is_visible(visibility))
                    .ok_or_else(|| AppError::not_found(R::LABEL))
            })
            .await
    }

    /// 按字段查找未删除的文档，不走缓存
    pub async fn find_where(&self, field: &str, value: Value) -> AppResult<Vec<R>> {
        let docs = self.store.find_by_field(R::COLLECTION, field, &value).await?;
        let mut items: Vec<R> = docs
            .into_iter()
            .filter_map(Self::decode_logged)
            .filter(|doc| !doc.meta().is_deleted())
            .collect();
        R::sort(&mut items);
        Ok(items)
    }

    /// 直接从存储读取，包括软删除的文档
    pub async fn get_raw(&self, id: &str) -> AppResult<Option<R>> {
        match self.store.get(R::COLLECTION, id).await? {
            Some(value) => Ok(Some(Self::decode(value)?)),
            None => Ok(None),
        }
    }

    pub async fn count(&self, visibility: Visibility) -> AppResult<usize> {
        Ok(self.list(visibility, &R::Filter::default()).await?.len())
    }

    pub async fn create(&self, req: R::Create) -> AppResult<R> {
        let doc = R::build(req, DocumentMeta::new(self.clock.now()))?;
        self.insert(doc).await
    }

    /// 写入已经构建好的文档
    pub async fn insert(&self, doc: R) -> AppResult<R> {
        self.ensure_unique_slug(&doc).await?;

        let value = serde_json::to_value(&doc).map_err(AppError::internal)?;
        match self.store.insert(R::COLLECTION, &doc.meta().id, value).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(AppError::Conflict(format!("{} already exists", R::LABEL)));
            }
            Err(e) => return Err(e.into()),
        }

        self.invalidate().await;
        tracing::info!("Created {} {}", R::COLLECTION, doc.meta().id);
        Ok(doc)
    }

    /// 只把本次请求实际改动的字段合并回存储
    pub async fn update(&self, id: &str, req: R::Update) -> AppResult<R> {
        let mut doc = self.require_live(id).await?;
        let before = Self::fields_of(&doc)?;
        // apply 可以用 updated_at 作为当前时间
        doc.meta_mut().updated_at = self.clock.now();
        doc.apply(req)?;
        self.ensure_unique_slug(&doc).await?;

        let after = Self::fields_of(&doc)?;
        let mut fields: Map<String, Value> = after
            .iter()
            .filter(|(key, value)| before.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        // 序列化时被省略的字段要显式置空
        for key in before.keys().filter(|key| !after.contains_key(*key)) {
            fields.insert(key.clone(), Value::Null);
        }
        for protected in R::PROTECTED_FIELDS {
            fields.remove(*protected);
        }
        // id、创建时间和删除标记不随更新改变
        fields.remove("id");
        fields.remove("created_at");
        fields.remove("deleted_at");

        self.merge(id, fields).await
    }

    /// 原子合并部分字段
    pub async fn patch(&self, id: &str, fields: Map<String, Value>) -> AppResult<R> {
        self.merge(id, fields).await
    }

    pub async fn soft_delete(&self, id: &str) -> AppResult<R> {
        self.require_live(id).await?;
        let now = self.clock.now();
        let mut fields = Map::new();
        fields.insert("deleted_at".into(), json!(now));
        fields.insert("updated_at".into(), json!(now));
        let doc = self.merge(id, fields).await?;
        tracing::info!("Soft-deleted {} {}", R::COLLECTION, id);
        Ok(doc)
    }

    /// 永久删除，软删除过的文档也可以被永久删除
    pub async fn hard_delete(&self, id: &str) -> AppResult<R> {
        let doc = self
            .get_raw(id)
            .await?
            .ok_or_else(|| AppError::not_found(R::LABEL))?;
        self.store.delete(R::COLLECTION, id).await?;
        self.invalidate().await;
        tracing::info!("Deleted {} {}", R::COLLECTION, id);
        Ok(doc)
    }

    async fn merge(&self, id: &str, fields: Map<String, Value>) -> AppResult<R> {
        let merged = self
            .store
            .merge(R::COLLECTION, id, fields)
            .await?
            .ok_or_else(|| AppError::not_found(R::LABEL))?;
        self.invalidate().await;
        Self::decode(merged)
    }

    async fn require_live(&self, id: &str) -> AppResult<R> {
        match self.get_raw(id).await? {
            Some(doc) if !doc.meta().is_deleted() => Ok(doc),
            _ => Err(AppError::not_found(R::LABEL)),
        }
    }

    async fn lookup(&self, id_or_slug: &str) -> AppResult<Option<R>> {
        if let Some(doc) = self.get_raw(id_or_slug).await? {
            return Ok(Some(doc));
        }
        let by_slug = self
            .store
            .find_by_field(R::COLLECTION, "slug", &json!(id_or_slug))
            .await?;
        Ok(by_slug.into_iter().filter_map(Self::decode_logged).next())
    }

    async fn load_all(&self) -> AppResult<Vec<R>> {
        let docs = self.store.list(R::COLLECTION).await?;
        Ok(docs.into_iter().filter_map(Self::decode_logged).collect())
    }

    async fn ensure_unique_slug(&self, doc: &R) -> AppResult<()> {
        let Some(slug) = doc.slug() else {
            return Ok(());
        };
        if slug.is_empty() {
            return Err(AppError::validation("slug must not be empty"));
        }
        let taken = self
            .store
            .find_by_field(R::COLLECTION, "slug", &json!(slug))
            .await?
            .into_iter()
            .filter_map(Self::decode_logged)
            .any(|other| other.meta().id != doc.meta().id);
        if taken {
            return Err(AppError::Conflict(format!(
                "{} with slug '{}' already exists",
                R::LABEL,
                slug
            )));
        }
        Ok(())
    }

    async fn invalidate(&self) {
        self.cache
            .delete_prefix(&keys::collection_prefix(R::COLLECTION))
            .await;
    }

    fn fields_of(doc: &R) -> AppResult<Map<String, Value>> {
        match serde_json::to_value(doc).map_err(AppError::internal)? {
            Value::Object(fields) => Ok(fields),
            _ => Err(AppError::internal(format!("{} is not an object", R::LABEL))),
        }
    }

    fn decode(value: Value) -> AppResult<R> {
        serde_json::from_value(value).map_err(|e| {
            AppError::internal(format!("Malformed {} document: {}", R::COLLECTION, e))
        })
    }

    /// 列表读取时跳过损坏的文档，只记日志
    fn decode_logged(value: Value) -> Option<R> {
        match serde_json::from_value(value) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!("Skipping malformed {} document: {}", R::COLLECTION, e);
                None
            }
        }
    }
}
