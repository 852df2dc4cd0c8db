use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::cache::CacheTtl;
use crate::error::{AppError, AppResult};
use crate::utils::slugify;

/// 所有文档共有的元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 软删除标记
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DocumentMeta {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// 托管在图片服务上的资源引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub public_id: String,
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// 读取视角：公开页面只能看到已发布内容，后台能看到全部未删除内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Admin,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Admin => "admin",
        }
    }
}

/// 可通过通用仓储和通用 CRUD 接口管理的内容类型
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// 存储集合名，同时是缓存键前缀
    const COLLECTION: &'static str;
    /// 错误信息中使用的名称
    const LABEL: &'static str;
    const CACHE_TTL: CacheTtl;
    /// 服务端维护的字段，通用更新不会写入
    const PROTECTED_FIELDS: &'static [&'static str] = &[];

    type Create: DeserializeOwned + Send + 'static;
    type Update: DeserializeOwned + Send + 'static;
    type Filter: Serialize + DeserializeOwned + Default + Send + Sync + 'static;
    type View: Serialize + From<Self> + Send + 'static;
    /// 公开接口返回的视图，可以隐藏内部字段
    type PublicView: Serialize + From<Self> + Send + 'static;

    fn meta(&self) -> &DocumentMeta;

    fn meta_mut(&mut self) -> &mut DocumentMeta;

    fn build(req: Self::Create, meta: DocumentMeta) -> AppResult<Self>;

    fn apply(&mut self, req: Self::Update) -> AppResult<()>;

    fn slug(&self) -> Option<&str> {
        None
    }

    /// 是否对公开页面可见
    fn is_published(&self) -> bool {
        true
    }

    /// 筛选条件校验，失败时不读缓存也不写缓存
    fn check_filter(_filter: &Self::Filter) -> AppResult<()> {
        Ok(())
    }

    fn matches(&self, _filter: &Self::Filter) -> bool {
        true
    }

    /// 默认按创建时间倒序
    fn sort(items: &mut [Self]) {
        items.sort_by(|a, b| b.meta().created_at.cmp(&a.meta().created_at));
    }

    /// 永久删除时需要一并清理的图片
    fn assets(&self) -> Vec<&Asset> {
        Vec::new()
    }

    fn is_visible(&self, visibility: Visibility) -> bool {
        if self.meta().is_deleted() {
            return false;
        }
        match visibility {
            Visibility::Public => self.is_published(),
            Visibility::Admin => true,
        }
    }
}

/// serde 默认值：新建内容默认发布
pub fn default_true() -> bool {
    true
}

/// 请求里给了值才覆盖
pub fn assign<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

pub fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(())
}

/// 优先使用请求给出的 slug，否则由标题生成
pub fn slug_or(slug: Option<&str>, title: &str) -> String {
    match slug.map(slugify).filter(|s| !s.is_empty()) {
        Some(slug) => slug,
        None => slugify(title),
    }
}

/// 大小写不敏感的子串匹配，用于 `q` 关键字筛选
pub fn text_matches(query: Option<&str>, fields: &[&str]) -> bool {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        None => true,
        Some(q) => {
            let q = q.to_lowercase();
            fields.iter().any(|f| f.to_lowercase().contains(&q))
        }
    }
}

/// 可选字符串等值筛选，忽略大小写
pub fn eq_filter(expected: Option<&str>, actual: &str) -> bool {
    expected.is_none_or(|e| e.eq_ignore_ascii_case(actual))
}
