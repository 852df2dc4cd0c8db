// 通用内容接口
// 公开列表/详情，以及后台的增删改查，所有内容类型共用

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    database::{Resource, Visibility},
    error::AppResult,
    extract::{ApiJson, ApiQuery},
    infrastructure::delete_assets,
    result::ApiResponse,
    utils::success_to_api_response,
};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T> Page<T> {
    pub fn paginate<S>(items: Vec<S>, pagination: &Pagination) -> Self
    where
        T: From<S>,
    {
        let limit = pagination
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = pagination.offset.unwrap_or(0);
        let total = items.len();

        Page {
            items: items
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(T::from)
                .collect(),
            total,
            limit,
            offset,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub permanent: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub id: String,
    pub permanent: bool,
}

type Reply<T> = AppResult<Json<ApiResponse<T>>>;

async fn list<R: Resource, V: From<R>>(
    state: &AppState,
    visibility: Visibility,
    pagination: &Pagination,
    filter: &R::Filter,
) -> AppResult<Page<V>> {
    let items = state.repo::<R>().list(visibility, filter).await?;
    Ok(Page::paginate(items, pagination))
}

pub async fn public_list<R: Resource>(
    State(state): State<AppState>,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<R::Filter>,
) -> Reply<Page<R::PublicView>> {
    let page = list::<R, R::PublicView>(&state, Visibility::Public, &pagination, &filter).await?;
    Ok(success_to_api_response(page))
}

pub async fn public_get<R: Resource>(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Reply<R::PublicView> {
    let doc = state.repo::<R>().find(&id_or_slug, Visibility::Public).await?;
    Ok(success_to_api_response(R::PublicView::from(doc)))
}

pub async fn admin_list<R: Resource>(
    State(state): State<AppState>,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<R::Filter>,
) -> Reply<Page<R::View>> {
    let page = list::<R, R::View>(&state, Visibility::Admin, &pagination, &filter).await?;
    Ok(success_to_api_response(page))
}

pub async fn admin_get<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Reply<R::View> {
    let doc = state.repo::<R>().find(&id, Visibility::Admin).await?;
    Ok(success_to_api_response(R::View::from(doc)))
}

pub async fn create<R: Resource>(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<R::Create>,
) -> AppResult<(StatusCode, Json<ApiResponse<R::View>>)> {
    let doc = state.repo::<R>().create(req).await?;
    Ok((StatusCode::CREATED, success_to_api_response(R::View::from(doc))))
}

pub async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<R::Update>,
) -> Reply<R::View> {
    let doc = state.repo::<R>().update(&id, req).await?;
    Ok(success_to_api_response(R::View::from(doc)))
}

/// 默认软删除；permanent=true 时永久删除并清理托管图片
pub async fn remove<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<DeleteParams>,
) -> Reply<Deleted> {
    let repo = state.repo::<R>();

    if !params.permanent {
        repo.soft_delete(&id).await?;
        return Ok(success_to_api_response(Deleted { id, permanent: false }));
    }

    let doc = repo.hard_delete(&id).await?;
    let assets = doc.assets();
    if !assets.is_empty() {
        let failures = delete_assets(state.assets.as_ref(), &assets).await;
        if failures > 0 {
            tracing::warn!(
                "{} of {} assets of {} {} could not be deleted",
                failures,
                assets.len(),
                R::COLLECTION,
                id
            );
        }
    }

    Ok(success_to_api_response(Deleted { id, permanent: true }))
}

/// 公开只读路由：`{path}` 列表和 `{path}/{id_or_slug}` 详情
pub fn public_routes<R: Resource>(path: &str) -> Router<AppState> {
    Router::new()
        .route(path, get(public_list::<R>))
        .route(&format!("{}/{{id}}", path), get(public_get::<R>))
}

/// 后台完整增删改查路由
pub fn admin_routes<R: Resource>(path: &str) -> Router<AppState> {
    Router::new()
        .route(path, get(admin_list::<R>).post(create::<R>))
        .route(
            &format!("{}/{{id}}", path),
            get(admin_get::<R>).put(update::<R>).delete(remove::<R>),
        )
}
