// 路由模块
// 每个内容类型一个子模块，通用增删改查在 resource 中

pub mod auth;
pub mod client;
pub mod dashboard;
pub mod gallery;
pub mod inquiry;
pub mod insight;
pub mod project;
pub mod property;
pub mod resource;
pub mod service;
pub mod team;

use axum::{
    Json, Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    middleware::{auth_middleware, log_errors, rate_limit, require_admin},
};

use self::{
    client::Client, gallery::Gallery, inquiry::Inquiry, insight::Insight, project::Project,
    property::Property, resource::{admin_get, admin_list, admin_routes, public_routes, remove},
    service::Service, team::TeamMember,
};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn public_api() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(public_routes::<Service>("/services"))
        .merge(public_routes::<Project>("/projects"))
        .merge(public_routes::<TeamMember>("/team"))
        .merge(public_routes::<Insight>("/insights"))
        .merge(public_routes::<Gallery>("/galleries"))
        .merge(public_routes::<Property>("/properties"))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
}

/// 登录、注册和公开表单需要限流
fn rate_limited_api(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/inquiries", post(inquiry::submit_inquiry))
        .route_layer(from_fn_with_state(state.clone(), rate_limit))
}

fn client_api(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route(
            "/client/me",
            get(client::get_profile).put(client::update_profile),
        )
        .route("/client/password", put(client::change_password))
        .route(
            "/client/inquiries",
            get(client::list_my_inquiries).post(client::create_my_inquiry),
        )
        .route("/client/projects", get(client::list_my_projects))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
}

fn admin_api(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard::dashboard))
        .merge(admin_routes::<Service>("/admin/services"))
        .merge(admin_routes::<Project>("/admin/projects"))
        .merge(admin_routes::<TeamMember>("/admin/team"))
        .merge(admin_routes::<Insight>("/admin/insights"))
        .merge(admin_routes::<Gallery>("/admin/galleries"))
        .merge(admin_routes::<Inquiry>("/admin/inquiries"))
        // 房源需要地址解析，账户需要哈希密码，创建和更新单独处理
        .route(
            "/admin/properties",
            get(admin_list::<Property>).post(property::create_property),
        )
        .route(
            "/admin/properties/{id}",
            get(admin_get::<Property>)
                .put(property::update_property)
                .delete(remove::<Property>),
        )
        .route(
            "/admin/clients",
            get(admin_list::<Client>).post(client::create_client),
        )
        .route(
            "/admin/clients/{id}",
            get(admin_get::<Client>)
                .put(resource::update::<Client>)
                .delete(remove::<Client>),
        )
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
}

/// 组装完整路由
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(public_api())
        .merge(rate_limited_api(&state))
        .merge(client_api(&state))
        .merge(admin_api(&state));

    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };

    // 添加日志中间件
    let router = router
        .layer(from_fn(log_errors))
        .layer(TraceLayer::new_for_http());

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    router.with_state(state)
}
