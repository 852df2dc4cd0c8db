use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState,
    database::Repository,
    error::{AppError, AppResult},
    extract::ApiJson,
    infrastructure::Claims,
    middleware::clear_session_cookies,
    result::ApiResponse,
    routes::{
        inquiry::{Inquiry, NewInquiry},
        project::Project,
    },
    utils::{hash_password, success_to_api_response, verify_password},
};

use super::model::{
    Client, ClientChanges, ClientProfile, CreateClientRequest, NewClient, check_password,
};

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ClientInquiryRequest {
    #[serde(default)]
    pub subject: String,
    pub message: String,
    pub phone: Option<String>,
    pub service_id: Option<String>,
    pub property_id: Option<String>,
}

/// 令牌对应的账户，已删除或停用视为未登录
pub async fn current_client(repo: &Repository<Client>, claims: &Claims) -> AppResult<Client> {
    match repo.get_raw(&claims.sub).await? {
        Some(client) if !client.meta.is_deleted() && client.active => Ok(client),
        _ => Err(AppError::Unauthorized),
    }
}

/// 后台新建账户
#[axum::debug_handler]
pub async fn create_client(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateClientRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ClientProfile>>)> {
    check_password(&req.password)?;
    let client = state
        .repo::<Client>()
        .register(NewClient {
            email: req.email,
            password_hash: hash_password(&req.password, state.config.bcrypt_cost)?,
            name: req.name,
            company: req.company,
            phone: req.phone,
            role: req.role,
        })
        .await?;

    Ok((StatusCode::CREATED, success_to_api_response(client.into())))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ApiResponse<ClientProfile>>> {
    let client = current_client(&state.repo::<Client>(), &claims).await?;
    Ok(success_to_api_response(client.into()))
}

/// 客户只能改自己的基本资料，角色和状态由后台管理
#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ClientProfile>>> {
    let repo = state.repo::<Client>();
    current_client(&repo, &claims).await?;

    let client = repo
        .update(
            &claims.sub,
            ClientChanges {
                name: req.name,
                company: req.company,
                phone: req.phone,
                role: None,
                active: None,
            },
        )
        .await?;
    Ok(success_to_api_response(client.into()))
}

/// 修改密码后撤销会话，需要重新登录
#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    jar: CookieJar,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> AppResult<Response> {
    let repo = state.repo::<Client>();
    let client = current_client(&repo, &claims).await?;

    if !verify_password(&req.current_password, &client.password_hash)? {
        return Err(AppError::validation("Current password is incorrect"));
    }
    check_password(&req.new_password)?;

    let password_hash = hash_password(&req.new_password, state.config.bcrypt_cost)?;
    repo.set_password_hash(&claims.sub, password_hash).await?;
    state.tokens.revoke(&claims.sub).await?;

    Ok((
        clear_session_cookies(jar),
        success_to_api_response(json!({ "password_changed": true })),
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn list_my_inquiries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ApiResponse<Vec<Inquiry>>>> {
    let inquiries = state
        .repo::<Inquiry>()
        .find_where("client_id", json!(claims.sub))
        .await?;
    Ok(success_to_api_response(inquiries))
}

#[axum::debug_handler]
pub async fn create_my_inquiry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ClientInquiryRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Inquiry>>)> {
    let client = current_client(&state.repo::<Client>(), &claims).await?;

    let inquiry = state
        .repo::<Inquiry>()
        .create(NewInquiry {
            name: client.name,
            email: client.email,
            phone: req.phone.or(client.phone),
            subject: req.subject,
            message: req.message,
            service_id: req.service_id,
            property_id: req.property_id,
            client_id: Some(client.meta.id),
        })
        .await?;

    Ok((StatusCode::CREATED, success_to_api_response(inquiry)))
}

/// 与账户关联的项目，包括未公开的
#[axum::debug_handler]
pub async fn list_my_projects(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ApiResponse<Vec<Project>>>> {
    let projects = state
        .repo::<Project>()
        .find_where("client_id", json!(claims.sub))
        .await?;
    Ok(success_to_api_response(projects))
}
