use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    error::{AppError, AppResult},
    extract::ApiJson,
    infrastructure::{AuthError, Claims, Role, TokenPair},
    middleware::{
        ACCESS_COOKIE, REFRESH_COOKIE, access_cookie, clear_session_cookies, refresh_cookie,
    },
    result::ApiResponse,
    routes::client::{Client, ClientProfile, NewClient, check_password, current_client},
    utils::{hash_password, success_to_api_response, verify_password},
};

use super::model::{LoginRequest, LogoutResponse, RefreshResponse, RegisterRequest};

/// 把令牌写入两个 http-only cookie
fn with_session(jar: CookieJar, pair: &TokenPair, state: &AppState) -> AppResult<CookieJar> {
    Ok(jar
        .add(access_cookie(&pair.access, &state.config)?)
        .add(refresh_cookie(&pair.refresh, &state.config)?))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<ApiResponse<ClientProfile>>)> {
    check_password(&req.password)?;

    let repo = state.repo::<Client>();
    let client = repo
        .register(NewClient {
            email: req.email,
            password_hash: hash_password(&req.password, state.config.bcrypt_cost)?,
            name: req.name,
            company: req.company,
            phone: req.phone,
            role: Role::Client,
        })
        .await?;

    let pair = state.tokens.issue(&client.meta.id, client.role).await?;
    let client = repo.touch_last_login(&client.meta.id, state.clock.now()).await?;
    tracing::info!("Registered client {}", client.meta.id);

    Ok((
        StatusCode::CREATED,
        with_session(jar, &pair, &state)?,
        success_to_api_response(client.into()),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<ClientProfile>>)> {
    let repo = state.repo::<Client>();

    // 账户不存在和密码错误返回同样的错误
    let client = match repo.find_by_email(&req.email).await? {
        Some(client) if verify_password(&req.password, &client.password_hash)? => client,
        _ => {
            tracing::info!("Failed login attempt for {}", req.email.trim());
            return Err(AppError::Unauthorized);
        }
    };
    if !client.active {
        return Err(AppError::Forbidden);
    }

    let pair = state.tokens.issue(&client.meta.id, client.role).await?;
    let client = repo.touch_last_login(&client.meta.id, state.clock.now()).await?;
    tracing::info!("Client {} logged in", client.meta.id);

    Ok((
        with_session(jar, &pair, &state)?,
        success_to_api_response(client.into()),
    ))
}

/// 用刷新令牌 cookie 换新的访问令牌
#[axum::debug_handler]
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> AppResult<Response> {
    let Some(token) = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) else {
        return Err(AppError::Unauthorized);
    };

    match state
        .refresh_gate
        .refresh(state.tokens.clone(), &token)
        .await
        .map_err(AppError::from)
    {
        Ok(refreshed) => {
            let cookie = access_cookie(&refreshed.access, &state.config)?;
            Ok((
                jar.add(cookie),
                success_to_api_response(RefreshResponse {
                    expires_at: refreshed.access.expires_at,
                }),
            )
                .into_response())
        }
        Err(AppError::Unauthorized) => {
            Ok((clear_session_cookies(jar), AppError::Unauthorized).into_response())
        }
        Err(e) => Err(e),
    }
}

/// 能识别出账户就撤销其刷新令牌，无论如何都清除 cookie
///
/// 只凭刷新令牌时，必须是账户当前的那一个，旧令牌不能注销新会话。
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<LogoutResponse>>) {
    let access_subject = jar
        .get(ACCESS_COOKIE)
        .and_then(|c| state.tokens.validate(c.value()).ok())
        .map(|claims| claims.sub);

    let revoked = match (access_subject, jar.get(REFRESH_COOKIE)) {
        (Some(subject), _) => state.tokens.revoke(&subject).await.map(|_| subject),
        (None, Some(cookie)) => state.tokens.revoke_refresh(cookie.value()).await,
        (None, None) => Err(AuthError::Missing),
    };
    match revoked {
        Ok(subject) => tracing::info!("Logged out {}", subject),
        Err(e) => tracing::debug!("Logout without a revocable session: {}", e),
    }

    (
        clear_session_cookies(jar),
        success_to_api_response(LogoutResponse { logged_out: true }),
    )
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ApiResponse<ClientProfile>>> {
    let client = current_client(&state.repo::<Client>(), &claims).await?;
    Ok(success_to_api_response(client.into()))
}
