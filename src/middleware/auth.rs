use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::{Authorization, HeaderMapExt, authorization::Bearer},
};

use crate::{
    AppState,
    config::Config,
    error::AppError,
    infrastructure::{Claims, Role, auth::IssuedToken},
};

/// 访问令牌 cookie
pub const ACCESS_COOKIE: &str = "client_token";

/// 刷新令牌 cookie
pub const REFRESH_COOKIE: &str = "client_refresh_token";

fn session_cookie(
    name: &'static str,
    issued: &IssuedToken,
    max_age_secs: i64,
    config: &Config,
) -> Result<Cookie<'static>, AppError> {
    let mut cookie = Cookie::parse(format!("{}={}; Max-Age={}", name, issued.token, max_age_secs))
        .map_err(|e| AppError::internal(format!("Failed to build session cookie: {}", e)))?;
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(config.cookie_secure);
    cookie.set_same_site(SameSite::Lax);
    Ok(cookie)
}

pub fn access_cookie(issued: &IssuedToken, config: &Config) -> Result<Cookie<'static>, AppError> {
    session_cookie(ACCESS_COOKIE, issued, config.access_token_expiration_secs as i64, config)
}

pub fn refresh_cookie(issued: &IssuedToken, config: &Config) -> Result<Cookie<'static>, AppError> {
    session_cookie(REFRESH_COOKIE, issued, config.refresh_token_expiration_secs as i64, config)
}

/// 清除两个会话 cookie
pub fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// 认证中间件
///
/// 依次尝试 Bearer 头、访问令牌 cookie；访问令牌缺失或失效且带有刷新令牌 cookie 时，
/// 透明刷新一次，用新的声明继续处理原请求，并在响应上写回新的访问令牌 cookie。
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = bearer_token(req.headers()) {
        let claims = state.tokens.validate(&token)?;
        req.extensions_mut().insert(claims);
        return Ok(next.run(req).await);
    }

    if let Some(access) = jar.get(ACCESS_COOKIE) {
        match state.tokens.validate(access.value()) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                return Ok(next.run(req).await);
            }
            Err(e) => tracing::debug!("Access cookie rejected: {}", e),
        }
    }

    let Some(refresh) = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) else {
        return Err(AppError::Unauthorized);
    };

    let refreshed = match state
        .refresh_gate
        .refresh(state.tokens.clone(), &refresh)
        .await
        .map_err(AppError::from)
    {
        Ok(refreshed) => refreshed,
        // 刷新失败时顺便清掉失效的 cookie，前端据此跳转登录
        Err(AppError::Unauthorized) => {
            return Ok((clear_session_cookies(jar), AppError::Unauthorized).into_response());
        }
        Err(e) => return Err(e),
    };

    let cookie = access_cookie(&refreshed.access, &state.config)?;
    req.extensions_mut().insert(refreshed.claims);
    let response = next.run(req).await;

    Ok((jar.add(cookie), response).into_response())
}

/// 只允许管理员访问，必须放在认证中间件之后
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    match req.extensions().get::<Claims>() {
        Some(claims) if claims.role == Role::Admin => Ok(next.run(req).await),
        Some(claims) => {
            tracing::warn!("Non-admin {} attempted admin access", claims.sub);
            Err(AppError::Forbidden)
        }
        None => Err(AppError::Unauthorized),
    }
}
