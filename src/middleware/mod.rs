mod auth;
mod error_handler;
mod rate_limit;

pub use auth::{
    ACCESS_COOKIE, REFRESH_COOKIE, access_cookie, auth_middleware, clear_session_cookies,
    refresh_cookie, require_admin,
};
pub use error_handler::log_errors;
pub use rate_limit::{RateLimiter, rate_limit};
