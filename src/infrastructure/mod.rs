// 基础设施：令牌会话管理与第三方服务契约

pub mod assets;
pub mod auth;
pub mod geocoder;
pub mod refresh_gate;

pub use assets::{AssetHost, HttpAssetHost, NoopAssetHost, delete_assets};
pub use auth::{AuthError, Claims, Role, TokenManager, TokenPair, TokenPurpose};
pub use geocoder::{Geocoder, GoogleGeocoder, NoopGeocoder};
pub use refresh_gate::RefreshGate;

use thiserror::Error;

/// 第三方服务调用失败
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("Request to {service} failed: {message}")]
    Request { service: &'static str, message: String },

    #[error("{service} responded with status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("{service} returned an unexpected payload: {message}")]
    Payload { service: &'static str, message: String },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}
