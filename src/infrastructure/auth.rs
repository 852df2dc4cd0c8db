use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::Config;
use crate::utils::token_digest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Client,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,     // 账户ID
    pub role: Role,      // 账户角色
    pub purpose: TokenPurpose,
    pub iat: i64,        // 签发时间
    pub exp: i64,        // 过期时间
    pub jti: String,     // 令牌ID
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    #[error("credential missing")]
    Missing,

    #[error("credential invalid")]
    Invalid,

    #[error("credential expired")]
    Expired,

    #[error("credential used for the wrong purpose")]
    WrongPurpose,

    #[error("refresh credential revoked")]
    Revoked,

    #[error("session store failure: {0}")]
    Store(String),

    #[error("token signing failure: {0}")]
    Signing(String),
}

/// 账户上保存的会话状态
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub refresh_digest: Option<String>,
    pub role: Role,
    pub active: bool,
}

/// 刷新令牌持久化契约，刷新令牌摘要保存在账户记录上
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn save_refresh_digest(&self, subject: &str, digest: Option<String>)
    -> Result<(), AuthError>;

    async fn load_session(&self, subject: &str) -> Result<Option<SessionRecord>, AuthError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// 刷新成功后的新访问令牌及其声明
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedAccess {
    pub claims: Claims,
    pub access: IssuedToken,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// 令牌会话管理
///
/// 访问令牌短期有效，刷新令牌长期有效且摘要落在账户记录上，
/// 撤销时清掉摘要即可让所有未过期的刷新令牌立刻失效。
pub struct TokenManager {
    access_keys: KeyPair,
    refresh_keys: KeyPair,
    access_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    sessions: Arc<dyn RefreshTokenStore>,
}

impl TokenManager {
    pub fn new(config: &Config, clock: Arc<dyn Clock>, sessions: Arc<dyn RefreshTokenStore>) -> Self {
        Self {
            access_keys: KeyPair::from_secret(&config.jwt_secret),
            refresh_keys: KeyPair::from_secret(&config.jwt_refresh_secret),
            access_ttl: TimeDelta::seconds(config.access_token_expiration_secs as i64),
            refresh_ttl: TimeDelta::seconds(config.refresh_token_expiration_secs as i64),
            clock,
            sessions,
        }
    }

    /// 签发访问令牌和刷新令牌，并把刷新令牌摘要写入账户
    pub async fn issue(&self, subject: &str, role: Role) -> Result<TokenPair, AuthError> {
        let access = self.sign(subject, role, TokenPurpose::Access)?;
        let refresh = self.sign(subject, role, TokenPurpose::Refresh)?;

        self.sessions
            .save_refresh_digest(subject, Some(token_digest(&refresh.token)))
            .await?;

        tracing::debug!("Issued session tokens for {}", subject);
        Ok(TokenPair { access, refresh })
    }

    /// 校验访问令牌
    pub fn validate(&self, access_token: &str) -> Result<Claims, AuthError> {
        self.decode(access_token, TokenPurpose::Access)
    }

    /// 用刷新令牌换新的访问令牌，刷新令牌本身不轮换
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, AuthError> {
        let (claims, session) = self.current_session(refresh_token).await?;
        if !session.active {
            return Err(AuthError::Revoked);
        }

        // 角色以账户当前值为准
        let access = self.sign(&claims.sub, session.role, TokenPurpose::Access)?;
        let claims = self.validate(&access.token)?;
        tracing::debug!("Refreshed access token for {}", claims.sub);
        Ok(RefreshedAccess { claims, access })
    }

    /// 仅当刷新令牌仍是账户当前的令牌时才撤销，返回被撤销的账户
    pub async fn revoke_refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let (claims, _) = self.current_session(refresh_token).await?;
        self.revoke(&claims.sub).await?;
        Ok(claims.sub)
    }

    /// 清除账户上保存的刷新令牌
    pub async fn revoke(&self, subject: &str) -> Result<(), AuthError> {
        self.sessions.save_refresh_digest(subject, None).await?;
        tracing::info!("Revoked refresh token for {}", subject);
        Ok(())
    }

    /// 校验签名、过期和用途，并要求摘要与账户上保存的一致
    async fn current_session(
        &self,
        refresh_token: &str,
    ) -> Result<(Claims, SessionRecord), AuthError> {
        let claims = self.decode(refresh_token, TokenPurpose::Refresh)?;

        let session = self
            .sessions
            .load_session(&claims.sub)
            .await?
            .ok_or(AuthError::Revoked)?;

        match &session.refresh_digest {
            Some(stored) if *stored == token_digest(refresh_token) => Ok((claims, session)),
            _ => Err(AuthError::Revoked),
        }
    }

    fn sign(&self, subject: &str, role: Role, purpose: TokenPurpose) -> Result<IssuedToken, AuthError> {
        let (keys, ttl) = match purpose {
            TokenPurpose::Access => (&self.access_keys, self.access_ttl),
            TokenPurpose::Refresh => (&self.refresh_keys, self.refresh_ttl),
        };

        let now = self.clock.now();
        let expires_at = now + ttl;
        let claims = Claims {
            sub: subject.to_string(),
            role,
            purpose,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &keys.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    fn decode(&self, token: &str, purpose: TokenPurpose) -> Result<Claims, AuthError> {
        let keys = match purpose {
            TokenPurpose::Access => &self.access_keys,
            TokenPurpose::Refresh => &self.refresh_keys,
        };

        // 过期由注入的时钟判断
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &keys.decoding, &validation)
            .map_err(|_| AuthError::Invalid)?
            .claims;

        if claims.purpose != purpose {
            return Err(AuthError::WrongPurpose);
        }
        if claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// 内存会话存储
    #[derive(Default)]
    pub(crate) struct MemorySessions {
        records: Mutex<HashMap<String, SessionRecord>>,
    }

    impl MemorySessions {
        pub(crate) async fn add(&self, subject: &str, role: Role) {
            self.records.lock().await.insert(
                subject.to_string(),
                SessionRecord {
                    refresh_digest: None,
                    role,
                    active: true,
                },
            );
        }

        async fn set_active(&self, subject: &str, active: bool) {
            if let Some(record) = self.records.lock().await.get_mut(subject) {
                record.active = active;
            }
        }
    }

    #[async_trait]
    impl RefreshTokenStore for MemorySessions {
        async fn save_refresh_digest(
            &self,
            subject: &str,
            digest: Option<String>,
        ) -> Result<(), AuthError> {
            match self.records.lock().await.get_mut(subject) {
                Some(record) => {
                    record.refresh_digest = digest;
                    Ok(())
                }
                None => Err(AuthError::Store(format!("unknown subject {}", subject))),
            }
        }

        async fn load_session(&self, subject: &str) -> Result<Option<SessionRecord>, AuthError> {
            Ok(self.records.lock().await.get(subject).cloned())
        }
    }

    async fn manager_with(config: Config) -> (TokenManager, ManualClock, Arc<MemorySessions>) {
        let clock = ManualClock::default();
        let sessions = Arc::new(MemorySessions::default());
        sessions.add("client-1", Role::Client).await;
        let manager = TokenManager::new(&config, Arc::new(clock.clone()), sessions.clone());
        (manager, clock, sessions)
    }

    async fn manager() -> (TokenManager, ManualClock, Arc<MemorySessions>) {
        manager_with(Config::for_tests("unit-secret")).await
    }

    #[tokio::test]
    async fn issued_access_validates_and_refresh_yields_new_access() {
        let (manager, clock, _) = manager().await;
        let pair = manager.issue("client-1", Role::Client).await.unwrap();

        let claims = manager.validate(&pair.access.token).unwrap();
        assert_eq!(claims.sub, "client-1");
        assert_eq!(claims.purpose, TokenPurpose::Access);
        assert_eq!(pair.access.expires_at - clock.now(), TimeDelta::minutes(15));
        assert_eq!(pair.refresh.expires_at - clock.now(), TimeDelta::days(7));

        clock.advance(TimeDelta::minutes(20));
        assert_eq!(manager.validate(&pair.access.token), Err(AuthError::Expired));

        let refreshed = manager.refresh(&pair.refresh.token).await.unwrap();
        assert_eq!(refreshed.claims.sub, "client-1");
        assert_eq!(manager.validate(&refreshed.access.token).unwrap().sub, "client-1");
    }

    #[tokio::test]
    async fn refresh_fails_after_revoke() {
        let (manager, _, _) = manager().await;
        let pair = manager.issue("client-1", Role::Client).await.unwrap();

        manager.revoke("client-1").await.unwrap();
        assert_eq!(
            manager.refresh(&pair.refresh.token).await.unwrap_err(),
            AuthError::Revoked
        );
    }

    #[tokio::test]
    async fn only_latest_refresh_token_is_accepted() {
        let (manager, _, _) = manager().await;
        let first = manager.issue("client-1", Role::Client).await.unwrap();
        let second = manager.issue("client-1", Role::Client).await.unwrap();

        assert_eq!(
            manager.refresh(&first.refresh.token).await.unwrap_err(),
            AuthError::Revoked
        );
        assert!(manager.refresh(&second.refresh.token).await.is_ok());
    }

    #[tokio::test]
    async fn superseded_refresh_token_cannot_revoke_current_session() {
        let (manager, _, _) = manager().await;
        let old = manager.issue("client-1", Role::Client).await.unwrap();
        let current = manager.issue("client-1", Role::Client).await.unwrap();

        assert_eq!(
            manager.revoke_refresh(&old.refresh.token).await.unwrap_err(),
            AuthError::Revoked
        );
        assert!(manager.refresh(&current.refresh.token).await.is_ok());

        assert_eq!(
            manager.revoke_refresh(&current.refresh.token).await.unwrap(),
            "client-1"
        );
        assert_eq!(
            manager.refresh(&current.refresh.token).await.unwrap_err(),
            AuthError::Revoked
        );
    }

    #[tokio::test]
    async fn expired_refresh_token_is_rejected() {
        let (manager, clock, _) = manager().await;
        let pair = manager.issue("client-1", Role::Client).await.unwrap();

        clock.advance(TimeDelta::days(7));
        assert_eq!(
            manager.refresh(&pair.refresh.token).await.unwrap_err(),
            AuthError::Expired
        );
    }

    #[tokio::test]
    async fn purpose_tags_are_enforced_with_shared_secret() {
        let mut config = Config::for_tests("shared");
        config.jwt_refresh_secret = config.jwt_secret.clone();
        let (manager, _, _) = manager_with(config).await;
        let pair = manager.issue("client-1", Role::Client).await.unwrap();

        assert_eq!(manager.validate(&pair.refresh.token), Err(AuthError::WrongPurpose));
        assert_eq!(
            manager.refresh(&pair.access.token).await.unwrap_err(),
            AuthError::WrongPurpose
        );
    }

    #[tokio::test]
    async fn tampered_or_foreign_tokens_are_invalid() {
        let (manager, _, _) = manager().await;
        let pair = manager.issue("client-1", Role::Client).await.unwrap();

        let (other, _, _) = manager_with(Config::for_tests("other-secret")).await;
        assert_eq!(other.validate(&pair.access.token), Err(AuthError::Invalid));
        assert_eq!(manager.validate("not-a-jwt"), Err(AuthError::Invalid));
        // 用访问密钥解不开刷新令牌
        assert_eq!(manager.validate(&pair.refresh.token), Err(AuthError::Invalid));
    }

    #[tokio::test]
    async fn deactivated_account_cannot_refresh() {
        let (manager, _, sessions) = manager().await;
        let pair = manager.issue("client-1", Role::Client).await.unwrap();

        sessions.set_active("client-1", false).await;
        assert_eq!(
            manager.refresh(&pair.refresh.token).await.unwrap_err(),
            AuthError::Revoked
        );
    }

    #[tokio::test]
    async fn refresh_picks_up_current_role() {
        let (manager, _, sessions) = manager().await;
        let pair = manager.issue("client-1", Role::Client).await.unwrap();

        sessions.records.lock().await.get_mut("client-1").unwrap().role = Role::Admin;
        let refreshed = manager.refresh(&pair.refresh.token).await.unwrap();
        assert_eq!(refreshed.claims.role, Role::Admin);
    }
}
