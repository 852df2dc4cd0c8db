use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{
    cache::CacheTtl,
    database::{DocumentMeta, Repository, Resource, document::{assign, eq_filter, require_text, text_matches}},
    error::{AppError, AppResult},
    infrastructure::{
        Role,
        auth::{AuthError, RefreshTokenStore, SessionRecord},
    },
    utils::{hash_password, is_valid_email, normalize_email},
};

pub const MIN_PASSWORD_LEN: usize = 8;

/// 客户账户，同时承载会话状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub active: bool,
    /// 当前有效刷新令牌的摘要
    #[serde(default)]
    pub refresh_token_hash: Option<String>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

/// 对外返回的账户信息，不含密码和令牌
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Client> for ClientProfile {
    fn from(client: Client) -> Self {
        ClientProfile {
            id: client.meta.id,
            email: client.email,
            name: client.name,
            company: client.company,
            phone: client.phone,
            role: client.role,
            active: client.active,
            last_login_at: client.last_login_at,
            created_at: client.meta.created_at,
        }
    }
}

/// 已经哈希过密码的新账户
#[derive(Debug, Deserialize)]
pub struct NewClient {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// 后台新建账户的请求，密码为明文
#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClientFilter {
    pub q: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

pub fn check_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

impl Resource for Client {
    const COLLECTION: &'static str = "clients";
    const LABEL: &'static str = "Client";
    const CACHE_TTL: CacheTtl = CacheTtl::Short;
    const PROTECTED_FIELDS: &'static [&'static str] =
        &["password_hash", "refresh_token_hash", "last_login_at"];

    type Create = NewClient;
    type Update = ClientChanges;
    type Filter = ClientFilter;
    type View = ClientProfile;
    type PublicView = ClientProfile;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    fn build(req: NewClient, meta: DocumentMeta) -> AppResult<Self> {
        require_text("name", &req.name)?;
        if !is_valid_email(&req.email) {
            return Err(AppError::validation("email is not a valid address"));
        }
        Ok(Client {
            meta,
            email: normalize_email(&req.email),
            password_hash: req.password_hash,
            name: req.name.trim().to_string(),
            company: req.company,
            phone: req.phone,
            role: req.role,
            active: true,
            refresh_token_hash: None,
            last_login_at: None,
        })
    }

    fn apply(&mut self, req: ClientChanges) -> AppResult<()> {
        if let Some(name) = &req.name {
            require_text("name", name)?;
        }
        assign(&mut self.name, req.name.map(|n| n.trim().to_string()));
        assign(&mut self.role, req.role);
        assign(&mut self.active, req.active);
        if req.company.is_some() {
            self.company = req.company;
        }
        if req.phone.is_some() {
            self.phone = req.phone;
        }
        Ok(())
    }

    fn matches(&self, filter: &ClientFilter) -> bool {
        let role = match self.role {
            Role::Client => "client",
            Role::Admin => "admin",
        };
        text_matches(
            filter.q.as_deref(),
            &[&self.name, &self.email, self.company.as_deref().unwrap_or("")],
        ) && eq_filter(filter.role.as_deref(), role)
            && filter.active.is_none_or(|a| a == self.active)
    }
}

impl Repository<Client> {
    /// 按邮箱查找未删除的账户
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Client>> {
        let found = self
            .find_where("email", json!(normalize_email(email)))
            .await?;
        Ok(found.into_iter().next())
    }

    /// 邮箱唯一，新建前检查
    pub async fn register(&self, req: NewClient) -> AppResult<Client> {
        if self.find_by_email(&req.email).await?.is_some() {
            return Err(AppError::Conflict(
                "An account with this email already exists".into(),
            ));
        }
        self.create(req).await
    }

    pub async fn set_password_hash(&self, id: &str, password_hash: String) -> AppResult<Client> {
        let mut fields = Map::new();
        fields.insert("password_hash".into(), Value::String(password_hash));
        self.patch(id, fields).await
    }

    pub async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> AppResult<Client> {
        let mut fields = Map::new();
        fields.insert("last_login_at".into(), json!(at));
        self.patch(id, fields).await
    }

    /// 启动时确保存在管理员账户
    pub async fn ensure_admin(&self, email: &str, password: &str, cost: u32) -> AppResult<Client> {
        if let Some(existing) = self.find_by_email(email).await? {
            if existing.role != Role::Admin {
                tracing::warn!("Bootstrap admin {} exists without admin role", email);
            }
            return Ok(existing);
        }

        check_password(password)?;
        let admin = self
            .register(NewClient {
                email: email.to_string(),
                password_hash: hash_password(password, cost)?,
                name: "Administrator".into(),
                company: None,
                phone: None,
                role: Role::Admin,
            })
            .await?;
        tracing::info!("Created bootstrap admin account {}", admin.email);
        Ok(admin)
    }
}

#[async_trait]
impl RefreshTokenStore for Repository<Client> {
    async fn save_refresh_digest(
        &self,
        subject: &str,
        digest: Option<String>,
    ) -> Result<(), AuthError> {
        let mut fields = Map::new();
        fields.insert("refresh_token_hash".into(), json!(digest));
        self.patch(subject, fields)
            .await
            .map(|_| ())
            .map_err(|e| AuthError::Store(e.to_string()))
    }

    async fn load_session(&self, subject: &str) -> Result<Option<SessionRecord>, AuthError> {
        let client = self
            .get_raw(subject)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(client
            .filter(|c| !c.meta.is_deleted())
            .map(|c| SessionRecord {
                refresh_digest: c.refresh_token_hash,
                role: c.role,
                active: c.active,
            }))
    }
}
