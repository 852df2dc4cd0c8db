use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub access_token_expiration_secs: u64,
    pub refresh_token_expiration_secs: u64,
    pub bcrypt_cost: u32,
    pub cookie_secure: bool,
    pub cache_sweep_interval_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub asset_host_url: Option<String>,
    pub asset_host_api_key: Option<String>,
    pub geocoder_url: String,
    pub geocoder_api_key: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

/// 可选环境变量，空字符串视为未设置
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// 解析 "15m" / "7d" / "1h" / "30s" 或纯秒数
fn parse_duration_secs(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((i, _)) => raw.split_at(i),
        None => (raw, "s"),
    };
    let value = digits.parse::<u64>().ok()?;
    let factor = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => return None,
    };
    value.checked_mul(factor)
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")?;
        let access_token_expiration = optional("ACCESS_TOKEN_TTL")
            .and_then(|v| parse_duration_secs(&v))
            .unwrap_or(15 * 60);
        let refresh_token_expiration = optional("REFRESH_TOKEN_TTL")
            .and_then(|v| parse_duration_secs(&v))
            .unwrap_or(7 * 24 * 3600);

        Ok(Config {
            database_url: optional("DATABASE_URL"),
            redis_url: optional("REDIS_URL"),
            jwt_refresh_secret: optional("JWT_REFRESH_SECRET").unwrap_or_else(|| jwt_secret.clone()),
            jwt_secret,
            access_token_expiration_secs: access_token_expiration,
            refresh_token_expiration_secs: refresh_token_expiration,
            bcrypt_cost: optional("BCRYPT_COST")
                .and_then(|v| v.parse().ok())
                .unwrap_or(bcrypt::DEFAULT_COST),
            cookie_secure: optional("COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(!cfg!(debug_assertions)),
            cache_sweep_interval_secs: optional("CACHE_SWEEP_INTERVAL")
                .and_then(|v| parse_duration_secs(&v))
                .unwrap_or(60),
            rate_limit_window_secs: optional("RATE_LIMIT_WINDOW")
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            rate_limit_requests: optional("RATE_LIMIT_REQUESTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: optional("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            api_base_uri: optional("API_BASE_URI").unwrap_or_else(|| "/api".into()),
            asset_host_url: optional("ASSET_HOST_URL"),
            asset_host_api_key: optional("ASSET_HOST_API_KEY"),
            geocoder_url: optional("GEOCODER_URL").unwrap_or_else(|| {
                "https://maps.googleapis.com/maps/api/geocode/json".into()
            }),
            geocoder_api_key: optional("GEOCODER_API_KEY"),
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
        })
    }

    /// 测试和本地开发用的配置，不读取环境变量
    pub fn for_tests(jwt_secret: &str) -> Self {
        Config {
            database_url: None,
            redis_url: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_refresh_secret: format!("{}-refresh", jwt_secret),
            access_token_expiration_secs: 15 * 60,
            refresh_token_expiration_secs: 7 * 24 * 3600,
            bcrypt_cost: 4,
            cookie_secure: false,
            cache_sweep_interval_secs: 60,
            rate_limit_window_secs: 60,
            rate_limit_requests: 1000,
            server_host: "127.0.0.1".into(),
            server_port: 0,
            api_base_uri: "/api".into(),
            asset_host_url: None,
            asset_host_api_key: None,
            geocoder_url: "http://127.0.0.1/geocode".into(),
            geocoder_api_key: None,
            admin_email: None,
            admin_password: None,
        }
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs.max(1))
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_suffixes() {
        assert_eq!(parse_duration_secs("15m"), Some(900));
        assert_eq!(parse_duration_secs("7d"), Some(604_800));
        assert_eq!(parse_duration_secs("1h"), Some(3600));
        assert_eq!(parse_duration_secs("45"), Some(45));
        assert_eq!(parse_duration_secs("10w"), None);
        assert_eq!(parse_duration_secs("abc"), None);
    }

    #[test]
    fn test_config_uses_default_lifetimes() {
        let config = Config::for_tests("secret");
        assert_eq!(config.access_token_expiration_secs, 900);
        assert_eq!(config.refresh_token_expiration_secs, 604_800);
        assert_ne!(config.jwt_secret, config.jwt_refresh_secret);
    }
}
