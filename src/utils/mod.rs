use axum::Json;
use bcrypt::{hash, verify};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::result::ApiResponse;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// 令牌只存摘要，不落明文
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 粗略校验邮箱格式
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// 由标题生成 URL 友好的 slug
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_dash = true;
    for c in input.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

pub fn error_to_api_response<T: Serialize>(msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse::error(&msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("  Brand Strategy & Design! "), "brand-strategy-design");
        assert_eq!(slugify("Villa #12 -- Sea View"), "villa-12-sea-view");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn email_checks() {
        assert!(is_valid_email("jane@studio.com"));
        assert!(!is_valid_email("jane@studio"));
        assert!(!is_valid_email("@studio.com"));
        assert!(!is_valid_email("jane doe@studio.com"));
        assert_eq!(normalize_email(" Jane@Studio.COM "), "jane@studio.com");
    }

    #[test]
    fn digest_is_stable_hex() {
        let a = token_digest("abc");
        assert_eq!(a, token_digest("abc"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, token_digest("abd"));
    }

    #[test]
    fn password_roundtrip() {
        let hashed = hash_password("s3cret-pass", 4).unwrap();
        assert!(verify_password("s3cret-pass", &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
    }
}
