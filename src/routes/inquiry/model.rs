use serde::{Deserialize, Serialize};

use crate::{
    cache::CacheTtl,
    database::{
        DocumentMeta, Resource,
        document::{assign, require_text, text_matches},
    },
    error::{AppError, AppResult},
    utils::{is_valid_email, normalize_email},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    #[default]
    New,
    InProgress,
    Closed,
}

/// 联系表单或客户门户提交的咨询
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inquiry {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub property_id: Option<String>,
    /// 登录客户提交时记录账户
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub status: InquiryStatus,
    /// 内部备注
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewInquiry {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: String,
    pub message: String,
    pub service_id: Option<String>,
    pub property_id: Option<String>,
    /// 只能由服务端填写
    #[serde(skip)]
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InquiryChanges {
    pub status: Option<InquiryStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InquiryFilter {
    pub q: Option<String>,
    pub status: Option<InquiryStatus>,
}

impl Resource for Inquiry {
    const COLLECTION: &'static str = "inquiries";
    const LABEL: &'static str = "Inquiry";
    const CACHE_TTL: CacheTtl = CacheTtl::Short;

    type Create = NewInquiry;
    type Update = InquiryChanges;
    type Filter = InquiryFilter;
    type View = Inquiry;
    type PublicView = Inquiry;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    fn build(req: NewInquiry, meta: DocumentMeta) -> AppResult<Self> {
        require_text("name", &req.name)?;
        require_text("message", &req.message)?;
        if !is_valid_email(&req.email) {
            return Err(AppError::validation("email is not a valid address"));
        }
        Ok(Inquiry {
            meta,
            name: req.name.trim().to_string(),
            email: normalize_email(&req.email),
            phone: req.phone,
            subject: req.subject,
            message: req.message,
            service_id: req.service_id,
            property_id: req.property_id,
            client_id: req.client_id,
            status: InquiryStatus::New,
            notes: None,
        })
    }

    fn apply(&mut self, req: InquiryChanges) -> AppResult<()> {
        assign(&mut self.status, req.status);
        if req.notes.is_some() {
            self.notes = req.notes;
        }
        Ok(())
    }

    /// 咨询只在后台和客户门户可见
    fn is_published(&self) -> bool {
        false
    }

    fn matches(&self, filter: &InquiryFilter) -> bool {
        text_matches(
            filter.q.as_deref(),
            &[&self.name, &self.email, &self.subject, &self.message],
        ) && filter.status.is_none_or(|s| s == self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn new_inquiries_start_open_and_require_message() {
        let req = |message: &str| NewInquiry {
            name: "Omar".into(),
            email: "Omar@Example.com".into(),
            phone: None,
            subject: "Viewing".into(),
            message: message.into(),
            service_id: None,
            property_id: Some("p-1".into()),
            client_id: None,
        };

        let inquiry = Inquiry::build(req("Can I view on Friday?"), DocumentMeta::new(Utc::now()))
            .unwrap();
        assert_eq!(inquiry.status, InquiryStatus::New);
        assert_eq!(inquiry.email, "omar@example.com");

        assert!(Inquiry::build(req("   "), DocumentMeta::new(Utc::now())).is_err());
    }

    #[test]
    fn client_id_cannot_be_supplied_by_caller() {
        let req: NewInquiry = serde_json::from_value(serde_json::json!({
            "name": "Omar",
            "email": "omar@example.com",
            "message": "hi",
            "client_id": "someone-else"
        }))
        .unwrap();
        assert_eq!(req.client_id, None);
    }
}
