use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    cache::CacheTtl,
    database::{
        Asset, DocumentMeta, Resource,
        document::{assign, default_true, require_text, slug_or, text_matches},
    },
    error::{AppError, AppResult},
    utils::is_valid_email,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo: Option<Asset>,
    /// 平台名 -> 链接
    #[serde(default)]
    pub socials: BTreeMap<String, String>,
    #[serde(default)]
    pub display_order: i32,
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewTeamMember {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub bio: String,
    pub email: Option<String>,
    pub photo: Option<Asset>,
    #[serde(default)]
    pub socials: BTreeMap<String, String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TeamMemberChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub photo: Option<Asset>,
    pub socials: Option<BTreeMap<String, String>>,
    pub display_order: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TeamFilter {
    pub q: Option<String>,
}

fn check_email(email: Option<&str>) -> AppResult<()> {
    match email {
        Some(email) if !is_valid_email(email) => {
            Err(AppError::validation("email is not a valid address"))
        }
        _ => Ok(()),
    }
}

impl Resource for TeamMember {
    const COLLECTION: &'static str = "team_members";
    const LABEL: &'static str = "Team member";
    const CACHE_TTL: CacheTtl = CacheTtl::Hour;

    type Create = NewTeamMember;
    type Update = TeamMemberChanges;
    type Filter = TeamFilter;
    type View = TeamMember;
    type PublicView = TeamMember;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    fn build(req: NewTeamMember, meta: DocumentMeta) -> AppResult<Self> {
        require_text("name", &req.name)?;
        check_email(req.email.as_deref())?;
        Ok(TeamMember {
            meta,
            slug: slug_or(req.slug.as_deref(), &req.name),
            name: req.name.trim().to_string(),
            role: req.role,
            bio: req.bio,
            email: req.email,
            photo: req.photo,
            socials: req.socials,
            display_order: req.display_order,
            active: req.active,
        })
    }

    fn apply(&mut self, req: TeamMemberChanges) -> AppResult<()> {
        if let Some(name) = &req.name {
            require_text("name", name)?;
        }
        check_email(req.email.as_deref())?;
        if let Some(slug) = req.slug {
            self.slug = slug_or(Some(&slug), &self.name);
        }
        assign(&mut self.name, req.name);
        assign(&mut self.role, req.role);
        assign(&mut self.bio, req.bio);
        assign(&mut self.socials, req.socials);
        assign(&mut self.display_order, req.display_order);
        assign(&mut self.active, req.active);
        if req.email.is_some() {
            self.email = req.email;
        }
        if req.photo.is_some() {
            self.photo = req.photo;
        }
        Ok(())
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }

    /// 离职成员不在公开页面展示
    fn is_published(&self) -> bool {
        self.active
    }

    fn matches(&self, filter: &TeamFilter) -> bool {
        text_matches(filter.q.as_deref(), &[&self.name, &self.role])
    }

    fn sort(items: &mut [Self]) {
        items.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name))
        });
    }

    fn assets(&self) -> Vec<&Asset> {
        self.photo.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn invalid_email_is_rejected() {
        let result = TeamMember::build(
            NewTeamMember {
                name: "Lina".into(),
                slug: None,
                role: "Designer".into(),
                bio: String::new(),
                email: Some("not-an-email".into()),
                photo: None,
                socials: BTreeMap::new(),
                display_order: 0,
                active: true,
            },
            DocumentMeta::new(Utc::now()),
        );
        assert!(result.is_err());
    }
}
