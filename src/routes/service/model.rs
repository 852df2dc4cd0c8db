use serde::{Deserialize, Serialize};

use crate::{
    cache::CacheTtl,
    database::{
        DocumentMeta, Resource,
        document::{assign, default_true, require_text, slug_or, text_matches},
    },
    error::AppResult,
};

/// 公司提供的服务项目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub display_order: i32,
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewService {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub published: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub features: Option<Vec<String>>,
    pub display_order: Option<i32>,
    pub published: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServiceFilter {
    pub q: Option<String>,
}

impl Resource for Service {
    const COLLECTION: &'static str = "services";
    const LABEL: &'static str = "Service";
    const CACHE_TTL: CacheTtl = CacheTtl::Long;

    type Create = NewService;
    type Update = ServiceChanges;
    type Filter = ServiceFilter;
    type View = Service;
    type PublicView = Service;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    fn build(req: NewService, meta: DocumentMeta) -> AppResult<Self> {
        require_text("title", &req.title)?;
        Ok(Service {
            meta,
            slug: slug_or(req.slug.as_deref(), &req.title),
            title: req.title.trim().to_string(),
            summary: req.summary,
            description: req.description,
            icon: req.icon,
            features: req.features,
            display_order: req.display_order,
            published: req.published,
        })
    }

    fn apply(&mut self, req: ServiceChanges) -> AppResult<()> {
        if let Some(title) = &req.title {
            require_text("title", title)?;
        }
        if let Some(slug) = req.slug {
            self.slug = slug_or(Some(&slug), &self.title);
        }
        assign(&mut self.title, req.title);
        assign(&mut self.summary, req.summary);
        assign(&mut self.description, req.description);
        assign(&mut self.features, req.features);
        assign(&mut self.display_order, req.display_order);
        assign(&mut self.published, req.published);
        if req.icon.is_some() {
            self.icon = req.icon;
        }
        Ok(())
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn is_published(&self) -> bool {
        self.published
    }

    fn matches(&self, filter: &ServiceFilter) -> bool {
        text_matches(
            filter.q.as_deref(),
            &[&self.title, &self.summary, &self.description],
        )
    }

    /// 按展示顺序，其次按标题
    fn sort(items: &mut [Self]) {
        items.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.title.cmp(&b.title))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn service(title: &str, order: i32) -> Service {
        Service::build(
            NewService {
                title: title.into(),
                slug: None,
                summary: String::new(),
                description: format!("{} for growing brands", title),
                icon: None,
                features: vec![],
                display_order: order,
                published: true,
            },
            DocumentMeta::new(Utc::now()),
        )
        .unwrap()
    }

    #[test]
    fn services_sort_by_display_order() {
        let mut items = vec![service("Web", 2), service("Branding", 1), service("Apps", 2)];
        Service::sort(&mut items);
        let titles: Vec<_> = items.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Branding", "Apps", "Web"]);
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut s = service("Web", 1);
        assert!(s.apply(ServiceChanges {
            title: Some(" ".into()),
            ..Default::default()
        })
        .is_err());
        assert_eq!(s.slug, "web");
    }
}
