use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    cache::CacheTtl,
    database::{
        Asset, DocumentMeta, Resource,
        document::{assign, eq_filter, require_text, slug_or, text_matches},
    },
    error::AppResult,
};

/// 博客文章
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cover_image: Option<Asset>,
    pub published: bool,
    /// 第一次发布的时间
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct NewInsight {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub cover_image: Option<Asset>,
    /// 文章默认以草稿创建
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct InsightChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub cover_image: Option<Asset>,
    pub published: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InsightFilter {
    pub q: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
}

impl Resource for Insight {
    const COLLECTION: &'static str = "insights";
    const LABEL: &'static str = "Insight";
    const CACHE_TTL: CacheTtl = CacheTtl::Medium;

    type Create = NewInsight;
    type Update = InsightChanges;
    type Filter = InsightFilter;
    type View = Insight;
    type PublicView = Insight;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    fn build(req: NewInsight, meta: DocumentMeta) -> AppResult<Self> {
        require_text("title", &req.title)?;
        let published_at = req.published.then_some(meta.created_at);
        Ok(Insight {
            slug: slug_or(req.slug.as_deref(), &req.title),
            title: req.title.trim().to_string(),
            excerpt: req.excerpt,
            content: req.content,
            author: req.author,
            category: req.category,
            tags: req.tags,
            cover_image: req.cover_image,
            published: req.published,
            published_at,
            meta,
        })
    }

    fn apply(&mut self, req: InsightChanges) -> AppResult<()> {
        if let Some(title) = &req.title {
            require_text("title", title)?;
        }
        if let Some(slug) = req.slug {
            self.slug = slug_or(Some(&slug), &self.title);
        }
        assign(&mut self.title, req.title);
        assign(&mut self.excerpt, req.excerpt);
        assign(&mut self.content, req.content);
        assign(&mut self.author, req.author);
        assign(&mut self.category, req.category);
        assign(&mut self.tags, req.tags);
        assign(&mut self.published, req.published);
        if req.cover_image.is_some() {
            self.cover_image = req.cover_image;
        }
        if self.published && self.published_at.is_none() {
            self.published_at = Some(self.meta.updated_at);
        }
        Ok(())
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn is_published(&self) -> bool {
        self.published
    }

    fn matches(&self, filter: &InsightFilter) -> bool {
        text_matches(
            filter.q.as_deref(),
            &[&self.title, &self.excerpt, &self.author],
        ) && eq_filter(filter.category.as_deref(), &self.category)
            && filter
                .tag
                .as_deref()
                .is_none_or(|tag| self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
    }

    /// 最新发布的在前，草稿排在最后
    fn sort(items: &mut [Self]) {
        items.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.meta.created_at.cmp(&a.meta.created_at))
        });
    }

    fn assets(&self) -> Vec<&Asset> {
        self.cover_image.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn draft(title: &str, created: DateTime<Utc>) -> Insight {
        Insight::build(
            NewInsight {
                title: title.into(),
                slug: None,
                excerpt: String::new(),
                content: "body".into(),
                author: "Sam".into(),
                category: "Market".into(),
                tags: vec![],
                cover_image: None,
                published: false,
            },
            DocumentMeta::new(created),
        )
        .unwrap()
    }

    #[test]
    fn publishing_stamps_published_at_once() {
        let created = Utc::now();
        let mut post = draft("Q3 outlook", created);
        assert_eq!(post.published_at, None);

        let first = created + TimeDelta::hours(1);
        post.meta.updated_at = first;
        post.apply(InsightChanges {
            published: Some(true),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(post.published_at, Some(first));

        post.meta.updated_at = first + TimeDelta::hours(1);
        post.apply(InsightChanges {
            excerpt: Some("short".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(post.published_at, Some(first));
    }

    #[test]
    fn drafts_sort_after_published() {
        let now = Utc::now();
        let mut published = draft("Live", now);
        published.published = true;
        published.published_at = Some(now);
        let mut items = vec![draft("Draft", now + TimeDelta::hours(1)), published];

        Insight::sort(&mut items);
        assert_eq!(items[0].title, "Live");
    }
}
