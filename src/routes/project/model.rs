use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    cache::CacheTtl,
    database::{
        Asset, DocumentMeta, Resource,
        document::{assign, default_true, eq_filter, require_text, slug_or, text_matches},
    },
    error::AppResult,
};

/// 作品案例
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub client_name: String,
    /// 关联的客户账户，客户门户据此展示
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_image: Option<Asset>,
    #[serde(default)]
    pub images: Vec<Asset>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    pub published: bool,
    #[serde(default)]
    pub completed_on: Option<NaiveDate>,
}

/// 公开页面看到的作品，不暴露关联的客户账户
#[derive(Debug, Serialize)]
pub struct PublicProject {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub slug: String,
    pub title: String,
    pub client_name: String,
    pub category: String,
    pub summary: String,
    pub description: String,
    pub cover_image: Option<Asset>,
    pub images: Vec<Asset>,
    pub tags: Vec<String>,
    pub featured: bool,
    pub completed_on: Option<NaiveDate>,
}

impl From<Project> for PublicProject {
    fn from(project: Project) -> Self {
        PublicProject {
            meta: project.meta,
            slug: project.slug,
            title: project.title,
            client_name: project.client_name,
            category: project.category,
            summary: project.summary,
            description: project.description,
            cover_image: project.cover_image,
            images: project.images,
            tags: project.tags,
            featured: project.featured,
            completed_on: project.completed_on,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewProject {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub client_name: String,
    pub client_id: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub cover_image: Option<Asset>,
    #[serde(default)]
    pub images: Vec<Asset>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_true")]
    pub published: bool,
    pub completed_on: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub client_name: Option<String>,
    pub client_id: Option<String>,
    pub category: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<Asset>,
    pub images: Option<Vec<Asset>>,
    pub tags: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub published: Option<bool>,
    pub completed_on: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProjectFilter {
    pub q: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub featured: Option<bool>,
}

impl Resource for Project {
    const COLLECTION: &'static str = "projects";
    const LABEL: &'static str = "Project";
    const CACHE_TTL: CacheTtl = CacheTtl::Medium;

    type Create = NewProject;
    type Update = ProjectChanges;
    type Filter = ProjectFilter;
    type View = Project;
    type PublicView = PublicProject;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    fn build(req: NewProject, meta: DocumentMeta) -> AppResult<Self> {
        require_text("title", &req.title)?;
        Ok(Project {
            meta,
            slug: slug_or(req.slug.as_deref(), &req.title),
            title: req.title.trim().to_string(),
            client_name: req.client_name,
            client_id: req.client_id,
            category: req.category,
            summary: req.summary,
            description: req.description,
            cover_image: req.cover_image,
            images: req.images,
            tags: req.tags,
            featured: req.featured,
            published: req.published,
            completed_on: req.completed_on,
        })
    }

    fn apply(&mut self, req: ProjectChanges) -> AppResult<()> {
        if let Some(title) = &req.title {
            require_text("title", title)?;
        }
        if let Some(slug) = req.slug {
            self.slug = slug_or(Some(&slug), &self.title);
        }
        assign(&mut self.title, req.title);
        assign(&mut self.client_name, req.client_name);
        assign(&mut self.category, req.category);
        assign(&mut self.summary, req.summary);
        assign(&mut self.description, req.description);
        assign(&mut self.images, req.images);
        assign(&mut self.tags, req.tags);
        assign(&mut self.featured, req.featured);
        assign(&mut self.published, req.published);
        if req.client_id.is_some() {
            self.client_id = req.client_id;
        }
        if req.cover_image.is_some() {
            self.cover_image = req.cover_image;
        }
        if req.completed_on.is_some() {
            self.completed_on = req.completed_on;
        }
        Ok(())
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn is_published(&self) -> bool {
        self.published
    }

    fn matches(&self, filter: &ProjectFilter) -> bool {
        text_matches(
            filter.q.as_deref(),
            &[&self.title, &self.client_name, &self.summary],
        ) && eq_filter(filter.category.as_deref(), &self.category)
            && filter
                .tag
                .as_deref()
                .is_none_or(|tag| self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
            && filter.featured.is_none_or(|f| f == self.featured)
    }

    /// 推荐在前，其余按完成日期倒序
    fn sort(items: &mut [Self]) {
        items.sort_by(|a, b| {
            b.featured
                .cmp(&a.featured)
                .then_with(|| b.completed_on.cmp(&a.completed_on))
                .then_with(|| b.meta.created_at.cmp(&a.meta.created_at))
        });
    }

    fn assets(&self) -> Vec<&Asset> {
        self.cover_image.iter().chain(self.images.iter()).collect()
    }
}
