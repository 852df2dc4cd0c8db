use serde::{Deserialize, Serialize};

use crate::{
    cache::CacheTtl,
    database::{
        Asset, DocumentMeta, Resource,
        document::{assign, default_true, eq_filter, require_text, slug_or, text_matches},
    },
    error::AppResult,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gallery {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub images: Vec<Asset>,
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewGallery {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub images: Vec<Asset>,
    #[serde(default = "default_true")]
    pub published: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct GalleryChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub images: Option<Vec<Asset>>,
    pub published: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GalleryFilter {
    pub q: Option<String>,
    pub category: Option<String>,
}

impl Resource for Gallery {
    const COLLECTION: &'static str = "galleries";
    const LABEL: &'static str = "Gallery";
    const CACHE_TTL: CacheTtl = CacheTtl::Long;

    type Create = NewGallery;
    type Update = GalleryChanges;
    type Filter = GalleryFilter;
    type View = Gallery;
    type PublicView = Gallery;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    fn build(req: NewGallery, meta: DocumentMeta) -> AppResult<Self> {
        require_text("title", &req.title)?;
        Ok(Gallery {
            meta,
            slug: slug_or(req.slug.as_deref(), &req.title),
            title: req.title.trim().to_string(),
            description: req.description,
            category: req.category,
            images: req.images,
            published: req.published,
        })
    }

    fn apply(&mut self, req: GalleryChanges) -> AppResult<()> {
        if let Some(title) = &req.title {
            require_text("title", title)?;
        }
        if let Some(slug) = req.slug {
            self.slug = slug_or(Some(&slug), &self.title);
        }
        assign(&mut self.title, req.title);
        assign(&mut self.description, req.description);
        assign(&mut self.category, req.category);
        assign(&mut self.images, req.images);
        assign(&mut self.published, req.published);
        Ok(())
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn is_published(&self) -> bool {
        self.published
    }

    fn matches(&self, filter: &GalleryFilter) -> bool {
        text_matches(filter.q.as_deref(), &[&self.title, &self.description])
            && eq_filter(filter.category.as_deref(), &self.category)
    }

    fn assets(&self) -> Vec<&Asset> {
        self.images.iter().collect()
    }
}
