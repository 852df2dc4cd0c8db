use serde::{Deserialize, Serialize};

use crate::{
    cache::CacheTtl,
    database::{
        Asset, DocumentMeta, GeoPoint, Resource,
        document::{assign, default_true, eq_filter, require_text, slug_or, text_matches},
    },
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    #[default]
    Sale,
    Rent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    #[default]
    Available,
    UnderOffer,
    Sold,
    Rented,
}

/// 房源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub listing_type: ListingType,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    #[serde(default)]
    pub area_sqm: Option<f64>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub images: Vec<Asset>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default)]
    pub featured: bool,
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewProperty {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub listing_type: ListingType,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    pub area_sqm: Option<f64>,
    #[serde(default)]
    pub address: String,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub images: Vec<Asset>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_true")]
    pub published: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PropertyChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub listing_type: Option<ListingType>,
    pub property_type: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub area_sqm: Option<f64>,
    pub address: Option<String>,
    pub location: Option<GeoPoint>,
    pub images: Option<Vec<Asset>>,
    pub features: Option<Vec<String>>,
    pub status: Option<PropertyStatus>,
    pub featured: Option<bool>,
    pub published: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub q: Option<String>,
    pub listing_type: Option<ListingType>,
    pub property_type: Option<String>,
    pub status: Option<PropertyStatus>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u32>,
    pub featured: Option<bool>,
}

fn default_currency() -> String {
    "AED".to_string()
}

fn check_price(price: f64) -> AppResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation("price must be a non-negative number"));
    }
    Ok(())
}

fn check_location(location: Option<&GeoPoint>) -> AppResult<()> {
    match location {
        Some(point) if !point.is_valid() => Err(AppError::validation(
            "location must have lat within ±90 and lng within ±180",
        )),
        _ => Ok(()),
    }
}

impl Resource for Property {
    const COLLECTION: &'static str = "properties";
    const LABEL: &'static str = "Property";
    const CACHE_TTL: CacheTtl = CacheTtl::Medium;

    type Create = NewProperty;
    type Update = PropertyChanges;
    type Filter = PropertyFilter;
    type View = Property;
    type PublicView = Property;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    fn build(req: NewProperty, meta: DocumentMeta) -> AppResult<Self> {
        require_text("title", &req.title)?;
        check_price(req.price)?;
        check_location(req.location.as_ref())?;
        Ok(Property {
            meta,
            slug: slug_or(req.slug.as_deref(), &req.title),
            title: req.title.trim().to_string(),
            description: req.description,
            price: req.price,
            currency: req.currency.to_uppercase(),
            listing_type: req.listing_type,
            property_type: req.property_type,
            bedrooms: req.bedrooms,
            bathrooms: req.bathrooms,
            area_sqm: req.area_sqm,
            address: req.address,
            location: req.location,
            images: req.images,
            features: req.features,
            status: req.status,
            featured: req.featured,
            published: req.published,
        })
    }

    fn apply(&mut self, req: PropertyChanges) -> AppResult<()> {
        if let Some(title) = &req.title {
            require_text("title", title)?;
        }
        if let Some(price) = req.price {
            check_price(price)?;
        }
        check_location(req.location.as_ref())?;

        if let Some(slug) = req.slug {
            self.slug = slug_or(Some(&slug), &self.title);
        }
        // 地址变了但没给坐标时，旧坐标作废
        if req.address.as_ref().is_some_and(|a| *a != self.address) && req.location.is_none() {
            self.location = None;
        }
        assign(&mut self.title, req.title);
        assign(&mut self.description, req.description);
        assign(&mut self.price, req.price);
        assign(&mut self.currency, req.currency.map(|c| c.to_uppercase()));
        assign(&mut self.listing_type, req.listing_type);
        assign(&mut self.property_type, req.property_type);
        assign(&mut self.bedrooms, req.bedrooms);
        assign(&mut self.bathrooms, req.bathrooms);
        assign(&mut self.address, req.address);
        assign(&mut self.images, req.images);
        assign(&mut self.features, req.features);
        assign(&mut self.status, req.status);
        assign(&mut self.featured, req.featured);
        assign(&mut self.published, req.published);
        if req.area_sqm.is_some() {
            self.area_sqm = req.area_sqm;
        }
        if req.location.is_some() {
            self.location = req.location;
        }
        Ok(())
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn is_published(&self) -> bool {
        self.published
    }

    fn check_filter(filter: &PropertyFilter) -> AppResult<()> {
        for (field, value) in [("min_price", filter.min_price), ("max_price", filter.max_price)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(AppError::validation(format!("{} must be a finite number", field)));
            }
        }
        Ok(())
    }

    fn matches(&self, filter: &PropertyFilter) -> bool {
        text_matches(
            filter.q.as_deref(),
            &[&self.title, &self.address, &self.description],
        ) && filter.listing_type.is_none_or(|t| t == self.listing_type)
            && eq_filter(filter.property_type.as_deref(), &self.property_type)
            && filter.status.is_none_or(|s| s == self.status)
            && filter.min_price.is_none_or(|min| self.price >= min)
            && filter.max_price.is_none_or(|max| self.price <= max)
            && filter.min_bedrooms.is_none_or(|min| self.bedrooms >= min)
            && filter.featured.is_none_or(|f| f == self.featured)
    }

    /// 推荐房源在前，其余按创建时间倒序
    fn sort(items: &mut [Self]) {
        items.sort_by(|a, b| {
            b.featured
                .cmp(&a.featured)
                .then_with(|| b.meta.created_at.cmp(&a.meta.created_at))
        });
    }

    fn assets(&self) -> Vec<&Asset> {
        self.images.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn villa() -> NewProperty {
        NewProperty {
            title: "Sea View Villa".into(),
            slug: None,
            description: "Four bedroom villa on the water".into(),
            price: 2_500_000.0,
            currency: "aed".into(),
            listing_type: ListingType::Sale,
            property_type: "Villa".into(),
            bedrooms: 4,
            bathrooms: 5,
            area_sqm: Some(420.0),
            address: "1 Marina Walk, Dubai".into(),
            location: None,
            images: vec![],
            features: vec!["Pool".into()],
            status: PropertyStatus::Available,
            featured: false,
            published: true,
        }
    }

    #[test]
    fn negative_price_and_bad_location_are_rejected() {
        let meta = DocumentMeta::new(Utc::now());
        let mut req = villa();
        req.price = -1.0;
        assert!(Property::build(req, meta.clone()).is_err());

        let mut req = villa();
        req.location = Some(GeoPoint { lat: 120.0, lng: 0.0 });
        assert!(Property::build(req, meta).is_err());
    }

    #[test]
    fn non_finite_price_filters_are_rejected() {
        let nan = PropertyFilter {
            min_price: Some(f64::NAN),
            ..Default::default()
        };
        assert!(matches!(Property::check_filter(&nan), Err(AppError::Validation(_))));
        let inf = PropertyFilter {
            max_price: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(Property::check_filter(&inf).is_err());
        let ok = PropertyFilter {
            min_price: Some(10.0),
            max_price: Some(20.5),
            ..Default::default()
        };
        assert!(Property::check_filter(&ok).is_ok());
    }

    #[test]
    fn filters_by_price_bedrooms_and_type() {
        let p = Property::build(villa(), DocumentMeta::new(Utc::now())).unwrap();
        assert_eq!(p.currency, "AED");
        assert!(p.matches(&PropertyFilter {
            listing_type: Some(ListingType::Sale),
            property_type: Some("villa".into()),
            min_price: Some(1_000_000.0),
            max_price: Some(3_000_000.0),
            min_bedrooms: Some(3),
            ..Default::default()
        }));
        assert!(!p.matches(&PropertyFilter {
            listing_type: Some(ListingType::Rent),
            ..Default::default()
        }));
        assert!(!p.matches(&PropertyFilter {
            max_price: Some(1_000_000.0),
            ..Default::default()
        }));
        assert!(!p.matches(&PropertyFilter {
            status: Some(PropertyStatus::Sold),
            ..Default::default()
        }));
    }

    #[test]
    fn changing_address_drops_stale_location() {
        let mut req = villa();
        req.location = Some(GeoPoint { lat: 25.08, lng: 55.14 });
        let mut p = Property::build(req, DocumentMeta::new(Utc::now())).unwrap();

        p.apply(PropertyChanges {
            address: Some("2 Palm Road, Dubai".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(p.location, None);
    }
}
