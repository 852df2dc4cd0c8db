use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::IntegrationError;
use crate::database::GeoPoint;

const SERVICE: &str = "geocoder";

/// 地址解析契约
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// 找不到地址时返回 None
    async fn resolve(&self, address: &str) -> Result<Option<GeoPoint>, IntegrationError>;
}

#[derive(Debug, Default)]
pub struct NoopGeocoder;

#[async_trait]
impl Geocoder for NoopGeocoder {
    async fn resolve(&self, _address: &str) -> Result<Option<GeoPoint>, IntegrationError> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Google Geocoding API 客户端
pub struct GoogleGeocoder {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn resolve(&self, address: &str) -> Result<Option<GeoPoint>, IntegrationError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| IntegrationError::Request {
                service: SERVICE,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(IntegrationError::Status {
                service: SERVICE,
                status: response.status().as_u16(),
            });
        }

        let body: GeocodeResponse = response.json().await.map_err(|e| IntegrationError::Payload {
            service: SERVICE,
            message: e.to_string(),
        })?;

        match body.status.as_str() {
            "OK" => Ok(body.results.into_iter().next().map(|r| GeoPoint {
                lat: r.geometry.location.lat,
                lng: r.geometry.location.lng,
            })),
            "ZERO_RESULTS" => Ok(None),
            other => Err(IntegrationError::Payload {
                service: SERVICE,
                message: format!("status {}", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Query, routing::get};
    use std::collections::HashMap;

    async fn spawn_stub() -> String {
        let app = Router::new().route(
            "/geocode",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let body = match params.get("address").map(String::as_str) {
                    Some("1 Marina Walk, Dubai") => serde_json::json!({
                        "status": "OK",
                        "results": [{ "geometry": { "location": { "lat": 25.08, "lng": 55.14 } } }]
                    }),
                    Some("nowhere") => serde_json::json!({ "status": "ZERO_RESULTS", "results": [] }),
                    _ => serde_json::json!({ "status": "REQUEST_DENIED" }),
                };
                Json(body)
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/geocode", addr)
    }

    #[tokio::test]
    async fn resolves_known_address() {
        let geocoder = GoogleGeocoder::new(&spawn_stub().await, "key");
        let point = geocoder.resolve("1 Marina Walk, Dubai").await.unwrap().unwrap();
        assert_eq!(point, GeoPoint { lat: 25.08, lng: 55.14 });
    }

    #[tokio::test]
    async fn zero_results_is_none_and_denial_is_error() {
        let geocoder = GoogleGeocoder::new(&spawn_stub().await, "key");
        assert_eq!(geocoder.resolve("nowhere").await.unwrap(), None);
        assert!(geocoder.resolve("secret base").await.is_err());
    }
}
