use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use super::IntegrationError;
use crate::database::Asset;

const SERVICE: &str = "asset host";

/// 图片托管服务契约
///
/// 目前路由只用到删除；上传保留在契约里，供后续接入上传接口。
#[async_trait]
pub trait AssetHost: Send + Sync {
    async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Asset, IntegrationError>;

    async fn delete(&self, public_id: &str) -> Result<(), IntegrationError>;
}

/// 未配置图片服务时使用，删除直接成功
#[derive(Debug, Default)]
pub struct NoopAssetHost;

#[async_trait]
impl AssetHost for NoopAssetHost {
    async fn upload(
        &self,
        _folder: &str,
        _file_name: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<Asset, IntegrationError> {
        Err(IntegrationError::NotConfigured(SERVICE))
    }

    async fn delete(&self, public_id: &str) -> Result<(), IntegrationError> {
        tracing::debug!("Asset host not configured, skipping delete of {}", public_id);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    #[serde(alias = "secure_url")]
    url: String,
}

/// 基于 HTTP 的图片托管客户端
pub struct HttpAssetHost {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpAssetHost {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, IntegrationError> {
        let base_url = Url::parse(base_url).map_err(|e| IntegrationError::Request {
            service: SERVICE,
            message: format!("invalid base url: {}", e),
        })?;
        Ok(Self {
            client: Client::new(),
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, IntegrationError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| IntegrationError::Request {
                service: SERVICE,
                message: "base url cannot have path segments".into(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

fn request_error(e: reqwest::Error) -> IntegrationError {
    IntegrationError::Request {
        service: SERVICE,
        message: e.to_string(),
    }
}

#[async_trait]
impl AssetHost for HttpAssetHost {
    async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Asset, IntegrationError> {
        let url = self.endpoint(&["upload"])?;
        let response = self
            .authorize(self.client.post(url))
            .query(&[("folder", folder), ("file_name", file_name)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(IntegrationError::Status {
                service: SERVICE,
                status: response.status().as_u16(),
            });
        }

        let uploaded: UploadResponse =
            response.json().await.map_err(|e| IntegrationError::Payload {
                service: SERVICE,
                message: e.to_string(),
            })?;

        tracing::info!("Uploaded asset {}", uploaded.public_id);
        Ok(Asset {
            public_id: uploaded.public_id,
            url: uploaded.url,
            alt: None,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), IntegrationError> {
        let url = self.endpoint(&["assets", public_id])?;
        let response = self
            .authorize(self.client.delete(url))
            .send()
            .await
            .map_err(request_error)?;

        match response.status() {
            // 已经不存在也算删除成功
            status if status.is_success() || status == StatusCode::NOT_FOUND => Ok(()),
            status => Err(IntegrationError::Status {
                service: SERVICE,
                status: status.as_u16(),
            }),
        }
    }
}

/// 并发删除一组图片，单个失败只记日志，返回失败数量
pub async fn delete_assets(host: &dyn AssetHost, assets: &[&Asset]) -> usize {
    let results = join_all(assets.iter().map(|asset| host.delete(&asset.public_id))).await;

    let mut failures = 0;
    for (asset, result) in assets.iter().zip(results) {
        if let Err(e) = result {
            failures += 1;
            tracing::warn!("Failed to delete asset {}: {}", asset.public_id, e);
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        body::Bytes,
        extract::{Path, Query},
        http::StatusCode as AxumStatus,
        routing::{delete, post},
    };
    use std::collections::HashMap;

    async fn spawn_stub() -> String {
        let app = Router::new()
            .route(
                "/upload",
                post(
                    |Query(params): Query<HashMap<String, String>>, body: Bytes| async move {
                        let id = format!("{}/{}", params["folder"], params["file_name"]);
                        Json(serde_json::json!({
                            "public_id": id,
                            "secure_url": format!("https://cdn.test/{}?size={}", id, body.len()),
                        }))
                    },
                ),
            )
            .route(
                "/assets/{id}",
                delete(|Path(id): Path<String>| async move {
                    match id.as_str() {
                        "broken" => AxumStatus::BAD_GATEWAY,
                        "missing" => AxumStatus::NOT_FOUND,
                        _ => AxumStatus::NO_CONTENT,
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn upload_returns_hosted_asset() {
        let host = HttpAssetHost::new(&spawn_stub().await, Some("key".into())).unwrap();
        let asset = host
            .upload("properties", "villa.jpg", "image/jpeg", vec![0u8; 16])
            .await
            .unwrap();

        assert_eq!(asset.public_id, "properties/villa.jpg");
        assert_eq!(asset.url, "https://cdn.test/properties/villa.jpg?size=16");
    }

    #[tokio::test]
    async fn delete_tolerates_partial_failure() {
        let host = HttpAssetHost::new(&spawn_stub().await, None).unwrap();
        let assets: Vec<Asset> = ["a", "broken", "missing"]
            .iter()
            .map(|id| Asset {
                public_id: id.to_string(),
                url: format!("https://cdn.test/{}", id),
                alt: None,
            })
            .collect();
        let refs: Vec<&Asset> = assets.iter().collect();

        assert_eq!(delete_assets(&host, &refs).await, 1);
    }

    #[tokio::test]
    async fn noop_host_skips_deletes_and_refuses_uploads() {
        let host = NoopAssetHost;
        assert!(host.delete("x").await.is_ok());
        assert!(matches!(
            host.upload("f", "n", "image/png", vec![]).await,
            Err(IntegrationError::NotConfigured(_))
        ));
        let asset = Asset {
            public_id: "x".into(),
            url: "https://cdn.test/x".into(),
            alt: None,
        };
        assert_eq!(delete_assets(&host, &[&asset]).await, 0);
    }
}
