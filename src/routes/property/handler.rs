use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    database::GeoPoint,
    error::AppResult,
    extract::ApiJson,
    infrastructure::Geocoder,
    result::ApiResponse,
    utils::success_to_api_response,
};

use super::model::{NewProperty, Property, PropertyChanges};

/// 解析地址坐标，失败只记日志，房源照常保存
async fn locate(geocoder: &dyn Geocoder, address: &str) -> Option<GeoPoint> {
    if address.trim().is_empty() {
        return None;
    }
    match geocoder.resolve(address).await {
        Ok(Some(point)) => Some(point),
        Ok(None) => {
            tracing::info!("No coordinates found for address {:?}", address);
            None
        }
        Err(e) => {
            tracing::warn!("Geocoding failed for {:?}: {}", address, e);
            None
        }
    }
}

#[axum::debug_handler]
pub async fn create_property(
    State(state): State<AppState>,
    ApiJson(mut req): ApiJson<NewProperty>,
) -> AppResult<(StatusCode, Json<ApiResponse<Property>>)> {
    if req.location.is_none() {
        req.location = locate(state.geocoder.as_ref(), &req.address).await;
    }

    let property = state.repo::<Property>().create(req).await?;
    Ok((StatusCode::CREATED, success_to_api_response(property)))
}

#[axum::debug_handler]
pub async fn update_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(mut req): ApiJson<PropertyChanges>,
) -> AppResult<Json<ApiResponse<Property>>> {
    if req.location.is_none() {
        if let Some(address) = &req.address {
            req.location = locate(state.geocoder.as_ref(), address).await;
        }
    }

    let property = state.repo::<Property>().update(&id, req).await?;
    Ok(success_to_api_response(property))
}
