use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::{
    AppState, error::AppResult, extract::ApiJson, result::ApiResponse,
    utils::success_to_api_response,
};

use super::model::{Inquiry, NewInquiry};

/// 公开表单提交后只回执，不回显内容
#[derive(Debug, Serialize)]
pub struct InquiryReceipt {
    pub id: String,
    pub status: &'static str,
}

#[axum::debug_handler]
pub async fn submit_inquiry(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewInquiry>,
) -> AppResult<(StatusCode, Json<ApiResponse<InquiryReceipt>>)> {
    let inquiry = state.repo::<Inquiry>().create(req).await?;
    tracing::info!("New inquiry {} from {}", inquiry.meta.id, inquiry.email);

    Ok((
        StatusCode::CREATED,
        success_to_api_response(InquiryReceipt {
            id: inquiry.meta.id,
            status: "received",
        }),
    ))
}
