use axum::{Json, extract::State};
use serde::Serialize;

use crate::{
    AppState,
    cache::CacheStats,
    database::Visibility,
    error::AppResult,
    result::ApiResponse,
    utils::success_to_api_response,
};

use super::{
    client::Client,
    gallery::Gallery,
    inquiry::{Inquiry, InquiryFilter, InquiryStatus},
    insight::Insight,
    project::Project,
    property::Property,
    service::Service,
    team::TeamMember,
};

#[derive(Debug, Serialize)]
pub struct DashboardCounts {
    pub services: usize,
    pub projects: usize,
    pub team_members: usize,
    pub clients: usize,
    pub inquiries: usize,
    pub insights: usize,
    pub galleries: usize,
    pub properties: usize,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub counts: DashboardCounts,
    pub new_inquiries: usize,
    pub cache: CacheStats,
}

/// 后台首页统计，各集合并发读取
#[axum::debug_handler]
pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<ApiResponse<DashboardSummary>>> {
    let new_filter = InquiryFilter {
        status: Some(InquiryStatus::New),
        ..Default::default()
    };

    let services = state.repo::<Service>();
    let projects = state.repo::<Project>();
    let team = state.repo::<TeamMember>();
    let clients = state.repo::<Client>();
    let inquiries = state.repo::<Inquiry>();
    let insights = state.repo::<Insight>();
    let galleries = state.repo::<Gallery>();
    let properties = state.repo::<Property>();

    let (
        services,
        projects,
        team_members,
        clients,
        inquiries_total,
        insights,
        galleries,
        properties,
        new_inquiries,
    ) = tokio::try_join!(
        services.count(Visibility::Admin),
        projects.count(Visibility::Admin),
        team.count(Visibility::Admin),
        clients.count(Visibility::Admin),
        inquiries.count(Visibility::Admin),
        insights.count(Visibility::Admin),
        galleries.count(Visibility::Admin),
        properties.count(Visibility::Admin),
        inquiries.list(Visibility::Admin, &new_filter),
    )?;

    Ok(success_to_api_response(DashboardSummary {
        counts: DashboardCounts {
            services,
            projects,
            team_members,
            clients,
            inquiries: inquiries_total,
            insights,
            galleries,
            properties,
        },
        new_inquiries: new_inquiries.len(),
        cache: state.cache.stats().await,
    }))
}
