use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::Result;
use crate::models::{
    ChangeRole, ChannelSummary, CommunityDetail, CommunitySummary, CreateChannel,
    CreateCommunity, JoinedCommunity, MemberInfo, UpdateCommunity,
};
use crate::pagination::{Page, PageQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct CommunityFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
}

pub async fn create_community(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateCommunity>,
) -> Result<(StatusCode, Json<CommunityDetail>)> {
    let detail = state.community_service.create(input, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn list_communities(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<CommunityFilter>,
) -> Result<Json<Page<CommunitySummary>>> {
    let result = state
        .community_service
        .list(
            page,
            filter.category.as_deref(),
            filter.search.as_deref(),
            filter.sort_by.as_deref(),
            caller.user_id(),
        )
        .await?;

    Ok(Json(result))
}

pub async fn my_communities(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<JoinedCommunity>>> {
    let communities = state
        .community_service
        .joined_communities(auth.user_id)
        .await?;

    Ok(Json(communities))
}

pub async fn get_community(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    Path(slug): Path<String>,
) -> Result<Json<CommunityDetail>> {
    let detail = state
        .community_service
        .get_by_slug(&slug, caller.user_id())
        .await?;

    Ok(Json(detail))
}

pub async fn update_community(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCommunity>,
) -> Result<Json<CommunityDetail>> {
    let detail = state
        .community_service
        .update(id, input, auth.user_id)
        .await?;

    Ok(Json(detail))
}

pub async fn join_community(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.community_service.join(id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn leave_community(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.community_service.leave(id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<MemberInfo>>> {
    let members = state.community_service.get_members(id, page).await?;
    Ok(Json(members))
}

pub async fn change_member_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<ChangeRole>,
) -> Result<StatusCode> {
    state
        .community_service
        .change_role(id, user_id, input, auth.user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateChannel>,
) -> Result<(StatusCode, Json<ChannelSummary>)> {
    let channel = state
        .community_service
        .create_channel(id, input, auth.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(channel)))
}
