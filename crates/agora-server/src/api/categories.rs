use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::models::{Category, CreateCategory, UpdateCategory};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CategoryListQuery {
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "community".to_string()
}

/// Category writes are platform administration, not community moderation.
fn require_admin(auth: &AuthUser) -> Result<()> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Administrator access required.".to_string(),
        ))
    }
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> Result<Json<Vec<Category>>> {
    let categories = state.category_service.list(&query.kind).await?;
    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path((kind, slug)): Path<(String, String)>,
) -> Result<Json<Category>> {
    let category = state.category_service.get_by_slug(&kind, &slug).await?;
    Ok(Json(category))
}

pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateCategory>,
) -> Result<(StatusCode, Json<Category>)> {
    require_admin(&auth)?;
    let category = state.category_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCategory>,
) -> Result<Json<Category>> {
    require_admin(&auth)?;
    let category = state.category_service.update(id, input).await?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    require_admin(&auth)?;
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
