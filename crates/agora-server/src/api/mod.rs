mod categories;
mod communities;

use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Community routes
        .route(
            "/api/communities",
            get(communities::list_communities).post(communities::create_community),
        )
        .route("/api/communities/mine", get(communities::my_communities))
        // GET reads the segment as a slug, PUT as the community id.
        .route(
            "/api/communities/{id}",
            get(communities::get_community).put(communities::update_community),
        )
        .route("/api/communities/{id}/join", post(communities::join_community))
        .route(
            "/api/communities/{id}/leave",
            delete(communities::leave_community),
        )
        .route(
            "/api/communities/{id}/members",
            get(communities::list_members),
        )
        .route(
            "/api/communities/{id}/members/{user_id}/role",
            put(communities::change_member_role),
        )
        .route(
            "/api/communities/{id}/channels",
            post(communities::create_channel),
        )
        // Category routes
        .route(
            "/api/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/api/categories/{id}",
            put(categories::update_category).delete(categories::delete_category),
        )
        // Static segment so the slug lookup cannot collide with the id route.
        .route(
            "/api/categories/by-slug/{kind}/{slug}",
            get(categories::get_category),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
