use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Users & friendship graph
        .route("/users", post(handlers::create_user))
        .route("/users", put(handlers::update_user))
        .route("/users", get(handlers::get_users))
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id/friends", get(handlers::get_friends))
        .route("/users/:id/friends/:friend_id", put(handlers::add_friend))
        .route(
            "/users/:id/friends/:friend_id",
            delete(handlers::remove_friend),
        )
        .route(
            "/users/:id/friends/common/:other_id",
            get(handlers::get_common_friends),
        )
        // Films, likes & rankings
        .route("/films", post(handlers::create_film))
        .route("/films", put(handlers::update_film))
        .route("/films", get(handlers::get_films))
        .route("/films/popular", get(handlers::get_popular_films))
        .route("/films/search", get(handlers::search_films))
        .route("/films/:id", get(handlers::get_film))
        .route("/films/:id/like/:user_id", put(handlers::add_like))
        .route("/films/:id/like/:user_id", delete(handlers::remove_like))
        // Reviews & votes
        .route("/reviews", post(handlers::create_review))
        .route("/reviews", put(handlers::update_review))
        .route("/reviews", get(handlers::get_reviews))
        .route("/reviews/:id", get(handlers::get_review))
        .route("/reviews/:id", delete(handlers::delete_review))
        .route("/reviews/:id/like/:user_id", put(handlers::add_review_like))
        .route(
            "/reviews/:id/like/:user_id",
            delete(handlers::remove_review_like),
        )
        .route(
            "/reviews/:id/dislike/:user_id",
            put(handlers::add_review_dislike),
        )
        .route(
            "/reviews/:id/dislike/:user_id",
            delete(handlers::remove_review_dislike),
        )
        // Reference catalogs
        .route("/genres", get(handlers::get_genres))
        .route("/genres/:id", get(handlers::get_genre))
        .route("/mpa", get(handlers::get_mpa_ratings))
        .route("/mpa/:id", get(handlers::get_mpa_rating))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
